//! `resonance devices` — list audio output devices cpal can see.

use anyhow::Result;
use resonance_io::list_devices;

pub fn run() -> Result<()> {
    let devices = list_devices()?;
    if devices.is_empty() {
        println!("no audio devices found");
        return Ok(());
    }
    for device in devices {
        let direction = match (device.is_input, device.is_output) {
            (true, true) => "in/out",
            (true, false) => "in",
            (false, true) => "out",
            (false, false) => "none",
        };
        println!("{:<8} {:>7} Hz  {}", direction, device.default_sample_rate, device.name);
    }
    Ok(())
}
