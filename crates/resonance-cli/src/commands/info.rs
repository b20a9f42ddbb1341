//! `resonance info` — print a WAV file's format metadata without decoding
//! its samples.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use resonance_io::read_wav_info;

#[derive(Args)]
pub struct InfoArgs {
    /// Path to the WAV file.
    pub path: PathBuf,
}

pub fn run(args: InfoArgs) -> Result<()> {
    let info = read_wav_info(&args.path)?;
    println!("path:       {}", args.path.display());
    println!("channels:   {}", info.channels);
    println!("sample rate:{} Hz", info.sample_rate);
    println!("bit depth:  {}", info.bits_per_sample);
    println!("format:     {:?}", info.format);
    println!("frames:     {}", info.num_frames);
    println!("duration:   {:.3}s", info.duration_secs);
    Ok(())
}
