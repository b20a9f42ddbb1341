//! WAV file reading and writing.

use crate::Result;
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
///
/// Opens the file, reads the header, and returns a [`WavInfo`] struct
/// with format details and duration. This is much faster than
/// [`read_wav_planar`] for callers that only need metadata (e.g. the CLI's
/// `info` command).
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let total_samples = reader.len() as u64;
    let num_frames = total_samples / spec.channels as u64;
    let duration_secs = num_frames as f64 / spec.sample_rate as f64;

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// WAV file specification.
#[derive(Debug, Clone, Copy)]
pub struct WavSpec {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Bit depth per sample (e.g., 16, 24, 32).
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self { channels: 1, sample_rate: 48000, bits_per_sample: 32 }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self { channels: spec.channels, sample_rate: spec.sample_rate, bits_per_sample: spec.bits_per_sample }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 { SampleFormat::Float } else { SampleFormat::Int },
        }
    }
}

fn decode_interleaved(reader: WavReader<std::io::BufReader<std::fs::File>>) -> Result<(Vec<f32>, WavSpec)> {
    let spec = WavSpec::from(reader.spec());
    let samples: Vec<f32> = match reader.spec().sample_format {
        SampleFormat::Float => {
            reader.into_samples::<f32>().collect::<std::result::Result<Vec<_>, _>>()?
        }
        SampleFormat::Int => {
            let max_val = (1i32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok((samples, spec))
}

/// Reads a WAV file and returns its samples as one planar channel per
/// [`resonance_core`](../resonance_core/index.html) convention — the same
/// layout [`resonance_core::Buffer::load_from_array`] expects, so this is
/// the direct path from a file on disk to a loaded buffer asset.
pub fn read_wav_planar<P: AsRef<Path>>(path: P) -> Result<(Vec<Vec<f32>>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let (interleaved, spec) = decode_interleaved(reader)?;
    let channels = spec.channels as usize;
    let frame_count = interleaved.len() / channels.max(1);
    let mut planar = vec![Vec::with_capacity(frame_count); channels];
    for frame in interleaved.chunks(channels) {
        for (ch, &sample) in frame.iter().enumerate() {
            planar[ch].push(sample);
        }
    }
    Ok((planar, spec))
}

/// Reads a WAV file and mixes every channel down to mono.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let (samples, spec) = decode_interleaved(reader)?;
    let channels = spec.channels as usize;
    let mono = if channels > 1 {
        samples.chunks(channels).map(|chunk| chunk.iter().sum::<f32>() / channels as f32).collect()
    } else {
        samples
    };
    Ok((mono, spec))
}

fn write_interleaved<P: AsRef<Path>>(path: P, interleaved: &[f32], spec: WavSpec) -> Result<()> {
    let hound_spec = hound::WavSpec::from(spec);
    let mut writer = WavWriter::create(path, hound_spec)?;
    if spec.bits_per_sample == 32 {
        for &sample in interleaved {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (spec.bits_per_sample - 1)) as f32;
        for &sample in interleaved {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Writes mono samples to a WAV file.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], spec: WavSpec) -> Result<()> {
    write_interleaved(path, samples, spec)
}

/// Writes planar (one `Vec<f32>` per channel) samples to a WAV file —
/// the counterpart to [`read_wav_planar`], used by the CLI's offline
/// render path to persist a [`resonance_core::graph::Simulation::render_block`]
/// output.
pub fn write_wav_planar<P: AsRef<Path>>(path: P, planar: &[Vec<f32>], sample_rate: u32) -> Result<()> {
    let channels = planar.len().max(1);
    let frame_count = planar.first().map(Vec::len).unwrap_or(0);
    let mut interleaved = Vec::with_capacity(frame_count * channels);
    for frame in 0..frame_count {
        for ch in planar {
            interleaved.push(ch.get(frame).copied().unwrap_or(0.0));
        }
    }
    let spec = WavSpec { channels: channels as u16, sample_rate, bits_per_sample: 32 };
    write_interleaved(path, &interleaved, spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_roundtrip_f32() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect();
        let spec = WavSpec { channels: 1, sample_rate: 48000, bits_per_sample: 32 };

        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, spec).unwrap();

        let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
        assert_eq!(loaded_spec.sample_rate, 48000);
        assert_eq!(loaded.len(), samples.len());
        for (a, b) in samples.iter().zip(loaded.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_roundtrip_i16() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin() * 0.9).collect();
        let spec = WavSpec { channels: 1, sample_rate: 44100, bits_per_sample: 16 };

        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, spec).unwrap();

        let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
        assert_eq!(loaded_spec.sample_rate, 44100);
        assert_eq!(loaded.len(), samples.len());
        for (a, b) in samples.iter().zip(loaded.iter()) {
            assert!((a - b).abs() < 0.001);
        }
    }

    #[test]
    fn test_planar_roundtrip_stereo() {
        let left: Vec<f32> = (0..500).map(|i| (i as f32 / 500.0).sin()).collect();
        let right: Vec<f32> = (0..500).map(|i| (i as f32 / 500.0).cos()).collect();

        let file = NamedTempFile::new().unwrap();
        write_wav_planar(file.path(), &[left.clone(), right.clone()], 48000).unwrap();

        let (planar, spec) = read_wav_planar(file.path()).unwrap();
        assert_eq!(spec.channels, 2);
        assert_eq!(planar.len(), 2);
        for (a, b) in left.iter().zip(planar[0].iter()) {
            assert!((a - b).abs() < 1e-6);
        }
        for (a, b) in right.iter().zip(planar[1].iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mono_mixdown() {
        let left = vec![1.0, 2.0];
        let right = vec![3.0, 4.0];
        let file = NamedTempFile::new().unwrap();
        write_wav_planar(file.path(), &[left, right], 44100).unwrap();

        let (mono, _) = read_wav(file.path()).unwrap();
        assert_eq!(mono, vec![2.0, 3.0]);
    }
}
