//! WAV dumping for calibration mode: writes a frame to a 16-bit PCM file so
//! an operator can inspect bare door+retransmission timing offline.

use std::io;
use std::path::Path;

/// Writes `frame` (samples in [-1.0, 1.0]) to `path` as 16-bit mono PCM at
/// `sample_rate`.
pub fn write_frame(frame: &[f32], sample_rate: u32, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, format!("{err}")))?;
    let amplitude = i16::MAX as f32;
    for &sample in frame {
        writer
            .write_sample((sample * amplitude) as i16)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, format!("{err}")))?;
    }
    writer
        .finalize()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, format!("{err}")))
}
