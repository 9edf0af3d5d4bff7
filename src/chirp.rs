//! L2: chirp modulator.
//!
//! Maps framed J1708/J2497 bits to audio-rate samples: each preamble bit
//! occupies a 114 us slot (chirp-or-silence), each payload bit occupies a
//! 100 us slot (+/- chirp), and a pure sinusoid jam carrier corrupts
//! everything the keyholes don't protect.

use std::f64::consts::PI;

/// Body bit time for J2497 payload symbols, in microseconds.
pub const BODY_BIT_TIME_US: f64 = 100.0;
/// Preamble slot time (runs slower than the body), in microseconds.
pub const PREAMBLE_SLOT_TIME_US: f64 = 114.0;
/// Calibrated constant-carrier jam frequency (3/4 power of target signal).
pub const DEFAULT_JAM_FREQ_HZ: f64 = 376.379e3;

/// Which `single_chirp` endpoint set to synthesize. The frame composer (L4)
/// always uses [`ChirpVariant::Primary`]; [`ChirpVariant::Alternate`] is
/// exposed for experimentation per the source's two unreferenced-vs-referenced
/// `single_chirp` functions (see SPEC_FULL.md design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChirpVariant {
    #[default]
    Primary,
    Alternate,
}

/// Converts a duration in microseconds to a sample count at `sample_rate` Hz,
/// rounding rather than truncating to avoid cumulative drift across
/// concatenated segments.
pub fn samples_for_us(t_us: f64, sample_rate: f64) -> usize {
    (t_us * sample_rate / 1e6).round() as usize
}

/// One linear-frequency-sweep segment, sampled at `sample_rate` starting at
/// absolute time `t_start_s`, over `n` samples, from `f0` to `f1` reached at
/// `t_end_s`, with initial phase `phi_deg` degrees.
fn chirp_segment(
    t_start_s: f64,
    t_end_s: f64,
    f0: f64,
    f1: f64,
    phi_deg: f64,
    n: usize,
    sample_rate: f64,
) -> Vec<f64> {
    let phi = phi_deg * PI / 180.0;
    let rate = (f1 - f0) / (2.0 * t_end_s);
    (0..n)
        .map(|i| {
            let t = t_start_s + i as f64 / sample_rate;
            let phase = 2.0 * PI * (f0 * t + rate * t * t) + phi;
            phase.cos()
        })
        .collect()
}

fn single_chirp_segments(sample_rate: f64, variant: ChirpVariant) -> Vec<f64> {
    let n1 = samples_for_us(63.0, sample_rate);
    let n2 = samples_for_us(4.0, sample_rate);
    let n3 = samples_for_us(33.0, sample_rate);

    let (f1_seg1, phi_seg3, f0_seg3, f1_seg3, phi_seg1) = match variant {
        ChirpVariant::Primary => (400e3, -90.0, 100e3, 200e3, -90.0),
        ChirpVariant::Alternate => (394e3, -30.0, 1e3, 216e3, -90.0),
    };

    let mut wave = chirp_segment(0.0, 63e-6, 203e3, f1_seg1, phi_seg1, n1, sample_rate);
    wave.extend(chirp_segment(
        63e-6, 67e-6, 400e3, 100e3, -90.0, n2, sample_rate,
    ));
    wave.extend(chirp_segment(
        67e-6, 100e-6, f0_seg3, f1_seg3, phi_seg3, n3, sample_rate,
    ));
    wave
}

/// Synthesizes a single 100 us chirp symbol at `sample_rate`, zero-padded (or
/// truncated) to exactly `round(100e-6 * sample_rate)` samples.
pub fn single_chirp(sample_rate: f64, variant: ChirpVariant) -> Vec<f32> {
    let target_len = samples_for_us(BODY_BIT_TIME_US, sample_rate);
    let mut wave = single_chirp_segments(sample_rate, variant);
    wave.resize(target_len, 0.0);
    wave.into_iter().map(|s| s as f32).collect()
}

/// Modulates a preamble bit stream: bit `0` emits a chirp zero-padded to fill
/// a 114 us slot, bit `1` emits silence for the full slot.
pub fn modulate_preamble_bits(bits: &[bool], sample_rate: f64) -> Vec<f32> {
    let chirp = single_chirp(sample_rate, ChirpVariant::Primary);
    let slot_len = samples_for_us(PREAMBLE_SLOT_TIME_US, sample_rate);
    let mut wave = Vec::with_capacity(bits.len() * slot_len);
    for &bit in bits {
        if bit {
            wave.resize(wave.len() + slot_len, 0.0);
        } else {
            wave.extend_from_slice(&chirp);
            wave.resize(wave.len() + slot_len - chirp.len(), 0.0);
        }
    }
    wave
}

/// Modulates a payload bit stream: bit `1` emits +chirp, bit `0` emits
/// -chirp (phase-inverted).
pub fn modulate_payload_bits(bits: &[bool], sample_rate: f64) -> Vec<f32> {
    let chirp = single_chirp(sample_rate, ChirpVariant::Primary);
    let mut wave = Vec::with_capacity(bits.len() * chirp.len());
    for &bit in bits {
        if bit {
            wave.extend_from_slice(&chirp);
        } else {
            wave.extend(chirp.iter().map(|&s| -s));
        }
    }
    wave
}

/// A pure sinusoid carrier, `n_samples` long, amplitude 1.0, phase -90
/// degrees, used to jam any transmission not protected by a keyhole.
pub fn jam(n_samples: usize, sample_rate: f64, freq: f64) -> Vec<f32> {
    let phi = -90.0_f64 * PI / 180.0;
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * PI * freq * t + phi).cos() as f32
        })
        .collect()
}
