//! L4: frame composer — the keyhole-mitigation logic itself.
//!
//! Produces the periodic sequence of `door ‖ keyhole ‖ jam` frames (one per
//! `(allowed_message, supplier, delay, phase)` tuple) plus a single trailing
//! all-jam frame, each exactly `period_samples` long.

use tracing::{debug, info};

use crate::chirp::{jam, samples_for_us, DEFAULT_JAM_FREQ_HZ};
use crate::config::{GeneratorConfig, SAMPLE_RATE_FLOOR_HZ};
use crate::error::GeneratorError;
use crate::supplier::SupplierParameters;
use crate::waveform::build_message_waveform;

/// The J1708 UART bit time, 9600 bps.
pub const UART_BIT_TIME_US: f64 = 104.17;
/// One sync symbol (5 body bits at 100 us each).
pub const SYNC_SYMBOL_TIME_US: f64 = 5.0 * crate::chirp::BODY_BIT_TIME_US;
/// Fixed latency of the canonical PLC modem from J2497 end-of-frame to UART end-of-frame.
pub const FROM_J2497_OVER_TO_UART_OVER_US: f64 = 48.3;
/// Length of the blanked CRC+end-sync window a keyhole leaves silent:
/// start bit + checksum byte + stop bit + end sync, in body bits.
pub const TIME_AFTER_PAYLOAD_US: f64 = (1.0 + 8.0 + 1.0 + 7.0) * crate::chirp::BODY_BIT_TIME_US;

/// Minimum allowed frame period.
pub const MIN_PERIOD_US: u32 = 32_000;
/// Default frame period, equal to the minimum.
pub const DEFAULT_PERIOD_US: u32 = MIN_PERIOD_US;

/// Door signal MID: a real trailer-ABS address so queueing transmitters hold off.
const DOOR_MID: u8 = 0x89;
/// Door payload: MID followed by a deliberately CRC-corrupted 16-byte body.
const DOOR_PAYLOAD: [u8; 17] = [
    DOOR_MID, 0xFE, 0x07, 0x57, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
    0xA7, 0x1C,
];
/// Transmitted checksum for the door; the correct value would be 0xB4 (see S1).
const DOOR_CHECKSUM: u8 = 0xCC;

/// Builds the door waveform: a full (untruncated) J2497 transmission whose
/// checksum is intentionally wrong, holding queueing transmitters in wait.
fn door_waveform(sample_rate: f64) -> Result<Vec<f32>, GeneratorError> {
    build_message_waveform(
        &DOOR_PAYLOAD,
        Some(DOOR_MID),
        Some(DOOR_CHECKSUM),
        &[0],
        false,
        sample_rate,
    )
}

/// Builds one keyhole signal: a truncated transmission of `payload`, phase-scaled,
/// padded with the blanked CRC/end-sync window, and prefixed with early jam timed
/// to land on the target supplier's retransmission.
fn keyhole_waveform(
    payload: &[u8],
    supplier: &SupplierParameters,
    delay: f64,
    phase: i8,
    sample_rate: f64,
) -> Result<Vec<f32>, GeneratorError> {
    let mut wave = build_message_waveform(
        payload,
        None,
        None,
        &supplier.extra_stop_bits,
        true,
        sample_rate,
    )?;

    let phase = phase as f32;
    for sample in wave.iter_mut() {
        *sample *= phase;
    }

    let silence_len = samples_for_us(TIME_AFTER_PAYLOAD_US, sample_rate);
    wave.resize(wave.len() + silence_len, 0.0);

    let start_us =
        delay * UART_BIT_TIME_US + FROM_J2497_OVER_TO_UART_OVER_US - UART_BIT_TIME_US - SYNC_SYMBOL_TIME_US;
    let early_jam_len = samples_for_us(start_us.max(0.0), sample_rate);

    let mut frame = jam(early_jam_len, sample_rate, DEFAULT_JAM_FREQ_HZ);
    frame.extend(wave);
    Ok(frame)
}

/// One `(allowed_message, supplier, delay, phase)` tuple, stored as indices
/// into the generator's config so the config stays the single owner of the
/// catalog data.
struct KeyholeTuple {
    msg_idx: usize,
    supplier_idx: usize,
    delay: f64,
    phase: i8,
}

/// Lazy, finite iterator over fixed-length keyhole-mitigation frames.
///
/// Construction validates the configuration (§7); iteration never panics on
/// a bad configuration, but can fail mid-sequence with
/// [`GeneratorError::FrameExceedsPeriod`] if a particular keyhole turns out
/// too long for the configured period.
pub struct FrameGenerator {
    config: GeneratorConfig,
    sample_rate: f64,
    period_samples: usize,
    doors: Vec<Vec<f32>>,
    door_cursor: usize,
    tuples: Vec<KeyholeTuple>,
    cursor: usize,
    closing_emitted: bool,
}

impl FrameGenerator {
    /// Validates `config` and precomputes the door waveform and the
    /// (allowed_message, supplier, delay, phase) enumeration. The
    /// enumeration order — allowed_messages outer, then suppliers, then each
    /// supplier's delays, then its phases, all in declared order — is part
    /// of the contract (it interacts with real transmitter timing).
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        if config.sample_rate < SAMPLE_RATE_FLOOR_HZ {
            return Err(GeneratorError::SampleRateTooLow(config.sample_rate));
        }
        if config.period_us < MIN_PERIOD_US {
            return Err(GeneratorError::PeriodTooShort(config.period_us));
        }
        if config.allowed_messages.is_empty() {
            return Err(GeneratorError::NoAllowedMessages);
        }
        if config.supplier_parameters.is_empty() {
            return Err(GeneratorError::NoSupplierParameters);
        }
        for supplier in &config.supplier_parameters {
            supplier.validate()?;
        }

        let sample_rate = config.sample_rate;
        let period_samples = samples_for_us(config.period_us as f64, sample_rate);

        let half_lamp_cycle_samples = (0.5 * sample_rate).round() as u64;
        let remainder = half_lamp_cycle_samples % period_samples as u64;
        let align_limit = samples_for_us(SYNC_SYMBOL_TIME_US, sample_rate) as u64;
        if remainder <= align_limit || (period_samples as u64 - remainder) <= align_limit {
            return Err(GeneratorError::PeriodAlignsWithLampCycle {
                period_us: config.period_us,
                sample_rate,
                remainder,
                limit: align_limit,
            });
        }

        let doors = vec![door_waveform(sample_rate)?];

        let mut tuples = Vec::new();
        for msg_idx in 0..config.allowed_messages.len() {
            for (supplier_idx, supplier) in config.supplier_parameters.iter().enumerate() {
                let set_start = tuples.len();
                for &delay in &supplier.expected_delays {
                    for &phase in &supplier.expected_phases {
                        tuples.push(KeyholeTuple {
                            msg_idx,
                            supplier_idx,
                            delay,
                            phase,
                        });
                    }
                }
                debug!(
                    supplier = %supplier.label,
                    allowed_message_index = msg_idx,
                    delays = supplier.expected_delays.len(),
                    phases = supplier.expected_phases.len(),
                    keyholes = tuples.len() - set_start,
                    "built supplier keyhole set"
                );
            }
        }

        debug_assert!(doors.len() <= tuples.len() + 1);

        let frame_count = tuples.len() + 1;
        info!(
            sample_rate,
            period_us = config.period_us,
            period_samples,
            frame_count,
            calibration_mode = config.calibration_mode,
            "generator constructed"
        );

        Ok(Self {
            config,
            sample_rate,
            period_samples,
            doors,
            door_cursor: 0,
            tuples,
            cursor: 0,
            closing_emitted: false,
        })
    }

    /// Length, in samples, of every frame this generator yields.
    pub fn period_samples(&self) -> usize {
        self.period_samples
    }

    /// Total number of frames this generator will yield:
    /// `1 + |allowed| * sum_over_suppliers(|delays| * |phases|)`.
    pub fn frame_count(&self) -> usize {
        self.tuples.len() + 1
    }

    fn next_door(&mut self) -> Vec<f32> {
        let door = self.doors[self.door_cursor].clone();
        self.door_cursor = (self.door_cursor + 1) % self.doors.len();
        door
    }

    fn pad_to_period(&self, door_and_keyhole_len: usize) -> Result<usize, GeneratorError> {
        if door_and_keyhole_len >= self.period_samples {
            return Err(GeneratorError::FrameExceedsPeriod {
                combined: door_and_keyhole_len,
                period: self.period_samples,
            });
        }
        Ok(self.period_samples - door_and_keyhole_len)
    }

    fn trailing_jam(&self, len: usize) -> Vec<f32> {
        if self.config.calibration_mode {
            vec![0.0; len]
        } else {
            jam(len, self.sample_rate, DEFAULT_JAM_FREQ_HZ)
        }
    }

    fn build_keyhole_frame(&mut self, idx: usize) -> Result<Vec<f32>, GeneratorError> {
        let (payload_idx, supplier_idx, delay, phase) = {
            let tuple = &self.tuples[idx];
            (tuple.msg_idx, tuple.supplier_idx, tuple.delay, tuple.phase)
        };
        let payload = self.config.allowed_messages[payload_idx].clone();
        let supplier = self.config.supplier_parameters[supplier_idx].clone();

        let mut keyhole = keyhole_waveform(&payload, &supplier, delay, phase, self.sample_rate)?;
        if self.config.calibration_mode {
            keyhole.iter_mut().for_each(|s| *s = 0.0);
        }

        let door = self.next_door();
        let jam_len = self.pad_to_period(door.len() + keyhole.len())?;

        let mut frame = door;
        frame.extend(keyhole);
        frame.extend(self.trailing_jam(jam_len));
        Ok(frame)
    }

    fn build_closing_frame(&mut self) -> Result<Vec<f32>, GeneratorError> {
        let door = self.next_door();
        let jam_len = self.pad_to_period(door.len())?;

        let mut frame = door;
        frame.extend(self.trailing_jam(jam_len));
        Ok(frame)
    }
}

impl Iterator for FrameGenerator {
    type Item = Result<Vec<f32>, GeneratorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor < self.tuples.len() {
            let idx = self.cursor;
            self.cursor += 1;
            Some(self.build_keyhole_frame(idx))
        } else if !self.closing_emitted {
            self.closing_emitted = true;
            Some(self.build_closing_frame())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supplier::{bendix, wabco};

    #[test]
    fn door_checksum_is_deliberately_wrong() {
        // S1
        assert_eq!(crate::j1708::checksum(&DOOR_PAYLOAD), 0xB4);
        assert_ne!(DOOR_CHECKSUM, 0xB4);
    }

    #[test]
    fn keyhole_timing_matches_s4() {
        let sr = 1_000_000.0;
        let supplier = wabco();
        let keyhole = keyhole_waveform(&[0x0A, 0x00], &supplier, 45.0, 1, sr).unwrap();
        let start_us = 45.0 * UART_BIT_TIME_US + FROM_J2497_OVER_TO_UART_OVER_US
            - UART_BIT_TIME_US
            - SYNC_SYMBOL_TIME_US;
        assert!((start_us - 4131.78).abs() < 1e-6);
        let early_jam_len = samples_for_us(start_us, sr);
        assert!(early_jam_len == 4131 || early_jam_len == 4132);
        assert!(keyhole.len() > early_jam_len);
    }

    #[test]
    fn rejects_sample_rate_below_floor() {
        let mut config = GeneratorConfig::default();
        config.sample_rate = 799_999.0;
        let err = FrameGenerator::new(config).unwrap_err();
        assert_eq!(err, GeneratorError::SampleRateTooLow(799_999.0));
    }

    #[test]
    fn rejects_period_below_minimum() {
        // S5
        let mut config = GeneratorConfig::default();
        config.period_us = 25_000;
        let err = FrameGenerator::new(config).unwrap_err();
        assert_eq!(err, GeneratorError::PeriodTooShort(25_000));
    }

    #[test]
    fn rejects_empty_allowed_messages() {
        let mut config = GeneratorConfig::default();
        config.allowed_messages.clear();
        let err = FrameGenerator::new(config).unwrap_err();
        assert_eq!(err, GeneratorError::NoAllowedMessages);
    }

    #[test]
    fn rejects_empty_supplier_parameters() {
        let mut config = GeneratorConfig::default();
        config.supplier_parameters.clear();
        let err = FrameGenerator::new(config).unwrap_err();
        assert_eq!(err, GeneratorError::NoSupplierParameters);
    }

    #[test]
    fn default_config_frame_count_matches_formula() {
        let config = GeneratorConfig::default();
        let suppliers = config.supplier_parameters.clone();
        let expected: usize = config.allowed_messages.len()
            * suppliers
                .iter()
                .map(|s| s.expected_delays.len() * s.expected_phases.len())
                .sum::<usize>();
        let gen = FrameGenerator::new(config).unwrap();
        assert_eq!(gen.frame_count(), expected + 1);
    }

    #[test]
    fn every_frame_has_period_length_at_alternate_sample_rate() {
        // S6-shaped: same default config, a sample rate for which the
        // 0.5s/period alignment invariant still holds.
        let mut config = GeneratorConfig::default();
        config.sample_rate = 7_777_777.0;
        let expected_period = samples_for_us(config.period_us as f64, config.sample_rate);
        let gen = FrameGenerator::new(config).unwrap();
        assert_eq!(gen.period_samples(), expected_period);
        assert_eq!(gen.frame_count(), 11);
        let mut produced = 0;
        for frame in gen {
            let frame = frame.unwrap();
            assert_eq!(frame.len(), expected_period);
            produced += 1;
        }
        assert_eq!(produced, 11);
    }

    #[test]
    fn calibration_mode_zeroes_keyhole_and_jam_but_not_door() {
        let mut config = GeneratorConfig::default();
        config.calibration_mode = true;
        config.allowed_messages = vec![vec![0x0A, 0x00]];
        config.supplier_parameters = vec![bendix()];
        let gen = FrameGenerator::new(config).unwrap();
        let door_len = {
            let d = door_waveform(800_000.0).unwrap();
            d.len()
        };
        for frame in gen {
            let frame = frame.unwrap();
            assert!(frame[..door_len].iter().any(|&s| s != 0.0));
            assert!(frame[door_len..].iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn frame_exceeds_period_is_reported_as_error_not_panic() {
        let mut config = GeneratorConfig::default();
        config.period_us = MIN_PERIOD_US;
        config.sample_rate = 800_000.0;
        config.allowed_messages = vec![vec![0u8; 21]];
        let mut gen = FrameGenerator::new(config).unwrap();
        let result = gen.next().unwrap();
        assert!(matches!(
            result,
            Err(GeneratorError::FrameExceedsPeriod { .. })
        ));
    }
}
