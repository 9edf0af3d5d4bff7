//! Configuration surface for the keyhole waveform generator (§6).

use serde::{Deserialize, Serialize};

use crate::supplier::{default_catalog, SupplierParameters};

/// J1708 "LAMP ON" message: request that the tractor illuminate the ABS
/// warning lamp. The default allowed message.
pub const LAMP_ON: [u8; 2] = [0x0A, 0x00];

/// Sample-rate floor: Nyquist for the 400 kHz upper chirp sweep.
pub const SAMPLE_RATE_FLOOR_HZ: f64 = 800_000.0;

/// Every field a generator run needs, read-only once constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorConfig {
    /// Output sample rate in Hz. Must be >= 800 kHz.
    pub sample_rate: f64,
    /// J1708 payloads to let through the keyholes.
    pub allowed_messages: Vec<Vec<u8>>,
    /// Calibrated per-supplier delay/phase/stop-bit records.
    pub supplier_parameters: Vec<SupplierParameters>,
    /// Period of each door+keyhole (or all-jam) frame, in microseconds.
    /// Must be >= `crate::keyhole::MIN_PERIOD_US`.
    pub period_us: u32,
    /// When true, keyhole and jam amplitudes are zeroed so an operator can
    /// observe bare door+retransmission timing to calibrate a new supplier.
    pub calibration_mode: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE_FLOOR_HZ,
            allowed_messages: vec![LAMP_ON.to_vec()],
            supplier_parameters: default_catalog(),
            period_us: crate::keyhole::MIN_PERIOD_US,
            calibration_mode: false,
        }
    }
}

impl GeneratorConfig {
    /// Merges `other`'s fields over `self`'s, in place. Used to layer a
    /// config file's values under CLI overrides: `defaults.merge(file);
    /// file.merge(cli_overrides)` — whichever is applied last wins.
    pub fn merge_from(&mut self, other: PartialGeneratorConfig) {
        if let Some(v) = other.sample_rate {
            self.sample_rate = v;
        }
        if let Some(v) = other.allowed_messages {
            self.allowed_messages = v;
        }
        if let Some(v) = other.supplier_parameters {
            self.supplier_parameters = v;
        }
        if let Some(v) = other.period_us {
            self.period_us = v;
        }
        if let Some(v) = other.calibration_mode {
            self.calibration_mode = v;
        }
    }
}

/// Partial configuration used for the optional JSON config file (§10.1): any
/// field left out of the file falls back to [`GeneratorConfig::default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PartialGeneratorConfig {
    pub sample_rate: Option<f64>,
    pub allowed_messages: Option<Vec<Vec<u8>>>,
    pub supplier_parameters: Option<Vec<SupplierParameters>>,
    pub period_us: Option<u32>,
    pub calibration_mode: Option<bool>,
}
