//! Error types for the J2497 keyhole waveform generator.

use thiserror::Error;

/// Errors that can occur while building J1708/J2497 bit streams, waveforms,
/// or the periodic keyhole-mitigation frame sequence.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeneratorError {
    /// `sample_rate` was below the 800 kHz Nyquist floor for the 400 kHz chirp.
    #[error("sample rate {0} Hz is below the 800 kHz floor required for J2497 chirps")]
    SampleRateTooLow(f64),

    /// `period_us` was below `MIN_PERIOD_US`.
    #[error("period {0} us is below the minimum period of {min} us", min = crate::keyhole::MIN_PERIOD_US)]
    PeriodTooShort(u32),

    /// The configured period beats against the 0.5s LAMP message cycle within
    /// one sync-symbol width, risking alignment with non-queueing transmitters.
    #[error(
        "period_us {period_us} at sample_rate {sample_rate} aligns with the 0.5s LAMP cycle \
         (remainder {remainder} samples, limit {limit} samples); choose a different period_us"
    )]
    PeriodAlignsWithLampCycle {
        period_us: u32,
        sample_rate: f64,
        remainder: u64,
        limit: u64,
    },

    /// A door-plus-keyhole signal did not fit inside one period.
    #[error(
        "door+keyhole signal ({combined} samples) does not fit inside one period \
         ({period} samples); shorten the keyhole or lengthen period_us"
    )]
    FrameExceedsPeriod { combined: usize, period: usize },

    /// `extra_stop_bits` was empty; at least one element is required.
    #[error("extra_stop_bits must contain at least one element")]
    EmptyExtraStopBits,

    /// A J1708 payload exceeded the protocol's 21-byte limit.
    #[error("payload of {0} bytes exceeds the J1708 maximum of 21 bytes")]
    PayloadTooLong(usize),

    /// A payload was empty outside of truncated (keyhole) mode.
    #[error("payload must not be empty unless truncate_at_checksum is set")]
    EmptyPayload,

    /// No allowed messages were configured.
    #[error("allowed_messages must contain at least one message")]
    NoAllowedMessages,

    /// No supplier parameters were configured.
    #[error("supplier_parameters must contain at least one record")]
    NoSupplierParameters,

    /// A supplier record had no expected delays, phases, or stop-bit entries.
    #[error("supplier '{label}' has an empty {field} list")]
    EmptySupplierField { label: String, field: &'static str },

    /// Reading or parsing a JSON configuration file failed.
    #[error("failed to load config from {path}: {message}")]
    ConfigIo { path: String, message: String },
}
