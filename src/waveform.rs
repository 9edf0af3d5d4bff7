//! L3: message signal builder. Composes a J2497 preamble and payload into
//! one complete transmission waveform (used for both door and keyhole
//! signals).

use crate::chirp::{modulate_payload_bits, modulate_preamble_bits};
use crate::error::GeneratorError;
use crate::j1708::{build_payload_bits, build_preamble_bits};

/// Builds a complete J2497 transmission waveform: preamble (modulated by
/// presence/absence of chirps) followed by payload (modulated by chirp
/// phase).
///
/// - `mid_byte`: defaults to `payload[0]` when absent.
/// - `checksum_override`: used instead of the computed checksum when set.
/// - `extra_stop_bits`: defaults to `[0]` when empty is passed as `None`.
/// - `truncate_at_checksum`: when true, omits the checksum byte and end sync
///   (used for keyhole signals).
pub fn build_message_waveform(
    payload: &[u8],
    mid_byte: Option<u8>,
    checksum_override: Option<u8>,
    extra_stop_bits: &[u32],
    truncate_at_checksum: bool,
    sample_rate: f64,
) -> Result<Vec<f32>, GeneratorError> {
    let mid_byte = match mid_byte {
        Some(m) => m,
        None => *payload.first().ok_or(GeneratorError::EmptyPayload)?,
    };

    let preamble_bits = build_preamble_bits(mid_byte);
    let payload_bits = build_payload_bits(
        payload,
        checksum_override,
        extra_stop_bits,
        truncate_at_checksum,
    )?;

    let mut wave = modulate_preamble_bits(preamble_bits.as_slice(), sample_rate);
    wave.extend(modulate_payload_bits(payload_bits.as_slice(), sample_rate));
    Ok(wave)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chirp::{samples_for_us, PREAMBLE_SLOT_TIME_US};

    #[test]
    fn lamp_on_waveform_length_matches_preamble_plus_payload() {
        let sr = 1_000_000.0;
        let wave = build_message_waveform(&[0x0A, 0x00], None, None, &[0], false, sr).unwrap();

        let preamble_len = 11 * samples_for_us(PREAMBLE_SLOT_TIME_US, sr);
        let payload_bits_len = 22 + 10 * 2;
        let payload_len = payload_bits_len * samples_for_us(100.0, sr);
        assert_eq!(wave.len(), preamble_len + payload_len);
    }

    #[test]
    fn default_mid_byte_is_first_payload_byte() {
        let sr = 1_000_000.0;
        let with_default = build_message_waveform(&[0x0A, 0x00], None, None, &[0], false, sr).unwrap();
        let with_explicit =
            build_message_waveform(&[0x0A, 0x00], Some(0x0A), None, &[0], false, sr).unwrap();
        assert_eq!(with_default, with_explicit);
    }

    #[test]
    fn truncated_keyhole_waveform_omits_checksum_and_endsync() {
        let sr = 1_000_000.0;
        let truncated =
            build_message_waveform(&[0x0A, 0x00], None, None, &[0], true, sr).unwrap();
        let full = build_message_waveform(&[0x0A, 0x00], None, None, &[0], false, sr).unwrap();
        assert!(truncated.len() < full.len());
    }

    #[test]
    fn empty_payload_without_mid_byte_is_rejected() {
        let err = build_message_waveform(&[], None, None, &[0], true, 1_000_000.0).unwrap_err();
        assert_eq!(err, GeneratorError::EmptyPayload);
    }
}
