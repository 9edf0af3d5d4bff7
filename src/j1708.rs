//! L1: J1708 bit framer.
//!
//! Builds the preamble and payload bit streams that make up one J2497
//! transmission: sync symbols, start/stop framing around each byte, the
//! arithmetic checksum, and LSB-first byte encoding.

use crate::bits::BitVec;
use crate::error::GeneratorError;

/// Maximum payload length allowed by the J1708 protocol.
pub const MAX_PAYLOAD_LEN: usize = 21;

const START_BIT: bool = false;
const STOP_BIT: bool = true;
const SYNC_BITS: [bool; 5] = [true, true, true, true, true];
const ENDSYNC_BITS: [bool; 7] = [true, true, true, true, true, true, true];
const INITIAL_PREAMBLE_BITS: [bool; 2] = [false, false];

/// Two's-complement checksum of a J1708 payload: `(256 - sum(bytes)) mod 256`.
pub fn checksum(payload: &[u8]) -> u8 {
    let sum: u32 = payload.iter().map(|&b| b as u32).sum();
    ((256 - (sum % 256)) % 256) as u8
}

/// Builds the J2497 preamble bit stream for a given MID byte:
/// `START(0) ‖ INITIAL(00) ‖ reverse_bits(mid_byte) ‖ STOP(1)`.
///
/// Length is always 11 bits (S3).
pub fn build_preamble_bits(mid_byte: u8) -> BitVec {
    let mut bits = BitVec::with_capacity(11);
    bits.push_bit(START_BIT);
    bits.push_bits(&INITIAL_PREAMBLE_BITS);
    bits.push_bits(&crate::bits::encode_byte_lsb(mid_byte));
    bits.push_bit(STOP_BIT);
    bits
}

/// Number of extra stop bits to append after payload byte `index`, given the
/// per-byte vector `extra_stop_bits` (last element reused past its end).
fn extra_stop_bits_for(extra_stop_bits: &[u32], index: usize) -> u32 {
    if index < extra_stop_bits.len() {
        extra_stop_bits[index]
    } else {
        *extra_stop_bits.last().expect("non-empty extra_stop_bits")
    }
}

/// Builds the J2497 payload bit stream.
///
/// - `payload`: the J1708 message bytes (MID first).
/// - `checksum_override`: if set, used instead of `checksum(payload)`.
/// - `extra_stop_bits`: per-byte additional stop bits (§3); must be non-empty.
/// - `truncate_at_checksum`: if true, stop right after the last payload byte's
///   framing — used to build keyhole signals whose CRC slot is left silent.
pub fn build_payload_bits(
    payload: &[u8],
    checksum_override: Option<u8>,
    extra_stop_bits: &[u32],
    truncate_at_checksum: bool,
) -> Result<BitVec, GeneratorError> {
    if extra_stop_bits.is_empty() {
        return Err(GeneratorError::EmptyExtraStopBits);
    }
    if payload.is_empty() && !truncate_at_checksum {
        return Err(GeneratorError::EmptyPayload);
    }
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(GeneratorError::PayloadTooLong(payload.len()));
    }

    let mut bits = BitVec::new();
    bits.push_bits(&SYNC_BITS);

    for (i, &b) in payload.iter().enumerate() {
        bits.push_bit(START_BIT);
        bits.push_bits(&crate::bits::encode_byte_lsb(b));
        bits.push_bit(STOP_BIT);
        for _ in 0..extra_stop_bits_for(extra_stop_bits, i) {
            bits.push_bit(STOP_BIT);
        }
    }

    if truncate_at_checksum {
        return Ok(bits);
    }

    let csum = checksum_override.unwrap_or_else(|| checksum(payload));
    bits.push_bit(START_BIT);
    bits.push_bits(&crate::bits::encode_byte_lsb(csum));
    bits.push_bit(STOP_BIT);
    bits.push_bits(&ENDSYNC_BITS);

    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_door_payload_is_b4() {
        // S1
        let mut payload = vec![0x89u8, 0xFE, 0x07, 0x57];
        payload.extend(std::iter::repeat(0xAAu8).take(11));
        payload.extend_from_slice(&[0xA7, 0x1C]);
        assert_eq!(checksum(&payload), 0xB4);
    }

    #[test]
    fn checksum_makes_sum_zero_mod_256() {
        let payloads: &[&[u8]] = &[&[0x0A, 0x00], &[0x89, 0xFE, 0x07], &[0x01]];
        for payload in payloads {
            let csum = checksum(payload);
            let sum: u32 = payload.iter().map(|&b| b as u32).sum::<u32>() + csum as u32;
            assert_eq!(sum % 256, 0);
        }
    }

    #[test]
    fn lamp_on_truncated_framing_matches_s2() {
        let bits = build_payload_bits(&[0x0A], None, &[0], true).unwrap();
        let expected = [
            true, true, true, true, true, // sync
            false, // start
            false, true, false, true, false, false, false, false, // lsb(0x0A)
            true, // stop
        ];
        assert_eq!(bits.as_slice(), expected);
    }

    #[test]
    fn preamble_of_0a_matches_s3() {
        let bits = build_preamble_bits(0x0A);
        let expected = [
            false, false, false, // start, initial
            false, true, false, true, false, false, false, false, // lsb(0x0A)
            true, // stop
        ];
        assert_eq!(bits.len(), 11);
        assert_eq!(bits.as_slice(), expected);
    }

    #[test]
    fn untruncated_payload_length_matches_formula() {
        for len in 1..=MAX_PAYLOAD_LEN {
            let payload = vec![0u8; len];
            let bits = build_payload_bits(&payload, None, &[0], false).unwrap();
            assert_eq!(bits.len(), 22 + 10 * len);
        }
    }

    #[test]
    fn extra_stop_bits_extend_untruncated_length() {
        let payload = vec![0u8; 3];
        let k = 2;
        let bits = build_payload_bits(&payload, None, &[k], false).unwrap();
        assert_eq!(bits.len(), 22 + (10 + k as usize) * payload.len());
    }

    #[test]
    fn extra_stop_bits_vector_reuses_last_element() {
        let payload = vec![0u8; 4];
        let bits = build_payload_bits(&payload, None, &[1, 3], false).unwrap();
        // bytes: extras [1, 3, 3, 3] -> total extra stop bits = 10
        assert_eq!(bits.len(), 22 + 10 * payload.len() + 10);
    }

    #[test]
    fn empty_extra_stop_bits_is_rejected() {
        let err = build_payload_bits(&[0x0A], None, &[], false).unwrap_err();
        assert_eq!(err, GeneratorError::EmptyExtraStopBits);
    }

    #[test]
    fn empty_payload_rejected_outside_truncated_mode() {
        let err = build_payload_bits(&[], None, &[0], false).unwrap_err();
        assert_eq!(err, GeneratorError::EmptyPayload);
    }

    #[test]
    fn empty_payload_allowed_in_truncated_mode() {
        let bits = build_payload_bits(&[], None, &[0], true).unwrap();
        assert_eq!(bits.len(), 5);
    }

    #[test]
    fn payload_too_long_is_rejected() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        let err = build_payload_bits(&payload, None, &[0], false).unwrap_err();
        assert_eq!(err, GeneratorError::PayloadTooLong(MAX_PAYLOAD_LEN + 1));
    }
}
