//! ASCII-hex line codec and record checksums.
//!
//! Record text is addressed in byte slots: slot `n` is the two hex characters
//! at offset `2 * n` of the text that follows the record prefix (`:` for
//! Intel-HEX, `S<type>` for S-Records).

use crate::error::{ErrorKind, HexError};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

const fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decodes the byte stored in slot `index` of `text`.
///
/// # Errors
///
/// Returns a `Syntax` error when the slot is out of range or either character
/// is not a hex digit.
pub fn decode_byte(text: &[u8], index: usize) -> Result<u8, HexError> {
    let pos = index * 2;
    let (Some(&hi), Some(&lo)) = (text.get(pos), text.get(pos + 1)) else {
        return Err(HexError::new(ErrorKind::Syntax));
    };
    match (nibble(hi), nibble(lo)) {
        (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
        _ => Err(HexError::new(ErrorKind::Syntax)),
    }
}

/// Decodes a big-endian 16-bit value from slots `index` and `index + 1`.
///
/// # Errors
///
/// Propagates `Syntax` errors from [`decode_byte`].
pub fn decode_word(text: &[u8], index: usize) -> Result<u16, HexError> {
    let hi = decode_byte(text, index)?;
    let lo = decode_byte(text, index + 1)?;
    Ok(u16::from_be_bytes([hi, lo]))
}

/// Appends `value` as exactly two uppercase hex characters.
pub fn encode_byte(out: &mut String, value: u8) {
    out.push(char::from(HEX_DIGITS[usize::from(value >> 4)]));
    out.push(char::from(HEX_DIGITS[usize::from(value & 0x0F)]));
}

/// Appends `value` as four uppercase hex characters, high byte first.
pub fn encode_word(out: &mut String, value: u16) {
    let [hi, lo] = value.to_be_bytes();
    encode_byte(out, hi);
    encode_byte(out, lo);
}

/// Decodes a whole record body into raw bytes.
///
/// Trailing whitespace must be stripped by the caller.
///
/// # Errors
///
/// Returns a `Syntax` error for odd-length text or non-hex characters.
pub fn decode_line(text: &str) -> Result<Vec<u8>, HexError> {
    let bytes = text.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(HexError::new(ErrorKind::Syntax));
    }
    (0..bytes.len() / 2)
        .map(|index| decode_byte(bytes, index))
        .collect()
}

/// Returns `true` when the Intel-HEX byte sum of `raw` is zero modulo 256.
///
/// `raw` is `[length, addr_hi, addr_lo, command, data..., checksum]`.
#[must_use]
pub fn checksum_intel(raw: &[u8]) -> bool {
    raw.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) == 0
}

/// Returns `true` when the S-Record ones'-complement sum of `raw` is `0xFF`.
///
/// `raw` is `[count, address..., data..., checksum]`.
#[must_use]
pub fn checksum_srecord(raw: &[u8]) -> bool {
    raw.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) == 0xFF
}

/// Computes the S-Record checksum byte for `[count, address..., data...]`.
#[must_use]
pub fn srecord_checksum(body: &[u8]) -> u8 {
    !body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Rewrites the trailing Intel-HEX checksum so `raw` becomes self-consistent.
pub fn recompute_checksum(raw: &mut [u8]) {
    if let Some((checksum, body)) = raw.split_last_mut() {
        *checksum = body
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b))
            .wrapping_neg();
    }
}
