//! `0x` prefixed hex encoding helpers shared by the normalizer and the format
//! converter.

use std::fmt::Write as _;
use thiserror::Error;

/// Encodes bytes as a `0x` prefixed lowercase hex string.
pub fn encode(bytes: &[u8]) -> String {
    let mut buffer = String::with_capacity(2 + bytes.len() * 2);
    buffer.push_str("0x");
    for byte in bytes {
        // Writing to a `String` is infallible.
        let _ = write!(&mut buffer, "{byte:02x}");
    }
    buffer
}

/// Returns the hex digits of a `0x` (or `0X`) prefixed string.
pub fn digits(hex: &str) -> Option<&str> {
    hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X"))
}

/// Returns `true` if the string is `0x` prefixed and only contains hex digits
/// after the prefix.
pub fn is_hex(value: &str) -> bool {
    digits(value).is_some_and(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Decodes a `0x` prefixed hex string with an even number of digits.
pub fn decode(hex: &str) -> Result<Vec<u8>, HexError> {
    let digits = digits(hex).ok_or(HexError::MissingPrefix)?;
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength);
    }
    decode_digits(digits)
}

/// Decodes a `0x` prefixed hex string, left padding an odd number of digits
/// with a zero nibble.
pub fn decode_padded(hex: &str) -> Result<Vec<u8>, HexError> {
    let digits = digits(hex).ok_or(HexError::MissingPrefix)?;
    if digits.len() % 2 != 0 {
        return decode_digits(&format!("0{digits}"));
    }
    decode_digits(digits)
}

fn decode_digits(digits: &str) -> Result<Vec<u8>, HexError> {
    let nibble = |x: u8| -> Result<u8, HexError> {
        match x {
            b'0'..=b'9' => Ok(x - b'0'),
            b'a'..=b'f' => Ok(x - b'a' + 0xa),
            b'A'..=b'F' => Ok(x - b'A' + 0xa),
            _ => Err(HexError::InvalidDigit(x as char)),
        }
    };

    digits
        .as_bytes()
        .chunks_exact(2)
        .map(|chunk| Ok((nibble(chunk[0])? << 4) + nibble(chunk[1])?))
        .collect()
}

/// An error decoding a hex string.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum HexError {
    #[error("missing '0x' prefix")]
    MissingPrefix,
    #[error("odd number of characters in hex string")]
    OddLength,
    #[error("invalid hex digit {0:?}")]
    InvalidDigit(char),
}
