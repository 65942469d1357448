//! Normalization of caller supplied numbers and bytes into their canonical
//! `0x` prefixed wire encoding.

use crate::hex;
use ethprim::{Address, Digest, U256};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// A numeric or byte value in any representation accepted from callers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Input {
    /// A `0x` prefixed hex string or a string of decimal digits.
    Str(String),
    /// A native integer.
    Int(i128),
    /// A 256-bit unsigned integer.
    BigInt(U256),
    /// A raw byte sequence.
    Bytes(Vec<u8>),
    /// No value. The caller is expected to substitute a contextual default
    /// before normalizing.
    #[default]
    Undefined,
}

impl Input {
    /// Returns `true` if the value is [`Input::Undefined`].
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Interprets the value as an unsigned 256-bit integer.
    ///
    /// Byte sequences are read as big-endian integers of at most 32 bytes.
    pub fn to_u256(&self) -> Result<U256, InvalidInputError> {
        let invalid = |reason: &str| InvalidInputError::new(self, Kind::Quantity, reason);
        match self {
            Self::Str(value) => parse_quantity(value).map_err(|reason| invalid(reason)),
            Self::Int(value) => u128::try_from(*value)
                .map(U256::new)
                .map_err(|_| invalid("negative values cannot be encoded")),
            Self::BigInt(value) => Ok(*value),
            Self::Bytes(bytes) => {
                if bytes.len() > 32 {
                    return Err(invalid("value exceeds 256 bits"));
                }
                let mut buffer = [0; 32];
                buffer[32 - bytes.len()..].copy_from_slice(bytes);
                Ok(U256::from_be_bytes(buffer))
            }
            Self::Undefined => Err(invalid("value is undefined")),
        }
    }
}

impl Display for Input {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "{value:?}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::BigInt(value) => write!(f, "{value}"),
            Self::Bytes(bytes) => f.write_str(&hex::encode(bytes)),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

macro_rules! impl_from_int {
    ($($t:ty,)*) => {$(
        impl From<$t> for Input {
            fn from(value: $t) -> Self {
                Self::Int(value.into())
            }
        }
    )*};
}

impl_from_int! {
    u8,
    u16,
    u32,
    u64,
    i8,
    i16,
    i32,
    i64,
    i128,
}

impl From<usize> for Input {
    fn from(value: usize) -> Self {
        Self::BigInt(U256::new(value as u128))
    }
}

impl From<u128> for Input {
    fn from(value: u128) -> Self {
        Self::BigInt(U256::new(value))
    }
}

impl From<U256> for Input {
    fn from(value: U256) -> Self {
        Self::BigInt(value)
    }
}

impl From<Vec<u8>> for Input {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Input {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Input {
    fn from(value: [u8; N]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Address> for Input {
    fn from(value: Address) -> Self {
        Self::Bytes(value.0.to_vec())
    }
}

impl From<Digest> for Input {
    fn from(value: Digest) -> Self {
        Self::Bytes(value.0.to_vec())
    }
}

impl<T> From<Option<T>> for Input
where
    T: Into<Input>,
{
    fn from(value: Option<T>) -> Self {
        value.map(T::into).unwrap_or_default()
    }
}

/// The wire kind a value is normalized into.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    /// A 20-byte account address.
    Address,
    /// An unsigned integer quantity, encoded as minimal length hex.
    Quantity,
    /// An arbitrary length byte blob.
    Bytes,
    /// A 32-byte hash.
    Hash,
}

impl Kind {
    /// The fixed byte length of the kind, if it has one.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            Self::Address => Some(20),
            Self::Hash => Some(32),
            Self::Quantity | Self::Bytes => None,
        }
    }

    /// A human readable name for the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Quantity => "quantity",
            Self::Bytes => "bytes",
            Self::Hash => "hash",
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizes a value into the `0x` prefixed lowercase wire encoding of the
/// specified kind.
pub fn normalize(input: &Input, kind: Kind) -> Result<String, InvalidInputError> {
    match kind {
        Kind::Quantity => input.to_u256().map(quantity),
        Kind::Address | Kind::Bytes | Kind::Hash => bytes(input, kind).map(|b| hex::encode(&b)),
    }
}

/// Decodes a value as raw bytes of the specified byte kind, checking its
/// length for fixed size kinds.
pub fn bytes(input: &Input, kind: Kind) -> Result<Vec<u8>, InvalidInputError> {
    let invalid = |reason: &str| InvalidInputError::new(input, kind, reason);
    let bytes = match input {
        Input::Str(value) if hex::digits(value).is_some() => {
            hex::decode(value).map_err(|err| invalid(&err.to_string()))?
        }
        Input::Str(_) => return Err(invalid("expected a '0x' prefixed hex string")),
        Input::Bytes(bytes) => bytes.clone(),
        Input::Int(_) | Input::BigInt(_) => {
            return Err(invalid("numbers cannot be encoded as bytes"))
        }
        Input::Undefined => return Err(invalid("value is undefined")),
    };

    match kind.fixed_len() {
        Some(len) if bytes.len() != len => Err(invalid(&format!(
            "expected {len} bytes but got {}",
            bytes.len()
        ))),
        _ => Ok(bytes),
    }
}

/// Encodes a quantity as minimal length `0x` prefixed hex.
pub fn quantity(value: U256) -> String {
    let encoded = hex::encode(&value.to_be_bytes());
    let digits = encoded[2..].trim_start_matches('0');
    if digits.is_empty() {
        "0x0".to_owned()
    } else {
        format!("0x{digits}")
    }
}

/// Parses a hex or decimal string quantity.
pub(crate) fn parse_quantity(value: &str) -> Result<U256, &'static str> {
    if let Some(digits) = hex::digits(value) {
        if digits.is_empty() {
            return Err("hex quantity has no digits");
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err("invalid hex digit");
        }
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(U256::ZERO);
        }
        if digits.len() > 64 {
            return Err("value exceeds 256 bits");
        }
        return U256::from_str_radix(digits, 16).map_err(|_| "invalid hex quantity");
    }

    if value.starts_with('-') {
        return Err("negative values cannot be encoded");
    }
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err("expected a hex or decimal number");
    }
    U256::from_str_radix(value, 10).map_err(|_| "value exceeds 256 bits")
}

/// A value that cannot be losslessly represented in its target wire kind.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("invalid {expected} {value}: {reason}")]
pub struct InvalidInputError {
    /// The offending value, rendered for diagnostics.
    pub value: String,
    /// What the value was expected to be.
    pub expected: &'static str,
    /// Why the value was rejected.
    pub reason: String,
}

impl InvalidInputError {
    pub(crate) fn new(value: impl Display, kind: Kind, reason: &str) -> Self {
        Self::expected(value, kind.as_str(), reason)
    }

    pub(crate) fn expected(value: impl Display, expected: &'static str, reason: &str) -> Self {
        Self {
            value: value.to_string(),
            expected,
            reason: reason.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethprim::address;
    use hex_literal::hex;

    #[test]
    fn quantity_representations_agree() {
        let representations: Vec<Input> = vec![
            "0x4b7".into(),
            "0x04B7".into(),
            "1207".into(),
            1207_u64.into(),
            1207_i32.into(),
            U256::new(1207).into(),
            hex!("04b7").into(),
        ];
        for input in &representations {
            let normalized = normalize(input, Kind::Quantity).unwrap();
            assert_eq!(normalized, "0x4b7", "{input}");
            assert_eq!(
                normalize(&Input::from(normalized.as_str()), Kind::Quantity).unwrap(),
                normalized,
            );
        }
    }

    #[test]
    fn zero_quantity() {
        for input in [Input::from(0_u8), "0x0".into(), "0x0000".into(), "0".into()] {
            assert_eq!(normalize(&input, Kind::Quantity).unwrap(), "0x0");
        }
    }

    #[test]
    fn large_quantities() {
        assert_eq!(
            normalize(&U256::MAX.into(), Kind::Quantity).unwrap(),
            format!("0x{}", "f".repeat(64)),
        );
        let too_big = format!("0x1{}", "0".repeat(64));
        assert!(normalize(&too_big.into(), Kind::Quantity).is_err());
    }

    #[test]
    fn rejects_negative_quantities() {
        assert!(normalize(&(-1_i64).into(), Kind::Quantity).is_err());
        assert!(normalize(&"-5".into(), Kind::Quantity).is_err());
    }

    #[test]
    fn rejects_malformed_quantities() {
        for input in [
            Input::from("0x"),
            "0xg1".into(),
            "twelve".into(),
            "".into(),
            Input::Undefined,
        ] {
            let err = normalize(&input, Kind::Quantity).unwrap_err();
            assert_eq!(err.expected, "quantity");
        }
    }

    #[test]
    fn normalizes_addresses() {
        let expected = "0x9008d19f58aabd9ed0d60971565aa8510560ab41";
        for input in [
            Input::from("0x9008D19f58AAbD9eD0D60971565AA8510560ab41"),
            address!("0x9008D19f58AAbD9eD0D60971565AA8510560ab41").into(),
            hex!("9008D19f58AAbD9eD0D60971565AA8510560ab41").into(),
        ] {
            assert_eq!(normalize(&input, Kind::Address).unwrap(), expected);
        }
    }

    #[test]
    fn checks_fixed_lengths() {
        let short = Input::from(hex!("d5677cf67b5aa051bb40496e68ad359eb97cfbf8"));
        assert!(normalize(&short, Kind::Hash).is_err());
        assert!(normalize(&short, Kind::Address).is_ok());
        assert!(normalize(&Input::from([0_u8; 32]), Kind::Hash).is_ok());
    }

    #[test]
    fn normalizes_byte_blobs() {
        assert_eq!(normalize(&Vec::<u8>::new().into(), Kind::Bytes).unwrap(), "0x");
        assert_eq!(
            normalize(&"0xF698DA25".into(), Kind::Bytes).unwrap(),
            "0xf698da25"
        );
        assert!(normalize(&"0x123".into(), Kind::Bytes).is_err());
        assert!(normalize(&42_u64.into(), Kind::Bytes).is_err());
        assert!(normalize(&"1207".into(), Kind::Bytes).is_err());
    }

    #[test]
    fn optional_inputs() {
        assert!(Input::from(None::<u64>).is_undefined());
        assert_eq!(Input::from(Some(1_u64)), Input::Int(1));
    }
}
