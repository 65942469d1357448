//! Return formats and the schema driven response converter.
//!
//! Responses are lifted from wire JSON into a [`Formatted`] tree and then
//! reshaped according to a [`Schema`] and a caller chosen [`DataFormat`].

use crate::{
    debug, hex,
    normalize::{self, InvalidInputError, Kind},
    schema::Schema,
};
use ethprim::U256;
use serde::{Serialize, Serializer};
use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Index,
};
use thiserror::Error;

/// The largest integer a double precision float represents exactly.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Return format used when converting responses.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct DataFormat {
    /// Representation of quantities.
    pub number: NumberFormat,
    /// Representation of byte strings, hashes and addresses.
    pub bytes: ByteFormat,
}

impl DataFormat {
    /// The wire format: hex quantities and hex byte strings.
    pub const HEX: Self = Self::new(NumberFormat::Hex, ByteFormat::Hex);

    /// Creates a new data format.
    pub const fn new(number: NumberFormat, bytes: ByteFormat) -> Self {
        Self { number, bytes }
    }
}

/// Representation of quantities.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum NumberFormat {
    /// Minimal length `0x` prefixed hex string.
    Hex,
    /// Decimal string.
    Decimal,
    /// 256-bit integer.
    #[default]
    BigInt,
    /// Native number, limited to [`MAX_SAFE_INTEGER`].
    Number,
}

/// Representation of byte strings.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ByteFormat {
    /// `0x` prefixed hex string.
    #[default]
    Hex,
    /// Raw bytes.
    ByteArray,
}

/// A response value.
#[derive(Clone, Default, PartialEq)]
pub enum Formatted {
    #[default]
    Null,
    Bool(bool),
    Number(u64),
    Float(f64),
    BigInt(U256),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Formatted>),
    /// Object entries, in the order they were received.
    Object(Vec<(String, Formatted)>),
}

static NULL: Formatted = Formatted::Null;

impl Formatted {
    /// Returns the value of an object field.
    pub fn get(&self, key: &str) -> Option<&Formatted> {
        match self {
            Self::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_big_int(&self) -> Option<U256> {
        match self {
            Self::BigInt(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Formatted]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Formatted)]> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns the field names of an object value, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.as_object()
            .unwrap_or_default()
            .iter()
            .map(|(key, _)| key.as_str())
    }
}

impl From<serde_json::Value> for Formatted {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(value),
            Value::Number(number) => match number.as_u64() {
                Some(value) => Self::Number(value),
                None => Self::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(value) => Self::String(value),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Index<&str> for Formatted {
    type Output = Formatted;

    fn index(&self, key: &str) -> &Formatted {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Formatted {
    type Output = Formatted;

    fn index(&self, index: usize) -> &Formatted {
        self.as_array()
            .and_then(|items| items.get(index))
            .unwrap_or(&NULL)
    }
}

impl Debug for Formatted {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Number(value) => f.debug_tuple("Number").field(value).finish(),
            Self::Float(value) => f.debug_tuple("Float").field(value).finish(),
            Self::BigInt(value) => f.debug_tuple("BigInt").field(value).finish(),
            Self::String(value) => f.debug_tuple("String").field(value).finish(),
            Self::Bytes(value) => f.debug_tuple("Bytes").field(&debug::Hex(value)).finish(),
            Self::Array(items) => f.debug_list().entries(items).finish(),
            Self::Object(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
        }
    }
}

/// Big integers serialize as decimal strings and byte arrays as arrays of
/// numbers.
impl Serialize for Formatted {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Number(value) => serializer.serialize_u64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::BigInt(value) => serializer.collect_str(value),
            Self::String(value) => serializer.serialize_str(value),
            Self::Bytes(value) => value.serialize(serializer),
            Self::Array(items) => items.serialize(serializer),
            Self::Object(entries) => serializer.collect_map(entries.iter().map(|(k, v)| (k, v))),
        }
    }
}

impl Display for Formatted {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Converts a response value according to its schema.
pub fn convert(value: &Formatted, schema: &Schema, format: DataFormat) -> Result<Formatted, Error> {
    match (schema, value) {
        (_, Formatted::Null) | (Schema::Any, _) => Ok(value.clone()),
        (Schema::Quantity, _) => number(value, format.number),
        (Schema::Address, _) => bytes(value, Kind::Address, format.bytes),
        (Schema::Hash, _) => bytes(value, Kind::Hash, format.bytes),
        (Schema::Bytes, _) => bytes(value, Kind::Bytes, format.bytes),
        (Schema::Object(_), Formatted::Object(entries)) => entries
            .iter()
            .map(|(key, value)| {
                let value = match schema.field(key) {
                    Some(field) => convert(value, field, format)?,
                    None => value.clone(),
                };
                Ok::<_, Error>((key.clone(), value))
            })
            .collect::<Result<_, _>>()
            .map(Formatted::Object),
        (Schema::Array(item), Formatted::Array(items)) => {
            convert_array(items, item, format).map(Formatted::Array)
        }
        (Schema::Union(alternatives), _) => {
            let alternative = alternatives
                .iter()
                .find(|alternative| alternative.accepts(value));
            match alternative {
                Some(alternative) => convert(value, alternative, format),
                None => {
                    Err(InvalidInputError::expected(value, "union", "no matching shape").into())
                }
            }
        }
        (Schema::Object(_), _) => {
            Err(InvalidInputError::expected(value, "object", "unexpected value shape").into())
        }
        (Schema::Array(_), _) => {
            Err(InvalidInputError::expected(value, "array", "unexpected value shape").into())
        }
    }
}

/// Converts every item of a list according to the item schema.
pub fn convert_array(
    values: &[Formatted],
    schema: &Schema,
    format: DataFormat,
) -> Result<Vec<Formatted>, Error> {
    values
        .iter()
        .map(|value| convert(value, schema, format))
        .collect()
}

fn number(value: &Formatted, format: NumberFormat) -> Result<Formatted, Error> {
    let invalid = |reason: &str| InvalidInputError::new(value, Kind::Quantity, reason);
    let number = match value {
        Formatted::String(s) => {
            let number = normalize::parse_quantity(s).map_err(invalid)?;
            if format == NumberFormat::Hex && hex::digits(s).is_some() {
                return Ok(value.clone());
            }
            number
        }
        Formatted::Number(n) => U256::new((*n).into()),
        Formatted::BigInt(n) => *n,
        Formatted::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= MAX_SAFE_INTEGER as f64 => {
            U256::new(*f as u128)
        }
        Formatted::Bytes(b) => normalize::Input::Bytes(b.clone()).to_u256()?,
        _ => return Err(invalid("expected a number").into()),
    };

    Ok(match format {
        NumberFormat::Hex => Formatted::String(normalize::quantity(number)),
        NumberFormat::Decimal => Formatted::String(number.to_string()),
        NumberFormat::BigInt => Formatted::BigInt(number),
        NumberFormat::Number => u64::try_from(number)
            .ok()
            .filter(|n| *n <= MAX_SAFE_INTEGER)
            .map(Formatted::Number)
            .ok_or(PrecisionLossError { value: number })?,
    })
}

fn bytes(value: &Formatted, kind: Kind, format: ByteFormat) -> Result<Formatted, Error> {
    let invalid = |reason: &str| InvalidInputError::new(value, kind, reason);
    let decoded = match value {
        Formatted::String(s) => {
            let decoded = match kind.fixed_len() {
                Some(_) => hex::decode(s),
                None => hex::decode_padded(s),
            };
            decoded.map_err(|err| invalid(&err.to_string()))?
        }
        Formatted::Bytes(b) => b.clone(),
        _ => return Err(invalid("expected bytes").into()),
    };

    if let Some(len) = kind.fixed_len() {
        if decoded.len() != len {
            return Err(invalid(&format!("expected {len} bytes but got {}", decoded.len())).into());
        }
    }

    Ok(match (format, value) {
        (ByteFormat::Hex, Formatted::String(_)) => value.clone(),
        (ByteFormat::Hex, _) => Formatted::String(hex::encode(&decoded)),
        (ByteFormat::ByteArray, _) => Formatted::Bytes(decoded),
    })
}

/// A quantity that does not fit the requested native number format.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("{value} exceeds the safe integer range of native numbers")]
pub struct PrecisionLossError {
    pub value: U256,
}

/// An error converting a response value.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    PrecisionLoss(#[from] PrecisionLossError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ITEM: Schema = Schema::Object(&[
        ("number", Schema::Quantity),
        ("hash", Schema::Hash),
        ("miner", Schema::Address),
        ("data", Schema::Bytes),
        ("values", Schema::Array(&Schema::Quantity)),
        ("child", Schema::Object(&[("gas", Schema::Quantity)])),
    ]);

    fn item() -> Formatted {
        json!({
            "number": "0x1b4",
            "hash": "0xdc0818cf78f21a8e70579cb46a43643f78291264dda342ae31049421c82d21ae",
            "miner": "0xbb7b8287f3f0a933474a79eae42cbca977791171",
            "data": "0x476574682f4c5649562f76312e302e302f6c696e75782f676f312e342e32",
            "values": ["0x0", "0x10", "0xff"],
            "child": { "gas": "0x5208", "note": "kept" },
            "removed": false,
        })
        .into()
    }

    fn formats() -> Vec<DataFormat> {
        let numbers = [
            NumberFormat::Hex,
            NumberFormat::Decimal,
            NumberFormat::BigInt,
            NumberFormat::Number,
        ];
        let bytes = [ByteFormat::Hex, ByteFormat::ByteArray];
        numbers
            .into_iter()
            .flat_map(|number| bytes.into_iter().map(move |bytes| DataFormat::new(number, bytes)))
            .collect()
    }

    #[test]
    fn hex_format_is_identity_for_hex_values() {
        let value = item();
        assert_eq!(convert(&value, &ITEM, DataFormat::HEX).unwrap(), value);
    }

    #[test]
    fn conversion_is_idempotent() {
        for format in formats() {
            let once = convert(&item(), &ITEM, format).unwrap();
            let twice = convert(&once, &ITEM, format).unwrap();
            assert_eq!(once, twice, "{format:?}");
        }
    }

    #[test]
    fn converts_back_to_wire_format() {
        for format in formats() {
            let converted = convert(&item(), &ITEM, format).unwrap();
            assert_eq!(
                convert(&converted, &ITEM, DataFormat::HEX).unwrap(),
                item(),
                "{format:?}",
            );
        }
    }

    #[test]
    fn renders_numbers() {
        let value = Formatted::from(json!("0x1b4"));
        let render = |number| {
            convert(
                &value,
                &Schema::Quantity,
                DataFormat::new(number, ByteFormat::Hex),
            )
        };
        assert_eq!(render(NumberFormat::Hex).unwrap(), Formatted::String("0x1b4".into()));
        assert_eq!(render(NumberFormat::Decimal).unwrap(), Formatted::String("436".into()));
        assert_eq!(render(NumberFormat::BigInt).unwrap(), Formatted::BigInt(U256::new(436)));
        assert_eq!(render(NumberFormat::Number).unwrap(), Formatted::Number(436));
    }

    #[test]
    fn native_numbers_refuse_to_lose_precision() {
        let format = DataFormat::new(NumberFormat::Number, ByteFormat::Hex);
        let safe = Formatted::from(json!("0x1fffffffffffff"));
        assert_eq!(
            convert(&safe, &Schema::Quantity, format).unwrap(),
            Formatted::Number(MAX_SAFE_INTEGER),
        );

        let unsafe_ = Formatted::from(json!("0x20000000000000"));
        assert_eq!(
            convert(&unsafe_, &Schema::Quantity, format).unwrap_err(),
            Error::PrecisionLoss(PrecisionLossError {
                value: U256::new(1 << 53)
            }),
        );

        let decimal = DataFormat::new(NumberFormat::Decimal, ByteFormat::Hex);
        assert_eq!(
            convert(&unsafe_, &Schema::Quantity, decimal).unwrap(),
            Formatted::String("9007199254740992".into()),
        );
    }

    #[test]
    fn renders_byte_arrays() {
        let format = DataFormat::new(NumberFormat::Hex, ByteFormat::ByteArray);
        let converted = convert(&item(), &ITEM, format).unwrap();
        assert_eq!(converted["hash"].as_bytes().map(<[u8]>::len), Some(32));
        assert_eq!(converted["miner"].as_bytes().map(<[u8]>::len), Some(20));
        assert_eq!(&converted["data"].as_bytes().unwrap()[..4], b"Geth");
    }

    #[test]
    fn checks_fixed_byte_lengths() {
        let short = Formatted::from(json!("0xd5677cf67b5aa051bb40496e68ad359eb97cfbf8"));
        assert!(convert(&short, &Schema::Hash, DataFormat::HEX).is_err());
        assert!(convert(&short, &Schema::Address, DataFormat::HEX).is_ok());
    }

    #[test]
    fn pads_odd_length_byte_strings() {
        let nonce = Formatted::from(json!("0x1c11920a4"));
        let format = DataFormat::new(NumberFormat::Hex, ByteFormat::ByteArray);
        assert_eq!(
            convert(&nonce, &Schema::Bytes, format).unwrap(),
            Formatted::Bytes(vec![0x01, 0xc1, 0x19, 0x20, 0xa4]),
        );
    }

    #[test]
    fn preserves_keys_and_order() {
        let value = Formatted::from(json!({ "z": "0x1", "number": "0x2", "a": null }));
        let converted = convert(&value, &ITEM, DataFormat::default()).unwrap();
        assert_eq!(converted.keys().collect::<Vec<_>>(), ["z", "number", "a"]);
        assert_eq!(converted["z"], Formatted::String("0x1".into()));
        assert!(converted.get("hash").is_none());
        assert!(converted["a"].is_null());
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let value = Formatted::from(json!(["0x1"]));
        assert!(convert(&value, &ITEM, DataFormat::HEX).is_err());
        assert!(convert(&Formatted::Bool(true), &Schema::Quantity, DataFormat::HEX).is_err());
    }

    #[test]
    fn serializes_converted_values() {
        let converted = convert(&item(), &ITEM, DataFormat::default()).unwrap();
        let json = serde_json::to_value(&converted).unwrap();
        assert_eq!(json["number"], json!("436"));
        assert_eq!(json["values"], json!(["0", "16", "255"]));
        assert_eq!(json["child"]["note"], json!("kept"));
    }
}
