//! Ethereum RPC request types.
//!
//! Request values hold caller supplied [`Input`]s and are only normalized
//! into their wire encoding when a call is made, so that every representation
//! accepted by the normalizer can be used to build them.

use crate::{
    hex,
    normalize::{self, Input, InvalidInputError, Kind},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};

pub use arrayvec::ArrayVec;
pub use ethprim::{Address, Digest, U256};

/// Block tag.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    /// The lowest numbered block the client has available.
    Earliest,
    /// The most recent crypto-economically secure block, cannot be re-orged
    /// outside of manual intervention driven by community coordination.
    Finalized,
    /// The most recent block that is safe from re-orgs under honest majority
    /// and certain synchronicity assumptions.
    Safe,
    /// The most recent block in the canonical chain observed by the client,
    /// this block may be re-orged out of the canonical chain even under
    /// healthy/normal conditions.
    #[default]
    Latest,
    /// A sample next block built by the client on top of [`BlockTag::Latest`]
    /// and containing the set of transactions usually taken from local mempool.
    Pending,
}

impl BlockTag {
    /// Returns the tag for its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "earliest" => Some(Self::Earliest),
            "finalized" => Some(Self::Finalized),
            "safe" => Some(Self::Safe),
            "latest" => Some(Self::Latest),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Finalized => "finalized",
            Self::Safe => "safe",
            Self::Latest => "latest",
            Self::Pending => "pending",
        }
    }
}

impl Display for BlockTag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Block tag, number, or block hash.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BlockSelector {
    /// Block by tag.
    Tag(BlockTag),
    /// Block by number.
    Number(Input),
    /// Block by hash.
    Hash(Input),
}

impl BlockSelector {
    /// Returns `true` if the selector addresses a block by its hash.
    pub fn is_hash(&self) -> bool {
        matches!(self, Self::Hash(_))
    }

    /// Returns the block number for selectors with a valid numeric value.
    pub fn number(&self) -> Option<U256> {
        match self {
            Self::Number(number) => number.to_u256().ok(),
            _ => None,
        }
    }

    /// Encodes the selector for the wire.
    pub fn encode(&self) -> Result<String, InvalidInputError> {
        match self {
            Self::Tag(tag) => Ok(tag.as_str().to_owned()),
            Self::Number(number) => normalize::normalize(number, Kind::Quantity),
            Self::Hash(hash) => normalize::normalize(hash, Kind::Hash),
        }
    }
}

impl Default for BlockSelector {
    fn default() -> Self {
        Self::Tag(Default::default())
    }
}

impl From<BlockTag> for BlockSelector {
    fn from(tag: BlockTag) -> Self {
        Self::Tag(tag)
    }
}

/// Strings are dispatched by shape: tag names select tags, 32-byte hex
/// strings select block hashes, and everything else is a block number.
impl From<&str> for BlockSelector {
    fn from(value: &str) -> Self {
        if let Some(tag) = BlockTag::from_name(value) {
            return Self::Tag(tag);
        }
        match hex::digits(value) {
            Some(digits) if digits.len() == 64 && hex::is_hex(value) => Self::Hash(value.into()),
            _ => Self::Number(value.into()),
        }
    }
}

impl From<String> for BlockSelector {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

impl From<u64> for BlockSelector {
    fn from(number: u64) -> Self {
        Self::Number(number.into())
    }
}

impl From<U256> for BlockSelector {
    fn from(number: U256) -> Self {
        Self::Number(number.into())
    }
}

/// Raw byte sequences select blocks by hash.
impl From<Vec<u8>> for BlockSelector {
    fn from(hash: Vec<u8>) -> Self {
        Self::Hash(hash.into())
    }
}

impl From<&[u8]> for BlockSelector {
    fn from(hash: &[u8]) -> Self {
        Self::Hash(hash.into())
    }
}

impl From<Digest> for BlockSelector {
    fn from(hash: Digest) -> Self {
        Self::Hash(hash.into())
    }
}

/// Whether block transactions should be hydrated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Hydrated {
    /// Only fetch transaction hashes for blocks.
    #[default]
    No,
    /// Fetch full transaction data for blocks.
    Yes,
}

impl Hydrated {
    /// Returns the boolean value used for encoding Ethereum RPC calls for this
    /// parameter.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::No => false,
            Self::Yes => true,
        }
    }
}

impl From<bool> for Hydrated {
    fn from(value: bool) -> Self {
        match value {
            false => Self::No,
            true => Self::Yes,
        }
    }
}

/// An Ethereum transaction request, used for sending, signing, calling and
/// estimating gas. Absent fields are omitted from the request.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransactionRequest {
    /// The transaction type.
    pub kind: Option<Input>,
    /// The transaction nonce.
    pub nonce: Option<Input>,
    /// The transaction recipient. Absent for contract creation.
    pub to: Option<Input>,
    /// The account sending the transaction.
    pub from: Option<Input>,
    /// The limit in gas units for the transaction.
    pub gas: Option<Input>,
    /// The Ether value associated with the transaction.
    pub value: Option<Input>,
    /// The calldata associated with the transaction.
    pub input: Option<Input>,
    /// The gas price willing to be paid by the sender in wei.
    pub gas_price: Option<Input>,
    /// Maximum fee per gas the sender is willing to pay to miners in wei.
    pub max_priority_fee_per_gas: Option<Input>,
    /// The maximum total fee per gas the sender is willing to pay (includes
    /// the network / base fee and miner / priority fee) in wei.
    pub max_fee_per_gas: Option<Input>,
    /// EIP-2930 access list.
    pub access_list: Option<Vec<AccessListEntry>>,
    /// Chain ID that the transaction is valid on.
    pub chain_id: Option<Input>,
}

impl TransactionRequest {
    /// Encodes the request as a JSON object of normalized fields.
    pub fn encode(&self) -> Result<Value, InvalidInputError> {
        let mut object = Map::new();
        let fields = [
            ("type", &self.kind, Kind::Quantity),
            ("nonce", &self.nonce, Kind::Quantity),
            ("to", &self.to, Kind::Address),
            ("from", &self.from, Kind::Address),
            ("gas", &self.gas, Kind::Quantity),
            ("value", &self.value, Kind::Quantity),
            ("input", &self.input, Kind::Bytes),
            ("gasPrice", &self.gas_price, Kind::Quantity),
            (
                "maxPriorityFeePerGas",
                &self.max_priority_fee_per_gas,
                Kind::Quantity,
            ),
            ("maxFeePerGas", &self.max_fee_per_gas, Kind::Quantity),
            ("chainId", &self.chain_id, Kind::Quantity),
        ];
        for (name, field, kind) in fields {
            match field {
                Some(input) if !input.is_undefined() => {
                    object.insert(name.to_owned(), normalize::normalize(input, kind)?.into());
                }
                _ => {}
            }
        }
        if let Some(access_list) = &self.access_list {
            let entries = access_list
                .iter()
                .map(AccessListEntry::encode)
                .collect::<Result<Vec<_>, _>>()?;
            object.insert("accessList".to_owned(), entries.into());
        }
        Ok(Value::Object(object))
    }
}

/// Access list entry.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AccessListEntry {
    /// The address.
    pub address: Input,
    /// The storage keys.
    pub storage_keys: Vec<Input>,
}

impl AccessListEntry {
    fn encode(&self) -> Result<Value, InvalidInputError> {
        let storage_keys = self
            .storage_keys
            .iter()
            .map(|key| normalize::normalize(key, Kind::Hash).map(Value::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(serde_json::json!({
            "address": normalize::normalize(&self.address, Kind::Address)?,
            "storageKeys": storage_keys,
        }))
    }
}

/// The block range or block hash to fetch logs for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogFilterBlocks {
    /// Logs in a block range. Absent bounds are left to the node.
    Range {
        from: Option<BlockSelector>,
        to: Option<BlockSelector>,
    },
    /// Logs in a single block by hash.
    Hash(Input),
}

impl Default for LogFilterBlocks {
    fn default() -> Self {
        Self::Range {
            from: None,
            to: None,
        }
    }
}

/// A value used for filtering logs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum LogFilterValue<T> {
    /// A filter that accepts all values.
    #[default]
    Any,
    /// A filter that only accepts a single value.
    Exact(T),
    /// A filter that accepts any one of the specified values.
    OneOf(Vec<T>),
}

impl LogFilterValue<Input> {
    /// Returns `true` if the filter accepts all values.
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    pub(crate) fn encode(&self, kind: Kind) -> Result<Value, InvalidInputError> {
        Ok(match self {
            Self::Any => Value::Null,
            Self::Exact(value) => normalize::normalize(value, kind)?.into(),
            Self::OneOf(values) => values
                .iter()
                .map(|value| normalize::normalize(value, kind).map(Value::from))
                .collect::<Result<Vec<_>, _>>()?
                .into(),
        })
    }
}

macro_rules! impl_exact_filter_from {
    ($($t:ty,)*) => {$(
        impl From<$t> for LogFilterValue<Input> {
            fn from(value: $t) -> Self {
                Self::Exact(value.into())
            }
        }
    )*};
}

impl_exact_filter_from! {
    Input,
    &str,
    String,
    Address,
    Digest,
    [u8; 20],
    [u8; 32],
}

/// A filter for querying logs from a node.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LogFilter {
    /// The blocks to fetch logs for.
    pub blocks: LogFilterBlocks,
    /// The contract addresses to fetch logs for.
    pub address: LogFilterValue<Input>,
    /// The log topics to filter for.
    pub topics: ArrayVec<LogFilterValue<Input>, 4>,
}

impl LogFilter {
    /// Encodes the filter as a JSON object of normalized fields.
    pub fn encode(&self) -> Result<Value, InvalidInputError> {
        let mut object = Map::new();
        match &self.blocks {
            LogFilterBlocks::Range { from, to } => {
                if let Some(from) = from {
                    object.insert("fromBlock".to_owned(), from.encode()?.into());
                }
                if let Some(to) = to {
                    object.insert("toBlock".to_owned(), to.encode()?.into());
                }
            }
            LogFilterBlocks::Hash(hash) => {
                object.insert(
                    "blockHash".to_owned(),
                    normalize::normalize(hash, Kind::Hash)?.into(),
                );
            }
        }
        encode_address_and_topics(&mut object, &self.address, &self.topics)?;
        Ok(Value::Object(object))
    }
}

/// Adds the address and topic filters to a filter object, leaving out an
/// unrestricted address and an empty topic list.
pub(crate) fn encode_address_and_topics(
    object: &mut Map<String, Value>,
    address: &LogFilterValue<Input>,
    topics: &[LogFilterValue<Input>],
) -> Result<(), InvalidInputError> {
    if !address.is_any() {
        object.insert("address".to_owned(), address.encode(Kind::Address)?);
    }
    if !topics.is_empty() {
        let topics = topics
            .iter()
            .map(|topic| topic.encode(Kind::Hash))
            .collect::<Result<Vec<_>, _>>()?;
        object.insert("topics".to_owned(), topics.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethprim::address;
    use serde_json::json;

    #[test]
    fn dispatches_block_selectors_by_shape() {
        assert_eq!(
            BlockSelector::from("pending"),
            BlockSelector::Tag(BlockTag::Pending)
        );
        assert!(BlockSelector::from(
            "0xdc0818cf78f21a8e70579cb46a43643f78291264dda342ae31049421c82d21ae"
        )
        .is_hash());
        assert_eq!(
            BlockSelector::from("0x4b7"),
            BlockSelector::Number("0x4b7".into())
        );
        assert_eq!(BlockSelector::from("100").number(), Some(U256::new(100)));
        assert_eq!(BlockSelector::from("earliest").number(), None);
        // A 20-byte hex string is not a block hash.
        assert!(!BlockSelector::from("0xd5677cf67b5aa051bb40496e68ad359eb97cfbf8").is_hash());
        assert!(BlockSelector::from(vec![0xd5_u8; 20]).is_hash());
    }

    #[test]
    fn encodes_block_selectors() {
        assert_eq!(BlockSelector::default().encode().unwrap(), "latest");
        assert_eq!(BlockSelector::from(1207_u64).encode().unwrap(), "0x4b7");
        assert!(BlockSelector::Hash("0x01".into()).encode().is_err());
        assert!(BlockSelector::from(vec![0xd5_u8; 20]).encode().is_err());
    }

    #[test]
    fn encodes_transaction_without_recipient() {
        let tx = TransactionRequest {
            from: Some(address!("0x9008D19f58AAbD9eD0D60971565AA8510560ab41").into()),
            input: Some("0x6080".into()),
            gas: Some(21_000_u64.into()),
            value: Some(Input::Undefined),
            ..Default::default()
        };
        assert_eq!(
            tx.encode().unwrap(),
            json!({
                "from": "0x9008d19f58aabd9ed0d60971565aa8510560ab41",
                "gas": "0x5208",
                "input": "0x6080",
            }),
        );
    }

    #[test]
    fn rejects_invalid_transaction_fields() {
        let tx = TransactionRequest {
            to: Some("0x1234".into()),
            ..Default::default()
        };
        assert_eq!(tx.encode().unwrap_err().expected, "address");
    }

    #[test]
    fn encodes_log_filters() {
        let mut topics = ArrayVec::new();
        topics.push(LogFilterValue::Any);
        topics.push(LogFilterValue::OneOf(vec![[0_u8; 32].into(), [1_u8; 32].into()]));
        let filter = LogFilter {
            blocks: LogFilterBlocks::Range {
                from: Some("100".into()),
                to: Some(BlockTag::Latest.into()),
            },
            address: "0x9008D19f58AAbD9eD0D60971565AA8510560ab41".into(),
            topics,
        };
        assert_eq!(
            filter.encode().unwrap(),
            json!({
                "fromBlock": "0x64",
                "toBlock": "latest",
                "address": "0x9008d19f58aabd9ed0d60971565aa8510560ab41",
                "topics": [
                    null,
                    [
                        format!("0x{}", "00".repeat(32)),
                        format!("0x{}", "01".repeat(32)),
                    ],
                ],
            }),
        );
    }
}
