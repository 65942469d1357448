//! Response schemas.
//!
//! A [`Schema`] tags the fields of a JSON RPC response with their semantic
//! kind so that the format converter knows which values are quantities and
//! which are byte strings. Every RPC method declares the schema of its result.

use crate::format::Formatted;

/// The semantic shape of a response value.
#[derive(Clone, Copy, Debug)]
pub enum Schema {
    /// A 20-byte account address.
    Address,
    /// A 32-byte hash.
    Hash,
    /// An unsigned integer quantity.
    Quantity,
    /// An arbitrary length byte string.
    Bytes,
    /// An object with the specified field schemas. Fields without a schema
    /// are kept as is.
    Object(&'static [(&'static str, Schema)]),
    /// An array with items of the specified schema.
    Array(&'static Schema),
    /// A value matching the first alternative with a compatible shape.
    Union(&'static [Schema]),
    /// A value that is never converted.
    Any,
}

impl Schema {
    /// Returns the schema of an object field.
    pub fn field(&self, name: &str) -> Option<&Schema> {
        match self {
            Self::Object(fields) => fields
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, schema)| schema),
            _ => None,
        }
    }

    /// Returns `true` if the value has a shape compatible with the schema.
    pub fn accepts(&self, value: &Formatted) -> bool {
        match (self, value) {
            (Self::Any, _) | (_, Formatted::Null) => true,
            (Self::Object(_), value) => matches!(value, Formatted::Object(_)),
            (Self::Array(_), value) => matches!(value, Formatted::Array(_)),
            (Self::Union(alternatives), value) => alternatives.iter().any(|s| s.accepts(value)),
            (_, value) => matches!(
                value,
                Formatted::String(_)
                    | Formatted::Number(_)
                    | Formatted::Float(_)
                    | Formatted::BigInt(_)
                    | Formatted::Bytes(_)
            ),
        }
    }
}

pub const ANY: Schema = Schema::Any;
pub const QUANTITY: Schema = Schema::Quantity;
pub const HASH: Schema = Schema::Hash;
pub const ADDRESS: Schema = Schema::Address;
pub const BYTES: Schema = Schema::Bytes;

/// A list of account addresses.
pub const ADDRESSES: Schema = Schema::Array(&Schema::Address);

/// Proof-of-work package: header hash, seed hash and boundary.
pub const WORK: Schema = Schema::Array(&Schema::Hash);

/// An event log.
pub const LOG: Schema = Schema::Object(&[
    ("logIndex", Schema::Quantity),
    ("transactionIndex", Schema::Quantity),
    ("transactionHash", Schema::Hash),
    ("blockHash", Schema::Hash),
    ("blockNumber", Schema::Quantity),
    ("blockTimestamp", Schema::Quantity),
    ("address", Schema::Address),
    ("data", Schema::Bytes),
    ("topics", Schema::Array(&Schema::Hash)),
]);

pub const LOGS: Schema = Schema::Array(&LOG);

/// An EIP-2930 access list.
pub const ACCESS_LIST: Schema = Schema::Array(&Schema::Object(&[
    ("address", Schema::Address),
    ("storageKeys", Schema::Array(&Schema::Hash)),
]));

/// An EIP-7702 authorization list.
pub const AUTHORIZATION_LIST: Schema = Schema::Array(&Schema::Object(&[
    ("chainId", Schema::Quantity),
    ("nonce", Schema::Quantity),
    ("address", Schema::Address),
    ("yParity", Schema::Quantity),
    ("r", Schema::Quantity),
    ("s", Schema::Quantity),
]));

/// A transaction, as returned by the `eth_getTransaction*` family.
pub const TRANSACTION: Schema = Schema::Object(&[
    ("type", Schema::Quantity),
    ("blockHash", Schema::Hash),
    ("blockNumber", Schema::Quantity),
    ("blockTimestamp", Schema::Quantity),
    ("from", Schema::Address),
    ("gas", Schema::Quantity),
    ("gasPrice", Schema::Quantity),
    ("maxFeePerGas", Schema::Quantity),
    ("maxPriorityFeePerGas", Schema::Quantity),
    ("maxFeePerBlobGas", Schema::Quantity),
    ("hash", Schema::Hash),
    ("input", Schema::Bytes),
    ("nonce", Schema::Quantity),
    ("to", Schema::Address),
    ("transactionIndex", Schema::Quantity),
    ("value", Schema::Quantity),
    ("accessList", ACCESS_LIST),
    ("authorizationList", AUTHORIZATION_LIST),
    ("blobVersionedHashes", Schema::Array(&Schema::Hash)),
    ("chainId", Schema::Quantity),
    ("v", Schema::Quantity),
    ("r", Schema::Quantity),
    ("s", Schema::Quantity),
    ("yParity", Schema::Quantity),
]);

pub const TRANSACTIONS: Schema = Schema::Array(&TRANSACTION);

/// `eth_signTransaction` result: the signed raw transaction and its fields.
pub const SIGNED_TRANSACTION: Schema =
    Schema::Object(&[("raw", Schema::Bytes), ("tx", TRANSACTION)]);

/// A transaction hash or a full transaction object.
pub const TRANSACTION_OR_HASH: Schema = Schema::Union(&[TRANSACTION, Schema::Hash]);

/// A beacon chain withdrawal.
pub const WITHDRAWAL: Schema = Schema::Object(&[
    ("address", Schema::Address),
    ("amount", Schema::Quantity),
    ("index", Schema::Quantity),
    ("validatorIndex", Schema::Quantity),
]);

/// A block. Headers pushed by `newHeads` subscriptions use the same schema,
/// they simply lack the body fields.
pub const BLOCK: Schema = Schema::Object(&[
    ("hash", Schema::Hash),
    ("parentHash", Schema::Hash),
    ("sha3Uncles", Schema::Hash),
    ("miner", Schema::Address),
    ("stateRoot", Schema::Hash),
    ("transactionsRoot", Schema::Hash),
    ("receiptsRoot", Schema::Hash),
    ("logsBloom", Schema::Bytes),
    ("difficulty", Schema::Quantity),
    ("number", Schema::Quantity),
    ("gasLimit", Schema::Quantity),
    ("gasUsed", Schema::Quantity),
    ("timestamp", Schema::Quantity),
    ("extraData", Schema::Bytes),
    ("mixHash", Schema::Hash),
    ("nonce", Schema::Bytes),
    ("totalDifficulty", Schema::Quantity),
    ("baseFeePerGas", Schema::Quantity),
    ("withdrawalsRoot", Schema::Hash),
    ("blobGasUsed", Schema::Quantity),
    ("excessBlobGas", Schema::Quantity),
    ("parentBeaconBlockRoot", Schema::Hash),
    ("requestsHash", Schema::Hash),
    ("size", Schema::Quantity),
    ("transactions", Schema::Array(&TRANSACTION_OR_HASH)),
    ("withdrawals", Schema::Array(&WITHDRAWAL)),
    ("uncles", Schema::Array(&Schema::Hash)),
]);

pub const BLOCK_HEADER: Schema = BLOCK;

/// A transaction receipt.
pub const RECEIPT: Schema = Schema::Object(&[
    ("type", Schema::Quantity),
    ("transactionHash", Schema::Hash),
    ("transactionIndex", Schema::Quantity),
    ("blockHash", Schema::Hash),
    ("blockNumber", Schema::Quantity),
    ("from", Schema::Address),
    ("to", Schema::Address),
    ("effectiveGasPrice", Schema::Quantity),
    ("cumulativeGasUsed", Schema::Quantity),
    ("gasUsed", Schema::Quantity),
    ("contractAddress", Schema::Address),
    ("logs", LOGS),
    ("logsBloom", Schema::Bytes),
    ("root", Schema::Hash),
    ("status", Schema::Quantity),
    ("blobGasUsed", Schema::Quantity),
    ("blobGasPrice", Schema::Quantity),
]);

/// Fee history. Gas used ratios are floating point values and kept as is.
pub const FEE_HISTORY: Schema = Schema::Object(&[
    ("oldestBlock", Schema::Quantity),
    ("baseFeePerGas", Schema::Array(&Schema::Quantity)),
    ("reward", Schema::Array(&Schema::Array(&Schema::Quantity))),
    ("baseFeePerBlobGas", Schema::Array(&Schema::Quantity)),
]);

/// A storage slot proof.
pub const STORAGE_PROOF: Schema = Schema::Object(&[
    ("key", Schema::Quantity),
    ("value", Schema::Quantity),
    ("proof", Schema::Array(&Schema::Bytes)),
]);

/// An account proof with its storage proofs.
pub const ACCOUNT_PROOF: Schema = Schema::Object(&[
    ("address", Schema::Address),
    ("accountProof", Schema::Array(&Schema::Bytes)),
    ("balance", Schema::Quantity),
    ("codeHash", Schema::Hash),
    ("nonce", Schema::Quantity),
    ("storageHash", Schema::Hash),
    ("storageProof", Schema::Array(&STORAGE_PROOF)),
]);

const SYNC_PROGRESS_FIELDS: &[(&str, Schema)] = &[
    ("startingBlock", Schema::Quantity),
    ("currentBlock", Schema::Quantity),
    ("highestBlock", Schema::Quantity),
    ("knownStates", Schema::Quantity),
    ("pulledStates", Schema::Quantity),
];

/// Sync progress of a syncing node.
pub const SYNC_PROGRESS: Schema = Schema::Object(SYNC_PROGRESS_FIELDS);

/// `eth_syncing` result: either `false` or the sync progress.
pub const SYNCING: Schema = Schema::Union(&[SYNC_PROGRESS, Schema::Any]);

/// A `syncing` subscription notification. Nodes either push a bare boolean,
/// a `{ syncing, status }` envelope, or the progress object itself.
pub const SYNCING_NOTIFICATION: Schema = Schema::Union(&[
    Schema::Object(&[
        ("syncing", Schema::Any),
        ("status", SYNC_PROGRESS),
        ("startingBlock", Schema::Quantity),
        ("currentBlock", Schema::Quantity),
        ("highestBlock", Schema::Quantity),
        ("knownStates", Schema::Quantity),
        ("pulledStates", Schema::Quantity),
    ]),
    Schema::Any,
]);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn looks_up_fields() {
        assert!(matches!(BLOCK.field("number"), Some(Schema::Quantity)));
        assert!(matches!(BLOCK.field("hash"), Some(Schema::Hash)));
        assert!(BLOCK.field("unknown").is_none());
        assert!(QUANTITY.field("number").is_none());
    }

    #[test]
    fn union_accepts_alternative_shapes() {
        let hash = Formatted::from(json!("0x00"));
        let object = Formatted::from(json!({ "hash": "0x00" }));
        assert!(TRANSACTION_OR_HASH.accepts(&hash));
        assert!(TRANSACTION_OR_HASH.accepts(&object));
        assert!(!TRANSACTION_OR_HASH.accepts(&Formatted::from(json!([]))));
        assert!(SYNCING.accepts(&Formatted::Bool(false)));
    }
}
