//! Registry of subscription names.

use super::SubscriptionOptions;
use crate::{
    normalize::InvalidInputError,
    schema::{self, Schema},
    types,
};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
};
use thiserror::Error;

/// A kind of push subscription supported by Ethereum nodes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SubscriptionKind {
    /// Logs matching a filter, included in new blocks.
    Logs,
    /// Headers of new blocks added to the chain.
    NewHeads,
    /// Hashes of transactions added to the transaction pool.
    NewPendingTransactions,
    /// Changes in the sync status of the node.
    Syncing,
}

impl SubscriptionKind {
    /// The `eth_subscribe` name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::NewHeads => "newHeads",
            Self::NewPendingTransactions => "newPendingTransactions",
            Self::Syncing => "syncing",
        }
    }

    /// Builds the `eth_subscribe` parameters. Only log subscriptions take a
    /// filter, the starting block is never sent to the node.
    pub(crate) fn params(
        self,
        options: &SubscriptionOptions,
    ) -> Result<Vec<Value>, InvalidInputError> {
        let mut params = vec![Value::from(self.name())];
        if self == Self::Logs {
            let mut filter = Map::new();
            types::encode_address_and_topics(&mut filter, &options.address, &options.topics)?;
            params.push(Value::Object(filter));
        }
        Ok(params)
    }

    /// The schema of the notifications pushed for the kind.
    pub fn schema(self) -> Schema {
        match self {
            Self::Logs => schema::LOG,
            Self::NewHeads => schema::BLOCK_HEADER,
            Self::NewPendingTransactions => schema::TRANSACTION_OR_HASH,
            Self::Syncing => schema::SYNCING_NOTIFICATION,
        }
    }
}

impl Display for SubscriptionKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Table of subscription names and their kinds.
#[derive(Clone, Debug)]
pub struct Registry {
    kinds: HashMap<String, SubscriptionKind>,
}

impl Registry {
    /// Creates a registry with every subscription kind under its canonical
    /// name, plus the legacy `pendingTransactions` and `newBlockHeaders`
    /// aliases.
    pub fn new() -> Self {
        let kinds = [
            SubscriptionKind::Logs,
            SubscriptionKind::NewHeads,
            SubscriptionKind::NewPendingTransactions,
            SubscriptionKind::Syncing,
        ]
        .into_iter()
        .map(|kind| (kind.name().to_owned(), kind))
        .collect();

        Self { kinds }
            .with_alias("pendingTransactions", SubscriptionKind::NewPendingTransactions)
            .with_alias("newBlockHeaders", SubscriptionKind::NewHeads)
    }

    /// Adds an alias for a subscription kind.
    pub fn with_alias(mut self, alias: impl Into<String>, kind: SubscriptionKind) -> Self {
        self.kinds.insert(alias.into(), kind);
        self
    }

    /// Resolves a subscription name to its kind.
    pub fn resolve(&self, name: &str) -> Result<SubscriptionKind, UnknownSubscriptionError> {
        self.kinds
            .get(name)
            .copied()
            .ok_or_else(|| UnknownSubscriptionError {
                name: name.to_owned(),
            })
    }

    /// Returns every registered name.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription name that is not registered.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown subscription {name:?}")]
pub struct UnknownSubscriptionError {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArrayVec, LogFilterValue};
    use serde_json::json;

    #[test]
    fn resolves_legacy_aliases() {
        let registry = Registry::new();
        assert_eq!(
            registry.resolve("pendingTransactions"),
            registry.resolve("newPendingTransactions"),
        );
        assert_eq!(
            registry.resolve("newBlockHeaders").unwrap(),
            SubscriptionKind::NewHeads,
        );
        assert_eq!(registry.names().count(), 6);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = Registry::new().resolve("newBlocks").unwrap_err();
        assert_eq!(err.name, "newBlocks");
        assert_eq!(err.to_string(), r#"unknown subscription "newBlocks""#);
    }

    #[test]
    fn custom_aliases() {
        let registry = Registry::new().with_alias("heads", SubscriptionKind::NewHeads);
        assert_eq!(registry.resolve("heads").unwrap(), SubscriptionKind::NewHeads);
    }

    #[test]
    fn builds_subscribe_params() {
        assert_eq!(
            SubscriptionKind::NewHeads
                .params(&SubscriptionOptions::default())
                .unwrap(),
            [json!("newHeads")],
        );

        let mut topics = ArrayVec::new();
        topics.push(LogFilterValue::from([0xaa_u8; 32]));
        let options = SubscriptionOptions {
            from_block: Some("100".into()),
            address: "0x9008D19f58AAbD9eD0D60971565AA8510560ab41".into(),
            topics,
        };
        assert_eq!(
            SubscriptionKind::Logs.params(&options).unwrap(),
            [
                json!("logs"),
                json!({
                    "address": "0x9008d19f58aabd9ed0d60971565aa8510560ab41",
                    "topics": [format!("0x{}", "aa".repeat(32))],
                }),
            ],
        );
    }
}
