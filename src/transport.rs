//! Transport port used by the client to reach an Ethereum node.
//!
//! The client never performs I/O itself: every request goes through a
//! [`Transport`], and push channels for subscriptions are opened and closed
//! through it as well.

use crate::jsonrpc;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};
use thiserror::Error;

#[cfg(test)]
pub(crate) mod mock;

/// Server assigned identifier of a push channel.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub String);

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An open push channel.
pub struct PushChannel {
    /// The identifier the node assigned to the channel.
    pub id: SubscriptionId,
    /// Notification payloads, in the order the node pushed them. The stream
    /// ends when the channel is closed.
    pub notifications: BoxStream<'static, Result<Value, TransportError>>,
}

/// Port trait for the request and push channel transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the raw `result` of the response.
    async fn send(&self, method: &str, params: Value) -> Result<Value, TransportError>;

    /// Opens a push channel with the specified `eth_subscribe` parameters.
    async fn subscribe(&self, params: Vec<Value>) -> Result<PushChannel, TransportError> {
        let _ = params;
        Err(TransportError::Unsupported)
    }

    /// Closes a push channel.
    async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), TransportError> {
        let _ = id;
        Err(TransportError::Unsupported)
    }
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        (**self).send(method, params).await
    }

    async fn subscribe(&self, params: Vec<Value>) -> Result<PushChannel, TransportError> {
        (**self).subscribe(params).await
    }

    async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), TransportError> {
        (**self).unsubscribe(id).await
    }
}

/// An error reported by a transport.
#[derive(Clone, Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Rpc(#[from] jsonrpc::Error),
    #[error("transport closed")]
    Closed,
    #[error("push channels are not supported by this transport")]
    Unsupported,
    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps a transport specific error.
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Arc::new(err))
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::other(err)
    }
}
