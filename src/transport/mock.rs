//! Scripted in-memory transport.

use super::{PushChannel, SubscriptionId, Transport, TransportError};
use crate::jsonrpc::{self, ErrorCode};
use async_trait::async_trait;
use futures::StreamExt as _;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;

type Sender = mpsc::UnboundedSender<Result<Value, TransportError>>;

#[derive(Default)]
pub struct MockTransport {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    responses: HashMap<String, Result<Value, TransportError>>,
    gates: HashMap<String, Arc<Notify>>,
    requests: Vec<(String, Value)>,
    channels: HashMap<SubscriptionId, Sender>,
    unsubscribed: Vec<SubscriptionId>,
    next_id: u64,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    fn state(&self) -> MutexGuard<State> {
        self.state.lock().unwrap()
    }

    /// Responds to every request for `method` with `response`. The
    /// `eth_subscribe` and `eth_unsubscribe` methods script push channels.
    pub fn respond(&self, method: &str, response: Result<Value, TransportError>) {
        self.state().responses.insert(method.to_owned(), response);
    }

    /// Holds requests for `method` until the returned gate is notified once
    /// per request.
    pub fn gate(&self, method: &str) -> Arc<Notify> {
        self.state()
            .gates
            .entry(method.to_owned())
            .or_default()
            .clone()
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.state().requests.clone()
    }

    /// Returns the parameters of requests for `method`.
    pub fn requests_for(&self, method: &str) -> Vec<Value> {
        self.state()
            .requests
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn unsubscribed(&self) -> Vec<SubscriptionId> {
        self.state().unsubscribed.clone()
    }

    pub fn push(&self, id: &SubscriptionId, notification: Result<Value, TransportError>) {
        let state = self.state();
        let channel = state.channels.get(id).expect("unknown push channel");
        channel.send(notification).unwrap();
    }

    async fn record(&self, method: &str, params: Value) {
        let gate = {
            let mut state = self.state();
            state.requests.push((method.to_owned(), params));
            state.gates.get(method).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn response(&self, method: &str) -> Option<Result<Value, TransportError>> {
        self.state().responses.get(method).cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        self.record(method, params).await;
        self.response(method).unwrap_or_else(|| {
            Err(TransportError::Rpc(jsonrpc::Error {
                code: ErrorCode::MethodNotFound,
                message: format!("no scripted response for {method}"),
                data: Value::Null,
            }))
        })
    }

    async fn subscribe(&self, params: Vec<Value>) -> Result<PushChannel, TransportError> {
        self.record("eth_subscribe", Value::Array(params)).await;
        if let Some(Err(err)) = self.response("eth_subscribe") {
            return Err(err);
        }

        let mut state = self.state();
        state.next_id += 1;
        let id = SubscriptionId(format!("0x{:x}", state.next_id));
        let (sender, receiver) = mpsc::unbounded_channel();
        state.channels.insert(id.clone(), sender);
        Ok(PushChannel {
            id,
            notifications: UnboundedReceiverStream::new(receiver).boxed(),
        })
    }

    async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), TransportError> {
        self.record("eth_unsubscribe", Value::Array(vec![id.0.clone().into()]))
            .await;
        let mut state = self.state();
        state.unsubscribed.push(id.clone());
        state.channels.remove(id);
        match state.responses.get("eth_unsubscribe") {
            Some(Err(err)) => Err(err.clone()),
            _ => Ok(()),
        }
    }
}

/// Receives the next event forwarded by a listener.
pub async fn next_event<T>(events: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}
