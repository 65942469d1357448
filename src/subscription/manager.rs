//! Bookkeeping of live subscriptions and their push channels.

use super::{registry::SubscriptionKind, State, Subscription, SubscriptionOptions};
use crate::{
    client::Configuration,
    error::Error,
    format::{self, Formatted},
    transport::{Transport, TransportError},
};
use futures::{future, stream::BoxStream, StreamExt as _};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        atomic::{self, AtomicU64},
        Arc, Mutex, MutexGuard, PoisonError, RwLock,
    },
};
use tracing::{debug, info, warn};

/// Owner of the live subscription set.
pub struct Manager {
    transport: Arc<dyn Transport>,
    config: Arc<RwLock<Configuration>>,
    live: Mutex<HashMap<u64, Subscription>>,
    next_key: AtomicU64,
}

impl Manager {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        config: Arc<RwLock<Configuration>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            config,
            live: Mutex::default(),
            next_key: AtomicU64::new(0),
        })
    }

    fn live(&self) -> MutexGuard<HashMap<u64, Subscription>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a subscription with the node and starts delivering its
    /// notifications.
    pub(crate) async fn subscribe(
        self: &Arc<Self>,
        kind: SubscriptionKind,
        options: &SubscriptionOptions,
    ) -> Result<Subscription, Error> {
        let params = kind.params(options)?;
        let key = self.next_key.fetch_add(1, atomic::Ordering::Relaxed);
        let subscription = Subscription::new(key, kind, Arc::downgrade(self));
        self.live().insert(key, subscription.clone());

        let channel = match self.transport.subscribe(params).await {
            Ok(channel) => channel,
            Err(err) => {
                self.live().remove(&key);
                subscription.close();
                warn!(%kind, %err, "subscription request failed");
                return Err(err.into());
            }
        };

        if !subscription.activate(channel.id.clone()) {
            // Unsubscribed before the node acknowledged the subscription.
            debug!(%kind, id = %channel.id, "closing subscription unsubscribed while requested");
            if let Err(err) = self.transport.unsubscribe(&channel.id).await {
                warn!(%kind, id = %channel.id, %err, "failed to close push channel");
            }
            return Ok(subscription);
        }

        info!(%kind, id = %channel.id, "subscribed");
        tokio::spawn(pump(
            subscription.clone(),
            channel.notifications,
            self.config.clone(),
        ));
        Ok(subscription)
    }

    /// Unsubscribes, removing the subscription from the live set. Does nothing
    /// for closed subscriptions.
    pub(crate) async fn unsubscribe(&self, subscription: &Subscription) -> Result<(), Error> {
        let previous = subscription.close();
        if previous == State::Closed {
            return Ok(());
        }
        self.live().remove(&subscription.key());

        let id = match (previous, subscription.id()) {
            (State::Active, Some(id)) => id.clone(),
            // The push channel is closed once the node acknowledges it.
            _ => return Ok(()),
        };
        match self.transport.unsubscribe(&id).await {
            Ok(()) => {
                info!(kind = %subscription.kind(), %id, "unsubscribed");
                Ok(())
            }
            Err(err) => {
                warn!(kind = %subscription.kind(), %id, %err, "failed to unsubscribe");
                Err(err.into())
            }
        }
    }

    /// Unsubscribes every live subscription, keeping `syncing` subscriptions
    /// if requested. Returns one result per subscription once every teardown
    /// settled.
    pub(crate) async fn clear(&self, keep_syncing: bool) -> Vec<(Subscription, Result<(), Error>)> {
        let targets = self
            .subscriptions()
            .into_iter()
            .filter(|s| !(keep_syncing && s.kind() == SubscriptionKind::Syncing))
            .collect::<Vec<_>>();
        info!(count = targets.len(), keep_syncing, "clearing subscriptions");

        future::join_all(targets.into_iter().map(|subscription| async move {
            let result = self.unsubscribe(&subscription).await;
            (subscription, result)
        }))
        .await
    }

    /// Returns the live subscriptions in the order they were requested.
    pub(crate) fn subscriptions(&self) -> Vec<Subscription> {
        let mut subscriptions = self.live().values().cloned().collect::<Vec<_>>();
        subscriptions.sort_by_key(Subscription::key);
        subscriptions
    }
}

/// Delivers push notifications to the subscription listeners, in order,
/// converted with the return format configured at the time they arrive.
async fn pump(
    subscription: Subscription,
    mut notifications: BoxStream<'static, Result<Value, TransportError>>,
    config: Arc<RwLock<Configuration>>,
) {
    let schema = subscription.kind().schema();
    while let Some(notification) = notifications.next().await {
        if subscription.state() == State::Closed {
            break;
        }
        match notification {
            Ok(value) => {
                let format = config
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .default_format;
                match format::convert(&Formatted::from(value), &schema, format) {
                    Ok(data) => {
                        subscription.emit_data(data);
                    }
                    Err(err) => {
                        warn!(kind = %subscription.kind(), %err, "failed to convert notification");
                        subscription.emit_error(err.into());
                    }
                }
            }
            Err(err) => {
                subscription.emit_error(err.into());
            }
        }
    }
    debug!(kind = %subscription.kind(), id = ?subscription.id(), "push channel ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        format::DataFormat,
        transport::{
            mock::{next_event, MockTransport},
            SubscriptionId,
        },
    };
    use ethprim::U256;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn manager() -> (Arc<MockTransport>, Arc<RwLock<Configuration>>, Arc<Manager>) {
        let transport = MockTransport::new();
        let config = Arc::<RwLock<Configuration>>::default();
        let manager = Manager::new(transport.clone(), config.clone());
        (transport, config, manager)
    }

    fn id(id: &str) -> SubscriptionId {
        SubscriptionId(id.to_owned())
    }

    #[tokio::test]
    async fn selective_teardown() {
        let (transport, _, manager) = manager();
        let options = SubscriptionOptions::default();
        let a = manager.subscribe(SubscriptionKind::Logs, &options).await.unwrap();
        let b = manager.subscribe(SubscriptionKind::Syncing, &options).await.unwrap();
        let c = manager.subscribe(SubscriptionKind::NewHeads, &options).await.unwrap();

        let results = manager.clear(true).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, result)| result.is_ok()));
        assert_eq!(a.state(), State::Closed);
        assert_eq!(b.state(), State::Active);
        assert_eq!(c.state(), State::Closed);
        assert_eq!(transport.unsubscribed(), [id("0x1"), id("0x3")]);

        let live = manager.subscriptions();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].kind(), SubscriptionKind::Syncing);

        let results = manager.clear(false).await;
        assert_eq!(results.len(), 1);
        assert_eq!(b.state(), State::Closed);
        assert!(manager.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let (transport, _, manager) = manager();
        let subscription = manager
            .subscribe(SubscriptionKind::NewHeads, &SubscriptionOptions::default())
            .await
            .unwrap();

        subscription.unsubscribe().await.unwrap();
        subscription.unsubscribe().await.unwrap();
        assert_eq!(transport.unsubscribed(), [id("0x1")]);
        assert!(manager.subscriptions().is_empty());
        assert!(manager.clear(false).await.is_empty());
    }

    #[tokio::test]
    async fn reports_failed_teardown() {
        let (transport, _, manager) = manager();
        let subscription = manager
            .subscribe(SubscriptionKind::NewHeads, &SubscriptionOptions::default())
            .await
            .unwrap();
        transport.respond("eth_unsubscribe", Err(TransportError::Closed));

        let results = manager.clear(false).await;
        assert!(matches!(
            results[0].1,
            Err(Error::Transport(TransportError::Closed))
        ));
        // The subscription is closed locally regardless.
        assert_eq!(subscription.state(), State::Closed);
        assert!(manager.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn delivers_notifications_in_order() {
        let (transport, config, manager) = manager();
        let subscription = manager
            .subscribe(SubscriptionKind::NewHeads, &SubscriptionOptions::default())
            .await
            .unwrap();
        let (sender, mut events) = mpsc::unbounded_channel();
        subscription.on_data(move |data| sender.send(data.clone()).unwrap());

        let id = subscription.id().unwrap().clone();
        for number in ["0x1", "0x2", "0x3"] {
            transport.push(&id, Ok(json!({ "number": number, "miner": null })));
        }
        for number in 1..=3 {
            let header = next_event(&mut events).await;
            assert_eq!(header["number"], Formatted::BigInt(U256::new(number)));
            assert!(header["miner"].is_null());
        }

        config.write().unwrap().default_format = DataFormat::HEX;
        transport.push(&id, Ok(json!({ "number": "0x4" })));
        let header = next_event(&mut events).await;
        assert_eq!(header["number"], Formatted::String("0x4".into()));
    }

    #[tokio::test]
    async fn forwards_push_errors() {
        let (transport, _, manager) = manager();
        let subscription = manager
            .subscribe(SubscriptionKind::NewHeads, &SubscriptionOptions::default())
            .await
            .unwrap();
        let (sender, mut events) = mpsc::unbounded_channel();
        subscription.on_error(move |err| sender.send(err.clone()).unwrap());

        let id = subscription.id().unwrap().clone();
        transport.push(&id, Err(TransportError::Closed));
        transport.push(&id, Ok(json!({ "number": true })));
        assert!(matches!(
            next_event(&mut events).await,
            Error::Transport(TransportError::Closed)
        ));
        assert!(matches!(
            next_event(&mut events).await,
            Error::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn decodes_syncing_notifications() {
        let (transport, _, manager) = manager();
        let subscription = manager
            .subscribe(SubscriptionKind::Syncing, &SubscriptionOptions::default())
            .await
            .unwrap();
        let (sender, mut events) = mpsc::unbounded_channel();
        subscription.on_data(move |data| sender.send(data.clone()).unwrap());

        let id = subscription.id().unwrap().clone();
        transport.push(
            &id,
            Ok(json!({
                "syncing": true,
                "status": {
                    "startingBlock": "0x0",
                    "currentBlock": "0x10",
                    "highestBlock": "0x20",
                },
            })),
        );
        transport.push(&id, Ok(json!(false)));

        let status = next_event(&mut events).await;
        assert_eq!(status["syncing"], Formatted::Bool(true));
        assert_eq!(
            status["status"]["currentBlock"],
            Formatted::BigInt(U256::new(16))
        );
        assert_eq!(next_event(&mut events).await, Formatted::Bool(false));
    }

    #[tokio::test]
    async fn closes_channels_acknowledged_after_unsubscribe() {
        let (transport, _, manager) = manager();
        let gate = transport.gate("eth_subscribe");
        let pending = tokio::spawn({
            let manager = manager.clone();
            async move {
                manager
                    .subscribe(SubscriptionKind::NewHeads, &SubscriptionOptions::default())
                    .await
            }
        });

        while manager.subscriptions().is_empty() {
            tokio::task::yield_now().await;
        }
        let requested = manager.subscriptions().remove(0);
        assert_eq!(requested.state(), State::Requested);
        requested.unsubscribe().await.unwrap();
        assert!(transport.unsubscribed().is_empty());

        gate.notify_one();
        let subscription = pending.await.unwrap().unwrap();
        assert_eq!(subscription.state(), State::Closed);
        assert_eq!(transport.unsubscribed(), [id("0x1")]);
        assert!(manager.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn failed_subscriptions_are_not_live() {
        let (transport, _, manager) = manager();
        transport.respond("eth_subscribe", Err(TransportError::Unsupported));
        let err = manager
            .subscribe(SubscriptionKind::NewHeads, &SubscriptionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Unsupported)));
        assert!(manager.subscriptions().is_empty());
    }
}
