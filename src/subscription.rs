//! Push subscriptions.
//!
//! A [`Subscription`] moves through `Requested → Active → Closed`. It only
//! emits events while active, and it emits nothing once closed, even when a
//! notification or a replayed log arrives afterwards.

pub mod manager;
pub mod registry;

use self::{manager::Manager, registry::SubscriptionKind};
use crate::{
    error::Error,
    format::Formatted,
    normalize::Input,
    transport::SubscriptionId,
    types::{ArrayVec, BlockSelector, LogFilterValue},
};
use std::{
    collections::VecDeque,
    fmt::{self, Debug, Formatter},
    mem,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak},
};
use tracing::trace;

/// Options for a subscription.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubscriptionOptions {
    /// For log subscriptions, replay past logs starting at this block.
    pub from_block: Option<BlockSelector>,
    /// For log subscriptions, the contract addresses to receive logs for.
    pub address: LogFilterValue<Input>,
    /// For log subscriptions, the log topics to filter for.
    pub topics: ArrayVec<LogFilterValue<Input>, 4>,
}

/// A callback receiving both data and error events.
pub type Callback = Arc<dyn Fn(Result<&Formatted, &Error>) + Send + Sync>;

/// Subscription arguments, either options, a callback, or both.
#[derive(Clone, Default)]
pub enum SubscribeArgs {
    #[default]
    Empty,
    Options(SubscriptionOptions),
    Callback(Callback),
    OptionsWithCallback(SubscriptionOptions, Callback),
}

impl SubscribeArgs {
    /// Creates arguments with a callback.
    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(Result<&Formatted, &Error>) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(callback))
    }

    /// Adds a callback to the arguments.
    pub fn with_callback<F>(self, callback: F) -> Self
    where
        F: Fn(Result<&Formatted, &Error>) + Send + Sync + 'static,
    {
        let (options, _) = self.resolve();
        Self::OptionsWithCallback(options, Arc::new(callback))
    }

    /// Splits the arguments into options and an optional callback.
    pub fn resolve(self) -> (SubscriptionOptions, Option<Callback>) {
        match self {
            Self::Empty => (SubscriptionOptions::default(), None),
            Self::Options(options) => (options, None),
            Self::Callback(callback) => (SubscriptionOptions::default(), Some(callback)),
            Self::OptionsWithCallback(options, callback) => (options, Some(callback)),
        }
    }
}

impl From<()> for SubscribeArgs {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

impl From<SubscriptionOptions> for SubscribeArgs {
    fn from(options: SubscriptionOptions) -> Self {
        Self::Options(options)
    }
}

impl From<Callback> for SubscribeArgs {
    fn from(callback: Callback) -> Self {
        Self::Callback(callback)
    }
}

impl Debug for SubscribeArgs {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Options(options) => f.debug_tuple("Options").field(options).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::OptionsWithCallback(options, _) => f
                .debug_tuple("OptionsWithCallback")
                .field(options)
                .finish_non_exhaustive(),
        }
    }
}

/// Subscription lifecycle state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    /// Waiting for the node to acknowledge the subscription.
    Requested,
    /// Registered with the node and emitting events.
    Active,
    /// Unsubscribed, never emits again.
    Closed,
}

/// Events kept per channel while a subscription has no listeners at all.
const BACKLOG: usize = 256;

type DataListener = Arc<dyn Fn(&Formatted) + Send + Sync>;
type ErrorListener = Arc<dyn Fn(&Error) + Send + Sync>;

/// A handle to a push subscription. Clones refer to the same subscription.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

struct Inner {
    key: u64,
    kind: SubscriptionKind,
    id: OnceLock<SubscriptionId>,
    shared: Mutex<Shared>,
    manager: Weak<Manager>,
}

struct Shared {
    state: State,
    data: Vec<DataListener>,
    errors: Vec<ErrorListener>,
    // Events emitted before any listener attached. Once one channel has a
    // listener, events for a channel without one are dropped.
    pending_data: VecDeque<Formatted>,
    pending_errors: VecDeque<Error>,
}

impl Shared {
    fn buffering(&self) -> bool {
        self.data.is_empty() && self.errors.is_empty()
    }
}

fn buffer<T>(backlog: &mut VecDeque<T>, event: T, kind: SubscriptionKind) {
    if backlog.len() == BACKLOG {
        trace!(%kind, "backlog full, dropping oldest event");
        backlog.pop_front();
    }
    backlog.push_back(event);
}

impl Subscription {
    pub(crate) fn new(key: u64, kind: SubscriptionKind, manager: Weak<Manager>) -> Self {
        Self {
            inner: Arc::new(Inner {
                key,
                kind,
                id: OnceLock::new(),
                shared: Mutex::new(Shared {
                    state: State::Requested,
                    data: Vec::new(),
                    errors: Vec::new(),
                    pending_data: VecDeque::new(),
                    pending_errors: VecDeque::new(),
                }),
                manager,
            }),
        }
    }

    fn shared(&self) -> MutexGuard<Shared> {
        self.inner
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn key(&self) -> u64 {
        self.inner.key
    }

    /// The node assigned identifier, available once the node acknowledged
    /// the subscription.
    pub fn id(&self) -> Option<&SubscriptionId> {
        self.inner.id.get()
    }

    pub fn kind(&self) -> SubscriptionKind {
        self.inner.kind
    }

    pub fn state(&self) -> State {
        self.shared().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == State::Active
    }

    /// Adds a listener for data events.
    pub fn on_data<F>(&self, listener: F)
    where
        F: Fn(&Formatted) + Send + Sync + 'static,
    {
        let listener = Arc::new(listener);
        let backlog = {
            let mut shared = self.shared();
            shared.data.push(listener.clone());
            mem::take(&mut shared.pending_data)
        };
        for data in &backlog {
            listener(data);
        }
    }

    /// Adds a listener for error events.
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        let listener = Arc::new(listener);
        let backlog = {
            let mut shared = self.shared();
            shared.errors.push(listener.clone());
            mem::take(&mut shared.pending_errors)
        };
        for err in &backlog {
            listener(err);
        }
    }

    /// Adds a callback receiving data events as `Ok` and error events as
    /// `Err`.
    pub fn on_result<F>(&self, callback: F)
    where
        F: Fn(Result<&Formatted, &Error>) + Send + Sync + 'static,
    {
        self.attach(Arc::new(callback));
    }

    pub(crate) fn attach(&self, callback: Callback) {
        let on_error = callback.clone();
        self.on_data(move |data| callback(Ok(data)));
        self.on_error(move |err| on_error(Err(err)));
    }

    /// Unsubscribes. Unsubscribing a closed subscription does nothing.
    pub async fn unsubscribe(&self) -> Result<(), Error> {
        match self.inner.manager.upgrade() {
            Some(manager) => manager.unsubscribe(self).await,
            None => {
                self.close();
                Ok(())
            }
        }
    }

    /// Marks the subscription active with its node assigned identifier.
    /// Returns `false` if it was closed while waiting for the node.
    pub(crate) fn activate(&self, id: SubscriptionId) -> bool {
        let mut shared = self.shared();
        if shared.state != State::Requested {
            return false;
        }
        let _ = self.inner.id.set(id);
        shared.state = State::Active;
        true
    }

    /// Closes the subscription, returning its previous state.
    pub(crate) fn close(&self) -> State {
        let mut shared = self.shared();
        let previous = shared.state;
        shared.state = State::Closed;
        shared.pending_data.clear();
        shared.pending_errors.clear();
        previous
    }

    /// Emits a data event. Returns `false` if the subscription is not active
    /// and the event was dropped.
    pub(crate) fn emit_data(&self, data: Formatted) -> bool {
        let listeners = {
            let mut shared = self.shared();
            if shared.state != State::Active {
                trace!(kind = %self.kind(), state = ?shared.state, "dropping data event");
                return false;
            }
            if shared.data.is_empty() {
                if shared.buffering() {
                    buffer(&mut shared.pending_data, data, self.kind());
                } else {
                    trace!(kind = %self.kind(), "no data listener, dropping data event");
                }
                return true;
            }
            shared.data.clone()
        };
        for listener in listeners {
            listener(&data);
        }
        true
    }

    /// Emits an error event. Returns `false` if the subscription is not
    /// active and the event was dropped.
    pub(crate) fn emit_error(&self, err: Error) -> bool {
        let listeners = {
            let mut shared = self.shared();
            if shared.state != State::Active {
                trace!(kind = %self.kind(), state = ?shared.state, "dropping error event");
                return false;
            }
            if shared.errors.is_empty() {
                if shared.buffering() {
                    buffer(&mut shared.pending_errors, err, self.kind());
                } else {
                    trace!(kind = %self.kind(), "no error listener, dropping error event");
                }
                return true;
            }
            shared.errors.clone()
        };
        for listener in listeners {
            listener(&err);
        }
        true
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind())
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
