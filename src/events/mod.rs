pub mod listeners;
pub mod types;

pub use listeners::{ReplayEntry, ReplayRecorder, TraceListener};
pub use types::{EventKind, PlayerEvent};

use std::{collections::HashSet, future::Future, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::common::types::AnyResult;

/// A subscriber. Errors are logged by the manager and never reach the player.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, event: Arc<PlayerEvent>) -> AnyResult<()>;
}

/// Adapts an async closure into an [`EventHandler`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<PlayerEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AnyResult<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Arc<PlayerEvent>) -> AnyResult<()> {
        (self.f)(event).await
    }
}

type EventTx = mpsc::UnboundedSender<Arc<PlayerEvent>>;

/// One registered handler and the kinds it wants.
///
/// Each listener drains its own queue on a dedicated task, so it sees events
/// in firing order and a slow or failing listener only delays itself.
struct Listener {
    handler: Arc<dyn EventHandler>,
    kinds: RwLock<HashSet<EventKind>>,
    tx: Mutex<Option<EventTx>>,
}

impl Listener {
    fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            handler,
            kinds: RwLock::new(HashSet::new()),
            tx: Mutex::new(None),
        }
    }

    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.read().contains(&kind)
    }

    /// Queues `event`, starting the worker on first use.
    fn deliver(&self, event: Arc<PlayerEvent>) {
        let mut tx = self.tx.lock();
        if tx.as_ref().is_none_or(|t| t.is_closed()) {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!(
                    "Dropping {} for {}: no async runtime",
                    event.kind(),
                    self.handler.name()
                );
                return;
            };
            let (new_tx, rx) = mpsc::unbounded_channel();
            runtime.spawn(drain(self.handler.clone(), rx));
            *tx = Some(new_tx);
        }

        if let Some(sender) = tx.as_ref() {
            let _ = sender.send(event);
        }
    }
}

async fn drain(handler: Arc<dyn EventHandler>, mut rx: mpsc::UnboundedReceiver<Arc<PlayerEvent>>) {
    while let Some(event) = rx.recv().await {
        let kind = event.kind();
        match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Listener {} failed on {}: {}", handler.name(), kind, e),
            Err(_) => error!("Listener {} panicked on {}", handler.name(), kind),
        }
    }
}

/// Process-wide publish/subscribe hub for player events.
///
/// Cheap to clone; every clone shares the same listener table.
#[derive(Clone, Default)]
pub struct EventManager {
    listeners: Arc<RwLock<Vec<Arc<Listener>>>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`. Returns `false` if this exact handler
    /// (by pointer identity) was already subscribed to it.
    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> bool {
        let mut listeners = self.listeners.write();
        let listener = match listeners
            .iter()
            .find(|l| Arc::ptr_eq(&l.handler, &handler))
        {
            Some(existing) => existing.clone(),
            None => {
                let created = Arc::new(Listener::new(handler));
                listeners.push(created.clone());
                created
            }
        };

        let added = listener.kinds.write().insert(kind);
        if added {
            debug!("Listener {} subscribed to {}", listener.handler.name(), kind);
        }
        added
    }

    pub fn subscribe_all(&self, handler: Arc<dyn EventHandler>) {
        for kind in EventKind::ALL {
            self.subscribe(kind, handler.clone());
        }
    }

    /// Subscribes an async closure and returns its handle for later removal.
    pub fn subscribe_fn<F, Fut>(&self, kind: EventKind, name: &str, f: F) -> Arc<dyn EventHandler>
    where
        F: Fn(Arc<PlayerEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AnyResult<()>> + Send + 'static,
    {
        let handler: Arc<dyn EventHandler> = Arc::new(FnHandler::new(name, f));
        self.subscribe(kind, handler.clone());
        handler
    }

    pub fn unsubscribe(&self, kind: EventKind, handler: &Arc<dyn EventHandler>) -> bool {
        let mut listeners = self.listeners.write();
        let Some(pos) = listeners
            .iter()
            .position(|l| Arc::ptr_eq(&l.handler, handler))
        else {
            return false;
        };

        let removed = listeners[pos].kinds.write().remove(&kind);
        if listeners[pos].kinds.read().is_empty() {
            // Dropping the sender lets the worker finish what is queued and exit.
            listeners.remove(pos);
        }
        removed
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.listeners.read().iter().filter(|l| l.wants(kind)).count()
    }

    /// Hands `event` to every subscriber of its kind and returns immediately.
    /// Returns the number of listeners it was queued for.
    pub fn fire(&self, event: PlayerEvent) -> usize {
        let kind = event.kind();
        let event = Arc::new(event);
        let targets: Vec<Arc<Listener>> = self
            .listeners
            .read()
            .iter()
            .filter(|l| l.wants(kind))
            .cloned()
            .collect();

        debug!("[{}] Fired {} to {} listener(s)", event.guild_id(), kind, targets.len());
        for listener in &targets {
            listener.deliver(event.clone());
        }
        targets.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::common::types::{AnyError, GuildId};

    fn queue_ended(guild: &str) -> PlayerEvent {
        PlayerEvent::QueueEnded {
            guild_id: GuildId::from(guild),
        }
    }

    fn recorder(
        events: &EventManager,
        kind: EventKind,
    ) -> (Arc<dyn EventHandler>, mpsc::UnboundedReceiver<Arc<PlayerEvent>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = events.subscribe_fn(kind, "recorder", move |event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event);
                Ok::<(), AnyError>(())
            }
        });
        (handler, rx)
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent_per_handler() {
        let events = EventManager::new();
        let (handler, _rx) = recorder(&events, EventKind::QueueEnded);
        assert!(!events.subscribe(EventKind::QueueEnded, handler.clone()));
        assert_eq!(events.subscriber_count(EventKind::QueueEnded), 1);

        assert!(events.subscribe(EventKind::TrackStart, handler.clone()));
        assert_eq!(events.subscriber_count(EventKind::TrackStart), 1);
        assert_eq!(events.subscriber_count(EventKind::MemberLeftVoice), 0);
    }

    #[tokio::test]
    async fn test_fire_reaches_only_matching_kind() {
        let events = EventManager::new();
        let (_a, mut ended_rx) = recorder(&events, EventKind::QueueEnded);
        let (_b, mut start_rx) = recorder(&events, EventKind::TrackStart);

        assert_eq!(events.fire(queue_ended("1")), 1);
        let got = tokio::time::timeout(Duration::from_secs(1), ended_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.guild_id().to_string(), "1");
        assert!(start_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failing_and_panicking_listeners_do_not_stop_siblings() {
        let events = EventManager::new();
        events.subscribe_fn(EventKind::QueueEnded, "fails", |_| async {
            Err::<(), AnyError>("listener exploded".into())
        });
        events.subscribe_fn(EventKind::QueueEnded, "panics", |event| async move {
            if event.guild_id().len() > 0 {
                panic!("listener panicked");
            }
            Ok::<(), AnyError>(())
        });
        let (_ok, mut rx) = recorder(&events, EventKind::QueueEnded);

        assert_eq!(events.fire(queue_ended("1")), 3);
        assert_eq!(events.fire(queue_ended("2")), 3);

        for expected in ["1", "2"] {
            let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got.guild_id().to_string(), expected);
        }
    }

    #[tokio::test]
    async fn test_fire_does_not_wait_for_slow_listener() {
        let events = EventManager::new();
        events.subscribe_fn(EventKind::QueueEnded, "slow", |_| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<(), AnyError>(())
        });

        let fired = tokio::time::timeout(Duration::from_millis(100), async {
            events.fire(queue_ended("1"))
        })
        .await;
        assert_eq!(fired.ok(), Some(1));
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let events = EventManager::new();
        let (handler, mut rx) = recorder(&events, EventKind::QueueEnded);
        assert!(events.unsubscribe(EventKind::QueueEnded, &handler));
        assert!(!events.unsubscribe(EventKind::QueueEnded, &handler));
        assert_eq!(events.fire(queue_ended("1")), 0);
        assert!(rx.try_recv().is_err());
    }
}
