pub mod events;
pub mod queue;
mod sse;

use std::{
    collections::HashSet,
    future::Future,
    sync::Arc,
    time::{Duration, SystemTime},
};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, watch};
use tokio::time::timeout;
use uuid::Uuid;

use crate::{
    dao::{office_store::OfficeStore, storage::StorageResult},
    error::ServiceError,
    services::sse_events,
};

pub use self::events::{EventBus, EventKind, ListenerError, QueueEvent, SubscriptionId};
pub use self::queue::{Dequeued, QueueStore};
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_DISPLAY_CAPACITY: usize = 64;

/// Tunables applied when building the shared state.
#[derive(Debug, Clone)]
pub struct StateSettings {
    /// Upper bound for every storage call; `None` waits forever.
    pub store_timeout: Option<Duration>,
    /// Capacity of the display broadcast channel.
    pub display_capacity: usize,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            store_timeout: Some(DEFAULT_STORE_TIMEOUT),
            display_capacity: DEFAULT_DISPLAY_CAPACITY,
        }
    }
}

/// Hand-off whose served record could not be persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecordedServe {
    pub ticket_id: Uuid,
    pub counter_id: Uuid,
    pub served_at: SystemTime,
}

/// Central application state: storage handle, ticket queues and event fan-out.
pub struct AppState {
    store: RwLock<Option<Arc<dyn OfficeStore>>>,
    queues: QueueStore,
    events: EventBus,
    display: SseHub,
    service_gates: DashMap<Uuid, Arc<Mutex<()>>>,
    work: RwLock<()>,
    unrecorded: Mutex<Vec<UnrecordedServe>>,
    degraded: watch::Sender<bool>,
    store_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] with default settings.
    ///
    /// The application starts in degraded mode until a storage backend is brought online.
    pub fn new() -> SharedState {
        Self::with_settings(StateSettings::default())
    }

    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn with_settings(settings: StateSettings) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let events = EventBus::new();
        let display = SseHub::new(settings.display_capacity);
        sse_events::attach_display_bridge(&events, &display);

        Arc::new(Self {
            store: RwLock::new(None),
            queues: QueueStore::new(),
            events,
            display,
            service_gates: DashMap::new(),
            work: RwLock::new(()),
            unrecorded: Mutex::new(Vec::new()),
            degraded: degraded_tx,
            store_timeout: settings.store_timeout,
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn OfficeStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the store or fail with [`ServiceError::Degraded`].
    pub async fn require_store(&self) -> Result<Arc<dyn OfficeStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a store implementation. Degraded mode is left untouched.
    pub async fn set_store(&self, store: Arc<dyn OfficeStore>) {
        let mut guard = self.store.write().await;
        *guard = Some(store);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers and displays only when it changes.
    pub fn update_degraded(&self, value: bool) {
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
        if changed {
            sse_events::broadcast_system_status(&self.display, value);
        }
    }

    /// Per-service ticket queues.
    pub fn queues(&self) -> &QueueStore {
        &self.queues
    }

    /// Queue notification registry.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Broadcast hub feeding display boards.
    pub fn display(&self) -> &SseHub {
        &self.display
    }

    /// Lock serializing queue changes for one service.
    ///
    /// Issuance holds it across code allocation and enqueue; both issuance and dispatch
    /// publish `queue_updated` under it so displays see lengths in queue order.
    pub fn service_gate(&self, service_id: Uuid) -> Arc<Mutex<()>> {
        self.service_gates.entry(service_id).or_default().clone()
    }

    /// Shared guard held by issuance and dispatch for their whole run.
    pub async fn begin_work(&self) -> RwLockReadGuard<'_, ()> {
        self.work.read().await
    }

    /// Exclusive guard waiting for every running issuance and dispatch to finish.
    pub async fn quiesce(&self) -> RwLockWriteGuard<'_, ()> {
        self.work.write().await
    }

    /// Run a storage call under the configured timeout.
    pub async fn bounded<T, Fut>(&self, operation: Fut) -> Result<T, ServiceError>
    where
        Fut: Future<Output = StorageResult<T>>,
    {
        match self.store_timeout {
            Some(limit) => match timeout(limit, operation).await {
                Ok(result) => result.map_err(Into::into),
                Err(_) => Err(ServiceError::Timeout),
            },
            None => operation.await.map_err(Into::into),
        }
    }

    /// Remember a hand-off whose served record still has to be written.
    pub async fn push_unrecorded(&self, serve: UnrecordedServe) {
        self.unrecorded.lock().await.push(serve);
    }

    /// Drain the reconciliation backlog.
    pub async fn take_unrecorded(&self) -> Vec<UnrecordedServe> {
        std::mem::take(&mut *self.unrecorded.lock().await)
    }

    /// Tickets already handed out whose served record is still pending.
    pub async fn unrecorded_ticket_ids(&self) -> HashSet<Uuid> {
        self.unrecorded
            .lock()
            .await
            .iter()
            .map(|serve| serve.ticket_id)
            .collect()
    }
}
