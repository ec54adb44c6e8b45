use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    config::Catalog,
    dao::{office_store::OfficeStore, storage::StorageError},
    services::{dispatch_service, recovery},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Reconnect to the storage backend and keep the shared state in degraded mode when it is unavailable.
///
/// Every fresh connection seeds `catalog` and rebuilds the queues before leaving degraded mode.
/// Healthy polls also retry the served records that could not be written during dispatch.
pub async fn run<F, Fut>(state: SharedState, catalog: Catalog, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn OfficeStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        if let Err(err) = recovery::bring_online(&state, store.clone(), &catalog).await {
            warn!(error = %err, "failed to bring storage online; retrying");
            sleep(delay).await;
            delay = (delay * 2).min(MAX_DELAY);
            continue;
        }
        delay = INITIAL_DELAY;

        loop {
            match state.bounded(store.health_check()).await {
                Ok(()) => {
                    if state.is_degraded() {
                        info!("storage healthy again; leaving degraded mode");
                        state.update_degraded(false);
                    }
                    dispatch_service::flush_unrecorded(&state, &store).await;
                    sleep(HEALTH_POLL_INTERVAL).await;
                }
                Err(err) => {
                    warn!(error = %err, "storage health check failed");
                    if reconnect(&state, store.as_ref()).await {
                        state.update_degraded(false);
                        sleep(HEALTH_POLL_INTERVAL).await;
                        continue;
                    }
                    warn!("exhausted storage reconnect attempts; staying in degraded mode");
                    state.clear_store().await;
                    break;
                }
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Retry the existing connection with backoff, entering degraded mode after the first failure.
async fn reconnect(state: &SharedState, store: &dyn OfficeStore) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %err,
                        "storage reconnect first attempt failed; entering in degraded mode"
                    );
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}
