//! Background refresh of the player list.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{PlayerStore, SyncPhase};
use crate::api::GameApi;
use crate::error::ApiError;

/// Poll `GET /players` every `interval`, and right after an action lock is released.
pub async fn run(api: Arc<dyn GameApi>, store: PlayerStore, interval: Duration, cancel: CancellationToken) {
    info!(?interval, "player poller started");
    let mut phase_rx = store.subscribe();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
            _ = refetch_requested(&mut phase_rx) => debug!("refetch requested after action"),
        }
        if let Err(err) = refresh_once(api.as_ref(), &store).await {
            warn!(error = %err, "failed to poll players");
        }
    }
    info!("player poller stopped");
}

/// One poll round. `Ok(false)` when skipped or discarded.
pub async fn refresh_once(api: &dyn GameApi, store: &PlayerStore) -> Result<bool, ApiError> {
    let Some(ticket) = store.poll_ticket() else {
        debug!("skipping poll: turn action in flight");
        return Ok(false);
    };
    let players = api.fetch_players().await?;
    Ok(store.apply_players(players, ticket))
}

async fn refetch_requested(rx: &mut watch::Receiver<SyncPhase>) {
    loop {
        if rx.changed().await.is_err() {
            // store dropped; only the interval or cancellation can wake us now
            std::future::pending::<()>().await;
        }
        if *rx.borrow_and_update() == SyncPhase::PendingRefetch {
            return;
        }
    }
}
