use std::time::Duration;

use tokio::sync::watch;

use crate::db;
use crate::state::SharedState;

const INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Spawn the housekeeping loop. It purges expired refresh tokens and stale
/// setup tokens and drops old login-limiter windows until shutdown is signaled.
pub fn spawn(state: SharedState, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(state, shutdown))
}

async fn run(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    tracing::debug!("Maintenance worker started");

    let mut ticker = tokio::time::interval(INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => sweep(&state).await,
            _ = shutdown.changed() => {}
        }

        if *shutdown.borrow() {
            break;
        }
    }

    tracing::debug!("Maintenance worker stopped");
}

async fn sweep(state: &SharedState) {
    state.login_limiter.cleanup();

    match db::refresh_tokens::purge_expired(&state.pool).await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Purged {n} expired refresh tokens"),
        Err(e) => tracing::error!("Failed to purge refresh tokens: {e}"),
    }

    match db::password_setup_tokens::delete_stale(&state.pool).await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Purged {n} stale password setup tokens"),
        Err(e) => tracing::error!("Failed to purge password setup tokens: {e}"),
    }
}
