use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;

use crate::auth::extractor::AuthUser;
use crate::state::SharedState;

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Server-sent change events, filtered the same way the caller's reads are:
/// tenant users get their own company plus global lookups, and plain users
/// only rows they own or that are shared.
pub async fn stream(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let scope = auth.scope();
    let rx = state.notifier.subscribe();
    tracing::debug!(user_id = %auth.user_id, "Notification stream opened");

    let events = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(change) if change.visible_to(scope) => {
                    match Event::default().event("change").json_data(&change) {
                        Ok(event) => return Some((Ok(event), rx)),
                        Err(e) => tracing::error!("Failed to encode change event: {e}"),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE))
}
