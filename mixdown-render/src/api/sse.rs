//! SSE stream of job lifecycle events

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use super::AppState;

/// GET /api/v1/events - subscribe to job lifecycle notifications
///
/// Each ledger mutation (created/progress/updated/completed/failed/deleted)
/// arrives as one SSE event named after the lifecycle event type.
pub async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected");
    let rx = state.ledger.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(job_event) => Event::default()
                .event(job_event.event_type())
                .json_data(&job_event)
                .ok()
                .map(Ok),
            Err(e) => {
                // BroadcastStream wraps RecvError (lagged client), just log and continue
                warn!("SSE client error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
