//! Background delivery of catalog events to their handlers.

use domain::services::{CatalogEvent, EventHandler};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::middleware::metrics::record_event_handled;

/// Drains `receiver` until every publisher is dropped, handing each event to
/// every handler in order. Handler failures are logged and counted; they never
/// stop the loop.
pub fn spawn_dispatcher(
    mut receiver: mpsc::Receiver<CatalogEvent>,
    handlers: Vec<Arc<dyn EventHandler>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(handlers = handlers.len(), "Event dispatcher started");
        while let Some(event) = receiver.recv().await {
            dispatch(&event, &handlers).await;
        }
        tracing::info!("Event dispatcher stopped");
    })
}

async fn dispatch(event: &CatalogEvent, handlers: &[Arc<dyn EventHandler>]) -> usize {
    let mut failures = 0;
    for handler in handlers {
        match handler.handle(event).await {
            Ok(()) => record_event_handled(event.name(), true),
            Err(e) => {
                failures += 1;
                record_event_handled(event.name(), false);
                tracing::warn!(event = %event.name(), error = %e, "Event handler failed");
            }
        }
    }
    failures
}
