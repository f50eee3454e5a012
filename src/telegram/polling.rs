// Long-polling update loop

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use crate::core::dispatcher::Dispatcher;
use crate::telegram::client::BotApi;

const POLL_TIMEOUT_SECS: u64 = 30;
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Fetches updates forever, handing each text message to its own task
///
/// A failing or panicking handler only ends its own task; the loop keeps
/// serving other messages.
pub async fn run(api: Arc<BotApi>, dispatcher: Arc<Dispatcher>) {
    let mut offset: i64 = 0;
    info!("Polling for updates...");

    loop {
        let updates = match api.get_updates(offset, POLL_TIMEOUT_SECS).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!("getUpdates failed: {}", e);
                tokio::time::sleep(ERROR_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message.and_then(|m| m.into_incoming()) else {
                continue;
            };

            let dispatcher = dispatcher.clone();
            let update_id = update.update_id;
            let handle = tokio::spawn(async move {
                dispatcher.handle(message).await;
            });
            tokio::spawn(async move {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        error!("Handler for update {} panicked", update_id);
                    }
                }
            });
        }
    }
}
