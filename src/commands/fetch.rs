//! Link pipeline: resolve, download, relay, clean up
//!
//! One call handles one share link from start to finish. The scratch file
//! only exists between the download and the end of this call; it is removed
//! on every exit path, and by `TempPath`'s drop if the task unwinds.

use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::core::dispatcher::{Dispatcher, TransferReport};
use crate::core::messenger::{ChatRef, FileUpload, IncomingMessage, MediaKind, Messenger};
use crate::core::relay::{RelayOutcome, RelayStage, StageProgressFn};
use crate::core::transfer::{PendingTransfer, TransferStatus};
use crate::error::{ResolverError, Result, TeradropError};
use crate::ui::format_progress;

/// The one status message edited through the stages of a request
struct StatusMessage {
    messenger: Arc<dyn Messenger>,
    chat: ChatRef,
    message_id: Option<i64>,
}

impl StatusMessage {
    async fn open(messenger: Arc<dyn Messenger>, chat: ChatRef, text: &str) -> Self {
        let message_id = match messenger.send_text(&chat, text).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Could not send status message to {}: {}", chat, e);
                None
            }
        };
        Self {
            messenger,
            chat,
            message_id,
        }
    }

    async fn set(&self, text: &str) {
        let result = match self.message_id {
            Some(id) => self.messenger.edit_text(&self.chat, id, text).await,
            None => self.messenger.send_text(&self.chat, text).await.map(|_| ()),
        };
        if let Err(e) = result {
            warn!("Status update failed: {}", e);
        }
    }

    /// Background task applying the latest progress text
    fn reporter(&self) -> ProgressReporter {
        let (tx, mut rx) = watch::channel(None::<String>);
        let (stop, mut stopped) = oneshot::channel::<()>();
        let messenger = self.messenger.clone();
        let chat = self.chat.clone();
        let message_id = self.message_id;

        let task = tokio::spawn(async move {
            let Some(id) = message_id else {
                return;
            };
            loop {
                let last = tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        false
                    }
                    _ = &mut stopped => {
                        if !rx.has_changed().unwrap_or(false) {
                            break;
                        }
                        true
                    }
                };
                let text = rx.borrow_and_update().clone();
                if let Some(text) = text {
                    if let Err(e) = messenger.edit_text(&chat, id, &text).await {
                        warn!("Progress edit failed: {}", e);
                    }
                }
                if last {
                    break;
                }
            }
        });

        ProgressReporter {
            tx: Arc::new(tx),
            stop,
            task,
        }
    }
}

struct ProgressReporter {
    tx: Arc<watch::Sender<Option<String>>>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ProgressReporter {
    fn publish(&self, text: String) {
        self.tx.send_replace(Some(text));
    }

    /// Flushes the latest pending update and stops the reporter
    async fn finish(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!("Progress reporter ended abnormally: {}", e);
        }
    }
}

/// Handles one authorized link request
pub async fn execute(ctx: &Dispatcher, msg: &IncomingMessage, link: &str) -> TransferReport {
    if let Err(e) = ctx.settings.record_request() {
        warn!("Could not count request: {}", e);
    }

    let chat = ChatRef::Id(msg.chat_id);
    let status = StatusMessage::open(ctx.messenger.clone(), chat.clone(), "Resolving your link...").await;
    let mut transfer = PendingTransfer::new(link);

    let result = run(ctx, msg, &chat, &status, &mut transfer).await;

    match result {
        Ok((bytes, text)) => {
            transfer.finish(TransferStatus::Done);
            status.set(text).await;
            info!("Delivered {} ({} bytes) to {}", link, bytes, msg.user_id);
            TransferReport {
                status: TransferStatus::Done,
                resolved_url: transfer.resolved_url().map(str::to_string),
                bytes: Some(bytes),
                failure: None,
            }
        }
        Err(e) => {
            let reached = transfer.status();
            transfer.finish(TransferStatus::Failed);
            match transfer.resolved_url() {
                Some(direct) => error!("Request {} ({}) failed while {}: {}", link, direct, reached, e),
                None => error!("Request {} failed while {}: {}", link, reached, e),
            }
            status.set(&e.user_message()).await;
            TransferReport {
                status: TransferStatus::Failed,
                resolved_url: transfer.resolved_url().map(str::to_string),
                bytes: None,
                failure: Some(e.to_string()),
            }
        }
    }
}

async fn run(
    ctx: &Dispatcher,
    msg: &IncomingMessage,
    chat: &ChatRef,
    status: &StatusMessage,
    transfer: &mut PendingTransfer,
) -> Result<(u64, &'static str)> {
    let template = match ctx.settings.api_template()? {
        Some(template) => template,
        None => ctx.config.api_template.clone(),
    };
    let direct = resolve_with_retry(ctx, &template, &transfer.source_link).await?;
    if let Err(e) = ctx.settings.record_resolved() {
        warn!("Could not count resolved link: {}", e);
    }
    info!("Resolved {} -> {}", transfer.source_link, direct);
    transfer.set_resolved(direct.clone());

    let dest = transfer
        .allocate_temp(&ctx.config.scratch_dir)
        .await?
        .to_path_buf();
    status.set("Downloading...").await;
    let reporter = status.reporter();
    let downloaded = ctx
        .downloader
        .download(&direct, &dest, |bytes, total| {
            reporter.publish(format_progress("Downloading", bytes, total));
        })
        .await;
    reporter.finish().await;
    let downloaded = downloaded?;

    transfer.set_status(TransferStatus::Uploading);
    let relay_channel = relay_channel(ctx)?;
    let upload = FileUpload {
        path: dest,
        kind: MediaKind::detect(downloaded.content_type.as_deref(), &downloaded.file_name),
        file_name: downloaded.file_name,
        caption: None,
    };

    let initial = match relay_channel {
        Some(_) => "Uploading to dumb channel...",
        None => "Uploading file to you...",
    };
    status.set(initial).await;
    let reporter = status.reporter();
    let tx = reporter.tx.clone();
    let on_progress: StageProgressFn = Arc::new(move |stage, sent, total| {
        let text = match stage {
            RelayStage::ChannelUpload => format_progress("Uploading to dumb channel", sent, Some(total)),
            RelayStage::DirectUpload => format_progress("Uploading to you", sent, Some(total)),
            RelayStage::Copy => "Copying file to you...".to_string(),
        };
        tx.send_replace(Some(text));
    });
    let outcome = ctx
        .relay
        .relay(
            ctx.messenger.as_ref(),
            &upload,
            chat,
            &msg.requester_label(),
            relay_channel.as_ref(),
            on_progress,
        )
        .await;
    reporter.finish().await;
    let outcome = outcome?;

    if let Err(e) = ctx.settings.record_upload(downloaded.bytes) {
        warn!("Could not count upload: {}", e);
    }

    let text = match outcome {
        RelayOutcome::ViaChannel { .. } => "Done! File stored in dumb channel and delivered to you.",
        RelayOutcome::Direct { .. } => "Done! Uploaded to you.",
    };
    Ok((downloaded.bytes, text))
}

/// One resolver call, repeated once after a fixed delay on transport failures
async fn resolve_with_retry(
    ctx: &Dispatcher,
    template: &str,
    link: &str,
) -> std::result::Result<String, ResolverError> {
    match ctx.resolver.resolve(template, link).await {
        Err(e) if e.is_transient() => {
            warn!("Resolver failed ({}), retrying once", e);
            tokio::time::sleep(ctx.config.resolver_retry_delay).await;
            ctx.resolver.resolve(template, link).await
        }
        other => other,
    }
}

fn relay_channel(ctx: &Dispatcher) -> Result<Option<ChatRef>> {
    let Some(raw) = ctx.settings.relay_channel()? else {
        return Ok(None);
    };
    match ChatRef::parse(&raw) {
        Some(chat) => Ok(Some(chat)),
        None => Err(TeradropError::config(format!(
            "stored dumb channel is invalid: {}",
            raw
        ))),
    }
}
