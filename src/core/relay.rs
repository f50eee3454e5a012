//! Upload relay
//!
//! Delivers a finished local file. With a relay (dumb) channel configured
//! the file is uploaded once to the channel, which keeps the archival copy,
//! and the channel message is then copied to the requester. Without one the
//! file goes straight to the requester.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::core::messenger::{ChatRef, FileUpload, Messenger, ProgressFn};
use crate::core::progress::throttled;
use crate::error::UploadError;

/// Step of the relay currently running, reported with progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    ChannelUpload,
    Copy,
    DirectUpload,
}

pub type StageProgressFn = Arc<dyn Fn(RelayStage, u64, u64) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Stored in the relay channel and copied to the requester
    ViaChannel {
        channel_message_id: i64,
        user_message_id: i64,
    },
    Direct { message_id: i64 },
}

pub struct UploadRelay {
    max_size: Option<u64>,
    progress_interval: Duration,
}

impl UploadRelay {
    pub fn new(max_size: Option<u64>, progress_interval: Duration) -> Self {
        Self {
            max_size,
            progress_interval,
        }
    }

    /// Sends `file` to `requester`, through `relay_channel` when one is set
    ///
    /// The size limit is checked before anything is sent. A failed copy after
    /// a successful channel upload is reported as
    /// [`UploadError::RelayForwardError`] and the file is not sent again.
    pub async fn relay(
        &self,
        messenger: &dyn Messenger,
        file: &FileUpload,
        requester: &ChatRef,
        requester_label: &str,
        relay_channel: Option<&ChatRef>,
        on_progress: StageProgressFn,
    ) -> Result<RelayOutcome, UploadError> {
        let size = tokio::fs::metadata(&file.path).await?.len();
        if let Some(limit) = self.max_size {
            if size > limit {
                warn!("Refusing to upload {} ({} bytes > {})", file.file_name, size, limit);
                return Err(UploadError::FileTooLarge { size, limit });
            }
        }

        match relay_channel {
            Some(channel) => {
                let upload = FileUpload {
                    caption: Some(format!("Saved for user {}", requester_label)),
                    ..file.clone()
                };
                let progress = self.stage_progress(RelayStage::ChannelUpload, &on_progress);
                let channel_message_id = messenger
                    .send_file(channel, &upload, progress)
                    .await
                    .map_err(UploadError::ChannelUploadError)?;
                info!("Stored {} in {} as message {}", file.file_name, channel, channel_message_id);

                on_progress(RelayStage::Copy, size, size);
                let user_message_id = messenger
                    .copy_message(requester, channel, channel_message_id)
                    .await
                    .map_err(|source| UploadError::RelayForwardError {
                        channel_message_id,
                        source,
                    })?;

                Ok(RelayOutcome::ViaChannel {
                    channel_message_id,
                    user_message_id,
                })
            }
            None => {
                let upload = FileUpload {
                    caption: Some("Here is your file".to_string()),
                    ..file.clone()
                };
                let progress = self.stage_progress(RelayStage::DirectUpload, &on_progress);
                let message_id = messenger
                    .send_file(requester, &upload, progress)
                    .await
                    .map_err(UploadError::DirectUploadError)?;
                info!("Sent {} directly to {}", file.file_name, requester);
                Ok(RelayOutcome::Direct { message_id })
            }
        }
    }

    fn stage_progress(&self, stage: RelayStage, sink: &StageProgressFn) -> ProgressFn {
        let sink = sink.clone();
        throttled(
            self.progress_interval,
            Arc::new(move |sent, total| sink(stage, sent, total)),
        )
    }
}
