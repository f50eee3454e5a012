// Messaging platform seam

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PlatformError;

/// Byte progress callback: `(bytes_so_far, total_bytes)`
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// A chat addressed either by numeric id or by `@username`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatRef {
    Id(i64),
    Username(String),
}

impl ChatRef {
    /// Accepts `-100123`, `123`, `@name` or a bare `name`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.contains(char::is_whitespace) {
            return None;
        }
        if let Ok(id) = raw.parse::<i64>() {
            return Some(ChatRef::Id(id));
        }
        let name = raw.trim_start_matches('@');
        let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        valid.then(|| ChatRef::Username(format!("@{}", name)))
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRef::Id(id) => write!(f, "{}", id),
            ChatRef::Username(name) => write!(f, "{}", name),
        }
    }
}

impl From<i64> for ChatRef {
    fn from(id: i64) -> Self {
        ChatRef::Id(id)
    }
}

/// How a file is presented on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Document,
    Video,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "webm", "ts"];

impl MediaKind {
    pub fn detect(content_type: Option<&str>, file_name: &str) -> Self {
        if content_type.is_some_and(|ct| ct.starts_with("video")) {
            return MediaKind::Video;
        }
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
            _ => MediaKind::Document,
        }
    }
}

/// A local file to be sent as a new message
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub path: PathBuf,
    pub file_name: String,
    pub caption: Option<String>,
    pub kind: MediaKind,
}

/// Incoming text message, reduced to what the dispatcher needs
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub text: String,
}

impl IncomingMessage {
    /// `@username` when known, otherwise the numeric id
    pub fn requester_label(&self) -> String {
        match &self.username {
            Some(name) => format!("@{}", name),
            None => self.user_id.to_string(),
        }
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a text message and returns its message id
    async fn send_text(&self, chat: &ChatRef, text: &str) -> Result<i64, PlatformError>;

    async fn edit_text(&self, chat: &ChatRef, message_id: i64, text: &str)
        -> Result<(), PlatformError>;

    /// Uploads a local file as a new message and returns its message id
    async fn send_file(
        &self,
        chat: &ChatRef,
        upload: &FileUpload,
        progress: ProgressFn,
    ) -> Result<i64, PlatformError>;

    /// Copies an existing message into another chat without re-uploading
    async fn copy_message(
        &self,
        to: &ChatRef,
        from: &ChatRef,
        message_id: i64,
    ) -> Result<i64, PlatformError>;

    async fn is_member(&self, chat: &ChatRef, user_id: i64) -> Result<bool, PlatformError>;

    /// Fails when the chat does not exist or is not visible to the bot
    async fn check_chat(&self, chat: &ChatRef) -> Result<(), PlatformError>;
}
