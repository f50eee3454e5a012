// Shared fixtures: a recording messenger and dispatcher builders

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use teradrop::core::messenger::{ChatRef, FileUpload, IncomingMessage, MediaKind, Messenger, ProgressFn};
use teradrop::error::PlatformError;
use teradrop::{Config, Dispatcher, SettingsStore};

pub const ADMIN: i64 = 1;
pub const USER: i64 = 42;

/// Every platform call the fake received, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SendText {
        chat: ChatRef,
        text: String,
    },
    EditText {
        chat: ChatRef,
        message_id: i64,
        text: String,
    },
    SendFile {
        chat: ChatRef,
        file_name: String,
        caption: Option<String>,
        kind: MediaKind,
        content: Vec<u8>,
    },
    Copy {
        to: ChatRef,
        from: ChatRef,
        message_id: i64,
    },
    IsMember {
        chat: ChatRef,
        user_id: i64,
    },
    CheckChat {
        chat: ChatRef,
    },
}

pub struct FakeMessenger {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    /// Membership answers keyed by user; unknown users are members
    members: Mutex<HashMap<i64, bool>>,
    pub membership_broken: AtomicBool,
    pub fail_uploads: AtomicBool,
    pub fail_copies: AtomicBool,
    pub missing_chats: Mutex<Vec<ChatRef>>,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
            members: Mutex::new(HashMap::new()),
            membership_broken: AtomicBool::new(false),
            fail_uploads: AtomicBool::new(false),
            fail_copies: AtomicBool::new(false),
            missing_chats: Mutex::new(Vec::new()),
        }
    }

    pub fn set_member(&self, user_id: i64, member: bool) {
        self.members.lock().insert(user_id, member);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn uploads(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::SendFile { .. }))
            .collect()
    }

    pub fn copies(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Copy { .. }))
            .collect()
    }

    /// Texts sent or edited into `chat`, in order
    pub fn texts(&self, chat: &ChatRef) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendText { chat: c, text } if &c == chat => Some(text),
                Call::EditText { chat: c, text, .. } if &c == chat => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self, chat: &ChatRef) -> Option<String> {
        self.texts(chat).pop()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_text(&self, chat: &ChatRef, text: &str) -> Result<i64, PlatformError> {
        self.record(Call::SendText {
            chat: chat.clone(),
            text: text.to_string(),
        });
        Ok(self.id())
    }

    async fn edit_text(
        &self,
        chat: &ChatRef,
        message_id: i64,
        text: &str,
    ) -> Result<(), PlatformError> {
        self.record(Call::EditText {
            chat: chat.clone(),
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_file(
        &self,
        chat: &ChatRef,
        upload: &FileUpload,
        progress: ProgressFn,
    ) -> Result<i64, PlatformError> {
        let content = std::fs::read(&upload.path)?;
        self.record(Call::SendFile {
            chat: chat.clone(),
            file_name: upload.file_name.clone(),
            caption: upload.caption.clone(),
            kind: upload.kind,
            content: content.clone(),
        });
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(PlatformError::other("upload rejected"));
        }
        let len = content.len() as u64;
        progress(len, len);
        Ok(self.id())
    }

    async fn copy_message(
        &self,
        to: &ChatRef,
        from: &ChatRef,
        message_id: i64,
    ) -> Result<i64, PlatformError> {
        self.record(Call::Copy {
            to: to.clone(),
            from: from.clone(),
            message_id,
        });
        if self.fail_copies.load(Ordering::SeqCst) {
            return Err(PlatformError::Api {
                code: 403,
                description: "Forbidden: bot was blocked by the user".into(),
                retry_after: None,
            });
        }
        Ok(self.id())
    }

    async fn is_member(&self, chat: &ChatRef, user_id: i64) -> Result<bool, PlatformError> {
        self.record(Call::IsMember {
            chat: chat.clone(),
            user_id,
        });
        if self.membership_broken.load(Ordering::SeqCst) {
            return Err(PlatformError::other("bot is not an admin of the channel"));
        }
        Ok(self.members.lock().get(&user_id).copied().unwrap_or(true))
    }

    async fn check_chat(&self, chat: &ChatRef) -> Result<(), PlatformError> {
        self.record(Call::CheckChat { chat: chat.clone() });
        if self.missing_chats.lock().contains(chat) {
            return Err(PlatformError::Api {
                code: 400,
                description: "Bad Request: chat not found".into(),
                retry_after: None,
            });
        }
        Ok(())
    }
}

/// Config pointing every directory into `dir`, with no waiting anywhere
pub fn test_config(dir: &Path, api_template: String) -> Config {
    let mut config = Config::new("123:test");
    config.admin_ids = vec![ADMIN];
    config.api_template = api_template;
    config.data_dir = dir.join("data");
    config.scratch_dir = dir.join("scratch");
    config.resolver_timeout = Duration::from_secs(5);
    config.resolver_retry_delay = Duration::ZERO;
    config.progress_interval = Duration::ZERO;
    config
}

pub fn dispatcher(config: Config, messenger: Arc<FakeMessenger>) -> Dispatcher {
    let settings = SettingsStore::open_in_memory().unwrap();
    Dispatcher::new(config, Arc::new(settings), messenger, reqwest::Client::new())
}

pub fn message(user_id: i64, text: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id: user_id,
        message_id: 1,
        user_id,
        username: Some(format!("user{}", user_id)),
        text: text.to_string(),
    }
}

/// Entries left in the scratch directory
pub fn scratch_entries(config: &Config) -> Vec<String> {
    match std::fs::read_dir(&config.scratch_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// HTTP server that promises `declared` bytes, sends `sent` of them, then hangs up
pub async fn truncating_server(declared: usize, sent: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                    declared
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&vec![7u8; sent]).await;
                let _ = socket.flush().await;
            });
        }
    });
    format!("http://{}", addr)
}
