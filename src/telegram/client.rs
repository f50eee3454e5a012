//! Telegram Bot API client
//!
//! JSON methods go through [`BotApi::call`]; files are sent as streamed
//! multipart bodies so they are never loaded into memory, and the stream
//! reports how many bytes have been handed to the connection.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;

use crate::core::messenger::{ChatRef, FileUpload, MediaKind, Messenger, ProgressFn};
use crate::error::PlatformError;
use crate::telegram::types::{ApiResponse, ChatMember, MessageIdResult, Update, User};

/// Longest flood-wait the client sleeps through before giving up
const MAX_RETRY_AFTER: u64 = 30;

pub struct BotApi {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl BotApi {
    pub fn new(client: reqwest::Client, base: &str, token: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base, self.token, method)
    }

    /// Calls a JSON method, sleeping once through a short flood-wait
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &Value,
    ) -> Result<T, PlatformError> {
        match self.call_once(method, params, None).await {
            Err(PlatformError::Api {
                retry_after: Some(secs),
                ..
            }) if secs <= MAX_RETRY_AFTER => {
                warn!("{} rate limited, retrying in {}s", method, secs);
                tokio::time::sleep(Duration::from_secs(secs)).await;
                self.call_once(method, params, None).await
            }
            other => other,
        }
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &Value,
        timeout: Option<Duration>,
    ) -> Result<T, PlatformError> {
        let mut request = self.client.post(self.method_url(method)).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        Self::parse(method, response).await
    }

    async fn parse<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, PlatformError> {
        let status = response.status();
        let body: ApiResponse<T> = response.json().await?;
        if body.ok {
            return body
                .result
                .ok_or_else(|| PlatformError::other(format!("{} returned no result", method)));
        }
        Err(PlatformError::Api {
            code: body.error_code.unwrap_or(i64::from(status.as_u16())),
            description: body.description.unwrap_or_default(),
            retry_after: body.parameters.and_then(|p| p.retry_after),
        })
    }

    pub async fn get_me(&self) -> Result<User, PlatformError> {
        self.call("getMe", &json!({})).await
    }

    /// Long-polls for new updates
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, PlatformError> {
        let params = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        let http_timeout = Duration::from_secs(timeout_secs + 10);
        self.call_once("getUpdates", &params, Some(http_timeout)).await
    }
}

fn chat_value(chat: &ChatRef) -> Value {
    match chat {
        ChatRef::Id(id) => json!(id),
        ChatRef::Username(name) => json!(name),
    }
}

fn is_not_modified(err: &PlatformError) -> bool {
    matches!(err, PlatformError::Api { description, .. } if description.contains("message is not modified"))
}

fn is_user_not_found(err: &PlatformError) -> bool {
    matches!(err, PlatformError::Api { code: 400, description, .. }
        if description.contains("user not found") || description.contains("PARTICIPANT_ID_INVALID"))
}

#[async_trait]
impl Messenger for BotApi {
    async fn send_text(&self, chat: &ChatRef, text: &str) -> Result<i64, PlatformError> {
        let params = json!({
            "chat_id": chat_value(chat),
            "text": text,
            "link_preview_options": {"is_disabled": true},
        });
        let sent: MessageIdResult = self.call("sendMessage", &params).await?;
        Ok(sent.message_id)
    }

    async fn edit_text(
        &self,
        chat: &ChatRef,
        message_id: i64,
        text: &str,
    ) -> Result<(), PlatformError> {
        let params = json!({
            "chat_id": chat_value(chat),
            "message_id": message_id,
            "text": text,
        });
        match self.call::<Value>("editMessageText", &params).await {
            Err(e) if is_not_modified(&e) => Ok(()),
            other => other.map(|_| ()),
        }
    }

    async fn send_file(
        &self,
        chat: &ChatRef,
        upload: &FileUpload,
        progress: ProgressFn,
    ) -> Result<i64, PlatformError> {
        let (method, field) = match upload.kind {
            MediaKind::Video => ("sendVideo", "video"),
            MediaKind::Document => ("sendDocument", "document"),
        };

        let file = tokio::fs::File::open(&upload.path).await?;
        let total = file.metadata().await?.len();

        let mut sent: u64 = 0;
        let stream = ReaderStream::new(file).inspect_ok(move |chunk| {
            sent += chunk.len() as u64;
            progress(sent, total);
        });
        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(upload.file_name.clone())
            .mime_str("application/octet-stream")?;

        let mut form = Form::new()
            .text("chat_id", chat.to_string())
            .part(field, part);
        if let Some(caption) = &upload.caption {
            form = form.text("caption", caption.clone());
        }
        if upload.kind == MediaKind::Video {
            form = form.text("supports_streaming", "true");
        }

        debug!("{} {} ({} bytes) to {}", method, upload.file_name, total, chat);
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await?;
        let message: MessageIdResult = Self::parse(method, response).await?;
        Ok(message.message_id)
    }

    async fn copy_message(
        &self,
        to: &ChatRef,
        from: &ChatRef,
        message_id: i64,
    ) -> Result<i64, PlatformError> {
        let params = json!({
            "chat_id": chat_value(to),
            "from_chat_id": chat_value(from),
            "message_id": message_id,
        });
        let copied: MessageIdResult = self.call("copyMessage", &params).await?;
        Ok(copied.message_id)
    }

    async fn is_member(&self, chat: &ChatRef, user_id: i64) -> Result<bool, PlatformError> {
        let params = json!({
            "chat_id": chat_value(chat),
            "user_id": user_id,
        });
        match self.call::<ChatMember>("getChatMember", &params).await {
            Ok(member) => Ok(member.is_present()),
            Err(e) if is_user_not_found(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn check_chat(&self, chat: &ChatRef) -> Result<(), PlatformError> {
        let params = json!({ "chat_id": chat_value(chat) });
        self.call::<Value>("getChat", &params).await.map(|_| ())
    }
}
