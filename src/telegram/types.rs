// Bot API wire types, limited to the fields the bot reads

use serde::Deserialize;

use crate::core::messenger::IncomingMessage;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    /// Keeps text messages sent by a human user, drops everything else
    pub fn into_incoming(self) -> Option<IncomingMessage> {
        let from = self.from.filter(|u| !u.is_bot)?;
        let text = self.text?;
        Some(IncomingMessage {
            chat_id: self.chat.id,
            message_id: self.message_id,
            user_id: from.id,
            username: from.username,
            text,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChatMember {
    pub status: String,
    #[serde(default)]
    pub is_member: Option<bool>,
}

impl ChatMember {
    /// Owners, admins, members, and restricted users still in the chat
    pub fn is_present(&self) -> bool {
        match self.status.as_str() {
            "creator" | "administrator" | "member" => true,
            "restricted" => self.is_member.unwrap_or(false),
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageIdResult {
    pub message_id: i64,
}
