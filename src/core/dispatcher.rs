//! Command dispatcher
//!
//! Routes each incoming message: bot commands go to their handler in
//! [`crate::commands`], messages carrying a share link go through the access
//! gate and then the fetch pipeline, anything else is ignored.

use std::sync::Arc;

use log::{error, info, warn};

use crate::commands;
use crate::core::access::{AccessGate, Verdict};
use crate::core::config::Config;
use crate::core::downloader::Downloader;
use crate::core::messenger::{ChatRef, IncomingMessage, Messenger};
use crate::core::relay::UploadRelay;
use crate::core::resolver::{find_share_link, LinkResolver};
use crate::core::settings::SettingsStore;
use crate::core::transfer::TransferStatus;
use crate::error::AuthorizationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    SetForceSub(Option<String>),
    RemoveForceSub,
    SetDumbChannel(Option<String>),
    RemoveDumbChannel,
    SetApiTemplate(Option<String>),
    Stats,
}

impl BotCommand {
    /// Parses `/name[@bot] [argument]`; unknown commands yield `None`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, arg) = match rest.split_once(char::is_whitespace) {
            Some((head, arg)) => (head, Some(arg.trim())),
            None => (rest, None),
        };
        let name = head.split('@').next().unwrap_or(head);
        let arg = arg.filter(|a| !a.is_empty()).map(str::to_string);

        let command = match name.to_ascii_lowercase().as_str() {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            "set_force_sub" => BotCommand::SetForceSub(arg),
            "remove_force_sub" => BotCommand::RemoveForceSub,
            "set_dumb_channel" => BotCommand::SetDumbChannel(arg),
            "remove_dumb_channel" => BotCommand::RemoveDumbChannel,
            "set_api_template" => BotCommand::SetApiTemplate(arg),
            "stats" => BotCommand::Stats,
            _ => return None,
        };
        Some(command)
    }

    pub fn is_admin_only(&self) -> bool {
        !matches!(self, BotCommand::Start | BotCommand::Help)
    }
}

/// The `@bot` suffix of a `/command@bot` message, if any
pub fn command_addressee(text: &str) -> Option<&str> {
    let rest = text.trim().strip_prefix('/')?;
    let head = rest.split(char::is_whitespace).next()?;
    head.split_once('@').map(|(_, bot)| bot)
}

/// Result of a finished link request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub status: TransferStatus,
    /// Direct URL the share link resolved to, if resolution got that far
    pub resolved_url: Option<String>,
    pub bytes: Option<u64>,
    pub failure: Option<String>,
}

/// What the dispatcher did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Replied,
    Denied(AuthorizationError),
    Transfer(TransferReport),
}

pub struct Dispatcher {
    pub(crate) config: Config,
    pub(crate) settings: Arc<SettingsStore>,
    pub(crate) messenger: Arc<dyn Messenger>,
    pub(crate) resolver: LinkResolver,
    pub(crate) downloader: Downloader,
    pub(crate) relay: UploadRelay,
    bot_username: Option<String>,
}

impl Dispatcher {
    pub fn new(
        config: Config,
        settings: Arc<SettingsStore>,
        messenger: Arc<dyn Messenger>,
        http: reqwest::Client,
    ) -> Self {
        let resolver = LinkResolver::new(http.clone(), config.resolver_timeout);
        let downloader = Downloader::new(http, config.upload_limit(), config.progress_interval);
        let relay = UploadRelay::new(config.upload_limit(), config.progress_interval);
        Self {
            config,
            settings,
            messenger,
            resolver,
            downloader,
            relay,
            bot_username: None,
        }
    }

    /// Commands suffixed with another bot's name are ignored once this is set
    pub fn with_bot_username<S: Into<String>>(mut self, username: S) -> Self {
        let username = username.into();
        self.bot_username = Some(username.trim_start_matches('@').to_string());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub async fn handle(&self, msg: IncomingMessage) -> Outcome {
        if !self.is_addressed_here(&msg.text) {
            return Outcome::Ignored;
        }
        if let Some(command) = BotCommand::parse(&msg.text) {
            return self.handle_command(&msg, command).await;
        }

        let Some(link) = find_share_link(&msg.text) else {
            return Outcome::Ignored;
        };

        match self.authorize(&msg, false).await {
            Some(Verdict::Allow) => {
                info!("User {} requested {}", msg.user_id, link);
                Outcome::Transfer(commands::fetch::execute(self, &msg, link).await)
            }
            Some(Verdict::Deny(reason)) => Outcome::Denied(reason),
            None => Outcome::Replied,
        }
    }

    fn is_addressed_here(&self, text: &str) -> bool {
        match (command_addressee(text), &self.bot_username) {
            (Some(target), Some(me)) => target.eq_ignore_ascii_case(me),
            _ => true,
        }
    }

    async fn handle_command(&self, msg: &IncomingMessage, command: BotCommand) -> Outcome {
        if command.is_admin_only() {
            match self.authorize(msg, true).await {
                Some(Verdict::Allow) => {}
                Some(Verdict::Deny(reason)) => return Outcome::Denied(reason),
                None => return Outcome::Replied,
            }
        }

        let result = match command {
            BotCommand::Start => commands::help::start(self, msg).await,
            BotCommand::Help => commands::help::help(self, msg).await,
            admin => commands::admin::execute(self, msg, admin).await,
        };
        if let Err(e) = result {
            error!("Command from {} failed: {}", msg.user_id, e);
            self.reply(msg, &e.user_message()).await;
        }
        Outcome::Replied
    }

    /// Runs the access gate and replies on denial; `None` on internal failure
    async fn authorize(&self, msg: &IncomingMessage, admin: bool) -> Option<Verdict> {
        let gate = AccessGate::new(&self.config.admin_ids, &self.settings);
        match gate.authorize(self.messenger.as_ref(), msg.user_id, admin).await {
            Ok(Verdict::Deny(reason)) => {
                warn!("Denied user {}: {}", msg.user_id, reason);
                self.reply(msg, &reason.user_message()).await;
                Some(Verdict::Deny(reason))
            }
            Ok(verdict) => Some(verdict),
            Err(e) => {
                error!("Access check failed: {}", e);
                self.reply(msg, "Internal error, please try again later.")
                    .await;
                None
            }
        }
    }

    /// Sends a text reply to the message's chat; failures are only logged
    pub(crate) async fn reply(&self, msg: &IncomingMessage, text: &str) -> Option<i64> {
        let chat = ChatRef::Id(msg.chat_id);
        match self.messenger.send_text(&chat, text).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to reply in {}: {}", msg.chat_id, e);
                None
            }
        }
    }
}
