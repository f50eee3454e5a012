// Admin commands: settings mutations and stats

use log::info;

use crate::core::config::validate_template;
use crate::core::dispatcher::{BotCommand, Dispatcher};
use crate::core::messenger::{ChatRef, IncomingMessage};
use crate::error::Result;
use crate::ui::format_stats;

/// Which channel setting a command targets
#[derive(Clone, Copy)]
enum ChannelSetting {
    ForceSub,
    Dumb,
}

impl ChannelSetting {
    fn label(&self) -> &'static str {
        match self {
            ChannelSetting::ForceSub => "Force-sub",
            ChannelSetting::Dumb => "Dumb channel",
        }
    }

    fn command(&self) -> &'static str {
        match self {
            ChannelSetting::ForceSub => "/set_force_sub",
            ChannelSetting::Dumb => "/set_dumb_channel",
        }
    }
}

/// Runs an admin command; the caller has already checked admin rights
pub async fn execute(ctx: &Dispatcher, msg: &IncomingMessage, command: BotCommand) -> Result<()> {
    match command {
        BotCommand::SetForceSub(arg) => set_channel(ctx, msg, ChannelSetting::ForceSub, arg).await,
        BotCommand::RemoveForceSub => {
            let removed = ctx.settings.clear_force_sub_channel()?;
            remove_channel(ctx, msg, ChannelSetting::ForceSub, removed).await;
            Ok(())
        }
        BotCommand::SetDumbChannel(arg) => set_channel(ctx, msg, ChannelSetting::Dumb, arg).await,
        BotCommand::RemoveDumbChannel => {
            let removed = ctx.settings.clear_relay_channel()?;
            remove_channel(ctx, msg, ChannelSetting::Dumb, removed).await;
            Ok(())
        }
        BotCommand::SetApiTemplate(arg) => set_api_template(ctx, msg, arg).await,
        BotCommand::Stats => {
            let stats = ctx.settings.stats()?;
            ctx.reply(msg, &format_stats(&stats)).await;
            Ok(())
        }
        BotCommand::Start | BotCommand::Help => Ok(()),
    }
}

async fn set_channel(
    ctx: &Dispatcher,
    msg: &IncomingMessage,
    setting: ChannelSetting,
    arg: Option<String>,
) -> Result<()> {
    let Some(raw) = arg else {
        let usage = format!("Usage: {} <channel_username_or_id>", setting.command());
        ctx.reply(msg, &usage).await;
        return Ok(());
    };

    let Some(chat) = ChatRef::parse(&raw) else {
        ctx.reply(msg, &format!("Invalid channel: {}", raw)).await;
        return Ok(());
    };

    if let Err(e) = ctx.messenger.check_chat(&chat).await {
        let text = format!("Failed to set {}: {}", setting.label().to_lowercase(), e);
        ctx.reply(msg, &text).await;
        return Ok(());
    }

    let value = chat.to_string();
    match setting {
        ChannelSetting::ForceSub => ctx.settings.set_force_sub_channel(&value)?,
        ChannelSetting::Dumb => ctx.settings.set_relay_channel(&value)?,
    }
    info!("{} set to {} by {}", setting.label(), value, msg.user_id);
    ctx.reply(msg, &format!("{} set to {}", setting.label(), value))
        .await;
    Ok(())
}

async fn remove_channel(ctx: &Dispatcher, msg: &IncomingMessage, setting: ChannelSetting, removed: bool) {
    let text = if removed {
        info!("{} removed by {}", setting.label(), msg.user_id);
        format!("{} removed.", setting.label())
    } else {
        format!("No {} is set.", setting.label().to_lowercase())
    };
    ctx.reply(msg, &text).await;
}

async fn set_api_template(ctx: &Dispatcher, msg: &IncomingMessage, arg: Option<String>) -> Result<()> {
    let Some(template) = arg else {
        ctx.reply(msg, "Usage: /set_api_template <api_url_template>")
            .await;
        return Ok(());
    };

    if let Err(e) = validate_template(&template) {
        ctx.reply(msg, &e.to_string()).await;
        return Ok(());
    }

    ctx.settings.set_api_template(&template)?;
    info!("API template updated by {}", msg.user_id);
    ctx.reply(msg, "API template updated.").await;
    Ok(())
}
