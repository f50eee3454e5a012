use crate::core::dispatcher::Dispatcher;
use crate::core::messenger::IncomingMessage;
use crate::error::Result;

const START_TEXT: &str = "Hi! Send me a Terabox share link and I'll resolve, download and send the file. \
Files will also be stored to the dumb channel if one is configured.\n\nUse /help to see commands.";

pub fn help_text(is_admin: bool) -> String {
    let mut text = String::from(
        "Send a Terabox share link and the file will be sent back to you.\n\n\
         /start - greeting\n\
         /help - this message",
    );
    if is_admin {
        text.push_str(
            "\n\nAdmin commands:\n\
             /set_force_sub <channel> - require membership before use\n\
             /remove_force_sub - drop the membership requirement\n\
             /set_dumb_channel <channel> - store every file in this channel\n\
             /remove_dumb_channel - send files directly\n\
             /set_api_template <url with {link}> - change the resolver\n\
             /stats - usage counters",
        );
    }
    text
}

pub async fn start(ctx: &Dispatcher, msg: &IncomingMessage) -> Result<()> {
    ctx.reply(msg, START_TEXT).await;
    Ok(())
}

pub async fn help(ctx: &Dispatcher, msg: &IncomingMessage) -> Result<()> {
    let text = help_text(ctx.config().is_admin(msg.user_id));
    ctx.reply(msg, &text).await;
    Ok(())
}
