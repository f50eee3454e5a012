// Telegram Bot API transport

pub mod client;
pub mod polling;
pub mod types;

pub use client::BotApi;
