// Bot command handlers module
pub mod admin;
pub mod fetch;
pub mod help;
