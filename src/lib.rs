// Teradrop Library - Public API

// Re-export error types
pub mod error;
pub use error::{Result, TeradropError};

// Module declarations
pub mod commands;
pub mod core;
pub mod telegram;
pub mod ui;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::dispatcher::{Dispatcher, Outcome};
pub use crate::core::settings::SettingsStore;

// Initialize logging
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
