// Core business logic module

pub mod access;
pub mod config;
pub mod dispatcher;
pub mod downloader;
pub mod messenger;
pub mod progress;
pub mod relay;
pub mod resolver;
pub mod settings;
pub mod transfer;

// Re-export commonly used items
pub use access::{AccessGate, Verdict};
pub use config::Config;
pub use dispatcher::{BotCommand, Dispatcher, Outcome, TransferReport};
pub use downloader::{DownloadedFile, Downloader};
pub use messenger::{ChatRef, FileUpload, IncomingMessage, MediaKind, Messenger, ProgressFn};
pub use progress::ProgressThrottle;
pub use relay::{RelayOutcome, RelayStage, UploadRelay};
pub use resolver::LinkResolver;
pub use settings::{SettingsStore, Stats};
pub use transfer::{PendingTransfer, TransferStatus};
