use std::io;
use thiserror::Error;

/// Why a user was refused by the access gate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("not an admin")]
    NotAdmin,

    #[error("not subscribed to {channel}")]
    NotSubscribed { channel: String },

    #[error("membership in {channel} could not be verified: {reason}")]
    MembershipUnverifiable { channel: String, reason: String },
}

impl AuthorizationError {
    pub fn user_message(&self) -> String {
        match self {
            AuthorizationError::NotAdmin => "You're not authorized to use this command.".to_string(),
            AuthorizationError::NotSubscribed { channel } => format!(
                "Access denied: you must join {} to use this bot.",
                channel
            ),
            AuthorizationError::MembershipUnverifiable { .. } => {
                "Access denied: cannot verify membership, make sure the bot is admin in the force-sub channel."
                    .to_string()
            }
        }
    }
}

/// Failures of the link resolver call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("resolver request failed: {0}")]
    NetworkError(String),

    #[error("could not parse a direct URL from the resolver response")]
    ParseError { raw: Option<String> },

    #[error("resolver did not answer within {0} seconds")]
    Timeout(u64),
}

impl ResolverError {
    /// Transport problems are worth one more attempt, a bad payload is not
    pub fn is_transient(&self) -> bool {
        matches!(self, ResolverError::NetworkError(_) | ResolverError::Timeout(_))
    }

    pub fn user_message(&self) -> String {
        match self {
            ResolverError::NetworkError(e) => format!("Error contacting resolver API: {}", e),
            ResolverError::Timeout(secs) => {
                format!("Resolver API did not answer within {} seconds.", secs)
            }
            ResolverError::ParseError { raw: Some(raw) } => {
                let snippet: String = raw.chars().take(1000).collect();
                format!("Could not parse direct URL. Raw response:\n\n{}", snippet)
            }
            ResolverError::ParseError { raw: None } => {
                "Could not parse direct URL from API response.".to_string()
            }
        }
    }
}

/// Failures while streaming the direct URL to disk
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("download request failed: {0}")]
    Request(String),

    #[error("download failed, status: {0}")]
    Status(u16),

    #[error("connection dropped after {received} bytes")]
    IncompleteTransfer {
        received: u64,
        expected: Option<u64>,
    },

    #[error("no space left on device")]
    DiskFull,

    #[error("failed to write download: {0}")]
    WriteError(#[source] io::Error),

    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },
}

impl DownloadError {
    /// Classifies a local write failure
    pub fn from_write(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::StorageFull {
            DownloadError::DiskFull
        } else {
            DownloadError::WriteError(err)
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            DownloadError::IncompleteTransfer {
                received,
                expected: Some(expected),
            } => format!(
                "Download failed: connection dropped after {} of {} bytes.",
                received, expected
            ),
            other => format!("Download failed: {}", other),
        }
    }
}

/// Failures while delivering the local file through the messaging platform
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("upload to relay channel failed: {0}")]
    ChannelUploadError(#[source] PlatformError),

    #[error("file stored in relay channel (message {channel_message_id}) but copy to user failed: {source}")]
    RelayForwardError {
        channel_message_id: i64,
        #[source]
        source: PlatformError,
    },

    #[error("upload to user failed: {0}")]
    DirectUploadError(#[source] PlatformError),

    #[error("file is {size} bytes, the upload limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("cannot read local file: {0}")]
    Io(#[from] io::Error),
}

impl UploadError {
    pub fn user_message(&self) -> String {
        match self {
            UploadError::RelayForwardError { .. } => {
                "The file was saved to the dumb channel but could not be copied to you.".to_string()
            }
            other => format!("Upload failed: {}", other),
        }
    }
}

/// A Bot API call that did not succeed
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("telegram error {code}: {description}")]
    Api {
        code: i64,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("cannot read upload: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl PlatformError {
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PlatformError::Other(msg.into())
    }
}

/// Settings database failures
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Custom error type for the Teradrop application
#[derive(Error, Debug)]
pub enum TeradropError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Result type alias for Teradrop
pub type Result<T> = std::result::Result<T, TeradropError>;

impl TeradropError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        TeradropError::Config(msg.into())
    }

    /// Text shown to the user who triggered the failing request
    pub fn user_message(&self) -> String {
        match self {
            TeradropError::Authorization(e) => e.user_message(),
            TeradropError::Resolver(e) => e.user_message(),
            TeradropError::Download(e) => e.user_message(),
            TeradropError::Upload(e) => e.user_message(),
            TeradropError::Io(_) | TeradropError::Settings(_) => {
                "Internal error, please try again later.".to_string()
            }
            other => format!("Error: {}", other),
        }
    }
}
