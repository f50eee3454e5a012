use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, TeradropError};

pub const DEFAULT_API_TEMPLATE: &str = "https://teradl.tiiny.io/?key=RushVx&link={link}";
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
/// Upload limit of the public Bot API server
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
pub const LINK_PLACEHOLDER: &str = "{link}";

/// Runtime configuration of the bot
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_ids: Vec<i64>,
    pub api_template: String,
    pub api_base: String,
    pub data_dir: PathBuf,
    pub scratch_dir: PathBuf,
    /// 0 disables the limit
    pub max_file_size: u64,
    pub resolver_timeout: Duration,
    pub resolver_retry_delay: Duration,
    pub progress_interval: Duration,
}

impl Config {
    pub fn new<S: Into<String>>(bot_token: S) -> Self {
        Self {
            bot_token: bot_token.into(),
            admin_ids: Vec::new(),
            api_template: DEFAULT_API_TEMPLATE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            data_dir: default_data_dir(),
            scratch_dir: default_scratch_dir(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            resolver_timeout: Duration::from_secs(120),
            resolver_retry_delay: Duration::from_secs(1),
            progress_interval: Duration::from_secs(3),
        }
    }

    /// Checks the values that would otherwise only fail at the first request
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(TeradropError::config("bot token must not be empty"));
        }
        validate_template(&self.api_template)?;
        if self.resolver_timeout.is_zero() {
            return Err(TeradropError::config("resolver timeout must be positive"));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("teradrop.db")
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Effective upload limit, `None` when unlimited
    pub fn upload_limit(&self) -> Option<u64> {
        (self.max_file_size > 0).then_some(self.max_file_size)
    }
}

/// A resolver template must carry the `{link}` placeholder
pub fn validate_template(template: &str) -> Result<()> {
    if !template.contains(LINK_PLACEHOLDER) {
        return Err(TeradropError::config(format!(
            "API template must contain {}",
            LINK_PLACEHOLDER
        )));
    }
    if !(template.starts_with("http://") || template.starts_with("https://")) {
        return Err(TeradropError::config("API template must be an http(s) URL"));
    }
    Ok(())
}

/// Parses the comma separated admin list used by `ADMIN_ID`
pub fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| TeradropError::config(format!("invalid admin id: {}", s)))
        })
        .collect()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("teradrop")
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("teradrop")
}
