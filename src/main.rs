use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use teradrop::core::config::{parse_admin_ids, DEFAULT_API_BASE, DEFAULT_API_TEMPLATE};
use teradrop::core::transfer::purge_stale_files;
use teradrop::telegram::{polling, BotApi};
use teradrop::{Config, Dispatcher, SettingsStore};

#[derive(Parser, Debug)]
#[command(name = "teradrop", version, about = "Resolve share links and relay the files to Telegram")]
struct Cli {
    /// Bot token issued by @BotFather
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    bot_token: String,

    /// Comma separated list of admin user ids
    #[arg(long, env = "ADMIN_ID", default_value = "")]
    admin_ids: String,

    /// Resolver URL template, must contain {link}
    #[arg(long, env = "API_TEMPLATE", default_value = DEFAULT_API_TEMPLATE)]
    api_template: String,

    /// Bot API server base URL
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Directory holding the settings database
    #[arg(long, env = "TERADROP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory for in-flight downloads
    #[arg(long, env = "TERADROP_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Largest file the bot will handle, in bytes (0 = no limit)
    #[arg(long, env = "MAX_FILE_SIZE")]
    max_file_size: Option<u64>,

    /// Resolver request timeout in seconds
    #[arg(long, env = "RESOLVER_TIMEOUT_SECS", default_value_t = 120)]
    resolver_timeout: u64,

    /// Minimum seconds between progress edits
    #[arg(long, env = "PROGRESS_INTERVAL_SECS", default_value_t = 3)]
    progress_interval: u64,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = Config::new(self.bot_token);
        config.admin_ids = parse_admin_ids(&self.admin_ids)?;
        config.api_template = self.api_template;
        config.api_base = self.api_base;
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(dir) = self.scratch_dir {
            config.scratch_dir = dir;
        }
        if let Some(size) = self.max_file_size {
            config.max_file_size = size;
        }
        config.resolver_timeout = Duration::from_secs(self.resolver_timeout);
        config.progress_interval = Duration::from_secs(self.progress_interval);
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    teradrop::init_logging();

    let config = Cli::parse().into_config().context("Invalid configuration")?;
    if config.admin_ids.is_empty() {
        warn!("No admin ids configured, admin commands are disabled");
    }

    let settings = SettingsStore::open(&config.database_path())
        .with_context(|| format!("Failed to open {:?}", config.database_path()))?;
    settings
        .seed_api_template(&config.api_template)
        .context("Failed to seed API template")?;

    std::fs::create_dir_all(&config.scratch_dir)
        .with_context(|| format!("Failed to create scratch dir {:?}", config.scratch_dir))?;
    let purged = purge_stale_files(&config.scratch_dir)?;
    if purged > 0 {
        info!("Removed {} leftover partial downloads", purged);
    }

    let http = reqwest::Client::builder()
        .user_agent(concat!("teradrop/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    let api = Arc::new(BotApi::new(http.clone(), &config.api_base, &config.bot_token));
    let me = api.get_me().await.context("Bot token rejected by the Bot API")?;
    info!(
        "Starting bot @{} (id {})",
        me.username.as_deref().unwrap_or("?"),
        me.id
    );

    let mut dispatcher = Dispatcher::new(config, Arc::new(settings), api.clone(), http);
    if let Some(username) = &me.username {
        dispatcher = dispatcher.with_bot_username(username.as_str());
    }
    let dispatcher = Arc::new(dispatcher);

    tokio::select! {
        _ = polling::run(api, dispatcher) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");
        }
    }

    Ok(())
}
