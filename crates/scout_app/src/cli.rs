use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use scout_core::SessionId;
use scout_engine::EngineConfig;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::logging::LogDestination;

/// Follow a live portfolio discovery session from the terminal.
#[derive(Debug, Parser)]
#[command(name = "scout", version)]
#[command(about = "Aggregate live portfolio scraping results into one list")]
pub struct Cli {
    /// Free-text query, e.g. "retrieve the YC and Antler portfolios"
    #[arg(required_unless_present = "print_config", num_args = 1..)]
    pub query: Vec<String>,

    /// Reuse an existing session id instead of generating one
    #[arg(long)]
    pub session_id: Option<String>,

    /// Configuration file (RON)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Override the HTTP API base url
    #[arg(long)]
    pub api_url: Option<String>,

    /// Override the WebSocket base url
    #[arg(long)]
    pub ws_url: Option<String>,

    /// Override the poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Override the silence grace window in milliseconds
    #[arg(long, value_name = "MS")]
    pub silence_grace_ms: Option<u64>,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogDestination::File)]
    pub log: LogDestination,

    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,

    /// Companies listed in the final summary
    #[arg(long, default_value_t = 25)]
    pub show: usize,

    /// Print the effective configuration as RON and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    pub fn query(&self) -> String {
        self.query.join(" ")
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(SessionId::from)
    }

    /// Command-line flags win over the config file.
    pub fn apply_overrides(&self, config: &mut EngineConfig) {
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        if let Some(url) = &self.ws_url {
            config.ws_base_url = url.clone();
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = self.silence_grace_ms {
            config.silence_grace = Duration::from_millis(ms);
        }
    }
}
