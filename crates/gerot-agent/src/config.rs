use clap::Parser;
use sqlx::mysql::MySqlConnectOptions;
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

#[derive(Parser, Debug, Clone)]
#[command(name = "gerot-agent")]
#[command(about = "GeRot agent - runs queued RPA queries against the remote MySQL", long_about = None)]
#[command(version)]
pub struct AgentConfig {
    /// Base URL of the GeRot API
    #[arg(long, env = "GEROT_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Key sent as X-API-Key to the agent endpoints
    #[arg(long, env = "AGENT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Seconds between two polls
    #[arg(long, env = "POLLING_INTERVAL", default_value_t = 30)]
    pub polling_interval: u64,

    /// MySQL host
    #[arg(long, env = "MYSQL_AZ_HOST", default_value = "localhost")]
    pub mysql_host: String,

    /// MySQL port
    #[arg(long, env = "MYSQL_AZ_PORT", default_value_t = 3306)]
    pub mysql_port: u16,

    /// MySQL user
    #[arg(long, env = "MYSQL_AZ_USER", default_value = "")]
    pub mysql_user: String,

    /// MySQL password
    #[arg(long, env = "MYSQL_AZ_PASSWORD", hide_env_values = true)]
    pub mysql_password: Option<String>,

    /// MySQL database
    #[arg(long, env = "MYSQL_AZ_DB")]
    pub mysql_db: Option<String>,

    /// Also write logs to this file
    #[arg(long, env = "AGENT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl AgentConfig {
    /// Configured API key; blank values count as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn poll_every(&self) -> Result<Duration> {
        if self.polling_interval == 0 {
            return Err(Error::Config(
                "POLLING_INTERVAL must be at least 1 second".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.polling_interval))
    }

    pub fn mysql_options(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&self.mysql_host)
            .port(self.mysql_port)
            .username(&self.mysql_user)
            .charset("utf8mb4");

        if let Some(password) = self.mysql_password.as_deref() {
            options = options.password(password);
        }
        if let Some(db) = self.mysql_db.as_deref().filter(|db| !db.is_empty()) {
            options = options.database(db);
        }
        options
    }

    /// `host:port` for log lines; credentials are never printed.
    pub fn mysql_target(&self) -> String {
        format!("{}:{}", self.mysql_host, self.mysql_port)
    }
}
