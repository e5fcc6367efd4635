use serde::Deserialize;

/// Signing key used when `SECRET_KEY` is not set. Never use it in production.
pub const DEV_SECRET_KEY: &str = "portoex-gerot-dev-key-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// API server settings, read from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_port: u16,
    pub database_url: String,
    pub secret_key: String,
    pub agent_api_key: Option<String>,
    pub session_ttl_hours: i64,
    pub allowed_email_domain: Option<String>,
    pub log_format: LogFormat,
    pub default_admin_password: String,
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_env(config::Environment::default())
    }

    /// Every value is read as the raw string; serde converts the numeric fields.
    fn from_env(env: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("api_port", 5000)?
            .set_default("database_url", "sqlite://gerot.db")?
            .set_default("secret_key", DEV_SECRET_KEY)?
            .set_default("session_ttl_hours", 12)?
            .set_default("log_format", "pretty")?
            .set_default("default_admin_password", "admin123")?
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    /// The configured agent key; blank values count as unset.
    pub fn agent_key(&self) -> Option<&str> {
        self.agent_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY
    }

    /// Whether `email` belongs to the company domain, when one is configured.
    pub fn email_allowed(&self, email: &str) -> bool {
        match self.allowed_email_domain.as_deref() {
            Some(domain) if !domain.is_empty() => email
                .trim()
                .to_lowercase()
                .ends_with(&format!("@{}", domain.trim_start_matches('@').to_lowercase())),
            _ => true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_port: 5000,
            database_url: "sqlite://gerot.db".to_string(),
            secret_key: DEV_SECRET_KEY.to_string(),
            agent_api_key: None,
            session_ttl_hours: 12,
            allowed_email_domain: None,
            log_format: LogFormat::Pretty,
            default_admin_password: "admin123".to_string(),
        }
    }
}
