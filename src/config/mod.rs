use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub paypal: PaypalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Root directory for uploaded media (profile photos, news images, ...).
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Controls the Secure attribute on the session cookie.
    #[serde(default)]
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            upload_dir: default_upload_dir(),
            production: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign session tokens. The server refuses to start
    /// without one.
    #[serde(default)]
    pub jwt_secret: String,
    /// Seed credentials for the initial admin account.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default)]
    pub admin_password: Option<String>,
}

fn default_admin_email() -> String {
    "admin@talenthub.local".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaypalConfig {
    #[serde(default = "default_paypal_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub secret: String,
    /// Membership registration fee. The client echoes this back when creating
    /// an order; the server value is authoritative.
    #[serde(default = "default_registration_fee")]
    pub registration_fee: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for PaypalConfig {
    fn default() -> Self {
        Self {
            base_url: default_paypal_base_url(),
            client_id: String::new(),
            secret: String::new(),
            registration_fee: default_registration_fee(),
            currency: default_currency(),
        }
    }
}

fn default_paypal_base_url() -> String {
    "https://api-m.sandbox.paypal.com".to_string()
}

fn default_registration_fee() -> String {
    "10.00".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse configuration file")?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            paypal: PaypalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Fatal startup checks. A missing signing secret is non-recoverable:
    /// every issued session would be unverifiable after a restart.
    fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            bail!(
                "auth.jwt_secret is missing. Add a long random value to the \
                 [auth] section of the config file and restart."
            );
        }
        Ok(())
    }
}
