use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    pub checks: CheckConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub sweep_interval_seconds: u64,
    pub rotation_interval_seconds: u64,
    pub max_concurrent_checks: usize,
    pub max_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    pub token_length: usize,
    pub phone_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
    pub api_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: 60,
            rotation_interval_seconds: 60 * 60 * 24,
            max_concurrent_checks: 16,
            max_timeout_seconds: 5,
        }
    }
}

impl SchedulerConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_interval_seconds)
    }

    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout_seconds)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./.data"),
            log_dir: PathBuf::from("./.logs"),
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            token_length: 20,
            phone_length: 12,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            account_sid: String::new(),
            auth_token: String::new(),
            from_phone: String::new(),
            api_base_url: "https://api.twilio.com".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.scheduler.sweep_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Sweep interval must be greater than 0".to_string(),
            ));
        }

        if self.scheduler.rotation_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Rotation interval must be greater than 0".to_string(),
            ));
        }

        if self.scheduler.max_concurrent_checks == 0 {
            return Err(ConfigError::Message(
                "Max concurrent checks must be greater than 0".to_string(),
            ));
        }

        if self.scheduler.max_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Max probe timeout must be at least 1 second".to_string(),
            ));
        }

        if self.storage.data_dir.as_os_str().is_empty() || self.storage.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "Data and log directories must be set".to_string(),
            ));
        }

        if self.checks.token_length == 0 || self.checks.phone_length == 0 {
            return Err(ConfigError::Message(
                "Token and phone lengths must be greater than 0".to_string(),
            ));
        }

        if self.notifications.enabled
            && (self.notifications.account_sid.is_empty()
                || self.notifications.auth_token.is_empty()
                || self.notifications.from_phone.is_empty())
        {
            return Err(ConfigError::Message(
                "SMS notifications are enabled but Twilio credentials are missing".to_string(),
            ));
        }

        if !self.notifications.enabled {
            tracing::warn!("SMS notifications disabled - alerts will only be logged");
        }

        Ok(())
    }

    pub fn create_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.storage.data_dir)?;
        std::fs::create_dir_all(&self.storage.log_dir)?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
