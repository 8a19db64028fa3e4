pub mod settings;

pub use settings::{
    AppConfig, CheckConfig, NotificationConfig, SchedulerConfig, ServerConfig, StorageConfig,
};
