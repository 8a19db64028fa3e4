pub mod checks;


pub use checks::{
    ComponentHealth, FilesystemHealthCheck, HealthCheck, HealthChecker, HealthStatus, RecordStoreHealthCheck,
    SchedulerHealthCheck, SystemHealth,
};
