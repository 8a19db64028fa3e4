pub mod models;
pub mod state;
pub mod validation;

pub use models::*;
pub use state::{decide, decide_at};
pub use validation::{CheckValidator, FieldViolation, ValidationReport};

/// Record store collection holding check records.
pub const CHECKS_COLLECTION: &str = "checks";
