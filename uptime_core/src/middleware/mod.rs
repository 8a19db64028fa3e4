//! Middleware for the operational HTTP surface

pub mod logging;
