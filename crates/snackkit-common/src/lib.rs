//! # SnackKit Common
//!
//! Shared infrastructure for the SnackStopper worker crates:
//!
//! - Logging configuration and setup (`tracing` based)
//! - Worker configuration (cache generation, asset manifest, notification
//!   defaults), passed explicitly into every operation instead of living as
//!   worker-global state

pub mod config;
pub mod logging;

pub use config::{ConfigError, NotificationConfig, WorkerConfig};
pub use logging::{init_logging, LogConfig, LogFormat};
