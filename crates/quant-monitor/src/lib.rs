//! Structured logging for the quantcore binary and services.

mod logging;

pub use logging::{setup_logging, LogFormat, LoggingError};
