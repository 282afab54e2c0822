//! nodeadm core
//!
//! Building blocks shared by the nodeadm validators:
//! - [`Context`]: cancellation and deadline scope passed into every operation
//! - [`retry`]: bounded retry loop with backoff and error classification
//! - [`config`]: serde-backed retry settings
//! - [`telemetry`]: tracing subscriber initialisation

pub mod config;
pub mod context;
pub mod error;
pub mod retry;
pub mod telemetry;

pub use config::{BackoffConfig, RetryConfig};
pub use context::{Context, ContextError};
pub use error::{ConfigError, ConfigResult};
pub use retry::{
    max_consecutive_error_handler, network_request, network_request_with, network_retrier,
    Backoff, HandleError, MaxConsecutiveErrorHandler, Retrier, RetrierOption, StepsExhausted,
};
pub use telemetry::{init_tracing, LogFormat};

/// nodeadm version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
