//! Retry engine for network-facing validation steps.
//!
//! - [`Retrier`] wraps an idempotent operation in a bounded loop with
//!   exponential backoff, a whole-loop timeout and a per-attempt timeout.
//! - [`HandleError`] hooks classify attempt errors; [`MaxConsecutiveErrorHandler`]
//!   gives up after too many failures in a row.
//! - [`network_request`] is the preset for short HTTP-style calls.

pub mod backoff;
pub mod handler;
pub mod network;
pub mod retrier;

pub use backoff::Backoff;
pub use handler::{max_consecutive_error_handler, HandleError, MaxConsecutiveErrorHandler};
pub use network::{network_request, network_request_with, network_retrier};
pub use retrier::{with_backoff_duration, with_timeout, Retrier, RetrierOption, StepsExhausted};
