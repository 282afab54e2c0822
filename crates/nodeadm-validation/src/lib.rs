//! nodeadm validation
//!
//! Composes independent checks over one configuration object and reports
//! them through an [`Informer`]:
//! - [`Validation`] and [`until_error`]: named checks and short-circuit chains
//! - [`Runner`]: sequential execution, warning filtering and the
//!   read-only guard on the validated object
//! - [`error`]: remediation, warning and captured-log decorations, and
//!   multi-error joining
//! - [`LogInformer`] and [`Printer`]: structured-log and plain-text output
//! - [`checks`]: endpoint configuration, resolution and reachability checks

pub mod checks;
pub mod config;
pub mod error;
pub mod informer;
pub mod lines;
pub mod obs;
pub mod printer;
pub mod runner;
pub mod validation;

pub use config::RunnerConfig;
pub use error::{
    flatten, is_remediable, is_warning, join, logs, new_remediable_err, new_warning, remediation,
    unwrap, with_logs, with_remediation, with_warning, ErrorList, LoggedError, RemediableError,
    WarningError,
};
pub use informer::{Informer, LogInformer};
pub use printer::Printer;
pub use runner::{Runner, MUTATION_PANIC};
pub use validation::{until_error, Validatable, Validation};
