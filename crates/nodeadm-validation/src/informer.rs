//! Output boundary for validation progress.
//!
//! Validations report through an [`Informer`]; they never print. The runner
//! executes validations one at a time, so calls on one informer never
//! interleave between validations.

use nodeadm_core::Context;
use tracing::{error, info, warn};

use crate::error::{flatten, is_warning, logs, remediation};

/// Receives start and completion notices from validations.
pub trait Informer: Send + Sync {
    /// A validation is about to run. Presentation only.
    fn starting(&self, ctx: &Context, name: &str, message: &str);

    /// A validation finished; `None` means it passed.
    fn done(&self, ctx: &Context, name: &str, err: Option<&anyhow::Error>);
}

/// Informer that emits structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogInformer;

impl Informer for LogInformer {
    fn starting(&self, _ctx: &Context, name: &str, message: &str) {
        info!(event = "validation.starting", validation = %name, message = %message);
    }

    fn done(&self, _ctx: &Context, name: &str, err: Option<&anyhow::Error>) {
        let Some(err) = err else {
            info!(event = "validation.passed", validation = %name);
            return;
        };

        for err in flatten(err) {
            let message = format!("{err:#}");
            let remediation = remediation(err);
            let logs = logs(err).join("\n");
            if is_warning(err) {
                warn!(
                    event = "validation.warning",
                    validation = %name,
                    error = %message,
                    remediation = %remediation,
                    logs = %logs,
                );
            } else {
                error!(
                    event = "validation.failed",
                    validation = %name,
                    error = %message,
                    remediation = %remediation,
                    logs = %logs,
                );
            }
        }
    }
}
