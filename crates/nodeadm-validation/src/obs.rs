//! Structured tracing hooks for validation runs.
//!
//! Every [`crate::Runner::sequentially`] call is wrapped in a
//! `nodeadm.validation.run` span tagged with a fresh `run_id`, so events
//! emitted by validations and the retry engine can be grouped per run.

use tracing::{debug, info, info_span, Span};

/// Span covering one runner execution.
pub fn run_span(run_id: &str) -> Span {
    info_span!("nodeadm.validation.run", run_id = %run_id)
}

pub fn emit_run_started(run_id: &str, validations: usize) {
    info!(event = "run.started", run_id = %run_id, validations = validations);
}

/// Emit event: run finished with failure and suppressed-warning counts.
pub fn emit_run_finished(run_id: &str, validations: usize, failures: usize, warnings: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        validations = validations,
        failures = failures,
        warnings = warnings,
        success = failures == 0,
    );
}

/// Emit event: a validation was dropped at registration by the skip list.
pub fn emit_validation_skipped(name: &str) {
    debug!(event = "validation.skipped", validation = %name);
}
