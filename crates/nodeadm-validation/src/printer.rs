//! Plain-text informer that renders one tree per failed error.
//!
//! ```text
//! * Validating API server endpoint
//! [FAIL] endpoint-reachability
//!     Error: connecting to 10.0.0.1:443: connection refused
//!     Logs:
//!         curl: (7) Failed to connect
//!     Remediation: Allow outbound traffic to the API server on port 443
//! ```

use std::io::{self, Write};
use std::sync::Mutex;

use nodeadm_core::Context;
use tracing::warn;

use crate::error::{flatten, is_warning, logs, remediation};
use crate::informer::Informer;

pub struct Printer<W> {
    out: Mutex<W>,
}

impl Printer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> Printer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, render: impl FnOnce(&mut W) -> io::Result<()>) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = render(&mut *out).and_then(|()| out.flush()) {
            warn!(error = %err, "failed to write validation output");
        }
    }
}

impl<W: Write + Send> Informer for Printer<W> {
    fn starting(&self, _ctx: &Context, _name: &str, message: &str) {
        self.emit(|out| writeln!(out, "* {message}"));
    }

    fn done(&self, _ctx: &Context, name: &str, err: Option<&anyhow::Error>) {
        self.emit(|out| {
            let Some(err) = err else {
                return writeln!(out, "[PASS] {name}");
            };

            let errors = flatten(err);
            let status = if errors.iter().all(|err| is_warning(err)) {
                "WARN"
            } else {
                "FAIL"
            };
            writeln!(out, "[{status}] {name}")?;

            for err in errors {
                let label = if is_warning(err) { "Warning" } else { "Error" };
                writeln!(out, "    {label}: {err:#}")?;

                let lines = logs(err);
                if !lines.is_empty() {
                    writeln!(out, "    Logs:")?;
                    for line in lines {
                        writeln!(out, "        {line}")?;
                    }
                }

                let remediation = remediation(err);
                if !remediation.is_empty() {
                    writeln!(out, "    Remediation: {remediation}")?;
                }
            }
            Ok(())
        });
    }
}
