//! Error decorations carried by validation failures.
//!
//! Decorations wrap an existing error instead of replacing it:
//! - [`RemediableError`] attaches a human-actionable fix suggestion.
//! - [`WarningError`] marks a failure as non-fatal to the overall run.
//! - [`LoggedError`] attaches lines captured from an external process.
//!
//! Decorations compose by wrapping, and every query ([`is_remediable`],
//! [`is_warning`], [`remediation`], [`logs`]) walks the whole chain, including
//! `anyhow` context layers added after the decoration.
//!
//! Several independent failures travel together as an [`ErrorList`]; use
//! [`unwrap`] or [`flatten`] instead of assuming a single error.

use std::error::Error as StdError;
use std::fmt;

/// Error carrying a suggested fix.
#[derive(Debug)]
pub struct RemediableError {
    inner: anyhow::Error,
    remediation: String,
}

impl RemediableError {
    pub fn remediation(&self) -> &str {
        &self.remediation
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl fmt::Display for RemediableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl StdError for RemediableError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// Failure that is reported but does not fail the run.
#[derive(Debug)]
pub struct WarningError {
    inner: anyhow::Error,
    remediation: String,
}

impl WarningError {
    pub fn remediation(&self) -> &str {
        &self.remediation
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl fmt::Display for WarningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl StdError for WarningError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// Error carrying output captured from an external command.
#[derive(Debug)]
pub struct LoggedError {
    inner: anyhow::Error,
    lines: Vec<String>,
}

impl LoggedError {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl fmt::Display for LoggedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl StdError for LoggedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// Independent errors joined into one. Displays one error per line.
#[derive(Debug)]
pub struct ErrorList {
    errors: Vec<anyhow::Error>,
}

impl ErrorList {
    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<anyhow::Error> {
        self.errors
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err:#}")?;
        }
        Ok(())
    }
}

impl StdError for ErrorList {}

pub fn with_remediation(err: impl Into<anyhow::Error>, remediation: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(RemediableError {
        inner: err.into(),
        remediation: remediation.into(),
    })
}

pub fn new_remediable_err(message: impl Into<String>, remediation: impl Into<String>) -> anyhow::Error {
    with_remediation(anyhow::Error::msg(message.into()), remediation)
}

pub fn with_warning(err: impl Into<anyhow::Error>, remediation: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(WarningError {
        inner: err.into(),
        remediation: remediation.into(),
    })
}

pub fn new_warning(message: impl Into<String>, remediation: impl Into<String>) -> anyhow::Error {
    with_warning(anyhow::Error::msg(message.into()), remediation)
}

pub fn with_logs(err: impl Into<anyhow::Error>, lines: Vec<String>) -> anyhow::Error {
    anyhow::Error::new(LoggedError {
        inner: err.into(),
        lines,
    })
}

fn as_dyn(err: &anyhow::Error) -> &(dyn StdError + 'static) {
    err.as_ref()
}

/// Every layer of `err`, stepping into decoration wrappers as well as `source()`.
fn layers(err: &anyhow::Error) -> impl Iterator<Item = &(dyn StdError + 'static)> {
    std::iter::successors(Some(as_dyn(err)), |layer| next_layer(*layer))
}

fn next_layer<'a>(layer: &'a (dyn StdError + 'static)) -> Option<&'a (dyn StdError + 'static)> {
    if let Some(err) = layer.downcast_ref::<RemediableError>() {
        return Some(as_dyn(&err.inner));
    }
    if let Some(err) = layer.downcast_ref::<WarningError>() {
        return Some(as_dyn(&err.inner));
    }
    if let Some(err) = layer.downcast_ref::<LoggedError>() {
        return Some(as_dyn(&err.inner));
    }
    layer.source()
}

/// True when any layer carries a remediation (warnings included).
pub fn is_remediable(err: &anyhow::Error) -> bool {
    layers(err).any(|layer| layer.is::<RemediableError>() || layer.is::<WarningError>())
}

/// Outermost remediation in the chain, or `""`.
pub fn remediation(err: &anyhow::Error) -> &str {
    layers(err)
        .find_map(|layer| {
            layer
                .downcast_ref::<RemediableError>()
                .map(RemediableError::remediation)
                .or_else(|| layer.downcast_ref::<WarningError>().map(WarningError::remediation))
        })
        .unwrap_or("")
}

pub fn is_warning(err: &anyhow::Error) -> bool {
    layers(err).any(|layer| layer.is::<WarningError>())
}

/// Captured lines from the outermost [`LoggedError`], empty when absent.
pub fn logs(err: &anyhow::Error) -> &[String] {
    layers(err)
        .find_map(|layer| layer.downcast_ref::<LoggedError>().map(LoggedError::lines))
        .unwrap_or(&[])
}

/// True only when the outermost layer is an [`ErrorList`]. `downcast` would
/// also match a list hidden under context, and splitting that drops the context.
fn is_list(err: &anyhow::Error) -> bool {
    as_dyn(err).is::<ErrorList>()
}

/// Split a joined error into its members; any other error becomes a list of one.
pub fn unwrap(err: anyhow::Error) -> Vec<anyhow::Error> {
    if !is_list(&err) {
        return vec![err];
    }
    match err.downcast::<ErrorList>() {
        Ok(list) => list.errors.into_iter().flat_map(unwrap).collect(),
        Err(err) => vec![err],
    }
}

/// Borrowing counterpart of [`unwrap`].
pub fn flatten(err: &anyhow::Error) -> Vec<&anyhow::Error> {
    if !is_list(err) {
        return vec![err];
    }
    match err.downcast_ref::<ErrorList>() {
        Some(list) => list.errors.iter().flat_map(flatten).collect(),
        None => vec![err],
    }
}

/// Join `errors` into one [`ErrorList`]; `Ok` when there are none.
pub fn join(errors: impl IntoIterator<Item = anyhow::Error>) -> anyhow::Result<()> {
    let errors: Vec<_> = errors.into_iter().collect();
    if errors.is_empty() {
        return Ok(());
    }
    Err(anyhow::Error::new(ErrorList { errors }))
}
