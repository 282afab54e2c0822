//! Named validation units and their composition.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use nodeadm_core::Context;

use crate::informer::Informer;

/// Object that can be checked by a [`crate::Runner`].
///
/// `deep_copy` must not share mutable state with `self`; the runner compares
/// the original against the copy with `PartialEq` after every run.
pub trait Validatable: PartialEq + Send + Sync + Sized + 'static {
    fn deep_copy(&self) -> Self;
}

/// Signature of a validation body.
pub type ValidateFn<O> = dyn for<'a> Fn(&'a Context, &'a dyn Informer, &'a O) -> BoxFuture<'a, anyhow::Result<()>>
    + Send
    + Sync;

/// A single named check. Cheap to clone; the body is shared.
pub struct Validation<O> {
    name: String,
    validate: Arc<ValidateFn<O>>,
}

impl<O> Clone for Validation<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            validate: Arc::clone(&self.validate),
        }
    }
}

impl<O> fmt::Debug for Validation<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validation").field("name", &self.name).finish()
    }
}

impl<O: Validatable> Validation<O> {
    /// The body must treat `O` as read-only.
    pub fn new<F>(name: impl Into<String>, validate: F) -> Self
    where
        F: for<'a> Fn(&'a Context, &'a dyn Informer, &'a O) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            validate: Arc::new(validate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn validate(&self, ctx: &Context, informer: &dyn Informer, obj: &O) -> anyhow::Result<()> {
        (self.validate)(ctx, informer, obj).await
    }
}

/// Compose `validations` into one that stops at the first error.
///
/// The failing error is returned as-is, warnings included: a warning still
/// stops the chain even though the runner will not count it as a failure.
pub fn until_error<O: Validatable>(validations: impl IntoIterator<Item = Validation<O>>) -> Validation<O> {
    let validations: Arc<[Validation<O>]> = validations.into_iter().collect();
    let names: Vec<&str> = validations.iter().map(Validation::name).collect();
    let name = format!("until-error-{}", names.join("-"));

    Validation::new(name, move |ctx, informer, obj| {
        run_until_error(Arc::clone(&validations), ctx, informer, obj).boxed()
    })
}

async fn run_until_error<O: Validatable>(
    validations: Arc<[Validation<O>]>,
    ctx: &Context,
    informer: &dyn Informer,
    obj: &O,
) -> anyhow::Result<()> {
    for validation in validations.iter() {
        validation.validate(ctx, informer, obj).await?;
    }
    Ok(())
}
