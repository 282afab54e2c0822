//! Sequential executor and aggregator for validations over one object type.

use std::collections::HashSet;
use std::sync::Arc;

use nodeadm_core::Context;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::error::{is_warning, join, unwrap};
use crate::informer::Informer;
use crate::obs::{emit_run_finished, emit_run_started, emit_validation_skipped, run_span};
use crate::validation::{self, Validatable, Validation};

/// Panic message raised when a validation mutates the object under validation.
pub const MUTATION_PANIC: &str = "validations must not modify the object under validation";

/// Runs registered validations one at a time in registration order.
pub struct Runner<O> {
    informer: Arc<dyn Informer>,
    skip: HashSet<String>,
    validations: Vec<Validation<O>>,
}

impl<O: Validatable> Runner<O> {
    pub fn new(informer: Arc<dyn Informer>) -> Self {
        Self {
            informer,
            skip: HashSet::new(),
            validations: Vec::new(),
        }
    }

    pub fn from_config(informer: Arc<dyn Informer>, config: &RunnerConfig) -> Self {
        Self::new(informer).with_skip_validations(config.skip_validations.iter().cloned())
    }

    /// Names to drop at registration time. Skipped validations produce no output.
    pub fn with_skip_validations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip.extend(names.into_iter().map(Into::into));
        self
    }

    fn is_skipped(&self, validation: &Validation<O>) -> bool {
        let skipped = self.skip.contains(validation.name());
        if skipped {
            emit_validation_skipped(validation.name());
        }
        skipped
    }

    /// Append validations not on the skip list. Order defines execution order.
    pub fn register(&mut self, validations: impl IntoIterator<Item = Validation<O>>) {
        for validation in validations {
            if !self.is_skipped(&validation) {
                self.validations.push(validation);
            }
        }
    }

    /// [`validation::until_error`] over the validations not on the skip list.
    pub fn until_error(&self, validations: impl IntoIterator<Item = Validation<O>>) -> Validation<O> {
        let kept: Vec<_> = validations
            .into_iter()
            .filter(|validation| !self.is_skipped(validation))
            .collect();
        validation::until_error(kept)
    }

    pub fn names(&self) -> Vec<&str> {
        self.validations.iter().map(Validation::name).collect()
    }

    /// Run every registered validation against a deep copy of `obj`.
    ///
    /// Errors are flattened and joined; warnings reach the informer through
    /// the validation itself but are left out of the result.
    ///
    /// # Panics
    ///
    /// If any validation modified the object (see [`MUTATION_PANIC`]).
    pub async fn sequentially(&self, ctx: &Context, obj: &O) -> anyhow::Result<()> {
        let run_id = Uuid::new_v4().to_string();
        let span = run_span(&run_id);

        async {
            emit_run_started(&run_id, self.validations.len());
            let copy = obj.deep_copy();
            let mut failures = Vec::new();
            let mut warnings = 0usize;

            for validation in &self.validations {
                let Err(err) = validation.validate(ctx, self.informer.as_ref(), &copy).await else {
                    continue;
                };
                for err in unwrap(err) {
                    if is_warning(&err) {
                        warnings += 1;
                    } else {
                        failures.push(err);
                    }
                }
            }

            if *obj != copy {
                panic!("{}", MUTATION_PANIC);
            }

            emit_run_finished(&run_id, self.validations.len(), failures.len(), warnings);
            join(failures)
        }
        .instrument(span)
        .await
    }
}
