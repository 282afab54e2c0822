//! Bounded retry loop around an idempotent operation.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::backoff::Backoff;
use super::handler::{HandleError, MaxConsecutiveErrorHandler};
use crate::config::RetryConfig;
use crate::context::Context;

/// Mutates a [`Retrier`] before it runs. Used to override defaults in tests.
pub type RetrierOption = Box<dyn FnOnce(&mut Retrier) + Send>;

/// The loop ran out of attempts before the operation reported done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("retry steps exhausted after {attempts} attempts")]
pub struct StepsExhausted {
    pub attempts: usize,
}

/// Retry policy for one logical sequence of attempts.
///
/// `timeout` bounds the whole loop, `operation_timeout` bounds each attempt.
/// A zero duration disables the corresponding bound.
pub struct Retrier {
    pub handle_error: Option<HandleError>,
    pub timeout: Duration,
    pub operation_timeout: Duration,
    pub backoff: Backoff,
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Retrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrier")
            .field("handle_error", &self.handle_error.is_some())
            .field("timeout", &self.timeout)
            .field("operation_timeout", &self.operation_timeout)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl Retrier {
    pub fn new() -> Self {
        Self {
            handle_error: None,
            timeout: Duration::ZERO,
            operation_timeout: Duration::ZERO,
            backoff: Backoff::default(),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            handle_error: None,
            timeout: Duration::from_millis(config.timeout_ms),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            backoff: config.backoff.to_backoff(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_handle_error(mut self, handle_error: HandleError) -> Self {
        self.handle_error = Some(handle_error);
        self
    }

    pub fn with_max_consecutive_errors(self, max_attempts: usize) -> Self {
        self.with_handle_error(MaxConsecutiveErrorHandler::new(max_attempts).into_handle_error())
    }

    /// Run `op` until it reports done without error.
    ///
    /// `op` receives a fresh context per attempt and returns `Ok(true)` when
    /// done, `Ok(false)` to be polled again, or `Err` to be retried. Every
    /// operation error is remembered as the last failure before the error
    /// handler sees it. The loop stops early when the handler returns an
    /// error. When the loop is interrupted by its context or runs out of
    /// steps, the last operation error is returned with the interruption
    /// attached as context.
    ///
    /// Consumes the retrier so that stateful handlers never leak into a
    /// second sequence.
    pub async fn run<F, Fut>(mut self, ctx: &Context, mut op: F) -> anyhow::Result<()>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = anyhow::Result<bool>>,
    {
        let loop_ctx = if self.timeout.is_zero() {
            ctx.clone()
        } else {
            ctx.with_timeout(self.timeout)
        };
        let max_steps = self.backoff.max_steps();
        let mut backoff = self.backoff;
        let mut last_err: Option<anyhow::Error> = None;
        let mut attempt = 0usize;

        loop {
            if let Some(reason) = loop_ctx.err() {
                return Err(interrupted(reason, last_err));
            }

            attempt += 1;
            let attempt_ctx = if self.operation_timeout.is_zero() {
                loop_ctx.clone()
            } else {
                loop_ctx.with_timeout(self.operation_timeout)
            };

            let (done, err) = match op(attempt_ctx).await {
                Ok(done) => (done, None),
                Err(err) => (false, Some(err)),
            };

            let verdict = match self.handle_error.as_mut() {
                Some(handle) => handle(err.as_ref()),
                None => Ok(()),
            };
            if let Err(reason) = verdict {
                let terminal = match err {
                    Some(err) => err.context(reason),
                    None => reason,
                };
                warn!(attempt, error = %format!("{terminal:#}"), "retry aborted by error handler");
                return Err(terminal);
            }

            match err {
                Some(err) => last_err = Some(err),
                None if done => return Ok(()),
                None => {}
            }

            if attempt >= max_steps {
                warn!(attempts = attempt, "retry steps exhausted");
                return Err(interrupted(StepsExhausted { attempts: attempt }, last_err));
            }

            let delay = backoff.step();
            debug!(
                attempt,
                delay = ?delay,
                error = ?last_err.as_ref().map(|err| format!("{err:#}")),
                "operation not done, retrying"
            );

            if let Err(reason) = loop_ctx.run(tokio::time::sleep(delay)).await {
                return Err(interrupted(reason, last_err));
            }
        }
    }
}

/// Override the whole-loop timeout.
pub fn with_timeout(timeout: Duration) -> RetrierOption {
    Box::new(move |retrier| retrier.timeout = timeout)
}

/// Override the initial backoff delay.
pub fn with_backoff_duration(duration: Duration) -> RetrierOption {
    Box::new(move |retrier| retrier.backoff.duration = duration)
}

fn interrupted<R>(reason: R, last_err: Option<anyhow::Error>) -> anyhow::Error
where
    R: std::error::Error + Send + Sync + 'static,
{
    match last_err {
        Some(err) => err.context(reason),
        None => anyhow::Error::new(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_first_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        Retrier::new()
            .run(&Context::background(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, anyhow::Error>(true) }
            })
            .await
            .expect("should succeed");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_done() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        Retrier::new()
            .with_backoff(Backoff::exponential(Duration::from_millis(1), 1.0, 0.0))
            .run(&Context::background(), move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok::<_, anyhow::Error>(n == 4) }
            })
            .await
            .expect("should finish once done");

        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_exhaustion_keeps_last_error() {
        let err = Retrier::new()
            .with_backoff(Backoff::exponential(Duration::from_millis(1), 1.0, 0.0).with_steps(3))
            .run(&Context::background(), |_| async {
                Err::<bool, _>(anyhow::anyhow!("endpoint unavailable"))
            })
            .await
            .expect_err("should exhaust steps");

        assert_eq!(
            err.downcast_ref::<StepsExhausted>(),
            Some(&StepsExhausted { attempts: 3 })
        );
        assert!(format!("{err:#}").contains("endpoint unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_context_skips_operation() {
        let ctx = Context::background();
        ctx.cancel();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let err = Retrier::new()
            .run(&ctx, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, anyhow::Error>(true) }
            })
            .await
            .expect_err("cancelled context");

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(err.downcast_ref::<ContextError>(), Some(&ContextError::Canceled));
        assert_eq!(err.to_string(), "context canceled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_timeout_is_fresh_per_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        Retrier::new()
            .with_operation_timeout(Duration::from_millis(50))
            .with_backoff(Backoff::exponential(Duration::from_millis(1), 1.0, 0.0))
            .run(&Context::background(), move |ctx| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    let remaining = ctx.remaining().expect("attempt has a deadline");
                    assert_eq!(remaining, Duration::from_millis(50));
                    if n < 3 {
                        ctx.done().await;
                        anyhow::bail!("attempt {n} timed out");
                    }
                    Ok::<_, anyhow::Error>(true)
                }
            })
            .await
            .expect("third attempt succeeds");

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_can_veto_success() {
        let err = Retrier::new()
            .with_handle_error(Box::new(|_: Option<&anyhow::Error>| Err(anyhow::anyhow!("not trusted"))))
            .run(&Context::background(), |_| async { Ok::<_, anyhow::Error>(true) })
            .await
            .expect_err("handler veto");

        assert_eq!(err.to_string(), "not trusted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_options_override_fields() {
        let mut retrier = Retrier::new();
        for option in [
            with_timeout(Duration::from_secs(3)),
            with_backoff_duration(Duration::from_millis(7)),
        ] {
            option(&mut retrier);
        }

        assert_eq!(retrier.timeout, Duration::from_secs(3));
        assert_eq!(retrier.backoff.duration, Duration::from_millis(7));
    }
}
