//! Retry preset for short network requests.

use std::future::Future;
use std::time::Duration;

use super::backoff::Backoff;
use super::retrier::{Retrier, RetrierOption};
use crate::context::Context;

/// Whole-loop budget for a network request.
pub const NETWORK_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Delay before the first retry.
pub const NETWORK_REQUEST_BACKOFF: Duration = Duration::from_secs(1);
pub const NETWORK_REQUEST_FACTOR: f64 = 2.0;
pub const NETWORK_REQUEST_JITTER: f64 = 0.1;

/// Retrier tuned for calls that normally finish well under a second.
///
/// Downloads and long polls need their own [`Retrier`].
pub fn network_retrier() -> Retrier {
    Retrier::new()
        .with_timeout(NETWORK_REQUEST_TIMEOUT)
        .with_backoff(Backoff::exponential(
            NETWORK_REQUEST_BACKOFF,
            NETWORK_REQUEST_FACTOR,
            NETWORK_REQUEST_JITTER,
        ))
}

/// Retry `op` with the network defaults until it returns `Ok`.
pub async fn network_request<F, Fut>(ctx: &Context, op: F) -> anyhow::Result<()>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    network_request_with(ctx, op, Vec::new()).await
}

/// [`network_request`] with overrides applied to the default retrier.
pub async fn network_request_with<F, Fut, I>(ctx: &Context, mut op: F, options: I) -> anyhow::Result<()>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
    I: IntoIterator<Item = RetrierOption>,
{
    let mut retrier = network_retrier();
    for option in options {
        option(&mut retrier);
    }

    retrier
        .run(ctx, move |ctx| {
            let attempt = op(ctx);
            async move { attempt.await.map(|()| true) }
        })
        .await
}
