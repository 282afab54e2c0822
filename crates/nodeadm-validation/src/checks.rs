//! Endpoint connectivity checks built on the validation framework.
//!
//! Each check announces itself through the informer, reports its own outcome
//! and returns remediable errors. Network checks retry with the configured
//! [`RetryConfig`] policy.

use anyhow::Context as _;
use futures::FutureExt;
use nodeadm_core::{Context, Retrier, RetryConfig};
use serde::{Deserialize, Serialize};
use tokio::net::{lookup_host, TcpStream};

use crate::error::with_remediation;
use crate::informer::Informer;
use crate::runner::Runner;
use crate::validation::{Validatable, Validation};

pub const ENDPOINT_CONFIG: &str = "endpoint-config";
pub const ENDPOINT_RESOLUTION: &str = "endpoint-resolution";
pub const ENDPOINT_REACHABILITY: &str = "endpoint-reachability";

/// A named network endpoint in `host:port` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub endpoint: String,
}

impl EndpointConfig {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }
}

impl Validatable for EndpointConfig {
    fn deep_copy(&self) -> Self {
        self.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("endpoint is empty")]
    Empty,

    #[error("endpoint {0:?} is not in host:port form")]
    Malformed(String),

    #[error("{0} resolved to no addresses")]
    NoAddresses(String),
}

/// Split `host:port`, accepting bracketed IPv6 hosts. Whitespace anywhere
/// is rejected since the network checks use the endpoint verbatim.
pub fn parse_endpoint(endpoint: &str) -> Result<(&str, u16), EndpointError> {
    if endpoint.is_empty() {
        return Err(EndpointError::Empty);
    }

    let malformed = || EndpointError::Malformed(endpoint.to_string());
    if endpoint.contains(char::is_whitespace) {
        return Err(malformed());
    }
    let (host, port) = endpoint.rsplit_once(':').ok_or_else(malformed)?;
    let host = match host.strip_prefix('[') {
        Some(rest) => rest.strip_suffix(']').ok_or_else(malformed)?,
        None if host.contains(':') => return Err(malformed()),
        None => host,
    };
    if host.is_empty() {
        return Err(malformed());
    }

    match port.parse::<u16>() {
        Ok(port) if port != 0 => Ok((host, port)),
        _ => Err(malformed()),
    }
}

fn report(ctx: &Context, informer: &dyn Informer, name: &str, result: anyhow::Result<()>) -> anyhow::Result<()> {
    informer.done(ctx, name, result.as_ref().err());
    result
}

/// `endpoint-config`: the endpoint must be a non-empty `host:port`.
pub fn endpoint_config_validation() -> Validation<EndpointConfig> {
    Validation::new(ENDPOINT_CONFIG, |ctx, informer, config: &EndpointConfig| {
        async move {
            informer.starting(
                ctx,
                ENDPOINT_CONFIG,
                &format!("Validating {} endpoint configuration", config.name),
            );
            let result = parse_endpoint(&config.endpoint).map(|_| ()).map_err(|err| {
                with_remediation(
                    err,
                    format!("Set the {} endpoint to a host:port address", config.name),
                )
            });
            report(ctx, informer, ENDPOINT_CONFIG, result)
        }
        .boxed()
    })
}

/// `endpoint-resolution`: the endpoint host resolves to at least one address.
pub fn endpoint_resolution_validation(retry: RetryConfig) -> Validation<EndpointConfig> {
    Validation::new(ENDPOINT_RESOLUTION, move |ctx, informer, config: &EndpointConfig| {
        validate_resolution(ctx, informer, config, retry.clone()).boxed()
    })
}

async fn validate_resolution(
    ctx: &Context,
    informer: &dyn Informer,
    config: &EndpointConfig,
    retry: RetryConfig,
) -> anyhow::Result<()> {
    informer.starting(
        ctx,
        ENDPOINT_RESOLUTION,
        &format!("Resolving {} endpoint {}", config.name, config.endpoint),
    );
    let result = Retrier::from_config(&retry)
        .run(ctx, |attempt| resolve_once(attempt, config.endpoint.clone()))
        .await
        .with_context(|| format!("resolving {}", config.endpoint))
        .map_err(|err| {
            with_remediation(
                err,
                format!(
                    "Ensure the {} endpoint host is resolvable from this node's DNS servers",
                    config.name
                ),
            )
        });
    report(ctx, informer, ENDPOINT_RESOLUTION, result)
}

async fn resolve_once(ctx: Context, endpoint: String) -> anyhow::Result<bool> {
    let resolved = ctx.run(lookup_host(endpoint.as_str())).await??.next().is_some();
    if !resolved {
        return Err(EndpointError::NoAddresses(endpoint).into());
    }
    Ok(true)
}

/// `endpoint-reachability`: a TCP connection to the endpoint succeeds.
pub fn endpoint_reachability_validation(retry: RetryConfig) -> Validation<EndpointConfig> {
    Validation::new(ENDPOINT_REACHABILITY, move |ctx, informer, config: &EndpointConfig| {
        validate_reachability(ctx, informer, config, retry.clone()).boxed()
    })
}

async fn validate_reachability(
    ctx: &Context,
    informer: &dyn Informer,
    config: &EndpointConfig,
    retry: RetryConfig,
) -> anyhow::Result<()> {
    informer.starting(
        ctx,
        ENDPOINT_REACHABILITY,
        &format!("Connecting to {} endpoint {}", config.name, config.endpoint),
    );
    let result = Retrier::from_config(&retry)
        .run(ctx, |attempt| connect_once(attempt, config.endpoint.clone()))
        .await
        .with_context(|| format!("connecting to {}", config.endpoint))
        .map_err(|err| {
            with_remediation(
                err,
                format!(
                    "Allow outbound TCP traffic from this node to the {} endpoint",
                    config.name
                ),
            )
        });
    report(ctx, informer, ENDPOINT_REACHABILITY, result)
}

async fn connect_once(ctx: Context, endpoint: String) -> anyhow::Result<bool> {
    ctx.run(TcpStream::connect(endpoint.as_str())).await??;
    Ok(true)
}

/// Config check, then resolution, then reachability, stopping at the first failure.
pub fn endpoint_validations(retry: &RetryConfig) -> Validation<EndpointConfig> {
    crate::validation::until_error([
        endpoint_config_validation(),
        endpoint_resolution_validation(retry.clone()),
        endpoint_reachability_validation(retry.clone()),
    ])
}

/// Register the endpoint chain on `runner`, honouring its skip list.
pub fn register_endpoint_validations(runner: &mut Runner<EndpointConfig>, retry: &RetryConfig) {
    let chain = runner.until_error([
        endpoint_config_validation(),
        endpoint_resolution_validation(retry.clone()),
        endpoint_reachability_validation(retry.clone()),
    ]);
    runner.register([chain]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{is_remediable, remediation};
    use nodeadm_core::BackoffConfig;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Informer for Recorder {
        fn starting(&self, _: &Context, name: &str, _: &str) {
            self.events.lock().unwrap().push(format!("start {name}"));
        }

        fn done(&self, _: &Context, name: &str, err: Option<&anyhow::Error>) {
            let outcome = if err.is_some() { "fail" } else { "pass" };
            self.events.lock().unwrap().push(format!("{outcome} {name}"));
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            timeout_ms: 200,
            operation_timeout_ms: 100,
            backoff: BackoffConfig {
                duration_ms: 10,
                factor: 1.0,
                jitter: 0.0,
                steps: 3,
            },
        }
    }

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(parse_endpoint("api.example.com:443"), Ok(("api.example.com", 443)));
        assert_eq!(parse_endpoint("[::1]:6443"), Ok(("::1", 6443)));
        assert_eq!(parse_endpoint("10.0.0.1:80"), Ok(("10.0.0.1", 80)));
        assert!(matches!(parse_endpoint(" 10.0.0.1:80 "), Err(EndpointError::Malformed(_))));
        assert!(matches!(parse_endpoint("10.0.0.1: 80"), Err(EndpointError::Malformed(_))));
        assert!(matches!(parse_endpoint("   "), Err(EndpointError::Malformed(_))));
        assert_eq!(parse_endpoint(""), Err(EndpointError::Empty));
        assert!(matches!(parse_endpoint("api.example.com"), Err(EndpointError::Malformed(_))));
        assert!(matches!(parse_endpoint(":443"), Err(EndpointError::Malformed(_))));
        assert!(matches!(parse_endpoint("host:0"), Err(EndpointError::Malformed(_))));
        assert!(matches!(parse_endpoint("host:https"), Err(EndpointError::Malformed(_))));
        assert!(matches!(parse_endpoint("::1:443"), Err(EndpointError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_config_validation_rejects_empty_endpoint() {
        let recorder = Recorder::default();
        let config = EndpointConfig::new("api-server", "");

        let err = endpoint_config_validation()
            .validate(&Context::background(), &recorder, &config)
            .await
            .expect_err("empty endpoint");

        assert!(is_remediable(&err));
        assert_eq!(err.to_string(), "endpoint is empty");
        assert_eq!(remediation(&err), "Set the api-server endpoint to a host:port address");
        assert_eq!(recorder.events(), vec!["start endpoint-config", "fail endpoint-config"]);
    }

    #[tokio::test]
    async fn test_resolution_of_ip_literal() {
        let recorder = Recorder::default();
        let config = EndpointConfig::new("api-server", "127.0.0.1:443");

        endpoint_resolution_validation(fast_retry())
            .validate(&Context::background(), &recorder, &config)
            .await
            .expect("ip literal resolves");

        assert_eq!(
            recorder.events(),
            vec!["start endpoint-resolution", "pass endpoint-resolution"]
        );
    }

    #[tokio::test]
    async fn test_reachability_of_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let config = EndpointConfig::new("api-server", listener.local_addr().unwrap().to_string());

        endpoint_reachability_validation(fast_retry())
            .validate(&Context::background(), &Recorder::default(), &config)
            .await
            .expect("listener accepts connections");
    }

    #[tokio::test]
    async fn test_reachability_of_closed_port_is_remediable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let endpoint = listener.local_addr().unwrap().to_string();
        drop(listener);

        let recorder = Recorder::default();
        let err = endpoint_reachability_validation(fast_retry())
            .validate(&Context::background(), &recorder, &EndpointConfig::new("api-server", &endpoint))
            .await
            .expect_err("nothing listens on the port");

        assert!(is_remediable(&err));
        assert!(format!("{err:#}").starts_with(&format!("connecting to {endpoint}")));
        assert_eq!(
            recorder.events(),
            vec!["start endpoint-reachability", "fail endpoint-reachability"]
        );
    }

    #[tokio::test]
    async fn test_chain_stops_at_config_failure() {
        let recorder = Recorder::default();
        let chain = endpoint_validations(&fast_retry());
        assert_eq!(
            chain.name(),
            "until-error-endpoint-config-endpoint-resolution-endpoint-reachability"
        );

        chain
            .validate(&Context::background(), &recorder, &EndpointConfig::new("api-server", "nope"))
            .await
            .expect_err("malformed endpoint");

        assert_eq!(recorder.events(), vec!["start endpoint-config", "fail endpoint-config"]);
    }

    #[tokio::test]
    async fn test_padded_endpoint_fails_config_check() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let padded = format!(" {} ", listener.local_addr().unwrap());

        let recorder = Recorder::default();
        let err = endpoint_validations(&fast_retry())
            .validate(&Context::background(), &recorder, &EndpointConfig::new("api-server", &padded))
            .await
            .expect_err("surrounding whitespace is not host:port");

        assert!(is_remediable(&err));
        assert_eq!(err.to_string(), format!("endpoint {padded:?} is not in host:port form"));
        assert_eq!(recorder.events(), vec!["start endpoint-config", "fail endpoint-config"]);
    }

    #[test]
    fn test_register_honours_skip_list() {
        let mut runner = Runner::new(Arc::new(Recorder::default()))
            .with_skip_validations([ENDPOINT_RESOLUTION]);
        register_endpoint_validations(&mut runner, &fast_retry());

        assert_eq!(
            runner.names(),
            vec!["until-error-endpoint-config-endpoint-reachability"]
        );
    }
}
