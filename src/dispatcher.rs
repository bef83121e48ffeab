// ABOUTME: Request dispatcher: authorize, resolve, validate, and invoke under a timeout
// ABOUTME: Turns every RequestEnvelope into exactly one ResponseEnvelope, catching adapter panics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::auth::{ClientIdentity, Guard};
use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::registry::{AdapterDescriptor, AdapterRegistry};
use crate::types::{AdapterError, AdapterErrorKind, GatewayError};

/// Longest adapter error message returned to clients
const MAX_ERROR_MESSAGE_CHARS: usize = 240;

/// Placeholder substituted for filesystem paths in adapter error messages
const REDACTED_PATH: &str = "<path>";

/// Routes authenticated requests to adapters
///
/// Rate limiting is charged by the transport before a request reaches the
/// dispatcher, so `dispatch` only covers the per-adapter checks.
pub struct Dispatcher {
    registry: Arc<AdapterRegistry>,
    guard: Arc<Guard>,
    timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher bounding every adapter call by `timeout`
    pub fn new(registry: Arc<AdapterRegistry>, guard: Arc<Guard>, timeout: Duration) -> Self {
        Self {
            registry,
            guard,
            timeout,
        }
    }

    /// The adapter registry
    pub const fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// The auth and rate-limit guard
    pub const fn guard(&self) -> &Arc<Guard> {
        &self.guard
    }

    /// Per-call adapter timeout
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Adapters the identity is allowed to reach, sorted by name
    pub fn visible_adapters(&self, identity: &ClientIdentity) -> Vec<AdapterDescriptor> {
        self.registry
            .list()
            .into_iter()
            .filter(|d| identity.allows(&d.name))
            .collect()
    }

    /// Dispatch one request, always producing a response
    pub async fn dispatch(&self, request: RequestEnvelope) -> ResponseEnvelope {
        let started = Instant::now();
        let correlation_id = request.correlation_id.clone();
        let outcome = self.execute(request).await;

        match &outcome {
            Ok(_) => info!(
                correlation_id = %correlation_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request completed"
            ),
            Err(err) => info!(
                correlation_id = %correlation_id,
                kind = err.kind.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request failed"
            ),
        }

        match outcome {
            Ok(result) => ResponseEnvelope::success(correlation_id, result),
            Err(err) => ResponseEnvelope::failure(correlation_id, err),
        }
    }

    async fn execute(&self, request: RequestEnvelope) -> Result<Value, GatewayError> {
        let RequestEnvelope {
            correlation_id,
            adapter,
            operation,
            arguments,
            identity,
            ..
        } = request;

        debug!(
            correlation_id = %correlation_id,
            identity = %identity.id,
            adapter = %adapter,
            operation = %operation,
            "Dispatching request"
        );

        self.guard.authorize(&identity, &adapter)?;
        let resolved = self.registry.resolve(&adapter, &operation)?;
        resolved
            .operation
            .validate(&arguments)
            .map_err(GatewayError::invalid_arguments)?;

        let call = AssertUnwindSafe(resolved.adapter.invoke(&operation, arguments)).catch_unwind();
        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => {
                warn!(
                    correlation_id = %correlation_id,
                    adapter = %adapter,
                    operation = %operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Adapter call timed out"
                );
                Err(GatewayError::adapter_timeout(&adapter, &operation, self.timeout))
            }
            Ok(Err(_panic)) => {
                warn!(
                    correlation_id = %correlation_id,
                    adapter = %adapter,
                    operation = %operation,
                    "Adapter panicked"
                );
                Err(GatewayError::adapter_execution(&adapter, "adapter failed unexpectedly"))
            }
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(map_adapter_error(&adapter, &operation, err)),
        }
    }
}

fn map_adapter_error(adapter: &str, operation: &str, err: AdapterError) -> GatewayError {
    debug!(adapter, operation, error = %err, "Adapter returned error");
    match err.kind {
        AdapterErrorKind::Validation => GatewayError::invalid_arguments(vec![
            crate::types::Violation {
                path: String::new(),
                message: sanitize_message(&err.message),
            },
        ]),
        AdapterErrorKind::UnknownOperation => GatewayError::operation_not_found(adapter, operation),
        AdapterErrorKind::NotFound => {
            GatewayError::adapter_execution(adapter, sanitize_message(&err.message))
                .with_data(json!({ "reason": "not_found" }))
        }
        AdapterErrorKind::Execution => {
            GatewayError::adapter_execution(adapter, sanitize_message(&err.message))
        }
    }
}

/// Reduce an adapter message to something safe to return to a client
///
/// Keeps the first line, replaces absolute paths with a placeholder, and
/// caps the length.
pub fn sanitize_message(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default().trim();
    let redacted = first_line
        .split(' ')
        .map(|word| if looks_like_path(word) { REDACTED_PATH } else { word })
        .collect::<Vec<_>>()
        .join(" ");

    if redacted.chars().count() > MAX_ERROR_MESSAGE_CHARS {
        let mut truncated: String = redacted.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        redacted
    }
}

fn looks_like_path(word: &str) -> bool {
    let word = word.trim_matches(|c: char| matches!(c, '\'' | '"' | '(' | ')' | ',' | ':' | ';'));
    let unix = word.len() > 1 && (word.starts_with('/') || word.starts_with("~/"));
    let windows = word.len() > 2 && word.as_bytes()[1] == b':' && word[2..].starts_with('\\');
    unix || windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimitPolicy;
    use crate::types::{Adapter, ErrorKind, OperationSpec};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Spy {
        name: &'static str,
        calls: AtomicUsize,
        behavior: Behavior,
    }

    enum Behavior {
        Echo,
        Fail(AdapterError),
        Panic,
        Sleep(Duration),
    }

    #[async_trait]
    impl Adapter for Spy {
        fn name(&self) -> &str {
            self.name
        }

        fn operations(&self) -> Vec<OperationSpec> {
            vec![OperationSpec::new(
                "run",
                "test operation",
                json!({
                    "type": "object",
                    "properties": { "project": { "type": "string" } },
                    "required": ["project"]
                }),
            )]
        }

        async fn invoke(&self, _operation: &str, arguments: Value) -> Result<Value, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Echo => Ok(arguments),
                Behavior::Fail(err) => Err(err.clone()),
                Behavior::Panic => panic!("adapter blew up"),
                Behavior::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(Value::Null)
                }
            }
        }
    }

    fn spy(name: &'static str, behavior: Behavior) -> Arc<Spy> {
        Arc::new(Spy {
            name,
            calls: AtomicUsize::new(0),
            behavior,
        })
    }

    fn setup(adapter: Arc<Spy>) -> (Dispatcher, Arc<ClientIdentity>) {
        let registry = Arc::new(AdapterRegistry::new());
        registry.register(adapter).expect("register");
        let guard = Arc::new(
            Guard::new(vec![
                ClientIdentity::new("cursor", "Cursor", "cursor-token")
                    .with_allowed_adapters(["filesystem"])
                    .with_rate_limit(RateLimitPolicy::per_minute(100)),
                ClientIdentity::new("cli", "CLI", "cli-token"),
            ])
            .expect("guard"),
        );
        let cli = guard.identity("cli").expect("cli");
        (
            Dispatcher::new(registry, guard, Duration::from_secs(1)),
            cli,
        )
    }

    fn request(identity: Arc<ClientIdentity>, adapter: &str, arguments: Value) -> RequestEnvelope {
        RequestEnvelope::new(identity, adapter, "run", arguments, Some("c1".to_owned()))
    }

    #[tokio::test]
    async fn success_echoes_result_and_id() {
        let adapter = spy("memory", Behavior::Echo);
        let (dispatcher, cli) = setup(Arc::clone(&adapter));
        let resp = dispatcher
            .dispatch(request(cli, "memory", json!({ "project": "p" })))
            .await;
        assert_eq!(resp.correlation_id, "c1");
        assert_eq!(resp.result(), Some(&json!({ "project": "p" })));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disallowed_adapter_is_never_invoked() {
        let adapter = spy("github", Behavior::Echo);
        let (dispatcher, _) = setup(Arc::clone(&adapter));
        let cursor = dispatcher.guard().identity("cursor").expect("cursor");
        let resp = dispatcher
            .dispatch(request(cursor, "github", json!({ "project": "p" })))
            .await;
        assert_eq!(resp.error().expect("error").kind, ErrorKind::PermissionDenied);
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn schema_rejection_skips_invocation() {
        let adapter = spy("memory", Behavior::Echo);
        let (dispatcher, cli) = setup(Arc::clone(&adapter));
        let resp = dispatcher.dispatch(request(cli, "memory", json!({}))).await;
        let err = resp.error().expect("error");
        assert_eq!(err.kind, ErrorKind::InvalidArguments);
        assert!(err.message.contains("project"));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_adapter_and_operation() {
        let (dispatcher, cli) = setup(spy("memory", Behavior::Echo));
        let resp = dispatcher
            .dispatch(request(Arc::clone(&cli), "github", json!({})))
            .await;
        assert_eq!(resp.error().expect("error").kind, ErrorKind::AdapterNotFound);

        let env = RequestEnvelope::new(cli, "memory", "nope", json!({}), None);
        let resp = dispatcher.dispatch(env).await;
        assert_eq!(resp.error().expect("error").kind, ErrorKind::OperationNotFound);
    }

    #[tokio::test]
    async fn panicking_adapter_still_yields_response() {
        let (dispatcher, cli) = setup(spy("memory", Behavior::Panic));
        let resp = dispatcher
            .dispatch(request(cli, "memory", json!({ "project": "p" })))
            .await;
        assert_eq!(resp.correlation_id, "c1");
        assert_eq!(resp.error().expect("error").kind, ErrorKind::AdapterExecution);
    }

    // catch_unwind is a no-op when the shipped profile aborts on panic
    #[test]
    fn release_profile_keeps_unwinding() {
        let manifest = include_str!("../Cargo.toml");
        let release = manifest
            .split("[profile.release]")
            .nth(1)
            .expect("release profile");
        let section = release.split("\n[").next().unwrap_or(release);
        let aborts = section
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").replace(' ', ""))
            .any(|line| line == "panic=\"abort\"");
        assert!(!aborts, "release profile must not abort on panic");
    }

    #[tokio::test]
    async fn adapter_error_is_sanitized() {
        let failure = AdapterError::execution(
            "open failed for /home/ops/secret/db.sqlite\nstack trace line",
        );
        let (dispatcher, cli) = setup(spy("memory", Behavior::Fail(failure)));
        let resp = dispatcher
            .dispatch(request(cli, "memory", json!({ "project": "p" })))
            .await;
        let err = resp.error().expect("error");
        assert_eq!(err.kind, ErrorKind::AdapterExecution);
        assert!(!err.message.contains("/home/ops"));
        assert!(!err.message.contains("stack trace"));
        assert!(err.message.contains(REDACTED_PATH));
    }

    #[tokio::test]
    async fn adapter_validation_maps_to_invalid_arguments() {
        let failure = AdapterError::validation("limit must be positive");
        let (dispatcher, cli) = setup(spy("memory", Behavior::Fail(failure)));
        let resp = dispatcher
            .dispatch(request(cli, "memory", json!({ "project": "p" })))
            .await;
        assert_eq!(resp.error().expect("error").kind, ErrorKind::InvalidArguments);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_adapter_times_out() {
        let (dispatcher, cli) = setup(spy("memory", Behavior::Sleep(Duration::from_secs(30))));
        let resp = dispatcher
            .dispatch(request(cli, "memory", json!({ "project": "p" })))
            .await;
        let err = resp.error().expect("error");
        assert_eq!(err.kind, ErrorKind::AdapterTimeout);
        assert!(err.kind.is_retryable());
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "x".repeat(1000);
        let cleaned = sanitize_message(&long);
        assert_eq!(cleaned.chars().count(), MAX_ERROR_MESSAGE_CHARS + 3);
    }

    #[test]
    fn sanitize_redacts_windows_paths() {
        let cleaned = sanitize_message(r"cannot open C:\Users\ops\key.pem");
        assert_eq!(cleaned, "cannot open <path>");
    }
}
