//! Governance interception pipeline (spec S4.5, S9).
//!
//! A [`GovernanceExecutor`] is consulted twice per guarded RPC: once before
//! the call reaches the collaborator (`before`) and once after a successful
//! result comes back (`after`). Unlike `turbomcp-server`'s `AuthzLayer`
//! (a Tower middleware wrapping the whole service), the guard here is a
//! plain async-trait object invoked explicitly by
//! [`crate::facade::ControlPlaneFacade`] around each handler body — spec S9
//! calls for "a struct with two operations, not a subclass hierarchy",
//! and an explicit call site makes the per-RPC envelope construction
//! (method, caller, identifier, routing key) visible at the point that
//! needs it instead of threaded through request extensions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::{GovernanceDecision, GovernanceEnvelope, RejectCode};

/// Governance plugin chain entry point (spec S3 "Governance executor").
#[async_trait]
pub trait GovernanceExecutor: Send + Sync {
    /// Evaluate a request before it reaches the collaborator.
    ///
    /// `envelope.response_json` is always `None` on this call.
    async fn before(&self, envelope: &GovernanceEnvelope) -> GovernanceDecision;

    /// Evaluate a response after the collaborator has produced one.
    ///
    /// `envelope.response_json` is always `Some` on this call;
    /// `envelope.request_json` carries the (possibly mutated) request that
    /// produced it.
    async fn after(&self, envelope: &GovernanceEnvelope) -> GovernanceDecision;
}

/// A [`GovernanceExecutor`] that allows every request unmodified. The
/// default when no plugins are configured (spec S4.5: "no governance
/// plugins configured behaves as if governance always continues").
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGovernance;

#[async_trait]
impl GovernanceExecutor for NoopGovernance {
    async fn before(&self, _envelope: &GovernanceEnvelope) -> GovernanceDecision {
        GovernanceDecision::Continue
    }

    async fn after(&self, _envelope: &GovernanceEnvelope) -> GovernanceDecision {
        GovernanceDecision::Continue
    }
}

/// Convert a [`GovernanceDecision::Reject`] into the wire error it renders
/// as (spec S4.5: rejections surface as `"governance rejected by
/// <category>[/<plugin>]: <message>"`, with the `by ...` segment omitted
/// entirely when no category is present).
fn reject_to_error(
    code: RejectCode,
    message: String,
    category: Option<String>,
    plugin_name: Option<String>,
) -> CoreError {
    let full = match category {
        Some(category) => match plugin_name {
            Some(plugin) => format!("governance rejected by {category}/{plugin}: {message}"),
            None => format!("governance rejected by {category}: {message}"),
        },
        None => format!("governance rejected: {message}"),
    };
    match code {
        RejectCode::Unauthenticated => CoreError::Unauthenticated(full),
        RejectCode::Unauthorized => CoreError::PermissionDenied(full),
        RejectCode::RateLimited => CoreError::ResourceExhausted(full),
        RejectCode::InvalidRequest => CoreError::InvalidArgument(full),
        RejectCode::Other => CoreError::FailedPrecondition(full),
    }
}

/// Apply a request-phase governance decision, returning the (possibly
/// mutated) request JSON to forward to the collaborator, or an error if the
/// request was rejected (spec S4.5 request-phase guard).
pub fn apply_before(
    envelope: &GovernanceEnvelope,
    decision: GovernanceDecision,
) -> Result<Option<Vec<u8>>, CoreError> {
    match decision {
        GovernanceDecision::Continue => Ok(envelope.request_json.clone()),
        GovernanceDecision::MutateRequest { request_json } => Ok(Some(request_json)),
        GovernanceDecision::MutateResponse { .. } => Err(CoreError::Internal(
            "governance: before() returned a response mutation".into(),
        )),
        GovernanceDecision::Reject {
            code,
            message,
            category,
            plugin_name,
        } => Err(reject_to_error(code, message, category, plugin_name)),
    }
}

/// Apply a response-phase governance decision, returning the (possibly
/// mutated) response JSON to return to the caller, or an error if the
/// response was rejected (spec S4.5 response-phase guard).
pub fn apply_after(
    envelope: &GovernanceEnvelope,
    decision: GovernanceDecision,
) -> Result<Vec<u8>, CoreError> {
    match decision {
        GovernanceDecision::Continue => Ok(envelope
            .response_json
            .clone()
            .unwrap_or_default()),
        GovernanceDecision::MutateResponse { response_json } => Ok(response_json),
        GovernanceDecision::MutateRequest { .. } => Err(CoreError::Internal(
            "governance: after() returned a request mutation".into(),
        )),
        GovernanceDecision::Reject {
            code,
            message,
            category,
            plugin_name,
        } => Err(reject_to_error(code, message, category, plugin_name)),
    }
}

/// Run both phases of the guard around a collaborator call.
///
/// `call` receives the request JSON (after any `before` mutation) and
/// returns the raw response JSON; `after` governance then runs over that
/// response before it is handed back to the caller.
pub async fn guard_call<F, Fut>(
    executor: &Arc<dyn GovernanceExecutor>,
    mut envelope: GovernanceEnvelope,
    call: F,
) -> Result<Vec<u8>, CoreError>
where
    F: FnOnce(Option<Vec<u8>>) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<u8>, CoreError>>,
{
    let before_decision = executor.before(&envelope).await;
    let request_json = apply_before(&envelope, before_decision)?;

    let response_json = call(request_json.clone()).await?;

    envelope.request_json = request_json;
    envelope.response_json = Some(response_json);
    let after_decision = executor.after(&envelope).await;
    apply_after(&envelope, after_decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> GovernanceEnvelope {
        GovernanceEnvelope {
            method: "tools/call".into(),
            caller: "claude-desktop".into(),
            identifier: Some("echo.echo".into()),
            routing_key: None,
            request_json: Some(br#"{"a":1}"#.to_vec()),
            response_json: None,
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn noop_governance_continues_both_phases() {
        let g = NoopGovernance;
        assert!(matches!(
            g.before(&envelope()).await,
            GovernanceDecision::Continue
        ));
        let mut env = envelope();
        env.response_json = Some(br#"{"ok":true}"#.to_vec());
        assert!(matches!(
            g.after(&env).await,
            GovernanceDecision::Continue
        ));
    }

    #[test]
    fn apply_before_continue_forwards_request_json() {
        let env = envelope();
        let out = apply_before(&env, GovernanceDecision::Continue).unwrap();
        assert_eq!(out, env.request_json);
    }

    #[test]
    fn apply_before_reject_maps_category_and_plugin_into_message() {
        let env = envelope();
        let err = apply_before(
            &env,
            GovernanceDecision::Reject {
                code: RejectCode::Unauthorized,
                message: "denied".into(),
                category: Some("pii".into()),
                plugin_name: Some("redactor".into()),
            },
        )
        .unwrap_err();
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);
        assert_eq!(status.message(), "governance rejected by pii/redactor: denied");
    }

    #[tokio::test]
    async fn guard_call_runs_before_then_call_then_after() {
        let executor: Arc<dyn GovernanceExecutor> = Arc::new(NoopGovernance);
        let env = envelope();
        let out = guard_call(&executor, env, |req| async move {
            assert_eq!(req, Some(br#"{"a":1}"#.to_vec()));
            Ok(br#"{"result":"ok"}"#.to_vec())
        })
        .await
        .unwrap();
        assert_eq!(out, br#"{"result":"ok"}"#.to_vec());
    }

    struct RejectEverything;

    #[async_trait]
    impl GovernanceExecutor for RejectEverything {
        async fn before(&self, _: &GovernanceEnvelope) -> GovernanceDecision {
            GovernanceDecision::Reject {
                code: RejectCode::RateLimited,
                message: "too many calls".into(),
                category: None,
                plugin_name: None,
            }
        }
        async fn after(&self, _: &GovernanceEnvelope) -> GovernanceDecision {
            GovernanceDecision::Continue
        }
    }

    #[tokio::test]
    async fn guard_call_short_circuits_on_before_rejection() {
        let executor: Arc<dyn GovernanceExecutor> = Arc::new(RejectEverything);
        let env = envelope();
        let err = guard_call(&executor, env, |_| async move {
            panic!("collaborator should not be called");
        })
        .await
        .unwrap_err();
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::ResourceExhausted);
    }
}
