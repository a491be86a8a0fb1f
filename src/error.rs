//! Error taxonomy for the control-plane core.
//!
//! Maps domain error kinds to gRPC status codes and back, per the
//! propagation policy of spec S7. Every public operation returns
//! [`CoreResult`]; [`CoreError`] carries enough structure for
//! [`crate::facade::ControlPlaneFacade`] to render a wire status whose
//! message is always prefixed with the operation label.

use thiserror::Error;
use tonic::Status;

/// Result type for control-plane operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Domain error kinds recognized by the core (spec S7).
///
/// This is a taxonomy, not a type hierarchy: every variant maps to exactly
/// one gRPC status code family via [`CoreError::into_status`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or missing request field.
    #[error("{0}")]
    InvalidArgument(String),

    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Transient capacity or busy condition; retry may succeed.
    #[error("{0}")]
    Unavailable(String),

    /// Precondition not met (e.g. caller not registered).
    #[error("{0}")]
    FailedPrecondition(String),

    /// Governance denied the request as unauthorized.
    #[error("{0}")]
    PermissionDenied(String),

    /// Governance denied the request as unauthenticated.
    #[error("{0}")]
    Unauthenticated(String),

    /// Governance rate-limited the request.
    #[error("{0}")]
    ResourceExhausted(String),

    /// The caller or context cancelled the request.
    #[error("{0}")]
    Canceled(String),

    /// The request exceeded its deadline.
    #[error("{0}")]
    DeadlineExceeded(String),

    /// Operation not implemented by the collaborator.
    #[error("{0}")]
    Unimplemented(String),

    /// A protocol-level signal that more client interaction is required
    /// before the call can proceed. Renders as `FailedPrecondition` with a
    /// distinctive message prefix (spec S7, S9 open question on
    /// elicitation).
    #[error("requires elicitation: {0}")]
    RequiresElicitation(String),

    /// Anything else; always carries the failing operation as a prefix.
    #[error("{0}")]
    Internal(String),
}

impl CoreError {
    /// Prefix a message with the operation label, per spec S7's
    /// "every wire status carries a human-readable message prefixed with
    /// the operation label" requirement.
    #[must_use]
    pub fn with_op(self, op: &str) -> Self {
        let prefix = |msg: String| format!("{op}: {msg}");
        match self {
            Self::InvalidArgument(m) => Self::InvalidArgument(prefix(m)),
            Self::NotFound(m) => Self::NotFound(prefix(m)),
            Self::Unavailable(m) => Self::Unavailable(prefix(m)),
            Self::FailedPrecondition(m) => Self::FailedPrecondition(prefix(m)),
            Self::PermissionDenied(m) => Self::PermissionDenied(prefix(m)),
            Self::Unauthenticated(m) => Self::Unauthenticated(prefix(m)),
            Self::ResourceExhausted(m) => Self::ResourceExhausted(prefix(m)),
            Self::Canceled(m) => Self::Canceled(prefix(m)),
            Self::DeadlineExceeded(m) => Self::DeadlineExceeded(prefix(m)),
            Self::Unimplemented(m) => Self::Unimplemented(prefix(m)),
            Self::RequiresElicitation(m) => {
                Self::FailedPrecondition(format!("{op}: requires elicitation: {m}"))
            }
            Self::Internal(m) => Self::Internal(prefix(m)),
        }
    }

    /// `op: <prefix> failed: <message>` for internal defaults (spec S7:
    /// "any other error defaults to Internal with the op name as prefix").
    #[must_use]
    pub fn internal(op: &str, msg: impl std::fmt::Display) -> Self {
        Self::Internal(format!("{op}: {msg}"))
    }
}

impl From<CoreError> for Status {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidArgument(m) => Status::invalid_argument(m),
            CoreError::NotFound(m) => Status::not_found(m),
            CoreError::Unavailable(m) => Status::unavailable(m),
            CoreError::FailedPrecondition(m) => Status::failed_precondition(m),
            CoreError::PermissionDenied(m) => Status::permission_denied(m),
            CoreError::Unauthenticated(m) => Status::unauthenticated(m),
            CoreError::ResourceExhausted(m) => Status::resource_exhausted(m),
            CoreError::Canceled(m) => Status::cancelled(m),
            CoreError::DeadlineExceeded(m) => Status::deadline_exceeded(m),
            CoreError::Unimplemented(m) => Status::unimplemented(m),
            CoreError::RequiresElicitation(m) => {
                Status::failed_precondition(format!("requires elicitation: {m}"))
            }
            CoreError::Internal(m) => Status::internal(m),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<Status> for CoreError {
    /// Reverse direction of [`CoreError`]'s own `Into<Status>`, used by
    /// [`crate::client::ControlPlaneClient`] to surface a remote daemon's
    /// wire status back in domain terms (spec S4.8).
    fn from(status: Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            tonic::Code::InvalidArgument => Self::InvalidArgument(message),
            tonic::Code::NotFound => Self::NotFound(message),
            tonic::Code::Unavailable => Self::Unavailable(message),
            tonic::Code::FailedPrecondition => Self::FailedPrecondition(message),
            tonic::Code::PermissionDenied => Self::PermissionDenied(message),
            tonic::Code::Unauthenticated => Self::Unauthenticated(message),
            tonic::Code::ResourceExhausted => Self::ResourceExhausted(message),
            tonic::Code::Cancelled => Self::Canceled(message),
            tonic::Code::DeadlineExceeded => Self::DeadlineExceeded(message),
            tonic::Code::Unimplemented => Self::Unimplemented(message),
            _ => Self::Internal(message),
        }
    }
}

/// Scheduler-layer errors surfaced by a [`crate::collaborator::ControlPlane`]
/// implementation (spec S7 propagation policy).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `spec_key` does not name a configured upstream server.
    #[error("unknown spec key: {0}")]
    UnknownSpecKey(String),
    /// No instance is available to service the call right now.
    #[error("no capacity: {0}")]
    NoCapacity(String),
    /// The only eligible instance is sticky-bound and busy.
    #[error("sticky busy: {0}")]
    StickyBusy(String),
    /// The collaborator does not implement this operation.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// The caller named in the request is not registered.
    #[error("client not registered: {0}")]
    ClientNotRegistered(String),
}

impl From<SchedulerError> for CoreError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::UnknownSpecKey(m) => CoreError::InvalidArgument(m),
            SchedulerError::NoCapacity(m) | SchedulerError::StickyBusy(m) => {
                CoreError::Unavailable(m)
            }
            SchedulerError::NotImplemented(m) => CoreError::Unimplemented(m),
            SchedulerError::ClientNotRegistered(m) => {
                CoreError::FailedPrecondition(format!("client not registered: {m}"))
            }
        }
    }
}

/// Errors surfaced by a [`crate::collaborator::CatalogEditor`] implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EditorError {
    /// Message describing the failure.
    pub message: String,
    /// Classifies how the message should be mapped to a wire status.
    pub kind: EditorErrorKind,
}

/// Classification of [`EditorError`] (spec S4.7: editor errors are
/// classified by kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorErrorKind {
    /// The request itself was malformed.
    InvalidRequest,
    /// The request was well-formed but produces an invalid configuration.
    InvalidConfig,
    /// Anything else.
    Other,
}

impl From<EditorError> for CoreError {
    fn from(err: EditorError) -> Self {
        match err.kind {
            EditorErrorKind::InvalidRequest => CoreError::InvalidArgument(err.message),
            EditorErrorKind::InvalidConfig => CoreError::FailedPrecondition(err.message),
            EditorErrorKind::Other => CoreError::Internal(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_op_prefixes_message() {
        let err = CoreError::InvalidArgument("bad arg".into()).with_op("call tool echo.echo");
        assert_eq!(err.to_string(), "call tool echo.echo: bad arg");
    }

    #[test]
    fn scheduler_no_capacity_maps_to_unavailable() {
        let status: Status = CoreError::from(SchedulerError::NoCapacity("pool full".into())).into();
        assert_eq!(status.code(), tonic::Code::Unavailable);
    }

    #[test]
    fn scheduler_unknown_spec_key_maps_to_invalid_argument() {
        let status: Status =
            CoreError::from(SchedulerError::UnknownSpecKey("x".into())).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn editor_invalid_config_maps_to_failed_precondition() {
        let status: Status = CoreError::from(EditorError {
            message: "bad toml".into(),
            kind: EditorErrorKind::InvalidConfig,
        })
        .into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
    }

    #[test]
    fn status_round_trips_back_to_matching_core_error_kind() {
        let status = Status::unavailable("daemon unreachable");
        let err = CoreError::from(status);
        assert!(matches!(err, CoreError::Unavailable(_)));
    }

    #[test]
    fn requires_elicitation_maps_to_failed_precondition_with_prefix() {
        let status: Status = CoreError::RequiresElicitation("need root confirm".into()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
        assert!(status.message().starts_with("requires elicitation:"));
    }
}
