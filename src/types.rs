//! Domain data model shared by the facade, governance guard, and wire codec
//! (spec S3).

use std::time::SystemTime;

/// Logical identity of an external consumer (spec S3 "Caller").
///
/// A caller is created on successful `RegisterCaller`, refreshed by every
/// subsequent RPC it makes, and destroyed by `UnregisterCaller` or by
/// heartbeat expiry in the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Free-form caller name; the table key.
    pub name: String,
    /// OS process identifier of the caller.
    pub pid: u32,
    /// Tags, mutually exclusive with `server`.
    pub tags: Vec<String>,
    /// Server affinity, mutually exclusive with `tags`.
    pub server: Option<String>,
}

impl Caller {
    /// Validate the mutual-exclusion invariant between `tags` and `server`
    /// (spec S4.7 `RegisterCaller`).
    pub fn validate(&self) -> Result<(), String> {
        if self.server.is_some() && !self.tags.is_empty() {
            return Err("server and tags are mutually exclusive".into());
        }
        Ok(())
    }
}

/// An active client entry as surfaced by `ListActiveClients` / `WatchActiveClients`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveClient {
    /// See [`Caller::name`].
    pub client: String,
    /// See [`Caller::pid`].
    pub pid: u32,
    /// See [`Caller::tags`].
    pub tags: Vec<String>,
    /// See [`Caller::server`].
    pub server: Option<String>,
    /// Timestamp of the caller's most recent heartbeat.
    pub last_heartbeat: Timestamp,
}

/// A nanosecond-resolution instant that serializes as signed i64 nanoseconds
/// since the Unix epoch, with `0` as the zero sentinel (spec S4.3, S9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The zero sentinel instant.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Build a timestamp from raw nanoseconds-since-epoch. Values `<= 0`
    /// collapse to the zero sentinel, per spec S4.3.
    #[must_use]
    pub fn from_unix_nanos(nanos: i64) -> Self {
        if nanos <= 0 { Self::ZERO } else { Self(nanos) }
    }

    /// The raw nanoseconds-since-epoch value; `0` for the zero sentinel.
    #[must_use]
    pub fn as_unix_nanos(self) -> i64 {
        self.0
    }

    /// `true` if this is the zero sentinel.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Capture the current time.
    #[must_use]
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        Self::from_unix_nanos(nanos)
    }
}

/// Opaque version token attached to a snapshot (spec S3, GLOSSARY "ETag").
pub type ETag = String;

/// An already-encoded tool definition, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEntry {
    /// Tool name (also enforced as the inner JSON's `name` when empty).
    pub name: String,
    /// Pre-encoded MCP tool definition (opaque JSON).
    pub tool_json: Vec<u8>,
}

/// Immutable, versioned view of the tool collection (spec S3 "Snapshot").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSnapshot {
    /// Version token for this snapshot.
    pub etag: ETag,
    /// Ordered tool entries.
    pub tools: Vec<ToolEntry>,
}

/// An already-encoded resource definition, keyed by URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Resource URI.
    pub uri: String,
    /// Pre-encoded MCP resource definition (opaque JSON).
    pub resource_json: Vec<u8>,
}

/// Immutable, versioned view of the resource collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSnapshot {
    /// Version token for this snapshot.
    pub etag: ETag,
    /// Ordered resource entries.
    pub resources: Vec<ResourceEntry>,
}

/// An already-encoded prompt definition, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptEntry {
    /// Prompt name.
    pub name: String,
    /// Pre-encoded MCP prompt definition (opaque JSON).
    pub prompt_json: Vec<u8>,
}

/// Immutable, versioned view of the prompt collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSnapshot {
    /// Version token for this snapshot.
    pub etag: ETag,
    /// Ordered prompt entries.
    pub prompts: Vec<PromptEntry>,
}

/// Immutable, versioned view of the active-client table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveClientSnapshot {
    /// Version token for this snapshot.
    pub etag: ETag,
    /// Active clients, in registration order.
    pub clients: Vec<ActiveClient>,
}

/// Lifecycle state of a single upstream MCP server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Instance has been requested but the process has not yet spawned.
    Starting,
    /// Process has spawned; performing MCP initialization.
    Initializing,
    /// Performing the MCP handshake.
    Handshaking,
    /// Ready to accept calls.
    Ready,
    /// Being gracefully retired.
    Draining,
    /// Failed and will not recover without intervention.
    Failed,
}

/// Per-instance runtime status row (spec S3 "Runtime status").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceStatus {
    /// Opaque instance identifier.
    pub id: String,
    /// Current lifecycle state.
    pub state: InstanceState,
    /// Number of calls currently in flight on this instance.
    pub busy_count: u32,
    /// When the instance process was spawned.
    pub spawned_at: Timestamp,
    /// When the MCP handshake completed.
    pub handshake_at: Timestamp,
    /// Last heartbeat observed.
    pub heartbeat_at: Timestamp,
    /// Last time the instance serviced a call.
    pub last_active_at: Timestamp,
}

/// Aggregated instance-state counts across a server's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Total instances tracked.
    pub total: u32,
    /// Instances in `Ready` state.
    pub ready: u32,
    /// Instances currently servicing at least one call.
    pub busy: u32,
    /// Instances in `Starting` state.
    pub starting: u32,
    /// Instances in `Initializing` state.
    pub initializing: u32,
    /// Instances in `Handshaking` state.
    pub handshaking: u32,
    /// Instances in `Draining` state.
    pub draining: u32,
    /// Instances in `Failed` state.
    pub failed: u32,
}

/// Cumulative pool metrics since process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolMetrics {
    /// Number of instance starts.
    pub start_count: u64,
    /// Number of instance stops.
    pub stop_count: u64,
    /// Total calls serviced.
    pub total_calls: u64,
    /// Total calls that ended in error.
    pub total_errors: u64,
    /// Sum of call durations, in nanoseconds.
    pub aggregate_duration_nanos: i64,
    /// Time of the most recent call.
    pub last_call_at: Timestamp,
}

/// Per-spec runtime status snapshot (spec S3 "Runtime status").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStatusSnapshot {
    /// Version token for this snapshot.
    pub etag: ETag,
    /// Per-instance status rows.
    pub statuses: Vec<InstanceStatus>,
    /// Aggregated pool stats.
    pub pool_stats: PoolStats,
    /// Cumulative pool metrics.
    pub pool_metrics: PoolMetrics,
    /// When this snapshot was generated.
    pub generated_at: Timestamp,
}

/// Bootstrap state of a server's minimum-ready pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerInitState {
    /// Bootstrap has not started.
    Pending,
    /// Bootstrap is in progress.
    InProgress,
    /// Minimum-ready target has been reached.
    Ready,
    /// Bootstrap failed.
    Failed,
}

/// Server-init status snapshot (spec S3 "Server-init status"). Unlike other
/// snapshots this carries no ETag — server-init updates are always
/// delivered (spec S4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInitStatusSnapshot {
    /// Minimum-ready target for this server.
    pub min_ready: i32,
    /// Number of instances currently ready.
    pub ready_count: i32,
    /// Number of instances that failed to become ready.
    pub failed_count: i32,
    /// Current bootstrap state.
    pub state: ServerInitState,
    /// Last error observed, if any (empty string when none).
    pub last_error: String,
    /// When this status was last updated.
    pub updated_at: Timestamp,
}

/// Log severity levels (spec S4.3). `Unspecified` decodes to `Info` inbound
/// (spec S4.3, S9); any unrecognized wire value decodes to `Debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Most verbose.
    Debug,
    /// Default operational level.
    Info,
    /// Normal but significant condition.
    Notice,
    /// Potentially harmful situation.
    Warning,
    /// Error condition.
    Error,
    /// Critical condition.
    Critical,
    /// Action must be taken immediately.
    Alert,
    /// System is unusable.
    Emergency,
}

/// A single log record delivered via `StreamLogs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Name of the logger that emitted this record.
    pub logger: String,
    /// Severity.
    pub level: LogLevel,
    /// When the record was emitted.
    pub timestamp: Timestamp,
    /// Structured payload, encoded as UTF-8 JSON object bytes.
    pub data_json: Vec<u8>,
}

/// Structured request/response description passed to governance plugins
/// (spec S3 "Governance envelope").
#[derive(Debug, Clone, Default)]
pub struct GovernanceEnvelope {
    /// Method token, e.g. `"tools/call"`, `"resources/read"`.
    pub method: String,
    /// The caller making the request.
    pub caller: String,
    /// Tool, prompt, or resource identifier, if the method names one.
    pub identifier: Option<String>,
    /// Optional routing key (spec S3, S4.7 `CallTool`).
    pub routing_key: Option<String>,
    /// Request-phase JSON body.
    pub request_json: Option<Vec<u8>>,
    /// Response-phase JSON body, set only on the response leg.
    pub response_json: Option<Vec<u8>>,
    /// Metadata propagated alongside the envelope; always carries
    /// `request-id` when available from telemetry context.
    pub metadata: std::collections::BTreeMap<String, String>,
}

/// Why a governance decision rejected a request (spec S3 "Governance decision").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
    /// Caller identity could not be established.
    Unauthenticated,
    /// Caller identity is known but not permitted.
    Unauthorized,
    /// Caller has exceeded an admission quota.
    RateLimited,
    /// The request itself is malformed from the governance plugin's view.
    InvalidRequest,
    /// Any other rejection reason.
    Other,
}

/// Outcome of a governance check (spec S3 "Governance decision", S9).
#[derive(Debug, Clone)]
pub enum GovernanceDecision {
    /// Allow the call to proceed unmodified.
    Continue,
    /// Allow the call to proceed with a mutated request body.
    MutateRequest {
        /// Replacement request JSON.
        request_json: Vec<u8>,
    },
    /// Allow the response to proceed with a mutated response body.
    MutateResponse {
        /// Replacement response JSON.
        response_json: Vec<u8>,
    },
    /// Deny the call.
    Reject {
        /// Wire-level rejection classification.
        code: RejectCode,
        /// Human-readable rejection reason.
        message: String,
        /// Policy category that produced the rejection, if any.
        category: Option<String>,
        /// Name of the plugin that produced the rejection, if any.
        plugin_name: Option<String>,
    },
}

impl GovernanceDecision {
    /// `true` for [`GovernanceDecision::Reject`].
    #[must_use]
    pub fn is_reject(&self) -> bool {
        matches!(self, GovernanceDecision::Reject { .. })
    }
}
