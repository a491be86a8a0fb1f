//! Wire codec between [`crate::types`] domain values and generated
//! `proto::*` messages (spec S4.3).
//!
//! Conversions into proto are infallible (`From`); conversions out of proto
//! are `TryFrom` only where the wire value can be structurally invalid
//! (unknown enum tag aside, which per spec S4.3/S9 decodes permissively
//! rather than failing).

use crate::error::CoreError;
use crate::proto;
use crate::types::{
    ActiveClient, ActiveClientSnapshot, InstanceState, InstanceStatus, LogEntry, LogLevel,
    PoolMetrics, PoolStats, PromptEntry, PromptSnapshot, ResourceEntry, ResourceSnapshot,
    RuntimeStatusSnapshot, ServerInitState, ServerInitStatusSnapshot, Timestamp, ToolEntry,
    ToolSnapshot,
};

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

impl From<ToolEntry> for proto::ToolEntry {
    fn from(entry: ToolEntry) -> Self {
        proto::ToolEntry {
            name: entry.name,
            tool_json: entry.tool_json,
        }
    }
}

impl From<ToolSnapshot> for proto::ToolsSnapshot {
    fn from(snapshot: ToolSnapshot) -> Self {
        proto::ToolsSnapshot {
            etag: snapshot.etag,
            tools: snapshot.tools.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

impl From<ResourceEntry> for proto::ResourceEntry {
    fn from(entry: ResourceEntry) -> Self {
        proto::ResourceEntry {
            uri: entry.uri,
            resource_json: entry.resource_json,
        }
    }
}

impl From<ResourceSnapshot> for proto::ResourcesSnapshot {
    fn from(snapshot: ResourceSnapshot) -> Self {
        proto::ResourcesSnapshot {
            etag: snapshot.etag,
            resources: snapshot.resources.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

impl From<PromptEntry> for proto::PromptEntry {
    fn from(entry: PromptEntry) -> Self {
        proto::PromptEntry {
            name: entry.name,
            prompt_json: entry.prompt_json,
        }
    }
}

impl From<PromptSnapshot> for proto::PromptsSnapshot {
    fn from(snapshot: PromptSnapshot) -> Self {
        proto::PromptsSnapshot {
            etag: snapshot.etag,
            prompts: snapshot.prompts.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Active clients
// ---------------------------------------------------------------------------

impl From<ActiveClient> for proto::ActiveClientEntry {
    fn from(client: ActiveClient) -> Self {
        proto::ActiveClientEntry {
            client: client.client,
            pid: i64::from(client.pid),
            tags: client.tags,
            server: client.server.unwrap_or_default(),
            last_heartbeat_unix_nano: client.last_heartbeat.as_unix_nanos(),
        }
    }
}

impl From<ActiveClientSnapshot> for proto::ActiveClientsSnapshot {
    fn from(snapshot: ActiveClientSnapshot) -> Self {
        proto::ActiveClientsSnapshot {
            etag: snapshot.etag,
            clients: snapshot.clients.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Instance / pool status
// ---------------------------------------------------------------------------

impl From<InstanceState> for proto::InstanceState {
    fn from(state: InstanceState) -> Self {
        match state {
            InstanceState::Starting => proto::InstanceState::Starting,
            InstanceState::Initializing => proto::InstanceState::Initializing,
            InstanceState::Handshaking => proto::InstanceState::Handshaking,
            InstanceState::Ready => proto::InstanceState::Ready,
            InstanceState::Draining => proto::InstanceState::Draining,
            InstanceState::Failed => proto::InstanceState::Failed,
        }
    }
}

impl From<InstanceStatus> for proto::InstanceStatus {
    fn from(status: InstanceStatus) -> Self {
        proto::InstanceStatus {
            id: status.id,
            state: proto::InstanceState::from(status.state) as i32,
            busy_count: status.busy_count,
            spawned_at_unix_nano: status.spawned_at.as_unix_nanos(),
            handshake_at_unix_nano: status.handshake_at.as_unix_nanos(),
            heartbeat_at_unix_nano: status.heartbeat_at.as_unix_nanos(),
            last_active_unix_nano: status.last_active_at.as_unix_nanos(),
        }
    }
}

impl From<PoolStats> for proto::PoolStats {
    fn from(stats: PoolStats) -> Self {
        proto::PoolStats {
            total: stats.total,
            ready: stats.ready,
            busy: stats.busy,
            starting: stats.starting,
            initializing: stats.initializing,
            handshaking: stats.handshaking,
            draining: stats.draining,
            failed: stats.failed,
        }
    }
}

impl From<PoolMetrics> for proto::PoolMetrics {
    fn from(metrics: PoolMetrics) -> Self {
        proto::PoolMetrics {
            start_count: metrics.start_count,
            stop_count: metrics.stop_count,
            total_calls: metrics.total_calls,
            total_errors: metrics.total_errors,
            aggregate_duration_nanos: metrics.aggregate_duration_nanos,
            last_call_unix_nano: metrics.last_call_at.as_unix_nanos(),
        }
    }
}

impl From<RuntimeStatusSnapshot> for proto::RuntimeStatusSnapshot {
    fn from(snapshot: RuntimeStatusSnapshot) -> Self {
        proto::RuntimeStatusSnapshot {
            etag: snapshot.etag,
            statuses: snapshot.statuses.into_iter().map(Into::into).collect(),
            pool_stats: Some(snapshot.pool_stats.into()),
            pool_metrics: Some(snapshot.pool_metrics.into()),
            generated_at_unix_nano: snapshot.generated_at.as_unix_nanos(),
        }
    }
}

impl From<ServerInitState> for proto::ServerInitState {
    fn from(state: ServerInitState) -> Self {
        match state {
            ServerInitState::Pending => proto::ServerInitState::Pending,
            ServerInitState::InProgress => proto::ServerInitState::InProgress,
            ServerInitState::Ready => proto::ServerInitState::Ready,
            ServerInitState::Failed => proto::ServerInitState::Failed,
        }
    }
}

impl From<ServerInitStatusSnapshot> for proto::ServerInitStatusSnapshot {
    fn from(snapshot: ServerInitStatusSnapshot) -> Self {
        proto::ServerInitStatusSnapshot {
            min_ready: snapshot.min_ready,
            ready_count: snapshot.ready_count,
            failed_count: snapshot.failed_count,
            state: proto::ServerInitState::from(snapshot.state) as i32,
            last_error: snapshot.last_error,
            updated_at_unix_nano: snapshot.updated_at.as_unix_nanos(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

impl From<LogLevel> for proto::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => proto::LogLevel::Debug,
            LogLevel::Info => proto::LogLevel::Info,
            LogLevel::Notice => proto::LogLevel::Notice,
            LogLevel::Warning => proto::LogLevel::Warning,
            LogLevel::Error => proto::LogLevel::Error,
            LogLevel::Critical => proto::LogLevel::Critical,
            LogLevel::Alert => proto::LogLevel::Alert,
            LogLevel::Emergency => proto::LogLevel::Emergency,
        }
    }
}

/// Decode a wire `LogLevel` permissively (spec S4.3, S9): `UNSPECIFIED`
/// means "no minimum filter requested" and is treated as `Info`; any tag
/// outside the known range (which `prost` surfaces as the raw `i32` failing
/// to map to an enum variant) is treated as the most verbose level,
/// `Debug`, so a StreamLogs filter never silently drops records it can't
/// classify.
#[must_use]
pub fn log_level_from_wire(raw: i32) -> LogLevel {
    match proto::LogLevel::try_from(raw) {
        Ok(proto::LogLevel::Unspecified | proto::LogLevel::Info) => LogLevel::Info,
        Ok(proto::LogLevel::Debug) => LogLevel::Debug,
        Ok(proto::LogLevel::Notice) => LogLevel::Notice,
        Ok(proto::LogLevel::Warning) => LogLevel::Warning,
        Ok(proto::LogLevel::Error) => LogLevel::Error,
        Ok(proto::LogLevel::Critical) => LogLevel::Critical,
        Ok(proto::LogLevel::Alert) => LogLevel::Alert,
        Ok(proto::LogLevel::Emergency) => LogLevel::Emergency,
        Err(_) => LogLevel::Debug,
    }
}

impl From<LogEntry> for proto::LogEntry {
    fn from(entry: LogEntry) -> Self {
        proto::LogEntry {
            logger: entry.logger,
            level: proto::LogLevel::from(entry.level) as i32,
            timestamp_unix_nano: entry.timestamp.as_unix_nanos(),
            data_json: entry.data_json,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests (proto -> domain)
// ---------------------------------------------------------------------------

/// Default a tool's inner JSON `name` field to its entry key when absent, per
/// spec S4.3's "tool_json inner name defaults from the entry key" rule.
pub fn ensure_tool_json_name(name: &str, tool_json: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut value: serde_json::Value = serde_json::from_slice(tool_json)?;
    if let serde_json::Value::Object(map) = &mut value {
        let has_name = map
            .get("name")
            .is_some_and(|v| v.as_str().is_some_and(|s| !s.is_empty()));
        if !has_name {
            map.insert("name".into(), serde_json::Value::String(name.to_string()));
        }
    }
    Ok(serde_json::to_vec(&value)?)
}

/// Parse a `WatchRequest`'s `last_etag` field into `None` when empty (spec
/// S4.6: an empty etag means "no incremental baseline, send the current
/// snapshot first").
#[must_use]
pub fn last_etag(raw: &str) -> Option<&str> {
    if raw.is_empty() { None } else { Some(raw) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_snapshot_round_trips_fields() {
        let snapshot = ToolSnapshot {
            etag: "v1".into(),
            tools: vec![ToolEntry {
                name: "echo".into(),
                tool_json: br#"{"name":"echo"}"#.to_vec(),
            }],
        };
        let wire: proto::ToolsSnapshot = snapshot.into();
        assert_eq!(wire.etag, "v1");
        assert_eq!(wire.tools[0].name, "echo");
    }

    #[test]
    fn ensure_tool_json_name_defaults_when_missing() {
        let out = ensure_tool_json_name("echo.echo", br#"{"description":"d"}"#).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["name"], "echo.echo");
    }

    #[test]
    fn ensure_tool_json_name_preserves_existing() {
        let out = ensure_tool_json_name("echo.echo", br#"{"name":"explicit"}"#).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["name"], "explicit");
    }

    #[test]
    fn log_level_unspecified_decodes_to_info() {
        assert_eq!(
            log_level_from_wire(proto::LogLevel::Unspecified as i32),
            LogLevel::Info
        );
    }

    #[test]
    fn log_level_unknown_tag_decodes_to_debug() {
        assert_eq!(log_level_from_wire(99), LogLevel::Debug);
    }

    #[test]
    fn last_etag_empty_is_none() {
        assert_eq!(last_etag(""), None);
        assert_eq!(last_etag("v2"), Some("v2"));
    }

    #[test]
    fn zero_timestamp_round_trips_as_sentinel() {
        let ts = Timestamp::from_unix_nanos(0);
        assert!(ts.is_zero());
        assert_eq!(ts.as_unix_nanos(), 0);
    }
}
