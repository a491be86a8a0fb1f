//! Collaborator interfaces the core delegates to (spec S4.1, S6).
//!
//! The core never executes a tool, spawns a server process, or edits a
//! configuration file itself; it validates requests, runs them through
//! [`crate::governance`], and forwards the validated call to one of these
//! two traits. Mirrors the `async_trait` handler-trait shape of
//! `turbomcp-grpc`'s `ToolHandler`/`ResourceHandler`/`PromptHandler`, but as
//! two traits instead of three: one for the runtime-facing surface callers
//! invoke, one for the desktop-app-facing surface that edits configuration.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{CoreResult, EditorError, SchedulerError};
use crate::types::{
    ActiveClientSnapshot, Caller, LogEntry, LogLevel, PromptSnapshot, ResourceSnapshot,
    RuntimeStatusSnapshot, ServerInitStatusSnapshot, ToolSnapshot,
};

/// A task handle returned by [`ControlPlane::call_tool_task`].
#[derive(Debug, Clone)]
pub struct TaskHandle {
    /// Opaque task identifier (UUID v4, per spec S4.1).
    pub task_id: String,
    /// Current lifecycle status token, e.g. `"working"`, `"completed"`.
    pub status: String,
    /// Human-readable status detail.
    pub status_message: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-update timestamp.
    pub last_updated_at: String,
    /// Time-to-live in milliseconds.
    pub ttl_ms: i64,
    /// Suggested poll interval in milliseconds.
    pub poll_interval_ms: i64,
}

/// Terminal or in-progress result of a task (spec S4.1).
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Current status token.
    pub status: String,
    /// Result JSON, set once `status` reaches a terminal success state.
    pub result_json: Option<Vec<u8>>,
    /// Error detail, set once `status` reaches a terminal failure state.
    pub error: Option<TaskError>,
}

/// Structured task failure (spec S4.1, mirrors JSON-RPC error shape).
#[derive(Debug, Clone)]
pub struct TaskError {
    /// JSON-RPC-style numeric error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Opaque structured detail.
    pub data_json: Vec<u8>,
}

/// A page of tasks (spec S4.7 `TasksList`).
#[derive(Debug, Clone)]
pub struct TaskPage {
    /// Tasks in this page.
    pub tasks: Vec<TaskHandle>,
    /// Opaque continuation cursor; empty when there is no further page.
    pub cursor: String,
}

/// Runtime-facing collaborator surface (spec S4.1 "ControlPlane").
///
/// Implementations own the caller table, the discovery collections, the
/// instance pools, and task storage; every method here corresponds to one
/// RPC on `proto::ControlPlaneService`. A collaborator that does not
/// support a given operation returns [`SchedulerError::NotImplemented`],
/// the same opt-in-by-stub shape as `turbomcp-grpc`'s
/// `NoOpToolHandler`/`NoOpResourceHandler`.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Free-form daemon identity/version JSON (spec S4.7 `GetInfo`).
    async fn info(&self) -> CoreResult<Vec<u8>>;

    /// Register a caller identity; idempotent on the same `(client, pid)`
    /// pair (spec S4.7 `RegisterCaller`).
    async fn register_caller(&self, caller: Caller) -> Result<String, SchedulerError>;

    /// Remove a caller identity (spec S4.7 `UnregisterCaller`).
    async fn unregister_caller(&self, client: &str) -> Result<(), SchedulerError>;

    /// Current active-client snapshot (spec S4.7 `ListActiveClients`).
    async fn list_active_clients(&self) -> Result<ActiveClientSnapshot, SchedulerError>;

    /// Subscribe to active-client snapshot updates (spec S4.6, S4.7
    /// `WatchActiveClients`).
    async fn watch_active_clients(&self) -> Result<watch::Receiver<ActiveClientSnapshot>, SchedulerError>;

    /// Current tool snapshot (spec S4.7 `ListTools`).
    async fn list_tools(&self) -> Result<ToolSnapshot, SchedulerError>;

    /// Subscribe to tool snapshot updates (spec S4.6, S4.7 `WatchTools`).
    async fn watch_tools(&self) -> Result<watch::Receiver<ToolSnapshot>, SchedulerError>;

    /// Current resource snapshot, optionally paginated from `cursor` (spec
    /// S4.7 `ListResources`).
    async fn list_resources(&self, cursor: &str) -> Result<ResourceSnapshot, SchedulerError>;

    /// Subscribe to resource snapshot updates (spec S4.7 `WatchResources`).
    async fn watch_resources(&self) -> Result<watch::Receiver<ResourceSnapshot>, SchedulerError>;

    /// Read a resource's contents (spec S4.7 `ReadResource`).
    async fn read_resource(&self, uri: &str) -> Result<Vec<u8>, SchedulerError>;

    /// Current prompt snapshot (spec S4.7 `ListPrompts`).
    async fn list_prompts(&self, cursor: &str) -> Result<PromptSnapshot, SchedulerError>;

    /// Subscribe to prompt snapshot updates (spec S4.7 `WatchPrompts`).
    async fn watch_prompts(&self) -> Result<watch::Receiver<PromptSnapshot>, SchedulerError>;

    /// Render a prompt template (spec S4.7 `GetPrompt`).
    async fn get_prompt(&self, name: &str, arguments_json: &[u8]) -> Result<Vec<u8>, SchedulerError>;

    /// Invoke a tool synchronously (spec S4.7 `CallTool`).
    async fn call_tool(
        &self,
        caller: &str,
        name: &str,
        arguments_json: &[u8],
        routing_key: Option<&str>,
    ) -> Result<Vec<u8>, SchedulerError>;

    /// Invoke a tool asynchronously as a task (spec S4.7 `CallToolTask`).
    async fn call_tool_task(
        &self,
        caller: &str,
        name: &str,
        arguments_json: &[u8],
        routing_key: Option<&str>,
        ttl_ms: i64,
    ) -> Result<TaskHandle, SchedulerError>;

    /// Fetch a task's metadata (spec S4.7 `TasksGet`).
    async fn task_get(&self, caller: &str, task_id: &str) -> Result<TaskHandle, SchedulerError>;

    /// List tasks belonging to `caller` (spec S4.7 `TasksList`).
    async fn task_list(&self, caller: &str, cursor: &str, limit: i32) -> Result<TaskPage, SchedulerError>;

    /// Fetch a task's result, possibly still in progress (spec S4.7
    /// `TasksResult`).
    async fn task_result(&self, caller: &str, task_id: &str) -> Result<TaskOutcome, SchedulerError>;

    /// Cancel a task (spec S4.7 `TasksCancel`).
    async fn task_cancel(&self, caller: &str, task_id: &str) -> Result<(), SchedulerError>;

    /// Automated tool-surface reduction for a caller's context budget
    /// (spec S4.7 `AutomaticMCP`).
    async fn automatic_mcp(
        &self,
        caller: &str,
        arguments_json: &[u8],
    ) -> Result<(String, Vec<Vec<u8>>, i32, i32), SchedulerError>;

    /// Fully automated tool-call evaluation loop (spec S4.7
    /// `AutomaticEval`).
    async fn automatic_eval(
        &self,
        caller: &str,
        arguments_json: &[u8],
    ) -> Result<Vec<u8>, SchedulerError>;

    /// Subscribe to the structured log stream at or above `min_level`
    /// (spec S4.7 `StreamLogs`).
    async fn stream_logs(
        &self,
        min_level: LogLevel,
    ) -> Result<tokio::sync::mpsc::Receiver<LogEntry>, SchedulerError>;

    /// Subscribe to runtime status snapshot updates (spec S4.7
    /// `WatchRuntimeStatus`).
    async fn watch_runtime_status(
        &self,
    ) -> Result<watch::Receiver<RuntimeStatusSnapshot>, SchedulerError>;

    /// Subscribe to server-init status snapshot updates for `server_key`
    /// (spec S4.7 `WatchServerInitStatus`).
    async fn watch_server_init_status(
        &self,
        server_key: &str,
    ) -> Result<watch::Receiver<ServerInitStatusSnapshot>, SchedulerError>;
}

/// Desktop-app-facing configuration surface (spec S4.1 "CatalogEditor",
/// S6).
///
/// Every mutation method receives and returns pre-encoded JSON, which the
/// core forwards verbatim without interpreting — it is the editor's job to
/// validate and apply the payload, classify failures via [`EditorError`],
/// and publish updated snapshots back through the matching
/// [`ControlPlane`] watch channel.
#[async_trait]
pub trait CatalogEditor: Send + Sync {
    /// Diagnostic inspection payload (spec S6 "Inspect").
    async fn inspect(&self) -> Result<Vec<u8>, EditorError>;

    /// Config mode descriptor (spec S4.7 `GetConfigMode`).
    async fn config_mode(&self) -> Result<Vec<u8>, EditorError>;

    /// Full runtime configuration (spec S4.7 `GetRuntimeConfig`).
    async fn get_runtime_config(&self) -> Result<Vec<u8>, EditorError>;

    /// Apply a runtime configuration update (spec S4.7
    /// `UpdateRuntimeConfig`).
    async fn update_runtime_config(&self, update_json: &[u8]) -> Result<(), EditorError>;

    /// Reload configuration from its backing store (spec S4.7
    /// `ReloadConfig`).
    async fn reload_config(&self) -> Result<(), EditorError>;

    /// Add a new upstream server definition (spec S4.7 `CreateServer`).
    async fn create_server(&self, server_json: &[u8]) -> Result<(), EditorError>;

    /// Update an existing upstream server definition (spec S4.7
    /// `UpdateServer`).
    async fn update_server(&self, server_json: &[u8]) -> Result<(), EditorError>;

    /// Remove an upstream server definition (spec S4.7 `DeleteServer`).
    async fn delete_server(&self, server_json: &[u8]) -> Result<(), EditorError>;

    /// Toggle an upstream server's enabled state (spec S4.7
    /// `SetServerDisabled`).
    async fn set_server_disabled(&self, server_json: &[u8]) -> Result<(), EditorError>;

    /// Bulk-import server definitions (spec S4.7 `ImportServers`).
    async fn import_servers(&self, servers_json: &[u8]) -> Result<(), EditorError>;

    /// Sub-agent configuration (spec S4.7 `GetSubAgentConfig`).
    async fn get_sub_agent_config(&self) -> Result<Vec<u8>, EditorError>;

    /// Update sub-agent configuration (spec S4.7 `UpdateSubAgentConfig`).
    async fn update_sub_agent_config(&self, update_json: &[u8]) -> Result<(), EditorError>;

    /// Governance plugin status (spec S4.7 `GetPluginStatus`).
    async fn plugin_status(&self) -> Result<Vec<u8>, EditorError>;

    /// Install a governance plugin (spec S4.7 `CreatePlugin`).
    async fn create_plugin(&self, plugin_json: &[u8]) -> Result<(), EditorError>;

    /// Update a governance plugin's configuration (spec S4.7
    /// `UpdatePlugin`).
    async fn update_plugin(&self, plugin_json: &[u8]) -> Result<(), EditorError>;

    /// Remove a governance plugin (spec S4.7 `DeletePlugin`).
    async fn delete_plugin(&self, plugin_json: &[u8]) -> Result<(), EditorError>;

    /// Enable or disable a governance plugin without removing it (spec
    /// S4.7 `TogglePlugin`).
    async fn toggle_plugin(&self, plugin_json: &[u8]) -> Result<(), EditorError>;
}
