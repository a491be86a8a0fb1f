//! In-memory collaborator fakes used by this crate's own test suite.
//!
//! Grounded on `turbomcp-grpc`'s `NoOpToolHandler`/`NoOpResourceHandler`:
//! benign stand-ins that let handler-wiring tests exercise the façade
//! without a real scheduler or editor behind it.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::collaborator::{CatalogEditor, ControlPlane, TaskHandle, TaskOutcome, TaskPage};
use crate::error::{EditorError, SchedulerError};
use crate::governance::GovernanceExecutor;
use crate::task::TaskStorage;
use crate::types::{
    ActiveClientSnapshot, Caller, GovernanceDecision, GovernanceEnvelope, LogEntry, LogLevel,
    PromptSnapshot, RejectCode, ResourceSnapshot, RuntimeStatusSnapshot, ServerInitState,
    ServerInitStatusSnapshot, Timestamp, ToolEntry, ToolSnapshot,
};
use crate::watch::SnapshotPublisher;

/// An in-memory [`ControlPlane`] that echoes tool arguments back as the
/// result and serves a single fixed tool/resource/prompt/active-client
/// snapshot.
pub struct FakeControlPlane {
    tools: SnapshotPublisher<ToolSnapshot>,
    resources: SnapshotPublisher<ResourceSnapshot>,
    prompts: SnapshotPublisher<PromptSnapshot>,
    active_clients: SnapshotPublisher<ActiveClientSnapshot>,
    runtime_status: SnapshotPublisher<RuntimeStatusSnapshot>,
    server_init: watch::Sender<ServerInitStatusSnapshot>,
    tasks: TaskStorage,
}

impl Default for FakeControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeControlPlane {
    /// Build a fake seeded with one tool, one resource, one prompt, and no
    /// active clients.
    #[must_use]
    pub fn new() -> Self {
        let tools = SnapshotPublisher::new(ToolSnapshot {
            etag: "v1".into(),
            tools: vec![ToolEntry {
                name: "echo.echo".into(),
                tool_json: br#"{"name":"echo.echo"}"#.to_vec(),
            }],
        });
        let resources = SnapshotPublisher::new(ResourceSnapshot {
            etag: "v1".into(),
            resources: vec![],
        });
        let prompts = SnapshotPublisher::new(PromptSnapshot {
            etag: "v1".into(),
            prompts: vec![],
        });
        let active_clients = SnapshotPublisher::new(ActiveClientSnapshot {
            etag: "v1".into(),
            clients: vec![],
        });
        let runtime_status = SnapshotPublisher::new(RuntimeStatusSnapshot {
            etag: "v1".into(),
            statuses: vec![],
            pool_stats: Default::default(),
            pool_metrics: Default::default(),
            generated_at: Timestamp::now(),
        });
        let (server_init, _) = watch::channel(ServerInitStatusSnapshot {
            min_ready: 0,
            ready_count: 0,
            failed_count: 0,
            state: ServerInitState::Ready,
            last_error: String::new(),
            updated_at: Timestamp::now(),
        });
        Self {
            tools,
            resources,
            prompts,
            active_clients,
            runtime_status,
            server_init,
            tasks: TaskStorage::new(),
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn info(&self) -> crate::error::CoreResult<Vec<u8>> {
        Ok(br#"{"name":"mcpv"}"#.to_vec())
    }

    async fn register_caller(&self, caller: Caller) -> Result<String, SchedulerError> {
        Ok(caller.name)
    }

    async fn unregister_caller(&self, _client: &str) -> Result<(), SchedulerError> {
        Ok(())
    }

    async fn list_active_clients(&self) -> Result<ActiveClientSnapshot, SchedulerError> {
        Ok(self.active_clients.current())
    }

    async fn watch_active_clients(
        &self,
    ) -> Result<watch::Receiver<ActiveClientSnapshot>, SchedulerError> {
        Ok(self.active_clients.subscribe())
    }

    async fn list_tools(&self) -> Result<ToolSnapshot, SchedulerError> {
        Ok(self.tools.current())
    }

    async fn watch_tools(&self) -> Result<watch::Receiver<ToolSnapshot>, SchedulerError> {
        Ok(self.tools.subscribe())
    }

    async fn list_resources(&self, _cursor: &str) -> Result<ResourceSnapshot, SchedulerError> {
        Ok(self.resources.current())
    }

    async fn watch_resources(&self) -> Result<watch::Receiver<ResourceSnapshot>, SchedulerError> {
        Ok(self.resources.subscribe())
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<u8>, SchedulerError> {
        Ok(format!(r#"{{"uri":"{uri}"}}"#).into_bytes())
    }

    async fn list_prompts(&self, _cursor: &str) -> Result<PromptSnapshot, SchedulerError> {
        Ok(self.prompts.current())
    }

    async fn watch_prompts(&self) -> Result<watch::Receiver<PromptSnapshot>, SchedulerError> {
        Ok(self.prompts.subscribe())
    }

    async fn get_prompt(&self, name: &str, _arguments_json: &[u8]) -> Result<Vec<u8>, SchedulerError> {
        Ok(format!(r#"{{"name":"{name}"}}"#).into_bytes())
    }

    async fn call_tool(
        &self,
        _caller: &str,
        _name: &str,
        arguments_json: &[u8],
        _routing_key: Option<&str>,
    ) -> Result<Vec<u8>, SchedulerError> {
        Ok(arguments_json.to_vec())
    }

    async fn call_tool_task(
        &self,
        caller: &str,
        _name: &str,
        _arguments_json: &[u8],
        _routing_key: Option<&str>,
        ttl_ms: i64,
    ) -> Result<TaskHandle, SchedulerError> {
        Ok(self.tasks.create(caller, ttl_ms).await)
    }

    async fn task_get(&self, caller: &str, task_id: &str) -> Result<TaskHandle, SchedulerError> {
        self.tasks.get(caller, task_id).await
    }

    async fn task_list(&self, caller: &str, cursor: &str, limit: i32) -> Result<TaskPage, SchedulerError> {
        Ok(self.tasks.list(caller, cursor, limit).await)
    }

    async fn task_result(&self, caller: &str, task_id: &str) -> Result<TaskOutcome, SchedulerError> {
        self.tasks.result(caller, task_id).await
    }

    async fn task_cancel(&self, caller: &str, task_id: &str) -> Result<(), SchedulerError> {
        self.tasks.cancel(caller, task_id).await
    }

    async fn automatic_mcp(
        &self,
        _caller: &str,
        _arguments_json: &[u8],
    ) -> Result<(String, Vec<Vec<u8>>, i32, i32), SchedulerError> {
        Ok(("v1".into(), vec![], 1, 0))
    }

    async fn automatic_eval(
        &self,
        _caller: &str,
        arguments_json: &[u8],
    ) -> Result<Vec<u8>, SchedulerError> {
        Ok(arguments_json.to_vec())
    }

    async fn stream_logs(&self, _min_level: LogLevel) -> Result<mpsc::Receiver<LogEntry>, SchedulerError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn watch_runtime_status(
        &self,
    ) -> Result<watch::Receiver<RuntimeStatusSnapshot>, SchedulerError> {
        Ok(self.runtime_status.subscribe())
    }

    async fn watch_server_init_status(
        &self,
        _server_key: &str,
    ) -> Result<watch::Receiver<ServerInitStatusSnapshot>, SchedulerError> {
        Ok(self.server_init.subscribe())
    }
}

/// An in-memory [`CatalogEditor`] that accepts every mutation and reports a
/// fixed set of read-side payloads.
#[derive(Debug, Default)]
pub struct FakeCatalogEditor;

#[async_trait]
impl CatalogEditor for FakeCatalogEditor {
    async fn inspect(&self) -> Result<Vec<u8>, EditorError> {
        Ok(br#"{}"#.to_vec())
    }

    async fn config_mode(&self) -> Result<Vec<u8>, EditorError> {
        Ok(br#"{"mode":"file"}"#.to_vec())
    }

    async fn get_runtime_config(&self) -> Result<Vec<u8>, EditorError> {
        Ok(br#"{}"#.to_vec())
    }

    async fn update_runtime_config(&self, _update_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }

    async fn reload_config(&self) -> Result<(), EditorError> {
        Ok(())
    }

    async fn create_server(&self, _server_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }

    async fn update_server(&self, _server_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }

    async fn delete_server(&self, _server_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }

    async fn set_server_disabled(&self, _server_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }

    async fn import_servers(&self, _servers_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }

    async fn get_sub_agent_config(&self) -> Result<Vec<u8>, EditorError> {
        Ok(br#"{}"#.to_vec())
    }

    async fn update_sub_agent_config(&self, _update_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }

    async fn plugin_status(&self) -> Result<Vec<u8>, EditorError> {
        Ok(br#"[]"#.to_vec())
    }

    async fn create_plugin(&self, _plugin_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }

    async fn update_plugin(&self, _plugin_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }

    async fn delete_plugin(&self, _plugin_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }

    async fn toggle_plugin(&self, _plugin_json: &[u8]) -> Result<(), EditorError> {
        Ok(())
    }
}

/// A [`GovernanceExecutor`] that rejects every request as unauthorized.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectingGovernance;

#[async_trait]
impl GovernanceExecutor for RejectingGovernance {
    async fn before(&self, _envelope: &GovernanceEnvelope) -> GovernanceDecision {
        GovernanceDecision::Reject {
            code: RejectCode::Unauthorized,
            message: "denied by test policy".into(),
            category: None,
            plugin_name: None,
        }
    }

    async fn after(&self, _envelope: &GovernanceEnvelope) -> GovernanceDecision {
        GovernanceDecision::Continue
    }
}
