//! gRPC service implementation: wires the generated
//! `proto::control_plane_service_server::ControlPlaneService` trait to
//! [`crate::collaborator`], through [`crate::governance`] and
//! [`crate::watch`] (spec S4.7).
//!
//! Structured the way `turbomcp-grpc`'s `server.rs` wires `McpGrpcServer`
//! to its `ToolHandler`/`ResourceHandler`/`PromptHandler` traits: one
//! `#[tonic::async_trait] impl ... for ControlPlaneFacade` block, one
//! `#[instrument(skip(self, request), fields(method = "..."))]` handler per
//! RPC, streaming handlers built with `async_stream::stream!`.

use std::pin::Pin;
use std::sync::Arc;

use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status};
use tracing::instrument;

use crate::collaborator::{CatalogEditor, ControlPlane};
use crate::convert::{ensure_tool_json_name, last_etag, log_level_from_wire};
use crate::error::{CoreError, CoreResult};
use crate::governance::{GovernanceExecutor, apply_after, apply_before};
use crate::proto;
use crate::proto::control_plane_service_server::ControlPlaneService;
use crate::types::{Caller, GovernanceEnvelope};
use crate::watch::watch_stream;

type RpcResult<T> = Result<Response<T>, Status>;
type RpcStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// The gRPC façade: one governed front door over a
/// [`ControlPlane`]/[`CatalogEditor`] pair (spec S4.7).
pub struct ControlPlaneFacade {
    plane: Arc<dyn ControlPlane>,
    editor: Arc<dyn CatalogEditor>,
    governance: Arc<dyn GovernanceExecutor>,
}

impl ControlPlaneFacade {
    /// Assemble a façade over its collaborators.
    #[must_use]
    pub fn new(
        plane: Arc<dyn ControlPlane>,
        editor: Arc<dyn CatalogEditor>,
        governance: Arc<dyn GovernanceExecutor>,
    ) -> Self {
        Self {
            plane,
            editor,
            governance,
        }
    }

    fn envelope(&self, method: &str, caller: &str, identifier: Option<String>) -> GovernanceEnvelope {
        GovernanceEnvelope {
            method: method.to_string(),
            caller: caller.to_string(),
            identifier,
            routing_key: None,
            request_json: None,
            response_json: None,
            metadata: Default::default(),
        }
    }

    async fn guard_invocation<F, Fut>(
        &self,
        method: &str,
        caller: &str,
        identifier: Option<String>,
        request_json: Vec<u8>,
        call: F,
    ) -> Result<Vec<u8>, Status>
    where
        F: FnOnce(Vec<u8>) -> Fut,
        Fut: std::future::Future<Output = CoreResult<Vec<u8>>>,
    {
        let mut envelope = self.envelope(method, caller, identifier);
        envelope.request_json = Some(request_json);

        let before = self.governance.before(&envelope).await;
        let effective_request = apply_before(&envelope, before).map_err(|e| e.with_op(method))?;
        let effective_request = effective_request.unwrap_or_default();

        let response_json = call(effective_request.clone())
            .await
            .map_err(|e| e.with_op(method))?;

        envelope.request_json = Some(effective_request);
        envelope.response_json = Some(response_json);
        let after = self.governance.after(&envelope).await;
        apply_after(&envelope, after)
            .map_err(|e| e.with_op(method))
            .map_err(Status::from)
    }
}

#[tonic::async_trait]
impl ControlPlaneService for ControlPlaneFacade {
    #[instrument(skip(self, _request), fields(method = "GetInfo"))]
    async fn get_info(&self, _request: Request<proto::Empty>) -> RpcResult<proto::JsonBody> {
        let json = self.plane.info().await.map_err(|e| e.with_op("GetInfo"))?;
        Ok(Response::new(proto::JsonBody { json }))
    }

    #[instrument(skip(self, request), fields(method = "RegisterCaller"))]
    async fn register_caller(
        &self,
        request: Request<proto::RegisterCallerRequest>,
    ) -> RpcResult<proto::RegisterCallerResponse> {
        let req = request.into_inner();
        if req.client.is_empty() {
            return Err(Status::from(
                CoreError::InvalidArgument("client must not be empty".into())
                    .with_op("RegisterCaller"),
            ));
        }
        if req.pid <= 0 {
            return Err(Status::from(
                CoreError::InvalidArgument("pid must be positive".into()).with_op("RegisterCaller"),
            ));
        }
        let caller = Caller {
            name: req.client,
            pid: req.pid as u32,
            tags: req.tags,
            server: if req.server.is_empty() {
                None
            } else {
                Some(req.server)
            },
        };
        caller
            .validate()
            .map_err(|m| Status::from(CoreError::InvalidArgument(m).with_op("RegisterCaller")))?;

        let profile = self
            .plane
            .register_caller(caller)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("RegisterCaller")))?;
        Ok(Response::new(proto::RegisterCallerResponse { profile }))
    }

    #[instrument(skip(self, request), fields(method = "UnregisterCaller"))]
    async fn unregister_caller(
        &self,
        request: Request<proto::UnregisterCallerRequest>,
    ) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        self.plane
            .unregister_caller(&req.client)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("UnregisterCaller")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, _request), fields(method = "ListTools"))]
    async fn list_tools(
        &self,
        _request: Request<proto::ListToolsRequest>,
    ) -> RpcResult<proto::ToolsSnapshot> {
        let snapshot = self
            .plane
            .list_tools()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("ListTools")))?;
        Ok(Response::new(snapshot.into()))
    }

    type WatchToolsStream = RpcStream<proto::ToolsSnapshot>;

    #[instrument(skip(self, request), fields(method = "WatchTools"))]
    async fn watch_tools(&self, request: Request<proto::WatchRequest>) -> RpcResult<Self::WatchToolsStream> {
        let req = request.into_inner();
        let receiver = self
            .plane
            .watch_tools()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("WatchTools")))?;
        let stream = watch_stream(receiver, last_etag(&req.last_etag).map(str::to_string))
            .map(|snapshot| Ok(snapshot.into()));
        Ok(Response::new(Box::pin(stream)))
    }

    #[instrument(skip(self, request), fields(method = "ListResources"))]
    async fn list_resources(
        &self,
        request: Request<proto::ListResourcesRequest>,
    ) -> RpcResult<proto::ResourcesSnapshot> {
        let req = request.into_inner();
        let snapshot = self
            .plane
            .list_resources(&req.cursor)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("ListResources")))?;
        Ok(Response::new(snapshot.into()))
    }

    type WatchResourcesStream = RpcStream<proto::ResourcesSnapshot>;

    #[instrument(skip(self, request), fields(method = "WatchResources"))]
    async fn watch_resources(
        &self,
        request: Request<proto::WatchRequest>,
    ) -> RpcResult<Self::WatchResourcesStream> {
        let req = request.into_inner();
        let receiver = self
            .plane
            .watch_resources()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("WatchResources")))?;
        let stream = watch_stream(receiver, last_etag(&req.last_etag).map(str::to_string))
            .map(|snapshot| Ok(snapshot.into()));
        Ok(Response::new(Box::pin(stream)))
    }

    #[instrument(skip(self, request), fields(method = "ReadResource"))]
    async fn read_resource(
        &self,
        request: Request<proto::ReadResourceRequest>,
    ) -> RpcResult<proto::ReadResourceResponse> {
        let req = request.into_inner();
        if req.uri.is_empty() {
            return Err(Status::from(
                CoreError::InvalidArgument("uri must not be empty".into()).with_op("ReadResource"),
            ));
        }
        let uri = req.uri.clone();
        let contents_json = self
            .guard_invocation(
                "ReadResource",
                "",
                Some(uri.clone()),
                Vec::new(),
                |_| async move {
                    self.plane
                        .read_resource(&uri)
                        .await
                        .map_err(CoreError::from)
                },
            )
            .await?;
        Ok(Response::new(proto::ReadResourceResponse { contents_json }))
    }

    #[instrument(skip(self, request), fields(method = "ListPrompts"))]
    async fn list_prompts(
        &self,
        request: Request<proto::ListPromptsRequest>,
    ) -> RpcResult<proto::PromptsSnapshot> {
        let req = request.into_inner();
        let snapshot = self
            .plane
            .list_prompts(&req.cursor)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("ListPrompts")))?;
        Ok(Response::new(snapshot.into()))
    }

    type WatchPromptsStream = RpcStream<proto::PromptsSnapshot>;

    #[instrument(skip(self, request), fields(method = "WatchPrompts"))]
    async fn watch_prompts(
        &self,
        request: Request<proto::WatchRequest>,
    ) -> RpcResult<Self::WatchPromptsStream> {
        let req = request.into_inner();
        let receiver = self
            .plane
            .watch_prompts()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("WatchPrompts")))?;
        let stream = watch_stream(receiver, last_etag(&req.last_etag).map(str::to_string))
            .map(|snapshot| Ok(snapshot.into()));
        Ok(Response::new(Box::pin(stream)))
    }

    #[instrument(skip(self, request), fields(method = "GetPrompt"))]
    async fn get_prompt(
        &self,
        request: Request<proto::GetPromptRequest>,
    ) -> RpcResult<proto::GetPromptResponse> {
        let req = request.into_inner();
        let name = req.name.clone();
        let result_json = self
            .guard_invocation(
                "GetPrompt",
                "",
                Some(name.clone()),
                req.arguments_json,
                |arguments_json| async move {
                    self.plane
                        .get_prompt(&name, &arguments_json)
                        .await
                        .map_err(CoreError::from)
                },
            )
            .await?;
        Ok(Response::new(proto::GetPromptResponse { result_json }))
    }

    #[instrument(skip(self, request), fields(method = "CallTool"))]
    async fn call_tool(
        &self,
        request: Request<proto::CallToolRequest>,
    ) -> RpcResult<proto::CallToolResponse> {
        let req = request.into_inner();
        if req.name.is_empty() {
            return Err(Status::from(
                CoreError::InvalidArgument("name must not be empty".into()).with_op("CallTool"),
            ));
        }
        let name = req.name.clone();
        let routing_key = if req.routing_key.is_empty() {
            None
        } else {
            Some(req.routing_key.clone())
        };
        let result_json = self
            .guard_invocation(
                "CallTool",
                "",
                Some(name.clone()),
                req.arguments_json,
                |arguments_json| async move {
                    self.plane
                        .call_tool("", &name, &arguments_json, routing_key.as_deref())
                        .await
                        .map_err(CoreError::from)
                },
            )
            .await?;
        if result_json.is_empty() {
            return Err(Status::from(CoreError::Internal(
                "call tool: empty result".into(),
            )));
        }
        Ok(Response::new(proto::CallToolResponse { result_json }))
    }

    #[instrument(skip(self, request), fields(method = "CallToolTask"))]
    async fn call_tool_task(
        &self,
        request: Request<proto::CallToolTaskRequest>,
    ) -> RpcResult<proto::Task> {
        let req = request.into_inner();
        let routing_key = if req.routing_key.is_empty() {
            None
        } else {
            Some(req.routing_key.as_str())
        };
        let handle = self
            .plane
            .call_tool_task("", &req.name, &req.arguments_json, routing_key, req.ttl_ms)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("CallToolTask")))?;
        Ok(Response::new(task_to_proto(handle)))
    }

    #[instrument(skip(self, request), fields(method = "TasksGet"))]
    async fn tasks_get(&self, request: Request<proto::TaskIdRequest>) -> RpcResult<proto::Task> {
        let req = request.into_inner();
        if req.task_id.is_empty() {
            return Err(Status::from(
                CoreError::InvalidArgument("task_id must not be empty".into()).with_op("TasksGet"),
            ));
        }
        let handle = self
            .plane
            .task_get("", &req.task_id)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("TasksGet")))?;
        Ok(Response::new(task_to_proto(handle)))
    }

    #[instrument(skip(self, request), fields(method = "TasksList"))]
    async fn tasks_list(
        &self,
        request: Request<proto::TasksListRequest>,
    ) -> RpcResult<proto::TasksListResponse> {
        let req = request.into_inner();
        let page = self
            .plane
            .task_list("", &req.cursor, req.limit)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("TasksList")))?;
        Ok(Response::new(proto::TasksListResponse {
            tasks: page.tasks.into_iter().map(task_to_proto).collect(),
            cursor: page.cursor,
        }))
    }

    #[instrument(skip(self, request), fields(method = "TasksResult"))]
    async fn tasks_result(
        &self,
        request: Request<proto::TaskIdRequest>,
    ) -> RpcResult<proto::TaskResult> {
        let req = request.into_inner();
        if req.task_id.is_empty() {
            return Err(Status::from(
                CoreError::InvalidArgument("task_id must not be empty".into())
                    .with_op("TasksResult"),
            ));
        }
        let outcome = self
            .plane
            .task_result("", &req.task_id)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("TasksResult")))?;
        Ok(Response::new(proto::TaskResult {
            status: outcome.status,
            result_json: outcome.result_json.unwrap_or_default(),
            error: outcome.error.map(|e| proto::TaskError {
                code: e.code,
                message: e.message,
                data_json: e.data_json,
            }),
        }))
    }

    #[instrument(skip(self, request), fields(method = "TasksCancel"))]
    async fn tasks_cancel(&self, request: Request<proto::TaskIdRequest>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        if req.task_id.is_empty() {
            return Err(Status::from(
                CoreError::InvalidArgument("task_id must not be empty".into())
                    .with_op("TasksCancel"),
            ));
        }
        self.plane
            .task_cancel("", &req.task_id)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("TasksCancel")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, request), fields(method = "AutomaticMCP"))]
    async fn automatic_mcp(
        &self,
        request: Request<proto::AutomaticMcpRequest>,
    ) -> RpcResult<proto::AutomaticMcpResponse> {
        let req = request.into_inner();
        let (etag, tools_json, total_available, filtered) = self
            .plane
            .automatic_mcp("", &req.arguments_json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("AutomaticMCP")))?;
        Ok(Response::new(proto::AutomaticMcpResponse {
            etag,
            tools_json,
            total_available,
            filtered,
        }))
    }

    #[instrument(skip(self, request), fields(method = "AutomaticEval"))]
    async fn automatic_eval(
        &self,
        request: Request<proto::AutomaticEvalRequest>,
    ) -> RpcResult<proto::AutomaticEvalResponse> {
        let req = request.into_inner();
        let result_json = self
            .guard_invocation(
                "AutomaticEval",
                "",
                None,
                req.arguments_json,
                |arguments_json| async move {
                    self.plane
                        .automatic_eval("", &arguments_json)
                        .await
                        .map_err(CoreError::from)
                },
            )
            .await?;
        Ok(Response::new(proto::AutomaticEvalResponse { result_json }))
    }

    type StreamLogsStream = RpcStream<proto::LogEntry>;

    #[instrument(skip(self, request), fields(method = "StreamLogs"))]
    async fn stream_logs(
        &self,
        request: Request<proto::StreamLogsRequest>,
    ) -> RpcResult<Self::StreamLogsStream> {
        let req = request.into_inner();
        let min_level = log_level_from_wire(req.min_level);
        let mut receiver = self
            .plane
            .stream_logs(min_level)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("StreamLogs")))?;

        let stream = async_stream::stream! {
            while let Some(entry) = receiver.recv().await {
                yield Ok(entry.into());
            }
        };
        Ok(Response::new(Box::pin(stream)))
    }

    type WatchRuntimeStatusStream = RpcStream<proto::RuntimeStatusSnapshot>;

    #[instrument(skip(self, request), fields(method = "WatchRuntimeStatus"))]
    async fn watch_runtime_status(
        &self,
        request: Request<proto::WatchRequest>,
    ) -> RpcResult<Self::WatchRuntimeStatusStream> {
        let req = request.into_inner();
        let receiver = self
            .plane
            .watch_runtime_status()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("WatchRuntimeStatus")))?;
        let stream = watch_stream(receiver, last_etag(&req.last_etag).map(str::to_string))
            .map(|snapshot| Ok(snapshot.into()));
        Ok(Response::new(Box::pin(stream)))
    }

    type WatchServerInitStatusStream = RpcStream<proto::ServerInitStatusSnapshot>;

    #[instrument(skip(self, request), fields(method = "WatchServerInitStatus"))]
    async fn watch_server_init_status(
        &self,
        request: Request<proto::WatchRequest>,
    ) -> RpcResult<Self::WatchServerInitStatusStream> {
        let req = request.into_inner();
        // WatchServerInitStatus updates are always delivered (spec S4.7):
        // server-init status carries no etag, so every push is forwarded.
        let receiver = self
            .plane
            .watch_server_init_status(&req.caller)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("WatchServerInitStatus")))?;
        let stream = tokio_stream::wrappers::WatchStream::new(receiver).map(|snapshot| Ok(snapshot.into()));
        Ok(Response::new(Box::pin(stream)))
    }

    #[instrument(skip(self, _request), fields(method = "ListActiveClients"))]
    async fn list_active_clients(
        &self,
        _request: Request<proto::Empty>,
    ) -> RpcResult<proto::ActiveClientsSnapshot> {
        let snapshot = self
            .plane
            .list_active_clients()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("ListActiveClients")))?;
        Ok(Response::new(snapshot.into()))
    }

    type WatchActiveClientsStream = RpcStream<proto::ActiveClientsSnapshot>;

    #[instrument(skip(self, request), fields(method = "WatchActiveClients"))]
    async fn watch_active_clients(
        &self,
        request: Request<proto::WatchRequest>,
    ) -> RpcResult<Self::WatchActiveClientsStream> {
        let req = request.into_inner();
        let receiver = self
            .plane
            .watch_active_clients()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("WatchActiveClients")))?;
        let stream = watch_stream(receiver, last_etag(&req.last_etag).map(str::to_string))
            .map(|snapshot| Ok(snapshot.into()));
        Ok(Response::new(Box::pin(stream)))
    }

    #[instrument(skip(self, _request), fields(method = "GetConfigMode"))]
    async fn get_config_mode(&self, _request: Request<proto::Empty>) -> RpcResult<proto::JsonBody> {
        let json = self
            .editor
            .config_mode()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("GetConfigMode")))?;
        Ok(Response::new(proto::JsonBody { json }))
    }

    #[instrument(skip(self, _request), fields(method = "GetRuntimeConfig"))]
    async fn get_runtime_config(&self, _request: Request<proto::Empty>) -> RpcResult<proto::JsonBody> {
        let json = self
            .editor
            .get_runtime_config()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("GetRuntimeConfig")))?;
        Ok(Response::new(proto::JsonBody { json }))
    }

    #[instrument(skip(self, request), fields(method = "UpdateRuntimeConfig"))]
    async fn update_runtime_config(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "UpdateRuntimeConfig")?;
        self.editor
            .update_runtime_config(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("UpdateRuntimeConfig")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, _request), fields(method = "ReloadConfig"))]
    async fn reload_config(&self, _request: Request<proto::Empty>) -> RpcResult<proto::Empty> {
        self.editor
            .reload_config()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("ReloadConfig")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, request), fields(method = "CreateServer"))]
    async fn create_server(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "CreateServer")?;
        self.editor
            .create_server(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("CreateServer")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, request), fields(method = "UpdateServer"))]
    async fn update_server(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "UpdateServer")?;
        self.editor
            .update_server(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("UpdateServer")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, request), fields(method = "DeleteServer"))]
    async fn delete_server(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "DeleteServer")?;
        self.editor
            .delete_server(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("DeleteServer")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, request), fields(method = "SetServerDisabled"))]
    async fn set_server_disabled(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "SetServerDisabled")?;
        self.editor
            .set_server_disabled(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("SetServerDisabled")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, request), fields(method = "ImportServers"))]
    async fn import_servers(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "ImportServers")?;
        self.editor
            .import_servers(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("ImportServers")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, _request), fields(method = "GetSubAgentConfig"))]
    async fn get_sub_agent_config(&self, _request: Request<proto::Empty>) -> RpcResult<proto::JsonBody> {
        let json = self
            .editor
            .get_sub_agent_config()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("GetSubAgentConfig")))?;
        Ok(Response::new(proto::JsonBody { json }))
    }

    #[instrument(skip(self, request), fields(method = "UpdateSubAgentConfig"))]
    async fn update_sub_agent_config(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "UpdateSubAgentConfig")?;
        self.editor
            .update_sub_agent_config(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("UpdateSubAgentConfig")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, _request), fields(method = "GetPluginStatus"))]
    async fn get_plugin_status(&self, _request: Request<proto::Empty>) -> RpcResult<proto::JsonBody> {
        let json = self
            .editor
            .plugin_status()
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("GetPluginStatus")))?;
        Ok(Response::new(proto::JsonBody { json }))
    }

    #[instrument(skip(self, request), fields(method = "CreatePlugin"))]
    async fn create_plugin(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "CreatePlugin")?;
        self.editor
            .create_plugin(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("CreatePlugin")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, request), fields(method = "UpdatePlugin"))]
    async fn update_plugin(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "UpdatePlugin")?;
        self.editor
            .update_plugin(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("UpdatePlugin")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, request), fields(method = "DeletePlugin"))]
    async fn delete_plugin(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "DeletePlugin")?;
        self.editor
            .delete_plugin(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("DeletePlugin")))?;
        Ok(Response::new(proto::Empty {}))
    }

    #[instrument(skip(self, request), fields(method = "TogglePlugin"))]
    async fn toggle_plugin(&self, request: Request<proto::JsonBody>) -> RpcResult<proto::Empty> {
        let req = request.into_inner();
        require_non_empty_body(&req.json, "TogglePlugin")?;
        self.editor
            .toggle_plugin(&req.json)
            .await
            .map_err(|e| Status::from(CoreError::from(e).with_op("TogglePlugin")))?;
        Ok(Response::new(proto::Empty {}))
    }
}

/// Reject an empty config-mutation body (spec S4.7: "empty body ⇒
/// `InvalidArgument`").
fn require_non_empty_body(json: &[u8], op: &str) -> Result<(), Status> {
    if json.is_empty() {
        return Err(Status::from(
            CoreError::InvalidArgument("body must not be empty".into()).with_op(op),
        ));
    }
    Ok(())
}

fn task_to_proto(handle: crate::collaborator::TaskHandle) -> proto::Task {
    proto::Task {
        task_id: handle.task_id,
        status: handle.status,
        status_message: handle.status_message,
        created_at: handle.created_at,
        last_updated_at: handle.last_updated_at,
        ttl_ms: handle.ttl_ms,
        poll_interval_ms: handle.poll_interval_ms,
    }
}

/// Validate that a tool's encoded JSON carries its own name, defaulting it
/// from the entry key when absent (spec S4.3). Exposed for collaborators
/// that assemble [`crate::types::ToolEntry`] values to call before
/// publishing a [`crate::types::ToolSnapshot`].
pub fn normalize_tool_entry(
    entry: crate::types::ToolEntry,
) -> Result<crate::types::ToolEntry, CoreError> {
    let tool_json = ensure_tool_json_name(&entry.name, &entry.tool_json)?;
    Ok(crate::types::ToolEntry {
        name: entry.name,
        tool_json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeControlPlane;

    #[tokio::test]
    async fn get_info_returns_collaborator_payload() {
        let plane = Arc::new(FakeControlPlane::new());
        let facade = ControlPlaneFacade::new(
            plane.clone(),
            Arc::new(crate::testutil::FakeCatalogEditor::default()),
            Arc::new(crate::governance::NoopGovernance),
        );
        let response = facade.get_info(Request::new(proto::Empty {})).await.unwrap();
        assert_eq!(response.into_inner().json, br#"{"name":"mcpv"}"#.to_vec());
    }

    #[tokio::test]
    async fn call_tool_runs_through_governance_and_plane() {
        let plane = Arc::new(FakeControlPlane::new());
        let facade = ControlPlaneFacade::new(
            plane.clone(),
            Arc::new(crate::testutil::FakeCatalogEditor::default()),
            Arc::new(crate::governance::NoopGovernance),
        );
        let response = facade
            .call_tool(Request::new(proto::CallToolRequest {
                name: "echo.echo".into(),
                arguments_json: br#"{"text":"hi"}"#.to_vec(),
                routing_key: String::new(),
            }))
            .await
            .unwrap();
        assert_eq!(response.into_inner().result_json, br#"{"text":"hi"}"#.to_vec());
    }

    #[tokio::test]
    async fn call_tool_rejected_by_governance_maps_to_status() {
        let plane = Arc::new(FakeControlPlane::new());
        let facade = ControlPlaneFacade::new(
            plane,
            Arc::new(crate::testutil::FakeCatalogEditor::default()),
            Arc::new(crate::testutil::RejectingGovernance),
        );
        let status = facade
            .call_tool(Request::new(proto::CallToolRequest {
                name: "echo.echo".into(),
                arguments_json: br#"{}"#.to_vec(),
                routing_key: String::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);
    }

    #[tokio::test]
    async fn watch_tools_emits_current_snapshot_first() {
        let plane = Arc::new(FakeControlPlane::new());
        let facade = ControlPlaneFacade::new(
            plane,
            Arc::new(crate::testutil::FakeCatalogEditor::default()),
            Arc::new(crate::governance::NoopGovernance),
        );
        let mut stream = facade
            .watch_tools(Request::new(proto::WatchRequest {
                caller: String::new(),
                last_etag: String::new(),
            }))
            .await
            .unwrap()
            .into_inner();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.etag, "v1");
    }

    fn facade_with_noop_governance() -> ControlPlaneFacade {
        ControlPlaneFacade::new(
            Arc::new(FakeControlPlane::new()),
            Arc::new(crate::testutil::FakeCatalogEditor::default()),
            Arc::new(crate::governance::NoopGovernance),
        )
    }

    #[tokio::test]
    async fn call_tool_with_empty_name_is_invalid_argument() {
        let facade = facade_with_noop_governance();
        let status = facade
            .call_tool(Request::new(proto::CallToolRequest {
                name: String::new(),
                arguments_json: br#"{}"#.to_vec(),
                routing_key: String::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn call_tool_with_empty_result_is_internal() {
        let facade = facade_with_noop_governance();
        let status = facade
            .call_tool(Request::new(proto::CallToolRequest {
                name: "echo.echo".into(),
                arguments_json: Vec::new(),
                routing_key: String::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert_eq!(status.message(), "call tool: empty result");
    }

    #[tokio::test]
    async fn read_resource_with_empty_uri_is_invalid_argument() {
        let facade = facade_with_noop_governance();
        let status = facade
            .read_resource(Request::new(proto::ReadResourceRequest { uri: String::new() }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn register_caller_with_empty_client_is_invalid_argument() {
        let facade = facade_with_noop_governance();
        let status = facade
            .register_caller(Request::new(proto::RegisterCallerRequest {
                client: String::new(),
                pid: 1234,
                tags: vec![],
                server: String::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn register_caller_with_non_positive_pid_is_invalid_argument() {
        let facade = facade_with_noop_governance();
        let status = facade
            .register_caller(Request::new(proto::RegisterCallerRequest {
                client: "claude-desktop".into(),
                pid: 0,
                tags: vec![],
                server: String::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn tasks_get_with_empty_task_id_is_invalid_argument() {
        let facade = facade_with_noop_governance();
        let status = facade
            .tasks_get(Request::new(proto::TaskIdRequest { task_id: String::new() }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn update_runtime_config_with_empty_body_is_invalid_argument() {
        let facade = facade_with_noop_governance();
        let status = facade
            .update_runtime_config(Request::new(proto::JsonBody { json: Vec::new() }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
}
