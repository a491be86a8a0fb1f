//! Remote-client adapter: a typed wrapper over the generated gRPC client
//! that handles caller registration transparently (spec S4.8).
//!
//! Grounded on `turbomcp-grpc`'s `McpGrpcClient`: an `Endpoint` built from
//! `connect_timeout`/`timeout`, a thin method per RPC that maps
//! `tonic::Status` back through [`CoreError`]. Unlike the teacher's client,
//! every call here first ensures the caller is registered and retries once
//! on a `FailedPrecondition` (the core's "caller not registered" signal,
//! spec S7) after re-registering — a caller never has to call
//! `RegisterCaller` itself before using the adapter.

use std::time::Duration;

use tokio::sync::Mutex;
use tonic::Code;
use tonic::transport::{Channel, Endpoint};

use crate::address::normalize_target_address;
use crate::error::{CoreError, CoreResult};
use crate::proto;
use crate::proto::control_plane_service_client::ControlPlaneServiceClient;
use crate::tls::{ClientTlsSettings, load_client_tls};
use crate::types::{Caller, ToolSnapshot};

/// Connection and registration settings for [`ControlPlaneClient::connect`].
#[derive(Debug, Clone)]
pub struct ControlPlaneClientConfig {
    /// Caller identity to register on first use.
    pub caller: Caller,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// TLS settings; `None` dials in plaintext.
    pub tls: Option<ClientTlsSettings>,
    /// Bound on the `UnregisterCaller` call issued by [`ControlPlaneClient::close`]
    /// (spec S4.8: "graceful close with a 3 second unregister timeout").
    pub close_timeout: Duration,
}

impl ControlPlaneClientConfig {
    /// Settings for `caller`, with the adapter's default timeouts.
    #[must_use]
    pub fn new(caller: Caller) -> Self {
        Self {
            caller,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            tls: None,
            close_timeout: Duration::from_secs(3),
        }
    }
}

/// A typed gRPC client that transparently registers its caller identity and
/// retries once on a stale registration (spec S4.8).
pub struct ControlPlaneClient {
    client: ControlPlaneServiceClient<Channel>,
    config: ControlPlaneClientConfig,
    registered: Mutex<bool>,
}

impl ControlPlaneClient {
    /// Connect to a control-plane daemon at `addr` (spec S4.1 target
    /// address grammar: `tcp://host:port`, `unix:///path`, or a bare
    /// `host:port`).
    pub async fn connect(addr: &str, config: ControlPlaneClientConfig) -> CoreResult<Self> {
        let normalized = normalize_target_address(addr)?;
        let mut endpoint = Endpoint::from_shared(normalized)
            .map_err(|e| CoreError::InvalidArgument(format!("invalid target address: {e}")))?
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout);

        if let Some(tls) = &config.tls {
            let tls_config = load_client_tls(tls)?;
            endpoint = endpoint
                .tls_config(tls_config)
                .map_err(|e| CoreError::internal("client tls config", e))?;
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| CoreError::Unavailable(format!("connect: {e}")))?;

        Ok(Self {
            client: ControlPlaneServiceClient::new(channel),
            config,
            registered: Mutex::new(false),
        })
    }

    async fn register(&self) -> CoreResult<()> {
        let caller = &self.config.caller;
        let mut client = self.client.clone();
        client
            .register_caller(proto::RegisterCallerRequest {
                client: caller.name.clone(),
                pid: i64::from(caller.pid),
                tags: caller.tags.clone(),
                server: caller.server.clone().unwrap_or_default(),
            })
            .await
            .map_err(|status| CoreError::from(status).with_op("register caller"))?;
        *self.registered.lock().await = true;
        Ok(())
    }

    async fn ensure_registered(&self) -> CoreResult<()> {
        if *self.registered.lock().await {
            return Ok(());
        }
        self.register().await
    }

    /// Run `call`, registering first if needed, and retrying exactly once
    /// after re-registering if the server reports `FailedPrecondition`
    /// (spec S4.8: the core's "caller not registered" signal).
    async fn with_registration<T, F, Fut>(&self, call: F) -> CoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, tonic::Status>>,
    {
        self.ensure_registered().await?;
        match call().await {
            Ok(value) => Ok(value),
            Err(status) if status.code() == Code::FailedPrecondition => {
                *self.registered.lock().await = false;
                self.register().await?;
                call().await.map_err(|e| CoreError::from(e).with_op("retry after re-register"))
            }
            Err(status) => Err(CoreError::from(status)),
        }
    }

    /// Free-form daemon identity/version JSON (spec S4.7 `GetInfo`).
    pub async fn info(&self) -> CoreResult<Vec<u8>> {
        let mut client = self.client.clone();
        let response = client
            .get_info(proto::Empty {})
            .await
            .map_err(CoreError::from)?;
        Ok(response.into_inner().json)
    }

    /// Current tool snapshot (spec S4.7 `ListTools`).
    pub async fn list_tools(&self) -> CoreResult<ToolSnapshot> {
        let client = self.client.clone();
        self.with_registration(|| {
            let mut client = client.clone();
            async move { client.list_tools(proto::ListToolsRequest {}).await }
        })
        .await
        .map(|response| tool_snapshot_from_wire(response.into_inner()))
    }

    /// Invoke a tool synchronously (spec S4.7 `CallTool`).
    pub async fn call_tool(
        &self,
        name: &str,
        arguments_json: Vec<u8>,
        routing_key: Option<&str>,
    ) -> CoreResult<Vec<u8>> {
        let client = self.client.clone();
        let request = proto::CallToolRequest {
            name: name.to_string(),
            arguments_json,
            routing_key: routing_key.unwrap_or_default().to_string(),
        };
        let response = self
            .with_registration(move || {
                let mut client = client.clone();
                let request = request.clone();
                async move { client.call_tool(request).await }
            })
            .await?;
        Ok(response.into_inner().result_json)
    }

    /// Read a resource's contents (spec S4.7 `ReadResource`).
    pub async fn read_resource(&self, uri: &str) -> CoreResult<Vec<u8>> {
        let client = self.client.clone();
        let uri = uri.to_string();
        let response = self
            .with_registration(move || {
                let mut client = client.clone();
                let uri = uri.clone();
                async move { client.read_resource(proto::ReadResourceRequest { uri }).await }
            })
            .await?;
        Ok(response.into_inner().contents_json)
    }

    /// Render a prompt template (spec S4.7 `GetPrompt`).
    pub async fn get_prompt(&self, name: &str, arguments_json: Vec<u8>) -> CoreResult<Vec<u8>> {
        let client = self.client.clone();
        let request = proto::GetPromptRequest {
            name: name.to_string(),
            arguments_json,
        };
        let response = self
            .with_registration(move || {
                let mut client = client.clone();
                let request = request.clone();
                async move { client.get_prompt(request).await }
            })
            .await?;
        Ok(response.into_inner().result_json)
    }

    /// Gracefully disconnect, unregistering the caller with a bounded
    /// timeout (spec S4.8: a slow or unreachable daemon must not hang
    /// process shutdown).
    pub async fn close(self) {
        if !*self.registered.lock().await {
            return;
        }
        let mut client = self.client.clone();
        let request = proto::UnregisterCallerRequest {
            client: self.config.caller.name.clone(),
        };
        let _ = tokio::time::timeout(self.config.close_timeout, client.unregister_caller(request))
            .await;
    }
}

fn tool_snapshot_from_wire(wire: proto::ToolsSnapshot) -> ToolSnapshot {
    ToolSnapshot {
        etag: wire.etag,
        tools: wire
            .tools
            .into_iter()
            .map(|t| crate::types::ToolEntry {
                name: t.name,
                tool_json: t.tool_json,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_carry_three_second_close_timeout() {
        let config = ControlPlaneClientConfig::new(Caller {
            name: "claude-desktop".into(),
            pid: 1234,
            tags: vec![],
            server: None,
        });
        assert_eq!(config.close_timeout, Duration::from_secs(3));
    }

    #[test]
    fn tool_snapshot_from_wire_preserves_etag_and_entries() {
        let wire = proto::ToolsSnapshot {
            etag: "v7".into(),
            tools: vec![proto::ToolEntry {
                name: "echo.echo".into(),
                tool_json: b"{}".to_vec(),
            }],
        };
        let snapshot = tool_snapshot_from_wire(wire);
        assert_eq!(snapshot.etag, "v7");
        assert_eq!(snapshot.tools[0].name, "echo.echo");
    }
}
