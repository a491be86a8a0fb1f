//! gRPC transport shell: binds a listen address, assembles TLS and
//! keepalive settings, and serves [`crate::facade::ControlPlaneFacade`]
//! until a shutdown signal arrives (spec S4.4).
//!
//! Grounded on `turbomcp-server`'s `v3/transport/unix.rs`/`tcp.rs`: stale
//! Unix socket files are removed before bind, the socket file is chmod'd
//! to the configured mode once listening, and shutdown is driven by a
//! `tokio::select!` over the accept loop and a shutdown signal rather than
//! `Drop`-based cleanup. The grace window only starts counting once the
//! shutdown signal actually fires, so a long-lived idle server is never cut
//! off by its own drain bound.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UnixListener;
use tokio::sync::Notify;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Server, ServerTlsConfig};
use tracing::{info, warn};

use crate::address::{Network, parse_listen_address, resolve_socket_mode};
use crate::config::DaemonConfig;
use crate::error::{CoreError, CoreResult};
use crate::facade::ControlPlaneFacade;
use crate::proto::control_plane_service_server::ControlPlaneServiceServer;
use crate::tls::{ServerTlsSettings, load_server_tls};

/// Owns the listen configuration and drives the accept loop for the
/// control-plane gRPC service.
pub struct ControlPlaneServer {
    config: DaemonConfig,
    facade: Arc<ControlPlaneFacade>,
}

impl ControlPlaneServer {
    /// Build a server around an already-assembled façade.
    #[must_use]
    pub fn new(config: DaemonConfig, facade: ControlPlaneFacade) -> Self {
        Self {
            config,
            facade: Arc::new(facade),
        }
    }

    fn tls_settings(&self) -> Option<ServerTlsSettings> {
        let cert = self.config.tls_cert_file.clone()?;
        let key = self.config.tls_key_file.clone()?;
        Some(ServerTlsSettings {
            cert_file: cert,
            key_file: key,
            client_auth: self.config.tls_client_auth,
            ca_file: self.config.tls_client_ca_file.clone(),
        })
    }

    fn load_tls(&self) -> CoreResult<Option<ServerTlsConfig>> {
        self.tls_settings()
            .map(|settings| load_server_tls(&settings))
            .transpose()
    }

    /// Serve until `shutdown` resolves, honoring the configured grace
    /// window before forcing connections closed (spec S4.4: "graceful
    /// shutdown bounded at 5 seconds").
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> CoreResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (network, endpoint) = parse_listen_address(&self.config.listen_address)?;
        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        let tls_config = self.load_tls()?;

        let (health_reporter, health_service) = tonic_health::server::health_reporter();
        let mut builder = Server::builder()
            .http2_keepalive_interval(Some(Duration::from_secs(
                self.config.keepalive_interval_secs,
            )))
            .http2_keepalive_timeout(Some(Duration::from_secs(
                self.config.keepalive_timeout_secs,
            )));
        if let Some(tls) = tls_config {
            builder = builder
                .tls_config(tls)
                .map_err(|e| CoreError::internal("server tls config", e))?;
        }

        let service = ControlPlaneServiceServer::from_arc(self.facade.clone());
        health_reporter
            .set_serving::<ControlPlaneServiceServer<ControlPlaneFacade>>()
            .await;
        let router = builder.add_service(health_service).add_service(service);

        let shutdown_started = Arc::new(Notify::new());
        let shutdown_started_signal = shutdown_started.clone();
        let guarded_shutdown = async move {
            shutdown.await;
            info!("shutdown signal received, draining connections");
            shutdown_started_signal.notify_one();
        };

        match network {
            Network::Tcp => {
                let listener = tokio::net::TcpListener::bind(&endpoint)
                    .await
                    .map_err(|e| CoreError::internal("bind tcp listener", e))?;
                info!(address = %endpoint, "listening on tcp");
                let incoming = TcpListenerStream::new(listener);
                let serve_fut =
                    router.serve_with_incoming_shutdown(incoming, guarded_shutdown);
                drain_bounded(serve_fut, shutdown_started, grace).await?;
            }
            Network::Unix => {
                if std::path::Path::new(&endpoint).exists() {
                    std::fs::remove_file(&endpoint)
                        .map_err(|e| CoreError::internal("remove stale unix socket", e))?;
                }
                let listener = UnixListener::bind(&endpoint)
                    .map_err(|e| CoreError::internal("bind unix listener", e))?;

                let mode = resolve_socket_mode(&self.config.socket_mode)?;
                if mode != 0 {
                    set_socket_permissions(&endpoint, mode)?;
                }

                info!(path = %endpoint, "listening on unix socket");
                let incoming = tokio_stream::wrappers::UnixListenerStream::new(listener);
                let serve_fut =
                    router.serve_with_incoming_shutdown(incoming, guarded_shutdown);
                let result = drain_bounded(serve_fut, shutdown_started, grace).await;
                let _ = std::fs::remove_file(&endpoint);
                result?;
            }
        }

        Ok(())
    }

    /// Serve until SIGINT/SIGTERM (spec S4.4 default shutdown trigger).
    pub async fn serve(self) -> CoreResult<()> {
        self.serve_with_shutdown(wait_for_termination()).await
    }
}

/// Drive `serve_fut` to completion, but once `shutdown_started` fires, force
/// it closed after `grace` if it has not finished draining by then.
async fn drain_bounded<Fut, E>(serve_fut: Fut, shutdown_started: Arc<Notify>, grace: Duration) -> CoreResult<()>
where
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    tokio::pin!(serve_fut);
    tokio::select! {
        result = &mut serve_fut => {
            result.map_err(|e| CoreError::internal("serve", e))
        }
        () = shutdown_started.notified() => {
            match tokio::time::timeout(grace, &mut serve_fut).await {
                Ok(result) => result.map_err(|e| CoreError::internal("serve", e)),
                Err(_) => {
                    warn!(grace_secs = grace.as_secs(), "graceful shutdown grace window exceeded, forcing close");
                    Ok(())
                }
            }
        }
    }
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
            unreachable!()
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(unix)]
fn set_socket_permissions(path: &str, mode: u32) -> CoreResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| CoreError::internal("chmod unix socket", e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &str, _mode: u32) -> CoreResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facade() -> ControlPlaneFacade {
        ControlPlaneFacade::new(
            Arc::new(crate::testutil::FakeControlPlane::new()),
            Arc::new(crate::testutil::FakeCatalogEditor::default()),
            Arc::new(crate::governance::NoopGovernance),
        )
    }

    #[test]
    fn tls_settings_absent_when_no_cert_configured() {
        let server = ControlPlaneServer::new(DaemonConfig::default(), facade());
        assert!(server.tls_settings().is_none());
    }

    #[test]
    fn tls_settings_present_when_cert_and_key_configured() {
        let config = DaemonConfig {
            tls_cert_file: Some("/tmp/cert.pem".into()),
            tls_key_file: Some("/tmp/key.pem".into()),
            ..Default::default()
        };
        let server = ControlPlaneServer::new(config, facade());
        assert!(server.tls_settings().is_some());
    }

    #[tokio::test]
    async fn drain_bounded_returns_ok_when_serve_finishes_first() {
        let notify = Arc::new(Notify::new());
        let result: CoreResult<()> =
            drain_bounded(async { Ok::<(), std::io::Error>(()) }, notify, Duration::from_secs(1))
                .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn drain_bounded_forces_close_after_grace_window() {
        let notify = Arc::new(Notify::new());
        notify.notify_one();
        let result: CoreResult<()> = drain_bounded(
            std::future::pending::<Result<(), std::io::Error>>(),
            notify,
            Duration::from_millis(10),
        )
        .await;
        assert!(result.is_ok());
    }
}
