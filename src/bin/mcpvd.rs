//! Control-plane daemon entry point.
//!
//! Parses CLI flags (layered over environment variables via `clap`'s `env`
//! feature), initializes `tracing`, and serves
//! [`mcpv_controlplane::ControlPlaneServer`] until SIGINT/SIGTERM. Mirrors
//! the binary shape of `turbomcp-server`'s logging/config initialization,
//! simplified to this crate's own `DaemonConfig`.

use std::sync::Arc;

use clap::Parser;
use mcpv_controlplane::config::DaemonConfig;
use mcpv_controlplane::governance::NoopGovernance;
use mcpv_controlplane::{ControlPlaneFacade, ControlPlaneServer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Desktop MCP control-plane daemon.
#[derive(Parser, Debug)]
#[command(name = "mcpvd", version, about)]
struct Args {
    /// Listen address: `tcp://host:port`, `unix:///path`, or bare `host:port`.
    #[arg(long, env = "MCPVD_LISTEN", default_value = "127.0.0.1:50051")]
    listen: String,

    /// Unix socket file mode (octal), e.g. `0660`. Ignored for tcp listeners.
    #[arg(long, env = "MCPVD_SOCKET_MODE", default_value = "")]
    socket_mode: String,

    /// Server TLS certificate chain (PEM). Enables TLS when set together
    /// with `--tls-key-file`.
    #[arg(long, env = "MCPVD_TLS_CERT_FILE")]
    tls_cert_file: Option<String>,

    /// Server TLS private key (PEM).
    #[arg(long, env = "MCPVD_TLS_KEY_FILE")]
    tls_key_file: Option<String>,

    /// CA bundle to verify client certificates; enables mTLS.
    #[arg(long, env = "MCPVD_TLS_CLIENT_CA_FILE")]
    tls_client_ca_file: Option<String>,

    /// Require client certificates (mTLS).
    #[arg(long, env = "MCPVD_TLS_CLIENT_AUTH")]
    tls_client_auth: bool,

    /// HTTP/2 keepalive ping interval, in seconds.
    #[arg(long, env = "MCPVD_KEEPALIVE_INTERVAL_SECS", default_value_t = 30)]
    keepalive_interval_secs: u64,

    /// HTTP/2 keepalive ping timeout, in seconds.
    #[arg(long, env = "MCPVD_KEEPALIVE_TIMEOUT_SECS", default_value_t = 10)]
    keepalive_timeout_secs: u64,

    /// Bound on the graceful-shutdown drain window, in seconds.
    #[arg(long, env = "MCPVD_SHUTDOWN_GRACE_SECS", default_value_t = 5)]
    shutdown_grace_secs: u64,

    /// `tracing_subscriber` env-filter directive, e.g. `info` or
    /// `mcpv_controlplane=debug,tonic=warn`.
    #[arg(long, env = "MCPVD_LOG", default_value = "info")]
    log: String,

    /// Emit structured JSON log lines instead of human-readable ones.
    #[arg(long, env = "MCPVD_LOG_JSON")]
    log_json: bool,

    /// Run with an in-memory collaborator instead of a configured
    /// scheduler, for local smoke-testing. Requires the `testutil`
    /// feature.
    #[arg(long)]
    demo: bool,
}

impl From<Args> for DaemonConfig {
    fn from(args: Args) -> Self {
        Self {
            listen_address: args.listen,
            socket_mode: args.socket_mode,
            tls_cert_file: args.tls_cert_file,
            tls_key_file: args.tls_key_file,
            tls_client_ca_file: args.tls_client_ca_file,
            tls_client_auth: args.tls_client_auth,
            keepalive_interval_secs: args.keepalive_interval_secs,
            keepalive_timeout_secs: args.keepalive_timeout_secs,
            shutdown_grace_secs: args.shutdown_grace_secs,
            config_file: None,
            log_filter: args.log,
            log_json: args.log_json,
        }
    }
}

fn init_tracing(config: &DaemonConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let subscriber = tracing_subscriber::registry().with(filter);
    let result = if config.log_json {
        subscriber.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        subscriber.with(fmt::layer().with_writer(std::io::stderr)).try_init()
    };
    if let Err(e) = result {
        eprintln!("failed to initialize tracing: {e}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let demo = args.demo;
    let config = DaemonConfig::from(args);
    init_tracing(&config);

    let facade = build_facade(demo)?;
    let server = ControlPlaneServer::new(config, facade);
    server.serve().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(())
}

#[cfg(feature = "testutil")]
fn build_facade(demo: bool) -> anyhow::Result<ControlPlaneFacade> {
    if !demo {
        anyhow::bail!(
            "mcpvd has no built-in scheduler; run with --demo for local smoke-testing, or embed mcpv_controlplane::ControlPlaneServer in a process that supplies a ControlPlane/CatalogEditor"
        );
    }
    use mcpv_controlplane::testutil::{FakeCatalogEditor, FakeControlPlane};
    Ok(ControlPlaneFacade::new(
        Arc::new(FakeControlPlane::new()),
        Arc::new(FakeCatalogEditor),
        Arc::new(NoopGovernance),
    ))
}

#[cfg(not(feature = "testutil"))]
fn build_facade(_demo: bool) -> anyhow::Result<ControlPlaneFacade> {
    anyhow::bail!(
        "mcpvd has no built-in scheduler; embed mcpv_controlplane::ControlPlaneServer in a process that supplies a ControlPlane/CatalogEditor, or rebuild with --features testutil for local smoke-testing"
    )
}
