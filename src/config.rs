//! Runtime configuration payload shapes and process-level daemon settings
//! (spec S6, S10.3).
//!
//! The `RuntimeConfig*` types here describe the camelCase JSON contract
//! exchanged over `GetRuntimeConfig`/`UpdateRuntimeConfig`; the core never
//! validates their contents beyond basic shape (that is the
//! [`crate::collaborator::CatalogEditor`]'s job), but typing the envelope
//! gives the CLI and tests something concrete to construct.
//! [`DaemonConfig`] is the process-level configuration read at startup by
//! `src/bin/mcpvd.rs`, grounded on the fielded config structs
//! `turbomcp-server`'s `config.rs` builds from `clap` + environment layers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Full runtime configuration document (spec S6).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Minimum number of ready instances to keep warm per server, keyed by
    /// server name.
    #[serde(default)]
    pub min_ready: std::collections::BTreeMap<String, i32>,
    /// Maximum instances to allow per server, keyed by server name.
    #[serde(default)]
    pub max_instances: std::collections::BTreeMap<String, i32>,
    /// Whether automated tool-surface reduction is enabled by default.
    #[serde(default)]
    pub automatic_mcp_enabled: bool,
    /// Arbitrary additional settings the editor understands but the core
    /// does not model explicitly.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Partial update to [`RuntimeConfig`] (spec S4.7 `UpdateRuntimeConfig`).
///
/// All fields are optional; an absent field leaves the corresponding
/// current value untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfigUpdate {
    /// See [`RuntimeConfig::min_ready`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ready: Option<std::collections::BTreeMap<String, i32>>,
    /// See [`RuntimeConfig::max_instances`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<std::collections::BTreeMap<String, i32>>,
    /// See [`RuntimeConfig::automatic_mcp_enabled`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_mcp_enabled: Option<bool>,
    /// See [`RuntimeConfig::extra`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
}

impl RuntimeConfig {
    /// Apply a partial update in place.
    pub fn apply(&mut self, update: RuntimeConfigUpdate) {
        if let Some(min_ready) = update.min_ready {
            self.min_ready = min_ready;
        }
        if let Some(max_instances) = update.max_instances {
            self.max_instances = max_instances;
        }
        if let Some(enabled) = update.automatic_mcp_enabled {
            self.automatic_mcp_enabled = enabled;
        }
        if let Some(extra) = update.extra {
            self.extra = extra;
        }
    }
}

/// Config-mode descriptor returned by `GetConfigMode` (spec S4.7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMode {
    /// Configuration is read from a file on disk and may be edited.
    File,
    /// Configuration is fixed at startup and cannot be edited at runtime.
    Locked,
}

/// Process-level daemon configuration (spec S4.2, S10.3).
///
/// Built by `src/bin/mcpvd.rs` from CLI flags layered over environment
/// variables, the way `turbomcp-server`'s binary assembles its config from
/// `clap` + `envy`-style layering before constructing the transport.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Listen address; see [`crate::address::parse_listen_address`].
    pub listen_address: String,
    /// Unix socket file mode, as a string per
    /// [`crate::address::resolve_socket_mode`].
    pub socket_mode: String,
    /// Server certificate chain path, enables TLS when set.
    pub tls_cert_file: Option<String>,
    /// Server private key path.
    pub tls_key_file: Option<String>,
    /// CA bundle path for verifying client certificates (mTLS).
    pub tls_client_ca_file: Option<String>,
    /// Require client certificates when `true`.
    pub tls_client_auth: bool,
    /// HTTP/2 keepalive interval, in seconds.
    pub keepalive_interval_secs: u64,
    /// HTTP/2 keepalive timeout, in seconds.
    pub keepalive_timeout_secs: u64,
    /// Bound on the graceful-shutdown drain window, in seconds (spec S4.4:
    /// "graceful shutdown with a 5 second bound").
    pub shutdown_grace_secs: u64,
    /// Path to the runtime configuration file, if file-backed.
    pub config_file: Option<PathBuf>,
    /// `tracing_subscriber` env-filter directive string.
    pub log_filter: String,
    /// Emit structured JSON log lines instead of human-readable ones.
    pub log_json: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:50051".into(),
            socket_mode: String::new(),
            tls_cert_file: None,
            tls_key_file: None,
            tls_client_ca_file: None,
            tls_client_auth: false,
            keepalive_interval_secs: 30,
            keepalive_timeout_secs: 10,
            shutdown_grace_secs: 5,
            config_file: None,
            log_filter: "info".into(),
            log_json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_update_only_touches_present_fields() {
        let mut config = RuntimeConfig {
            automatic_mcp_enabled: true,
            ..Default::default()
        };
        config
            .min_ready
            .insert("filesystem".into(), 1);

        config.apply(RuntimeConfigUpdate {
            min_ready: Some(std::collections::BTreeMap::from([("filesystem".into(), 2)])),
            max_instances: None,
            automatic_mcp_enabled: None,
            extra: None,
        });

        assert_eq!(config.min_ready["filesystem"], 2);
        assert!(config.automatic_mcp_enabled);
    }

    #[test]
    fn runtime_config_serializes_camel_case() {
        let config = RuntimeConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("automaticMcpEnabled").is_some());
        assert!(json.get("minReady").is_some());
    }

    #[test]
    fn daemon_config_default_has_sane_shutdown_grace() {
        assert_eq!(DaemonConfig::default().shutdown_grace_secs, 5);
    }
}
