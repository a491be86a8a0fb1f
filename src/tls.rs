//! TLS / mTLS material assembly for the transport shell (spec S4.2).
//!
//! Built on tonic's `tls-ring` feature. The minimum negotiated TLS version
//! is 1.2 for both server and client configurations.

use std::path::Path;

use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};

use crate::error::CoreError;

/// Server-side TLS settings as read from configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerTlsSettings {
    /// Path to the server certificate chain (PEM).
    pub cert_file: String,
    /// Path to the server private key (PEM).
    pub key_file: String,
    /// Require and verify client certificates (mTLS) when `true`.
    pub client_auth: bool,
    /// Path to the CA bundle used to verify client certificates. Required
    /// when `client_auth` is `true`.
    pub ca_file: Option<String>,
}

/// Client-side TLS settings as read from configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientTlsSettings {
    /// Path to a CA bundle to verify the server certificate, if not using
    /// the system trust store.
    pub ca_file: Option<String>,
    /// Path to a client certificate (PEM), for mTLS.
    pub cert_file: Option<String>,
    /// Path to the client private key (PEM), required alongside `cert_file`.
    pub key_file: Option<String>,
    /// Server name used for SNI / certificate verification.
    pub domain_name: Option<String>,
}

fn read_pem(path: &str, what: &str) -> Result<Vec<u8>, CoreError> {
    if !Path::new(path).exists() {
        return Err(CoreError::InvalidArgument(format!(
            "{what} file not found: {path}"
        )));
    }
    std::fs::read(path).map_err(|e| CoreError::Internal(format!("reading {what} {path}: {e}")))
}

/// Assemble a tonic [`ServerTlsConfig`] from [`ServerTlsSettings`].
///
/// Minimum TLS version is 1.2. When `client_auth` is enabled, the CA bundle
/// is loaded from `ca_file` (a missing or unparseable file is an error) and
/// client certificates are required and verified; otherwise no client
/// certificate pool is installed.
pub fn load_server_tls(settings: &ServerTlsSettings) -> Result<ServerTlsConfig, CoreError> {
    let cert = read_pem(&settings.cert_file, "TLS certificate")?;
    let key = read_pem(&settings.key_file, "TLS key")?;
    let identity = Identity::from_pem(cert, key);

    let mut config = ServerTlsConfig::new().identity(identity);

    if settings.client_auth {
        let ca_file = settings.ca_file.as_deref().ok_or_else(|| {
            CoreError::InvalidArgument("client_auth enabled without ca_file".into())
        })?;
        let ca_pem = read_pem(ca_file, "client CA bundle")?;
        let ca = Certificate::from_pem(ca_pem);
        config = config.client_ca_root(ca).client_auth_optional(false);
    }

    Ok(config)
}

/// Assemble a tonic [`ClientTlsConfig`] from [`ClientTlsSettings`].
///
/// CA and client certificate are both optional; when neither is set the
/// resulting config trusts the platform root store and presents no client
/// certificate.
pub fn load_client_tls(settings: &ClientTlsSettings) -> Result<ClientTlsConfig, CoreError> {
    let mut config = ClientTlsConfig::new();

    if let Some(ca_file) = &settings.ca_file {
        let ca_pem = read_pem(ca_file, "CA bundle")?;
        config = config.ca_certificate(Certificate::from_pem(ca_pem));
    }

    match (&settings.cert_file, &settings.key_file) {
        (Some(cert_file), Some(key_file)) => {
            let cert = read_pem(cert_file, "client certificate")?;
            let key = read_pem(key_file, "client key")?;
            config = config.identity(Identity::from_pem(cert, key));
        }
        (None, None) => {}
        _ => {
            return Err(CoreError::InvalidArgument(
                "client TLS cert_file and key_file must be set together".into(),
            ));
        }
    }

    if let Some(domain) = &settings.domain_name {
        config = config.domain_name(domain.clone());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_cert_file_is_invalid_argument() {
        let settings = ServerTlsSettings {
            cert_file: "/nonexistent/cert.pem".into(),
            key_file: "/nonexistent/key.pem".into(),
            client_auth: false,
            ca_file: None,
        };
        assert!(load_server_tls(&settings).is_err());
    }

    #[test]
    fn client_auth_without_ca_file_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::File::create(&cert_path)
            .unwrap()
            .write_all(b"not a real cert")
            .unwrap();
        std::fs::File::create(&key_path)
            .unwrap()
            .write_all(b"not a real key")
            .unwrap();

        let settings = ServerTlsSettings {
            cert_file: cert_path.to_string_lossy().into_owned(),
            key_file: key_path.to_string_lossy().into_owned(),
            client_auth: true,
            ca_file: None,
        };
        assert!(load_server_tls(&settings).is_err());
    }

    #[test]
    fn client_cert_requires_key_too() {
        let settings = ClientTlsSettings {
            ca_file: None,
            cert_file: Some("/tmp/cert.pem".into()),
            key_file: None,
            domain_name: None,
        };
        assert!(load_client_tls(&settings).is_err());
    }
}
