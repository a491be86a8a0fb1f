//! Listen/target address parsing and Unix socket permission resolution
//! (spec S4.1).

use crate::error::CoreError;

/// The two transports a listen address can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// A TCP socket, `host:port`.
    Tcp,
    /// A Unix domain socket, identified by filesystem path.
    Unix,
}

/// Parse a server-side listen address into `(network, endpoint)`.
///
/// Precedence: `unix://` > `tcp://` > bare host (assumed TCP).
pub fn parse_listen_address(addr: &str) -> Result<(Network, String), CoreError> {
    if addr.is_empty() {
        return Err(CoreError::InvalidArgument("listen address is empty".into()));
    }

    if let Some(path) = addr.strip_prefix("unix://") {
        if path.is_empty() {
            return Err(CoreError::InvalidArgument(
                "unix listen address has empty path".into(),
            ));
        }
        return Ok((Network::Unix, path.to_string()));
    }

    if let Some(hostport) = addr.strip_prefix("tcp://") {
        if hostport.is_empty() {
            return Err(CoreError::InvalidArgument(
                "tcp listen address has empty host".into(),
            ));
        }
        return Ok((Network::Tcp, hostport.to_string()));
    }

    Ok((Network::Tcp, addr.to_string()))
}

/// Normalize a client-side target address for dialing (spec S4.1).
///
/// `unix://...` passes through unchanged (tonic's `Endpoint` connector
/// inspects the scheme itself); `tcp://X` is rewritten to bare `X`; any
/// other non-empty string passes through unchanged.
pub fn normalize_target_address(addr: &str) -> Result<String, CoreError> {
    if addr.is_empty() {
        return Err(CoreError::InvalidArgument("target address is empty".into()));
    }
    if addr.starts_with("unix://") {
        return Ok(addr.to_string());
    }
    if let Some(hostport) = addr.strip_prefix("tcp://") {
        return Ok(hostport.to_string());
    }
    Ok(addr.to_string())
}

/// Parse a POSIX file-mode string (`"0660"`, `"0o660"`, or decimal) into the
/// mode bits to `chmod` a Unix socket to. An empty string means "no chmod"
/// and resolves to `0`.
pub fn resolve_socket_mode(value: &str) -> Result<u32, CoreError> {
    if value.is_empty() {
        return Ok(0);
    }

    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0o")
        .or_else(|| trimmed.strip_prefix("0O"))
        .unwrap_or(trimmed);

    let mode = u32::from_str_radix(digits, 8)
        .map_err(|e| CoreError::InvalidArgument(format!("invalid socket mode {value:?}: {e}")))?;

    if mode > 0o777 {
        return Err(CoreError::InvalidArgument(format!(
            "socket mode {value:?} exceeds 0o777"
        )));
    }

    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_listen_address_is_invalid_argument() {
        assert!(parse_listen_address("").is_err());
    }

    #[test]
    fn unix_scheme_without_path_is_invalid() {
        assert!(parse_listen_address("unix://").is_err());
    }

    #[test]
    fn tcp_scheme_without_host_is_invalid() {
        assert!(parse_listen_address("tcp://").is_err());
    }

    #[test]
    fn unix_scheme_extracts_path() {
        let (network, endpoint) = parse_listen_address("unix:///tmp/mcpv.sock").unwrap();
        assert_eq!(network, Network::Unix);
        assert_eq!(endpoint, "/tmp/mcpv.sock");
    }

    #[test]
    fn tcp_scheme_extracts_hostport() {
        let (network, endpoint) = parse_listen_address("tcp://127.0.0.1:50051").unwrap();
        assert_eq!(network, Network::Tcp);
        assert_eq!(endpoint, "127.0.0.1:50051");
    }

    #[test]
    fn bare_address_defaults_to_tcp() {
        let (network, endpoint) = parse_listen_address("[::1]:50051").unwrap();
        assert_eq!(network, Network::Tcp);
        assert_eq!(endpoint, "[::1]:50051");
    }

    #[test]
    fn empty_socket_mode_resolves_to_zero() {
        assert_eq!(resolve_socket_mode("").unwrap(), 0);
    }

    #[test]
    fn octal_prefixed_socket_mode_parses() {
        assert_eq!(resolve_socket_mode("0o660").unwrap(), 0o660);
        assert_eq!(resolve_socket_mode("0660").unwrap(), 0o660);
    }

    #[test]
    fn socket_mode_above_0o777_is_rejected() {
        assert!(resolve_socket_mode("0o1000").is_err());
    }

    #[test]
    fn normalize_target_strips_tcp_scheme() {
        assert_eq!(
            normalize_target_address("tcp://127.0.0.1:50051").unwrap(),
            "127.0.0.1:50051"
        );
    }

    #[test]
    fn normalize_target_keeps_unix_scheme() {
        assert_eq!(
            normalize_target_address("unix:///tmp/a.sock").unwrap(),
            "unix:///tmp/a.sock"
        );
    }

    #[test]
    fn normalize_target_rejects_empty() {
        assert!(normalize_target_address("").is_err());
    }
}
