//! Address resolution.

use std::net::SocketAddr;

use crate::NetError;

/// Resolve `host:port` to the first matching socket address.
pub(crate) async fn resolve(host: &str, port: u16) -> Result<SocketAddr, NetError> {
    let invalid = |reason: String| NetError::InvalidAddress { addr: format!("{host}:{port}"), reason };

    let mut addrs =
        tokio::net::lookup_host((host, port)).await.map_err(|e| invalid(e.to_string()))?;
    addrs.next().ok_or_else(|| invalid("no addresses found".to_string()))
}
