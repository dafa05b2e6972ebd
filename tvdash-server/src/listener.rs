//! Listening socket setup with port auto-selection

use crate::error::ServerError;
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Bind `host:first_port`, moving to the next port while the current one is taken
///
/// Tries at most `attempts` consecutive ports (at least one). Errors other than
/// "address in use" abort immediately.
pub async fn bind_with_fallback(
    host: &str,
    first_port: u16,
    attempts: u16,
) -> Result<TcpListener, ServerError> {
    let attempts = attempts.max(1);
    let mut last = first_port;

    for offset in 0..attempts {
        let Some(port) = first_port.checked_add(offset) else {
            break;
        };
        last = port;

        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                if offset > 0 {
                    info!("Port {} busy, using port {} instead", first_port, port);
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                warn!("Port {} on {} already in use", port, host);
            }
            Err(e) => {
                return Err(ServerError::Bind {
                    addr: format!("{}:{}", host, port),
                    source: e,
                });
            }
        }
    }

    Err(ServerError::NoFreePort {
        host: host.to_string(),
        first: first_port,
        last,
    })
}
