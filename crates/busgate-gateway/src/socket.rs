//! Socket activation for the HTTP listener.
//!
//! If a supervisor passes a pre-bound socket via `LISTEN_FDS` and
//! `LISTEN_PID`, the first descriptor (fd 3) is adopted; otherwise the
//! gateway binds the configured address itself.
//!
//! ```ini
//! # busgate.socket
//! [Socket]
//! ListenStream=127.0.0.1:8080
//! ```

use std::io;

use listenfd::ListenFd;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Get a TCP listener, adopting an activated socket when one was passed.
///
/// # Errors
///
/// Returns an error if the activated socket cannot be adopted or if binding
/// `addr` fails.
pub async fn get_listener(addr: &str) -> io::Result<TcpListener> {
    if let Some(listener) = take_activated_listener()? {
        info!(
            local_addr = %listener.local_addr()?,
            "Using activated socket"
        );
        return Ok(listener);
    }

    debug!(addr = %addr, "Socket activation not available, binding");
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        io::Error::new(e.kind(), format!("failed to bind to {addr}: {e}"))
    })?;
    info!(local_addr = %listener.local_addr()?, "Listening (direct bind)");
    Ok(listener)
}

/// Adopt the first passed TCP socket, if this process was activated.
///
/// # Errors
///
/// Returns an error if activation is configured but descriptor 3 is not a
/// usable TCP listener.
pub fn take_activated_listener() -> io::Result<Option<TcpListener>> {
    if !has_socket() {
        return Ok(None);
    }

    let mut listenfd = ListenFd::from_env();
    match listenfd.take_tcp_listener(0)? {
        Some(std_listener) => {
            std_listener.set_nonblocking(true)?;
            Ok(Some(TcpListener::from_std(std_listener)?))
        }
        None => {
            debug!("No TCP listener among passed descriptors");
            Ok(None)
        }
    }
}

/// Check whether sockets were passed to this process.
#[must_use]
pub fn has_socket() -> bool {
    let fds = std::env::var("LISTEN_FDS").ok();
    let pid = std::env::var("LISTEN_PID").ok();
    let activated = is_activated(fds.as_deref(), pid.as_deref(), std::process::id());
    if activated {
        debug!(listen_fds = ?fds, listen_pid = ?pid, "Socket activation detected");
    }
    activated
}

fn is_activated(listen_fds: Option<&str>, listen_pid: Option<&str>, current_pid: u32) -> bool {
    let fds: u32 = listen_fds.and_then(|v| v.trim().parse().ok()).unwrap_or(0);
    let pid: Option<u32> = listen_pid.and_then(|v| v.trim().parse().ok());
    fds > 0 && pid == Some(current_pid)
}
