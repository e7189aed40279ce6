//! Discovery of the IPC socket path

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::error::IpcError;

/// Environment variable i3 sets for its children
pub const I3SOCK_ENV: &str = "I3SOCK";

/// Environment variable sway sets for its children
pub const SWAYSOCK_ENV: &str = "SWAYSOCK";

/// Discover the IPC socket path
///
/// Checks `$I3SOCK`, then `$SWAYSOCK`, then asks `i3 --get-socketpath`. The
/// resulting path must exist.
///
/// # Errors
///
/// Returns `IpcError::SocketNotSet` if no source yields a path.
/// Returns `IpcError::SocketNotFound` if the path doesn't exist.
pub fn get_socket_path() -> Result<PathBuf, IpcError> {
    resolve_socket_path(
        non_empty_var(I3SOCK_ENV),
        non_empty_var(SWAYSOCK_ENV),
        query_i3_socket_path,
    )
}

/// Pick the socket path from the given sources in priority order
fn resolve_socket_path<F>(
    i3sock: Option<String>,
    swaysock: Option<String>,
    query: F,
) -> Result<PathBuf, IpcError>
where
    F: FnOnce() -> Option<String>,
{
    let socket_path = i3sock
        .or(swaysock)
        .or_else(query)
        .map(PathBuf::from)
        .ok_or(IpcError::SocketNotSet)?;

    if !socket_path.exists() {
        return Err(IpcError::SocketNotFound { path: socket_path });
    }

    Ok(socket_path)
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Ask a running i3 for its socket path
fn query_i3_socket_path() -> Option<String> {
    let output = Command::new("i3").arg("--get-socketpath").output().ok()?;
    if !output.status.success() {
        debug!(status = %output.status, "i3 --get-socketpath failed");
        return None;
    }
    let path = String::from_utf8(output.stdout).ok()?;
    let path = path.trim();
    (!path.is_empty()).then(|| path.to_string())
}
