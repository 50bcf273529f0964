//! Engine socket and configuration paths
//!
//! The Podman socket lives at `$XDG_RUNTIME_DIR/podman/podman.sock`. When
//! the runtime dir is not exported (cron, plain ssh) we fall back to the
//! systemd default `/run/user/<uid>`.

use std::path::PathBuf;

/// Name used for the config directory
const APP_NAME: &str = "devdb";

/// Get the Podman API socket path for the current user
#[cfg(unix)]
pub fn engine_socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").ok();
    let uid = unsafe { libc::getuid() };
    engine_socket_path_from(runtime_dir.as_deref(), uid)
}

/// Resolve the socket path from an optional runtime dir and a uid
pub fn engine_socket_path_from(runtime_dir: Option<&str>, uid: u32) -> PathBuf {
    let base = match runtime_dir {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(format!("/run/user/{}", uid)),
    };
    base.join("podman").join("podman.sock")
}

/// Render a socket path as a `unix://` URI for log and error messages
pub fn socket_uri(path: &std::path::Path) -> String {
    format!("unix://{}", path.display())
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/devdb/`
/// - macOS: `~/Library/Application Support/devdb/`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
