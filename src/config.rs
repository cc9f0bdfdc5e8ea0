use std::path::PathBuf;
use std::time::Duration;

pub const SOCKET_PATH: &str = "/tmp/tnote.sock";
pub const GRACE_INTERVAL: Duration = Duration::from_millis(100);
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const MAX_POLL_ATTEMPTS: u32 = 20;
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub grace_interval: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(SOCKET_PATH),
            grace_interval: GRACE_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub socket_path: PathBuf,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(SOCKET_PATH),
            poll_interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}

pub fn log_dir() -> PathBuf {
    std::env::temp_dir().join("tnote").join("logs")
}
