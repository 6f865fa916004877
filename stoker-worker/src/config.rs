use std::time::Duration;

use serde::{Deserialize, Serialize};
use stoker_http::HttpLimits;

use crate::error::WorkerError;

pub const ENV_DAEMON: &str = "SERVERINO_DAEMON";
pub const ENV_SOCKET: &str = "SERVERINO_SOCKET";
pub const ENV_DYNAMIC_WORKER: &str = "SERVERINO_DYNAMIC_WORKER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerConfig {
    pub max_request_time: Duration,
    pub max_worker_idling: Duration,
    pub max_worker_lifetime: Duration,
    pub max_dynamic_worker_idling: Duration,
    pub keep_alive: bool,
    pub user: Option<String>,
    pub group: Option<String>,
    pub max_upload_bytes: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_request_time: Duration::from_secs(5),
            max_worker_idling: Duration::from_secs(60),
            max_worker_lifetime: Duration::from_secs(6 * 60 * 60),
            max_dynamic_worker_idling: Duration::from_secs(5),
            keep_alive: true,
            user: None,
            group: None,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl WorkerConfig {
    pub fn http_limits(&self) -> HttpLimits {
        HttpLimits {
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

/// Boot parameters handed down by the daemon through the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootEnv {
    pub daemon_pid: i32,
    pub socket: String,
    pub dynamic: bool,
}

impl BootEnv {
    pub fn from_env() -> Result<Self, WorkerError> {
        let daemon = std::env::var(ENV_DAEMON)
            .map_err(|_| WorkerError::MissingEnvironment(ENV_DAEMON))?;
        let daemon_pid = daemon
            .trim()
            .parse()
            .map_err(|_| WorkerError::InvalidEnvironment(ENV_DAEMON))?;
        let socket = std::env::var(ENV_SOCKET)
            .map_err(|_| WorkerError::MissingEnvironment(ENV_SOCKET))?;
        let dynamic = std::env::var(ENV_DYNAMIC_WORKER)
            .map(|value| value == "1")
            .unwrap_or(false);

        Ok(Self {
            daemon_pid,
            socket,
            dynamic,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{BootEnv, WorkerConfig, ENV_DAEMON, ENV_DYNAMIC_WORKER, ENV_SOCKET};

    #[test]
    fn defaults_are_sane() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_request_time, Duration::from_secs(5));
        assert_eq!(config.max_worker_idling, Duration::from_secs(60));
        assert!(config.keep_alive);
        assert!(config.user.is_none());
        assert_eq!(config.http_limits().max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = WorkerConfig {
            user: Some("www-data".to_string()),
            ..WorkerConfig::default()
        };
        let encoded = serde_json::to_string(&config).unwrap();
        let decoded: WorkerConfig = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn boot_env_reads_the_daemon_contract() {
        std::env::set_var(ENV_DAEMON, "4242");
        std::env::set_var(ENV_SOCKET, "stoker-control");
        std::env::set_var(ENV_DYNAMIC_WORKER, "1");

        let boot = BootEnv::from_env().unwrap();
        assert_eq!(boot.daemon_pid, 4242);
        assert_eq!(boot.socket, "stoker-control");
        assert!(boot.dynamic);

        std::env::remove_var(ENV_DAEMON);
        std::env::remove_var(ENV_SOCKET);
        std::env::remove_var(ENV_DYNAMIC_WORKER);
    }
}
