//! Configuration for the AirPointer server.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use airpointer_core::ListenAddress;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Controller authentication.
    pub auth: AuthConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface to bind. `0.0.0.0` listens on every interface.
    pub host: String,
    /// WebSocket port.
    pub port: u16,
    /// Seconds between WebSocket pings to the controller. 0 disables them.
    pub heartbeat_secs: u64,
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret the controller must send as its first frame.
    pub password: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            heartbeat_secs: 15,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password: "admin@1234".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    pub fn listen_address(&self) -> ListenAddress {
        ListenAddress::new(self.network.host.clone(), self.network.port)
    }

    pub fn heartbeat(&self) -> Option<Duration> {
        match self.network.heartbeat_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ServerConfig::default()).unwrap();
        assert!(text.contains("port = 5000"));
        assert!(text.contains("admin@1234"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: ServerConfig = toml::from_str("[network]\nport = 6000\n").unwrap();
        assert_eq!(cfg.network.port, 6000);
        assert_eq!(cfg.network.host, "0.0.0.0");
        assert_eq!(cfg.auth.password, "admin@1234");
    }

    #[test]
    fn zero_heartbeat_disables_pings() {
        let mut cfg = ServerConfig::default();
        assert_eq!(cfg.heartbeat(), Some(Duration::from_secs(15)));
        cfg.network.heartbeat_secs = 0;
        assert_eq!(cfg.heartbeat(), None);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = ServerConfig::load(Path::new("/nonexistent/airpointer.toml"));
        assert_eq!(cfg.network.port, 5000);
    }

    #[test]
    fn written_default_loads_back() {
        let path = std::env::temp_dir().join(format!(
            "airpointer-server-{}.toml",
            std::process::id()
        ));
        ServerConfig::write_default(&path).unwrap();
        let cfg = ServerConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.network.port, 5000);
        assert_eq!(cfg.auth.password, "admin@1234");
    }
}
