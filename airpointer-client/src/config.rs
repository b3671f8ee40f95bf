//! Controller configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use airpointer_core::{AirPointerError, ConnectionInfo};
use airpointer_core::signal::{ConditionerParams, TapThresholds};

/// Top-level configuration for the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server to dial.
    pub network: NetworkConfig,
    /// Shared password.
    pub auth: AuthConfig,
    /// What this controller reports about itself.
    pub device: DeviceConfig,
    /// Motion conditioning.
    pub motion: MotionConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server IP or host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connect and handshake timeout in milliseconds.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub password: String,
}

/// Device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Model string sent in `DEVICE_INFO`.
    pub model: String,
    /// Trackpad control enabled at start.
    pub control_on: bool,
    /// Air mouse enabled at start.
    pub air_mouse_on: bool,
}

/// Motion tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Gain applied to trackpad deltas.
    pub trackpad_sensitivity: f64,
    /// Gain applied to gyroscope rates.
    pub gyro_sensitivity: f64,
    /// Exponential smoothing factor in (0, 1]. 1 disables smoothing.
    pub smoothing: f64,
    /// Gyro values at or below this magnitude are ignored.
    pub dead_zone: f64,
    /// Longest touch that still counts as a tap.
    pub tap_max_duration_ms: u64,
    /// Largest displacement that still counts as a tap.
    pub tap_max_distance: f64,
    /// Window for volume-key double taps.
    pub double_tap_window_ms: u64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            auth: AuthConfig::default(),
            device: DeviceConfig::default(),
            motion: MotionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            timeout_ms: 5000,
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

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: "Unknown Device".into(),
            control_on: false,
            air_mouse_on: false,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            trackpad_sensitivity: 1.0,
            gyro_sensitivity: 20.0,
            smoothing: 0.2,
            dead_zone: 0.02,
            tap_max_duration_ms: 200,
            tap_max_distance: 10.0,
            double_tap_window_ms: 300,
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

impl ClientConfig {
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

    /// Write the default configuration to `path`.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Apply the JSON payload a server advertises for pairing
    /// (`{"ip":..,"port":..,"password":..}`).
    pub fn apply_pairing(&mut self, payload: &str) -> Result<(), AirPointerError> {
        let pairing: Pairing = serde_json::from_str(payload)?;
        self.network.host = pairing.ip;
        self.network.port = pairing.port;
        self.auth.password = pairing.password;
        Ok(())
    }

    /// Point at `host:port`.
    pub fn set_server(&mut self, server: &str) -> Result<(), AirPointerError> {
        let (host, port) = server
            .rsplit_once(':')
            .ok_or_else(|| AirPointerError::Config(format!("expected host:port, got {server}")))?;
        let port = port
            .parse()
            .map_err(|e| AirPointerError::Config(format!("bad port in {server}: {e}")))?;
        self.network.host = host.to_owned();
        self.network.port = port;
        Ok(())
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.network.host.clone(), self.network.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.network.timeout_ms.max(1))
    }
}

#[derive(Debug, Deserialize)]
struct Pairing {
    ip: String,
    port: u16,
    password: String,
}

impl MotionConfig {
    pub fn trackpad_params(&self) -> ConditionerParams {
        ConditionerParams::default()
            .with_sensitivity(self.trackpad_sensitivity)
            .with_smoothing(self.smoothing)
            .with_dead_zone(self.dead_zone)
    }

    pub fn gyro_params(&self) -> ConditionerParams {
        ConditionerParams::default()
            .with_sensitivity(self.gyro_sensitivity)
            .with_smoothing(self.smoothing)
            .with_dead_zone(self.dead_zone)
    }

    pub fn tap_thresholds(&self) -> TapThresholds {
        TapThresholds {
            max_duration_ms: self.tap_max_duration_ms,
            max_distance: self.tap_max_distance,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        let parsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.port, 5000);
        assert_eq!(parsed.motion.gyro_sensitivity, 20.0);
        assert_eq!(parsed.motion.double_tap_window_ms, 300);
    }

    #[test]
    fn params_follow_motion_section() {
        let mut motion = MotionConfig::default();
        motion.smoothing = 5.0;
        let params = motion.gyro_params();
        assert_eq!(params.sensitivity, 20.0);
        assert_eq!(params.smoothing, 1.0);
        assert_eq!(motion.trackpad_params().sensitivity, 1.0);
        assert_eq!(motion.tap_thresholds(), TapThresholds::default());
    }

    #[test]
    fn pairing_payload_overrides_network_and_auth() {
        let mut cfg = ClientConfig::default();
        cfg.apply_pairing(r#"{"ip":"10.0.0.7","port":6000,"password":"s3cret"}"#)
            .unwrap();
        assert_eq!(cfg.connection_info().url(), "ws://10.0.0.7:6000");
        assert_eq!(cfg.auth.password, "s3cret");

        assert!(cfg.apply_pairing(r#"{"ip":"10.0.0.7"}"#).is_err());
    }

    #[test]
    fn server_override_parses_host_and_port() {
        let mut cfg = ClientConfig::default();
        cfg.set_server("192.168.1.9:5123").unwrap();
        assert_eq!(cfg.network.host, "192.168.1.9");
        assert_eq!(cfg.network.port, 5123);

        assert!(cfg.set_server("192.168.1.9").is_err());
        assert!(cfg.set_server("host:notaport").is_err());
    }

    #[test]
    fn written_default_loads_back() {
        let path = std::env::temp_dir().join(format!(
            "airpointer-client-{}.toml",
            std::process::id()
        ));
        ClientConfig::write_default(&path).unwrap();
        let cfg = ClientConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.auth.password, "admin@1234");
        assert_eq!(cfg.device.model, "Unknown Device");
    }

    #[test]
    fn connection_info_uses_network_section() {
        let mut cfg = ClientConfig::default();
        cfg.network.host = "192.168.1.20".into();
        assert_eq!(cfg.connection_info().url(), "ws://192.168.1.20:5000");
    }
}
