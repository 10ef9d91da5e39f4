//! Host configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tm02_protocol::MAX_POINTS_PER_PACKET;

use crate::error::ConfigError;
use crate::simulator::SimulatorConfig;

/// Settings for connecting to and talking with the instrument.
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```yaml
/// port: /dev/ttyACM0
/// response_timeout_ms: 500
/// simulator:
///   latency_ms: 0
///   seed: 42
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Endpoint to connect to; the simulator when unset.
    pub port: Option<String>,
    /// Serial baud rate.
    pub baud: u32,
    /// How long to wait for each response, in milliseconds.
    pub response_timeout_ms: u64,
    /// Calibration points per table packet.
    pub points_per_packet: usize,
    /// Simulated instrument settings.
    pub simulator: SimulatorConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: 115_200,
            response_timeout_ms: 1000,
            points_per_packet: MAX_POINTS_PER_PACKET,
            simulator: SimulatorConfig::default(),
        }
    }
}

impl HostConfig {
    /// Load a configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Response timeout as a [`Duration`].
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}
