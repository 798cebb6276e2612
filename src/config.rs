use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8090;
/// A real BM1 polls the handshake a few times per second.
pub const DEFAULT_TICK_MS: u64 = 250;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Targets published once at startup, before any client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialTargets {
    pub power: u8,
    pub heating_c: u8,
    pub hot_water_c: u8,
    pub stop_pump: bool,
}

impl Default for InitialTargets {
    fn default() -> Self {
        // heating off until told otherwise
        Self {
            power: crate::ramblock::DEFAULT_POWER,
            heating_c: crate::busmodule::STOP_HEATING_SETPOINT_C,
            hot_water_c: crate::busmodule::STOP_HEATING_SETPOINT_C,
            stop_pump: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub host: String,
    pub port: u16,
    pub tick_ms: u64,
    pub simulate_furnace: bool,
    pub initial_targets: Option<InitialTargets>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            tick_ms: DEFAULT_TICK_MS,
            simulate_furnace: true,
            initial_targets: Some(InitialTargets::default()),
        }
    }
}

impl EmulatorConfig {
    /// Missing keys fall back to the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
