//! Link configuration
//!
//! Line parameters, handshake timing, and the retry bound, with
//! load/save against the platform config directory.

use crate::core::transport::SerialParity;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "payterm", "Payterm").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Protocol engine configuration.
///
/// The terminal line is fixed at the device's parameters (8N1 by
/// default); only the baud rate is normally negotiated per site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Default terminal identifier stamped into request frames
    pub terminal_id: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5, 6, 7, 8)
    pub data_bits: u8,
    /// Stop bits (1, 2)
    pub stop_bits: u8,
    /// Parity
    pub parity: SerialParity,
    /// Handshake (ACK/NACK) wait window in milliseconds
    pub ack_timeout_ms: u64,
    /// Response frame wait window in milliseconds
    pub response_timeout_ms: u64,
    /// Maximum send attempts before giving up
    pub max_retries: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            terminal_id: "PAYTERM0".to_string(),
            baud_rate: 115200,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            ack_timeout_ms: 3_000,
            response_timeout_ms: 30_000,
            max_retries: 3,
        }
    }
}

impl LinkConfig {
    /// Handshake wait window
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Response wait window
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Set the default terminal identifier
    #[must_use]
    pub fn terminal_id(mut self, id: &str) -> Self {
        self.terminal_id = id.to_string();
        self
    }

    /// Set the handshake wait window
    #[must_use]
    pub fn ack_timeout_ms(mut self, ms: u64) -> Self {
        self.ack_timeout_ms = ms;
        self
    }

    /// Set the response wait window
    #[must_use]
    pub fn response_timeout_ms(mut self, ms: u64) -> Self {
        self.response_timeout_ms = ms;
        self
    }

    /// Set the maximum send attempts
    #[must_use]
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.max_retries = attempts;
        self
    }

    /// Load config from the platform config directory
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = config_dir()
            .ok_or("Could not determine config directory")?
            .join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the platform config directory
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let dir = config_dir().ok_or("Could not determine config directory")?;
        std::fs::create_dir_all(&dir)?;

        let content = toml::to_string_pretty(self)?;
        std::fs::write(dir.join("config.toml"), content)?;
        Ok(())
    }
}
