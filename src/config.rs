//! Launcher settings.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LaunchError;
use crate::provider::ProtocolVersion;

/// Settings for starting plugin processes. Every field has a default, so an
/// empty YAML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// How long to wait for the plugin's handshake line.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// Largest gRPC message accepted or sent, in bytes. Schemas of large
    /// providers exceed tonic's 4 MiB default.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    #[serde(default = "default_plugin_min_port")]
    pub plugin_min_port: u16,
    #[serde(default = "default_plugin_max_port")]
    pub plugin_max_port: u16,
    /// Major protocol versions offered to the plugin.
    #[serde(default = "default_protocol_versions")]
    pub protocol_versions: Vec<u32>,
    /// Extra environment for the plugin process.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Re-emit the plugin's stderr through `tracing`. When false, stderr is
    /// discarded.
    #[serde(default = "default_forward_stderr")]
    pub forward_stderr: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: default_handshake_timeout_secs(),
            max_message_size: default_max_message_size(),
            plugin_min_port: default_plugin_min_port(),
            plugin_max_port: default_plugin_max_port(),
            protocol_versions: default_protocol_versions(),
            env: HashMap::new(),
            forward_stderr: default_forward_stderr(),
        }
    }
}

fn default_handshake_timeout_secs() -> u64 {
    30
}

fn default_max_message_size() -> usize {
    256 << 20
}

fn default_plugin_min_port() -> u16 {
    10000
}

fn default_plugin_max_port() -> u16 {
    25000
}

fn default_protocol_versions() -> Vec<u32> {
    vec![5, 6]
}

fn default_forward_stderr() -> bool {
    true
}

impl LaunchConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Read and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, LaunchError> {
        let content = fs::read_to_string(path).map_err(|e| {
            LaunchError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, LaunchError> {
        // serde_yaml reads an empty document as unit, not as an empty map.
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| LaunchError::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Offered versions must all be ones this crate has an adapter for.
    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.protocol_versions.is_empty() {
            return Err(LaunchError::Config(
                "protocol_versions must offer at least one version".to_string(),
            ));
        }
        if let Some(v) = self
            .protocol_versions
            .iter()
            .find(|v| ProtocolVersion::from_major(**v).is_none())
        {
            return Err(LaunchError::Config(format!(
                "protocol version {v} is not supported"
            )));
        }
        if self.plugin_min_port > self.plugin_max_port {
            return Err(LaunchError::Config(format!(
                "plugin_min_port {} is greater than plugin_max_port {}",
                self.plugin_min_port, self.plugin_max_port
            )));
        }
        if self.max_message_size == 0 {
            return Err(LaunchError::Config(
                "max_message_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Value of `PLUGIN_PROTOCOL_VERSIONS` for the plugin process.
    pub(crate) fn protocol_versions_env(&self) -> String {
        self.protocol_versions
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}
