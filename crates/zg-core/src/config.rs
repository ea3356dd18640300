use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// The `[guest]` section: how the guest module is linked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestSection {
    /// Import module name the bridge functions are registered under.
    pub import_module: String,
    /// Name of the exported linear memory.
    pub memory_export: String,
    /// Link WASI preview1 imports for guests built against WASI.
    pub wasi: bool,
}

impl Default for GuestSection {
    fn default() -> Self {
        Self {
            import_module: "env".to_string(),
            memory_export: "memory".to_string(),
            wasi: false,
        }
    }
}

/// The `[socket]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketSection {
    /// How long a transport worker blocks on a read before servicing sends.
    pub poll_interval_ms: u64,
    /// Inbound messages above this size are dropped.
    pub max_message_bytes: usize,
}

impl SocketSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for SocketSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            max_message_bytes: 16 * 1024 * 1024,
        }
    }
}

/// The `[log]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log target for text the guest writes through `wasm_log_write`.
    pub guest_target: String,
    /// Emit a record at every newline instead of waiting for `wasm_log_flush`.
    pub flush_on_newline: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            guest_target: "guest".to_string(),
            flush_on_newline: false,
        }
    }
}

/// Bridge configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub guest: GuestSection,
    pub socket: SocketSection,
    pub log: LogSection,
}

impl BridgeConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> crate::Result<Self> {
        toml::from_str(text).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = BridgeConfig::from_toml("").unwrap();
        assert_eq!(config.guest.import_module, "env");
        assert_eq!(config.guest.memory_export, "memory");
        assert!(!config.guest.wasi);
        assert_eq!(config.socket.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.log.guest_target, "guest");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = BridgeConfig::from_toml(
            r#"
[socket]
max_message_bytes = 1024

[log]
flush_on_newline = true
"#,
        )
        .unwrap();
        assert_eq!(config.socket.max_message_bytes, 1024);
        assert_eq!(config.socket.poll_interval_ms, 10);
        assert!(config.log.flush_on_newline);
    }

    #[test]
    fn malformed_config_is_rejected() {
        let err = BridgeConfig::from_toml("[socket]\npoll_interval_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
