use anyhow::Result;
use arena_core::DEFAULT_TICK_HZ;
use arena_net::DEFAULT_MAX_PENDING_INPUTS;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/client.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the game server.
    pub server_url: String,
    /// Local ticks per second.
    pub tick_hz: u32,
    /// Name committed on start; empty means spectate only.
    pub player_name: String,
    /// Directory holding `<id>.json` map documents.
    pub maps_dir: PathBuf,
    /// Cap on unacknowledged inputs kept for replay.
    pub max_pending_inputs: usize,
    pub reconnect: bool,
    pub reconnect_delay_ms: u64,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:4443".to_string(),
            tick_hz: DEFAULT_TICK_HZ,
            player_name: String::new(),
            maps_dir: PathBuf::from("maps"),
            max_pending_inputs: DEFAULT_MAX_PENDING_INPUTS,
            reconnect: true,
            reconnect_delay_ms: 1000,
            log_filter: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ClientConfig>(&contents) {
                Ok(cfg) => cfg.sanitized(),
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    ClientConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH)
                    || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!(
                        "Client config not found at {}. Using defaults",
                        path.display()
                    );
                }
                ClientConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if self.tick_hz == 0 {
            warn!("tick_hz must be positive; using {DEFAULT_TICK_HZ}");
            self.tick_hz = DEFAULT_TICK_HZ;
        }
        if self.max_pending_inputs == 0 {
            warn!("max_pending_inputs must be positive; using {DEFAULT_MAX_PENDING_INPUTS}");
            self.max_pending_inputs = DEFAULT_MAX_PENDING_INPUTS;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let cfg = ClientConfig::load_from_path(&dir.path().join("absent.toml"));
        assert_eq!(cfg, ClientConfig::default());
        assert_eq!(cfg.tick_hz, 144);
        assert_eq!(cfg.max_pending_inputs, 1024);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.toml");
        fs::write(&path, "server_url = \"ws://example:9000\"\nplayer_name = \"lima\"\n").unwrap();
        let cfg = ClientConfig::load_from_path(&path);
        assert_eq!(cfg.server_url, "ws://example:9000");
        assert_eq!(cfg.player_name, "lima");
        assert_eq!(cfg.maps_dir, PathBuf::from("maps"));
        assert!(cfg.reconnect);
    }

    #[test]
    fn unparsable_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.toml");
        fs::write(&path, "tick_hz = \"fast\"").unwrap();
        assert_eq!(ClientConfig::load_from_path(&path), ClientConfig::default());
    }

    #[test]
    fn zero_rates_are_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.toml");
        fs::write(&path, "tick_hz = 0\nmax_pending_inputs = 0\n").unwrap();
        let cfg = ClientConfig::load_from_path(&path);
        assert_eq!(cfg.tick_hz, DEFAULT_TICK_HZ);
        assert_eq!(cfg.max_pending_inputs, DEFAULT_MAX_PENDING_INPUTS);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/client.toml");
        let cfg = ClientConfig {
            player_name: "mike".to_string(),
            reconnect: false,
            ..ClientConfig::default()
        };
        cfg.save_to_path(&path).unwrap();
        assert_eq!(ClientConfig::load_from_path(&path), cfg);
    }
}
