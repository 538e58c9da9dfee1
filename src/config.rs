//! Environment-driven configuration

use serde::{Deserialize, Serialize};

/// Optional characters dealt at game start
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// Deal Percival (good) and Morgana (evil)
    pub percival_and_morgana: bool,
    /// Deal Mordred, hidden from Merlin
    pub mordred: bool,
    /// Deal Oberon, unknown to the other evil players
    pub oberon: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            percival_and_morgana: true,
            mordred: false,
            oberon: false,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v != "0" && v != "false"
        })
        .unwrap_or(default)
}

impl GameConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            percival_and_morgana: env_flag(
                "AVALON_PERCIVAL_MORGANA",
                defaults.percival_and_morgana,
            ),
            mordred: env_flag("AVALON_MORDRED", defaults.mordred),
            oberon: env_flag("AVALON_OBERON", defaults.oberon),
        }
    }
}

/// Logging configuration for the binary
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive string
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "avalon=debug".to_string(),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let filter = std::env::var("AVALON_LOG")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::default().filter);
        Self { filter }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "AVALON_PERCIVAL_MORGANA",
            "AVALON_MORDRED",
            "AVALON_OBERON",
            "AVALON_LOG",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        assert_eq!(GameConfig::from_env(), GameConfig::default());
        assert_eq!(LogConfig::from_env().filter, "avalon=debug");
    }

    #[test]
    #[serial]
    fn test_flags_from_env() {
        clear_env();
        std::env::set_var("AVALON_PERCIVAL_MORGANA", "false");
        std::env::set_var("AVALON_MORDRED", "1");
        std::env::set_var("AVALON_OBERON", "0");

        let config = GameConfig::from_env();
        assert!(!config.percival_and_morgana);
        assert!(config.mordred);
        assert!(!config.oberon);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_log_filter_from_env() {
        clear_env();
        std::env::set_var("AVALON_LOG", "  avalon=trace ");
        assert_eq!(LogConfig::from_env().filter, "avalon=trace");
        clear_env();
    }
}
