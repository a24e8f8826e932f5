//! Server Configuration
//!
//! | Variable | Default |
//! |----------|---------|
//! | `BIND_ADDR` | `0.0.0.0:3000` |
//! | `MAX_TURNS` | `8` |
//! | `TOOL_TIMEOUT_SECS` | `45` |
//! | `PARALLEL_TOOLS` | `true` |

use std::time::Duration;

use anyhow::Context;

use agent_core::reasoning::{DEFAULT_MAX_TURNS, DEFAULT_TOOL_TIMEOUT};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_turns: usize,
    pub tool_timeout: Duration,
    pub parallel_tools: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            max_turns: DEFAULT_MAX_TURNS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            parallel_tools: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their default
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(turns) = get("MAX_TURNS") {
            config.max_turns = turns.trim().parse().with_context(|| format!("MAX_TURNS must be a positive integer, got '{}'", turns))?;
            anyhow::ensure!(config.max_turns > 0, "MAX_TURNS must be at least 1");
        }
        if let Some(secs) = get("TOOL_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().with_context(|| format!("TOOL_TIMEOUT_SECS must be an integer, got '{}'", secs))?;
            config.tool_timeout = Duration::from_secs(secs);
        }
        if let Some(parallel) = get("PARALLEL_TOOLS") {
            config.parallel_tools = matches!(parallel.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.max_turns, 8);
        assert!(config.parallel_tools);
    }

    #[test]
    fn test_overrides() {
        let config = from(&[("MAX_TURNS", "3"), ("PARALLEL_TOOLS", "false"), ("TOOL_TIMEOUT_SECS", "5")]).unwrap();
        assert_eq!(config.max_turns, 3);
        assert!(!config.parallel_tools);
        assert_eq!(config.tool_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_turns_rejected() {
        assert!(from(&[("MAX_TURNS", "zero")]).is_err());
        assert!(from(&[("MAX_TURNS", "0")]).is_err());
    }
}
