//! Configuration
//!
//! Tier and chain settings with sensible defaults, overridable through
//! `CALLGATE_*` environment variables (a `.env` file is honoured).

use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::{CallError, CallResult};
use crate::scope::UserId;

const DEFAULT_IDLE_CAPACITY: usize = 64;

/// Settings for one tier
#[derive(Debug, Clone)]
pub struct TierConfig {
    /// Tier (owning process) name; labels logs and forms the scope owner
    pub name: String,
    /// Buffer of the gate's idle broadcast channel
    pub idle_capacity: usize,
}

impl TierConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            name: "shell".to_string(),
            idle_capacity: DEFAULT_IDLE_CAPACITY,
        }
    }
}

/// Settings for a whole chain of tiers
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Tier names, origin first, end of chain last
    pub tiers: Vec<String>,
    pub idle_capacity: usize,
    /// Fixed user for the demo; a fresh one is generated when unset
    pub user: Option<UserId>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            tiers: vec!["shell".to_string(), "dom".to_string(), "core".to_string()],
            idle_capacity: DEFAULT_IDLE_CAPACITY,
            user: None,
        }
    }
}

impl ChainConfig {
    /// Read `CALLGATE_TIERS`, `CALLGATE_IDLE_CAPACITY` and `CALLGATE_USER`
    /// from the process environment after loading `.env`
    pub fn from_env() -> CallResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same variables, taken from an explicit env file only
    pub fn from_env_file(path: impl AsRef<Path>) -> CallResult<Self> {
        let path = path.as_ref();
        // from_path would write into the process environment
        #[allow(deprecated)]
        let iter = dotenv::from_path_iter(path)
            .map_err(|e| CallError::usage(format!("Cannot read {}: {}", path.display(), e)))?;

        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) =
                item.map_err(|e| CallError::usage(format!("Malformed line in {}: {}", path.display(), e)))?;
            vars.insert(key, value);
        }

        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CallResult<Self> {
        let mut config = Self::default();

        if let Some(tiers) = lookup("CALLGATE_TIERS") {
            let tiers: Vec<String> = tiers
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
            if tiers.is_empty() {
                return Err(CallError::usage("CALLGATE_TIERS names no tier"));
            }
            config.tiers = tiers;
        }

        if let Some(capacity) = lookup("CALLGATE_IDLE_CAPACITY") {
            config.idle_capacity = capacity
                .trim()
                .parse()
                .map_err(|_| CallError::usage(format!("CALLGATE_IDLE_CAPACITY is not a number: {}", capacity)))?;
        }

        if let Some(user) = lookup("CALLGATE_USER") {
            let id = Uuid::parse_str(user.trim())
                .map_err(|e| CallError::usage(format!("CALLGATE_USER is not a uuid: {}", e)))?;
            config.user = Some(UserId(id));
        }

        Ok(config)
    }

    /// Per-tier settings, in chain order
    pub fn tier_configs(&self) -> Vec<TierConfig> {
        self.tiers
            .iter()
            .map(|name| TierConfig {
                name: name.clone(),
                idle_capacity: self.idle_capacity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ChainConfig::default();
        assert_eq!(config.tiers, vec!["shell", "dom", "core"]);
        assert_eq!(config.tier_configs()[2].name, "core");
        assert!(config.user.is_none());
    }

    #[test]
    fn test_from_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CALLGATE_TIERS=\"origin, middle ,end\"").unwrap();
        writeln!(file, "CALLGATE_IDLE_CAPACITY=8").unwrap();
        writeln!(file, "CALLGATE_USER=8c754db1-3e62-498c-a664-3b38aaa799f9").unwrap();

        let config = ChainConfig::from_env_file(file.path()).unwrap();
        assert_eq!(config.tiers, vec!["origin", "middle", "end"]);
        assert_eq!(config.idle_capacity, 8);
        assert_eq!(config.user.map(|u| u.short()).as_deref(), Some("8c75"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CALLGATE_IDLE_CAPACITY=lots").unwrap();
        assert!(ChainConfig::from_env_file(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CALLGATE_TIERS=\" , \"").unwrap();
        assert!(ChainConfig::from_env_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(ChainConfig::from_env_file("/nonexistent/callgate.env").is_err());
    }
}
