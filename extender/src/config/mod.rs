//! Startup configuration loading and the immutable node capacity table.
//!
//! The expected TOML structure is:
//! ```toml
//! prom_addr = "http://prometheus:9090"
//! prom_basic_auth_user = "admin"
//! prom_basic_auth_password = "secret"
//! local_cache_expire = 15
//! demo_expire = "1h"
//! sync_status_interval = "0/5 * * * * *"
//! use_bnp = true
//! topsis_min = false
//!
//! netbw_map_keys = ["node1", "node2", "node3"]
//! netbw_map_values = [1000, 1500, 2500]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::model::KBIT_PER_MBIT;

/// Errors that make the process unfit to serve traffic — every variant
/// here is `CONFIG_INVALID` and causes a non-zero exit before the HTTP
/// server binds or the first refresh tick runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error(
        "netbw_map_keys has {keys} entries but netbw_map_values has {values} — lists must be the same length"
    )]
    CapacityLengthMismatch { keys: usize, values: usize },

    #[error("netbw_map_values contains a zero speed for node '{node}' — capacity must be positive")]
    ZeroCapacity { node: String },
}

/// Raw TOML shape, deserialized as-is before validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    prom_addr: String,
    #[serde(default)]
    prom_basic_auth_user: String,
    #[serde(default)]
    prom_basic_auth_password: String,

    local_cache_expire: u64,

    /// Unused by the core scoring pipeline — carried for config-file
    /// compatibility with the diagnostic endpoint it originally fed.
    #[serde(default)]
    demo_expire: Option<String>,

    sync_status_interval: String,

    #[serde(default)]
    use_bnp: bool,
    #[serde(default)]
    topsis_min: bool,

    netbw_map_keys: Vec<String>,
    netbw_map_values: Vec<i64>,
}

/// Immutable node capacity table: `node name → Kbit/s`.
///
/// Built once at startup from `netbw_map_keys` / `netbw_map_values` and
/// never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct CapacityTable {
    net_kbit: HashMap<String, i64>,
}

impl CapacityTable {
    fn build(keys: &[String], values_mbit: &[i64]) -> Result<Self, ConfigError> {
        if keys.len() != values_mbit.len() {
            return Err(ConfigError::CapacityLengthMismatch {
                keys: keys.len(),
                values: values_mbit.len(),
            });
        }

        let mut net_kbit = HashMap::with_capacity(keys.len());
        for (node, &speed_mbit) in keys.iter().zip(values_mbit.iter()) {
            if speed_mbit == 0 {
                return Err(ConfigError::ZeroCapacity {
                    node: node.clone(),
                });
            }
            net_kbit.insert(node.clone(), speed_mbit * KBIT_PER_MBIT);
        }

        Ok(CapacityTable { net_kbit })
    }

    /// Returns the network capacity for `node` in Kbit/s, if known.
    pub fn get(&self, node: &str) -> Option<i64> {
        self.net_kbit.get(node).copied()
    }

    /// A node is *known* iff it appears in this table (§3).
    pub fn is_known(&self, node: &str) -> bool {
        self.net_kbit.contains_key(node)
    }

    /// Borrows the full `node → Kbit/s` map.
    pub fn as_map(&self) -> &HashMap<String, i64> {
        &self.net_kbit
    }
}

/// Fully validated, process-wide configuration.
///
/// Immutable after [`Config::load`] returns — see §5 "Shared mutable
/// state: only the load cache."
#[derive(Debug, Clone)]
pub struct Config {
    pub prom_addr: String,
    pub prom_basic_auth_user: String,
    pub prom_basic_auth_password: String,
    pub local_cache_expire_secs: u64,
    /// Parsed from config but not read by any scoring operation — kept for
    /// config-file compatibility with the diagnostic endpoint it once fed.
    pub demo_expire: Option<String>,
    pub sync_status_interval: String,
    pub use_bnp: bool,
    pub topsis_min: bool,
    pub capacity: CapacityTable,
}

impl Config {
    /// Parses and validates a TOML configuration file.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read, is not valid
    /// TOML, or the capacity table fails validation (§3, §7
    /// `CONFIG_INVALID`).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        if raw.demo_expire.is_none() {
            warn!("demo_expire not set in config — diagnostic-only field, safe to ignore");
        }

        let capacity = CapacityTable::build(&raw.netbw_map_keys, &raw.netbw_map_values)?;

        info!(
            nodes = capacity.as_map().len(),
            algorithm = if raw.use_bnp { "bnp" } else { "cmdn" },
            "configuration loaded"
        );

        Ok(Config {
            prom_addr: raw.prom_addr,
            prom_basic_auth_user: raw.prom_basic_auth_user,
            prom_basic_auth_password: raw.prom_basic_auth_password,
            local_cache_expire_secs: raw.local_cache_expire,
            demo_expire: raw.demo_expire,
            sync_status_interval: raw.sync_status_interval,
            use_bnp: raw.use_bnp,
            topsis_min: raw.topsis_min,
            capacity,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const VALID: &str = r#"
prom_addr = "http://prometheus:9090"
prom_basic_auth_user = "admin"
prom_basic_auth_password = "secret"
local_cache_expire = 15
sync_status_interval = "0/5 * * * * *"
use_bnp = true
topsis_min = false
netbw_map_keys = ["node1", "node2", "node3"]
netbw_map_values = [1000, 1500, 2500]
"#;

    #[test]
    fn loads_valid_config() {
        let f = toml_tempfile(VALID);
        let cfg = Config::load(f.path()).unwrap();

        assert_eq!(cfg.prom_addr, "http://prometheus:9090");
        assert_eq!(cfg.local_cache_expire_secs, 15);
        assert!(cfg.use_bnp);
        assert!(!cfg.topsis_min);
        assert_eq!(cfg.capacity.get("node1"), Some(1_000_000));
        assert_eq!(cfg.capacity.get("node2"), Some(1_500_000));
        assert_eq!(cfg.capacity.get("node3"), Some(2_500_000));
        assert!(cfg.capacity.is_known("node1"));
        assert!(!cfg.capacity.is_known("node4"));
    }

    #[test]
    fn mismatched_capacity_lists_is_config_invalid() {
        let toml = r#"
prom_addr = "http://prometheus:9090"
local_cache_expire = 15
sync_status_interval = "0/5 * * * * *"
netbw_map_keys = ["node1", "node2"]
netbw_map_values = [1000]
"#;
        let f = toml_tempfile(toml);
        let err = Config::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::CapacityLengthMismatch { keys: 2, values: 1 }));
    }

    #[test]
    fn zero_capacity_entry_is_config_invalid() {
        let toml = r#"
prom_addr = "http://prometheus:9090"
local_cache_expire = 15
sync_status_interval = "0/5 * * * * *"
netbw_map_keys = ["node1", "node2"]
netbw_map_values = [1000, 0]
"#;
        let f = toml_tempfile(toml);
        let err = Config::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity { node } if node == "node2"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::load(Path::new("/nonexistent/path/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let f = toml_tempfile("this is not valid toml :::");
        let err = Config::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
