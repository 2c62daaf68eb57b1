//! Runtime configuration from environment variables.
//!
//! # Variables
//! - `DTS_DB_PATH`: tracking store file. Defaults to `<temp_dir>/dts.sqlite3`.
//! - `DTS_LOG_LEVEL`: `trace|debug|info|warn|error`. Defaults to
//!   [`default_log_level`].
//! - `DTS_LOG_DIR`: absolute directory for rolling logs. Logging stays off
//!   when unset.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "DTS_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "DTS_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "DTS_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "dts.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            db_path: read(DB_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            log_level: read(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(LOG_DIR_VAR).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn defaults_apply_when_variables_are_missing_or_blank() {
        let vars = HashMap::from([("DTS_LOG_DIR", "   ".to_string())]);
        let config = AppConfig::from_lookup(|name| vars.get(name).cloned());
        assert_eq!(config.db_path, std::env::temp_dir().join("dts.sqlite3"));
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn explicit_values_win() {
        let vars = HashMap::from([
            ("DTS_DB_PATH", "/var/lib/dts/store.db".to_string()),
            ("DTS_LOG_LEVEL", "warn".to_string()),
            ("DTS_LOG_DIR", "/var/log/dts".to_string()),
        ]);
        let config = AppConfig::from_lookup(|name| vars.get(name).cloned());
        assert_eq!(config.db_path, PathBuf::from("/var/lib/dts/store.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/dts")));
    }
}
