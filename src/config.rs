use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

pub const DEFAULT_STATISTICS_API: &str = "http://localhost:8080/api";
pub const DEFAULT_GAME_DATA_API: &str = "https://esi.evetech.net/latest";
pub const DEFAULT_DATASOURCE: &str = "tranquility";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Everything the client and the front end need to know about their environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub statistics_api_base: String,
    pub game_data_api_base: String,
    pub datasource: String,
    /// `None` keeps cached game data in memory only.
    pub cache_file: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub strict_status: bool,
}

impl Config {
    pub fn new(statistics_api_base: impl Into<String>, game_data_api_base: impl Into<String>) -> Self {
        Self {
            statistics_api_base: normalize_base(statistics_api_base.into()),
            game_data_api_base: normalize_base(game_data_api_base.into()),
            datasource: DEFAULT_DATASOURCE.to_string(),
            cache_file: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            strict_status: false,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let statistics = base_url(&lookup, "ZKB_STATISTICS_API", DEFAULT_STATISTICS_API)?;
        let game_data = base_url(&lookup, "ZKB_GAME_DATA_API", DEFAULT_GAME_DATA_API)?;

        let mut config = Self::new(statistics, game_data);
        if let Some(datasource) = lookup("ZKB_DATASOURCE").filter(|s| !s.trim().is_empty()) {
            config.datasource = datasource.trim().to_string();
        }
        config.cache_file = match lookup("ZKB_CACHE_FILE") {
            Some(path) if !path.trim().is_empty() => Some(PathBuf::from(path.trim())),
            _ => dirs::cache_dir().map(|dir| dir.join("zkb-report").join("cache.json")),
        };
        if let Some(host) = lookup("ZKB_HOST").filter(|s| !s.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        config.port = parsed(&lookup, "ZKB_PORT", DEFAULT_PORT)?;
        config.strict_status = parsed(&lookup, "ZKB_STRICT_STATUS", false)?;

        Ok(config)
    }
}

fn normalize_base(base: String) -> String {
    base.trim().trim_end_matches('/').to_string()
}

fn base_url<F>(lookup: &F, var: &str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default.to_string()),
        Some(value) => {
            let value = normalize_base(value);
            if value.is_empty() {
                Err(ConfigError::InvalidEnvValue {
                    var: var.to_string(),
                    reason: "base URL must not be empty".to_string(),
                })
            } else {
                Ok(value)
            }
        }
    }
}

fn parsed<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.statistics_api_base, DEFAULT_STATISTICS_API);
        assert_eq!(config.game_data_api_base, DEFAULT_GAME_DATA_API);
        assert_eq!(config.datasource, "tranquility");
        assert_eq!(config.port, 3000);
        assert!(!config.strict_status);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = Config::from_lookup(lookup_from(&[
            ("ZKB_STATISTICS_API", "http://192.168.0.100:8080/api/"),
            ("ZKB_CACHE_FILE", "/tmp/zkb.json"),
        ]))
        .unwrap();
        assert_eq!(config.statistics_api_base, "http://192.168.0.100:8080/api");
        assert_eq!(config.cache_file, Some(PathBuf::from("/tmp/zkb.json")));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("ZKB_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvValue { ref var, .. } if var == "ZKB_PORT"));
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("ZKB_GAME_DATA_API", " / ")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvValue { .. }));
    }

    #[test]
    fn strict_status_flag() {
        let config = Config::from_lookup(lookup_from(&[("ZKB_STRICT_STATUS", "true")])).unwrap();
        assert!(config.strict_status);
    }
}
