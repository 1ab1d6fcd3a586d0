use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::EngineError;

fn default_engine_path() -> PathBuf {
    PathBuf::from("stockfish")
}
fn default_depth() -> u32 {
    10
}
fn default_multi_pv() -> u32 {
    1
}
fn default_max_retries() -> u32 {
    3
}
fn default_handshake_timeout_ms() -> u64 {
    5000
}
fn default_sync_timeout_ms() -> u64 {
    3000
}
fn default_search_timeout_ms() -> u64 {
    30_000
}
fn default_time_buffer_ms() -> u64 {
    1000
}
fn default_spawn_grace_ms() -> u64 {
    100
}
fn default_stop_grace_ms() -> u64 {
    500
}
fn default_match_timeout_ms() -> u64 {
    60_000
}
fn default_true() -> bool {
    true
}

/// Engine and search settings. The crate only ever reads this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_path")]
    pub engine_path: PathBuf,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default = "default_multi_pv")]
    pub multi_pv: u32,
    /// When set, searches use `go movetime` instead of `go depth`.
    #[serde(default)]
    pub min_time_ms: Option<u64>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
    #[serde(default = "default_time_buffer_ms")]
    pub time_buffer_ms: u64,
    #[serde(default = "default_spawn_grace_ms")]
    pub spawn_grace_ms: u64,
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    #[serde(default = "default_match_timeout_ms")]
    pub match_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub enable_wdl: bool,
    /// Extra `setoption` pairs sent after `uciok`, e.g. `Threads`, `Hash`.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_path: default_engine_path(),
            depth: default_depth(),
            multi_pv: default_multi_pv(),
            min_time_ms: None,
            max_retries: default_max_retries(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            sync_timeout_ms: default_sync_timeout_ms(),
            search_timeout_ms: default_search_timeout_ms(),
            time_buffer_ms: default_time_buffer_ms(),
            spawn_grace_ms: default_spawn_grace_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            match_timeout_ms: default_match_timeout_ms(),
            enable_wdl: true,
            options: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Loads `.env` if present, then overlays `ENGINE_*` variables on the
    /// defaults.
    pub fn from_env() -> Result<Self, EngineError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("ENGINE_PATH") {
            config.engine_path = PathBuf::from(path);
        }
        read_number(&lookup, "ENGINE_DEPTH", &mut config.depth)?;
        read_number(&lookup, "ENGINE_MULTI_PV", &mut config.multi_pv)?;
        read_number(&lookup, "ENGINE_MAX_RETRIES", &mut config.max_retries)?;
        read_number(&lookup, "ENGINE_HANDSHAKE_TIMEOUT_MS", &mut config.handshake_timeout_ms)?;
        read_number(&lookup, "ENGINE_SYNC_TIMEOUT_MS", &mut config.sync_timeout_ms)?;
        read_number(&lookup, "ENGINE_SEARCH_TIMEOUT_MS", &mut config.search_timeout_ms)?;
        read_number(&lookup, "ENGINE_MATCH_TIMEOUT_MS", &mut config.match_timeout_ms)?;
        read_number(&lookup, "ENGINE_TIME_BUFFER_MS", &mut config.time_buffer_ms)?;
        read_number(&lookup, "ENGINE_SPAWN_GRACE_MS", &mut config.spawn_grace_ms)?;
        read_number(&lookup, "ENGINE_STOP_GRACE_MS", &mut config.stop_grace_ms)?;
        if let Some(raw) = lookup("ENGINE_MIN_TIME_MS") {
            let ms = parse_number::<u64>("ENGINE_MIN_TIME_MS", &raw)?;
            config.min_time_ms = (ms > 0).then_some(ms);
        }
        if let Some(raw) = lookup("ENGINE_ENABLE_WDL") {
            config.enable_wdl = matches!(raw.trim(), "1" | "true" | "yes" | "on");
        }
        for (var, option) in [("ENGINE_THREADS", "Threads"), ("ENGINE_HASH_MB", "Hash")] {
            if let Some(raw) = lookup(var) {
                parse_number::<u32>(var, &raw)?;
                config.options.insert(option.to_string(), raw.trim().to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.engine_path.as_os_str().is_empty() {
            return Err(EngineError::Config("engine path is empty".to_string()));
        }
        if self.depth == 0 {
            return Err(EngineError::Config("depth must be at least 1".to_string()));
        }
        if self.multi_pv == 0 {
            return Err(EngineError::Config("multi_pv must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn spawn_grace(&self) -> Duration {
        Duration::from_millis(self.spawn_grace_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn match_timeout(&self) -> Duration {
        Duration::from_millis(self.match_timeout_ms)
    }

    /// Depth searches get the flat search timeout; time-based searches get
    /// their budget plus a buffer.
    pub fn search_deadline(&self, movetime_ms: Option<u64>) -> Duration {
        match movetime_ms {
            Some(ms) => Duration::from_millis(ms + self.time_buffer_ms),
            None => Duration::from_millis(self.search_timeout_ms),
        }
    }
}

fn parse_number<N: std::str::FromStr>(key: &str, raw: &str) -> Result<N, EngineError> {
    raw.trim()
        .parse::<N>()
        .map_err(|_| EngineError::Config(format!("{} is not a number: '{}'", key, raw)))
}

fn read_number<F, N>(lookup: &F, key: &str, target: &mut N) -> Result<(), EngineError>
where
    F: Fn(&str) -> Option<String>,
    N: std::str::FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = parse_number(key, &raw)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.depth, 10);
        assert_eq!(config.sync_timeout(), Duration::from_secs(3));
        assert!(config.min_time_ms.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("ENGINE_PATH", "/opt/engines/sf"),
            ("ENGINE_DEPTH", "18"),
            ("ENGINE_MULTI_PV", "3"),
            ("ENGINE_MIN_TIME_MS", "1500"),
            ("ENGINE_ENABLE_WDL", "false"),
            ("ENGINE_THREADS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.engine_path, PathBuf::from("/opt/engines/sf"));
        assert_eq!(config.depth, 18);
        assert_eq!(config.multi_pv, 3);
        assert_eq!(config.min_time_ms, Some(1500));
        assert!(!config.enable_wdl);
        assert_eq!(config.options.get("Threads").map(String::as_str), Some("4"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(EngineConfig::from_lookup(lookup_from(&[("ENGINE_DEPTH", "deep")])).is_err());
        assert!(EngineConfig::from_lookup(lookup_from(&[("ENGINE_MULTI_PV", "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup_from(&[("ENGINE_HASH_MB", "lots")])).is_err());
    }

    #[test]
    fn test_search_deadline() {
        let config = EngineConfig::default();
        assert_eq!(config.search_deadline(None), Duration::from_secs(30));
        assert_eq!(config.search_deadline(Some(2000)), Duration::from_millis(3000));
    }

    #[test]
    fn test_grace_and_buffer_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("ENGINE_TIME_BUFFER_MS", "250"),
            ("ENGINE_SPAWN_GRACE_MS", "20"),
            ("ENGINE_STOP_GRACE_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(config.spawn_grace(), Duration::from_millis(20));
        assert_eq!(config.stop_grace(), Duration::from_millis(1500));
        assert_eq!(config.search_deadline(Some(2000)), Duration::from_millis(2250));
        assert!(EngineConfig::from_lookup(lookup_from(&[("ENGINE_STOP_GRACE_MS", "soon")])).is_err());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "engine_path": "sf", "multi_pv": 4 }"#).unwrap();
        assert_eq!(config.multi_pv, 4);
        assert_eq!(config.max_retries, 3);
        assert!(config.enable_wdl);
    }
}
