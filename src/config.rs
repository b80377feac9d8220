//! Orchestrator configuration (ambient stack, supports spec.md §6 "Orchestrator options").
//!
//! Grounded on the teacher's bare `Config` struct, widened with the knobs `runner.rs` needs to
//! build a `Client`/`Scan` and with TOML file loading (`toml`+`serde`), the way
//! `microscaler-BRRTRouter` and `viewfromnowhere-view-from-nowhere` load their own engine config.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_RATE_LIMIT: u32 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_PARALLEL: usize = 16;
const DEFAULT_SEVERITY_THRESHOLD: f32 = 1.0;

/// Engine-wide defaults a CLI (or any other collaborator) assembles a `Client`/`Scan` from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rate_limit: u32,
    pub timeout_secs: u64,
    pub max_parallel: usize,
    /// Minimum CVSS score (per `Reporter::highest_severity_score`) that makes a scan exit non-zero
    /// (spec.md §9 Open Question (ii), narrow reading: this never filters `Reporter` itself).
    pub severity_threshold: f32,
    pub proxy_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_parallel: DEFAULT_MAX_PARALLEL,
            severity_threshold: DEFAULT_SEVERITY_THRESHOLD,
            proxy_url: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::ClientBuild(e.to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::ClientBuild(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.rate_limit, 10);
        assert_eq!(cfg.timeout_secs, 10);
        assert_eq!(cfg.max_parallel, 16);
        assert_eq!(cfg.severity_threshold, 1.0);
        assert!(cfg.proxy_url.is_none());
    }

    #[test]
    fn loads_partial_overrides_from_toml() {
        let dir = std::env::temp_dir().join("apivuln_hunter_cfg_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.toml");
        fs::write(&path, "rate_limit = 50\nseverity_threshold = 7.0\n").unwrap();

        let cfg = EngineConfig::from_toml_file(&path).unwrap();
        assert_eq!(cfg.rate_limit, 50);
        assert_eq!(cfg.severity_threshold, 7.0);
        assert_eq!(cfg.max_parallel, 16);

        let _ = fs::remove_dir_all(&dir);
    }
}
