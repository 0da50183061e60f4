// config.rs: FleetGovConfig, loaded from `.fleetgov/config.toml`.
//
// Every section and field has a default, so a missing file or a partial
// file both yield a usable config. Relative paths are resolved against the
// `.fleetgov/` state directory.

use std::path::{Path, PathBuf};

use fg_planning::dr::DEFAULT_BASELINE_SCORE;
use fg_planning::patch::{DEFAULT_CANARY_PERCENT, DEFAULT_MAX_BATCH_PERCENT};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const STATE_DIR: &str = ".fleetgov";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FleetGovConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub planning: PlanningConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Fleet snapshot backing the local store.
    #[serde(default = "default_snapshot")]
    pub snapshot: PathBuf,

    /// Append-only invocation audit log.
    #[serde(default = "default_audit_log")]
    pub audit_log: PathBuf,
}

fn default_snapshot() -> PathBuf {
    PathBuf::from("fleet.json")
}

fn default_audit_log() -> PathBuf {
    PathBuf::from("audit.jsonl")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            snapshot: default_snapshot(),
            audit_log: default_audit_log(),
        }
    }
}

/// Defaults applied when a planning tool's params leave a value unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanningConfig {
    #[serde(default = "default_canary_percent")]
    pub canary_percent: f64,

    #[serde(default = "default_max_batch_percent")]
    pub max_batch_percent: f64,

    /// Refuse patch plans needing more waves than this.
    #[serde(default)]
    pub max_waves: Option<u32>,

    #[serde(default = "default_dr_baseline")]
    pub dr_baseline_score: u32,
}

fn default_canary_percent() -> f64 {
    DEFAULT_CANARY_PERCENT
}

fn default_max_batch_percent() -> f64 {
    DEFAULT_MAX_BATCH_PERCENT
}

fn default_dr_baseline() -> u32 {
    DEFAULT_BASELINE_SCORE
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            canary_percent: default_canary_percent(),
            max_batch_percent: default_max_batch_percent(),
            max_waves: None,
            dr_baseline_score: default_dr_baseline(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// Refuse duplicate names and tools that break the approval rule
    /// instead of logging a warning.
    #[serde(default = "default_true")]
    pub strict_registration: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strict_registration: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionConfig {
    /// Deadline applied to each invocation; 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Actor recorded when the caller does not name one.
    #[serde(default = "default_actor")]
    pub default_actor: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_actor() -> String {
    "operator".to_string()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            default_actor: default_actor(),
        }
    }
}

impl FleetGovConfig {
    /// Parse a config file. Relative paths stay relative; see [`Self::resolve`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config for a project: `<root>/.fleetgov/config.toml` if present,
    /// defaults otherwise, with paths resolved under `<root>/.fleetgov/`.
    pub fn for_project(project_root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let state_dir = Self::state_dir(project_root.as_ref());
        let file = state_dir.join(CONFIG_FILE);
        let config = if file.exists() {
            Self::load(&file)?
        } else {
            Self::default()
        };
        Ok(config.resolve(&state_dir))
    }

    pub fn state_dir(project_root: &Path) -> PathBuf {
        project_root.join(STATE_DIR)
    }

    /// Anchor relative paths at `base`.
    pub fn resolve(mut self, base: &Path) -> Self {
        if self.paths.snapshot.is_relative() {
            self.paths.snapshot = base.join(&self.paths.snapshot);
        }
        if self.paths.audit_log.is_relative() {
            self.paths.audit_log = base.join(&self.paths.audit_log);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("planning.canary_percent", self.planning.canary_percent),
            ("planning.max_batch_percent", self.planning.max_batch_percent),
        ] {
            if !(value.is_finite() && value > 0.0 && value <= 100.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} is not in (0, 100]", value),
                });
            }
        }
        if self.planning.dr_baseline_score > 100 {
            return Err(ConfigError::Invalid {
                field: "planning.dr_baseline_score",
                reason: format!("{} is above 100", self.planning.dr_baseline_score),
            });
        }
        Ok(())
    }

    /// Write the config as TOML, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let rendered = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, rendered).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn default_timeout(&self) -> Option<std::time::Duration> {
        (self.execution.default_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.execution.default_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults_under_state_dir() {
        let dir = tempdir().unwrap();
        let config = FleetGovConfig::for_project(dir.path()).unwrap();
        assert_eq!(config.paths.snapshot, dir.path().join(".fleetgov/fleet.json"));
        assert_eq!(config.paths.audit_log, dir.path().join(".fleetgov/audit.jsonl"));
        assert_eq!(config.planning.canary_percent, 5.0);
        assert!(config.registry.strict_registration);
        assert_eq!(config.default_timeout(), Some(std::time::Duration::from_secs(30)));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let state = dir.path().join(".fleetgov");
        std::fs::create_dir_all(&state).unwrap();
        std::fs::write(
            state.join("config.toml"),
            "[planning]\nmax_waves = 6\n\n[execution]\ndefault_timeout_secs = 0\n",
        )
        .unwrap();

        let config = FleetGovConfig::for_project(dir.path()).unwrap();
        assert_eq!(config.planning.max_waves, Some(6));
        assert_eq!(config.planning.max_batch_percent, 20.0);
        assert_eq!(config.default_timeout(), None);
        assert_eq!(config.execution.default_actor, "operator");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[planning]\ncanary_percent = 0.0\n").unwrap();
        assert!(matches!(
            FleetGovConfig::load(&path),
            Err(ConfigError::Invalid { field: "planning.canary_percent", .. })
        ));
    }

    #[test]
    fn written_config_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".fleetgov").join("config.toml");
        let mut config = FleetGovConfig::default();
        config.planning.max_waves = Some(12);
        config.write(&path).unwrap();
        assert_eq!(FleetGovConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn absolute_paths_are_kept() {
        let mut config = FleetGovConfig::default();
        config.paths.audit_log = PathBuf::from("/var/log/fleetgov/audit.jsonl");
        let resolved = config.resolve(Path::new("/srv/project/.fleetgov"));
        assert_eq!(resolved.paths.audit_log, PathBuf::from("/var/log/fleetgov/audit.jsonl"));
        assert_eq!(resolved.paths.snapshot, PathBuf::from("/srv/project/.fleetgov/fleet.json"));
    }
}
