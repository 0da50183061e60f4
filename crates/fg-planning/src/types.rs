// types.rs: Environment and change-type vocabularies shared by every planner.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlanningError;

/// Deployment environment an operation targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[serde(alias = "prod")]
    Production,
    #[serde(alias = "stage")]
    Staging,
    #[serde(alias = "dev")]
    Development,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Production,
        Environment::Staging,
        Environment::Development,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "staging" | "stage" => Ok(Environment::Staging),
            "development" | "dev" => Ok(Environment::Development),
            _ => Err(PlanningError::UnknownEnvironment(s.to_string())),
        }
    }
}

/// Kind of change being rolled out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Patch,
    #[serde(alias = "major-upgrade")]
    MajorUpgrade,
    #[serde(alias = "config-change")]
    ConfigChange,
    Reboot,
}

impl ChangeType {
    pub const ALL: [ChangeType; 4] = [
        ChangeType::Patch,
        ChangeType::MajorUpgrade,
        ChangeType::ConfigChange,
        ChangeType::Reboot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Patch => "patch",
            ChangeType::MajorUpgrade => "major_upgrade",
            ChangeType::ConfigChange => "config_change",
            ChangeType::Reboot => "reboot",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "patch" => Ok(ChangeType::Patch),
            "major_upgrade" => Ok(ChangeType::MajorUpgrade),
            "config_change" => Ok(ChangeType::ConfigChange),
            "reboot" => Ok(ChangeType::Reboot),
            _ => Err(PlanningError::UnknownChangeType(s.to_string())),
        }
    }
}
