// snapshot.rs: Serializable fleet snapshot and a demo fleet.
//
// A snapshot is the whole state of a MemoryStore as one JSON document. The
// CLI loads it at start-up and writes it back after state-changing commands.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use fg_approval::Proposal;
use fg_planning::{
    ComplianceCounts, ControlSeverity, Environment, FailedControl, ReplicationStatus,
};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::records::{
    Alert, AlertState, Asset, AssetState, Certificate, CertificateBinding, ChangeHistory,
    ComplianceReport, DrPair, DriftDetail, DriftStatus, GoldenImage, ImageStatus, PhaseRow,
    PlanRecord, RotationRecord,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetSnapshot {
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub images: Vec<GoldenImage>,
    #[serde(default)]
    pub certificates: Vec<Certificate>,
    #[serde(default)]
    pub bindings: Vec<CertificateBinding>,
    #[serde(default)]
    pub rotations: Vec<RotationRecord>,
    #[serde(default)]
    pub compliance: Vec<ComplianceReport>,
    #[serde(default)]
    pub drift: Vec<DriftDetail>,
    #[serde(default)]
    pub dr_pairs: Vec<DrPair>,
    #[serde(default)]
    pub change_history: Vec<ChangeHistory>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub plans: Vec<PlanRecord>,
    #[serde(default)]
    pub phases: Vec<PhaseRow>,
    #[serde(default)]
    pub proposals: Vec<Proposal>,
}

impl FleetSnapshot {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let json = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load `path`, or start empty if it does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write atomically: a temp file next to `path`, then rename over it.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    /// A small, fixed fleet for trying the tools out locally.
    pub fn demo(now: DateTime<Utc>) -> Self {
        let mut snapshot = Self::default();
        let regions = ["us-east-1", "eu-west-1", "ap-southeast-2"];
        let sizes = [
            (Environment::Production, "prod", 150usize),
            (Environment::Staging, "stg", 40),
            (Environment::Development, "dev", 12),
        ];

        for (env, prefix, count) in sizes {
            for i in 0..count {
                // Every 25th asset lags one release behind.
                let drifted = i % 25 == 7;
                let asset_id = format!("{}-web-{:03}", prefix, i + 1);
                snapshot.assets.push(Asset {
                    asset_id: asset_id.clone(),
                    hostname: format!("{}.{}.internal", asset_id, prefix),
                    platform: if i % 3 == 0 { "azure" } else { "aws" }.to_string(),
                    region: regions[i % regions.len()].to_string(),
                    environment: env,
                    image_family: "ubuntu-22-base".to_string(),
                    image_version: if drifted { "2026.08.1" } else { "2026.09.2" }.to_string(),
                    state: AssetState::Running,
                    drift_status: if drifted {
                        DriftStatus::Drifted
                    } else {
                        DriftStatus::InSync
                    },
                    tags: Default::default(),
                });
                if drifted {
                    snapshot.drift.push(DriftDetail {
                        asset_id,
                        environment: env,
                        image_family: "ubuntu-22-base".to_string(),
                        expected_version: "2026.09.2".to_string(),
                        actual_version: "2026.08.1".to_string(),
                        detected_at: now - Duration::days(3),
                    });
                }
            }
        }

        snapshot.images = vec![
            GoldenImage {
                image_id: "img-ubuntu22-20260801".to_string(),
                family: "ubuntu-22-base".to_string(),
                version: "2026.08.1".to_string(),
                os: "Ubuntu 22.04 LTS".to_string(),
                status: ImageStatus::Deprecated,
                published_at: now - Duration::days(60),
                compliance_flags: vec!["cis-level-1".to_string()],
            },
            GoldenImage {
                image_id: "img-ubuntu22-20260902".to_string(),
                family: "ubuntu-22-base".to_string(),
                version: "2026.09.2".to_string(),
                os: "Ubuntu 22.04 LTS".to_string(),
                status: ImageStatus::Published,
                published_at: now - Duration::days(20),
                compliance_flags: vec!["cis-level-1".to_string(), "cis-level-2".to_string()],
            },
        ];

        snapshot.certificates = vec![Certificate {
            certificate_id: "cert-web-prod".to_string(),
            common_name: "*.prod.example.com".to_string(),
            issuer: "Example Internal CA".to_string(),
            environment: Environment::Production,
            not_before: now - Duration::days(335),
            not_after: now + Duration::days(30),
            key_algorithm: "ECDSA-P256".to_string(),
        }];
        snapshot.bindings = (1..=3)
            .map(|i| CertificateBinding {
                certificate_id: "cert-web-prod".to_string(),
                asset_id: format!("prod-web-{:03}", i),
                service: "nginx".to_string(),
            })
            .collect();

        snapshot.compliance = vec![
            ComplianceReport {
                environment: Environment::Production,
                counts: ComplianceCounts {
                    passed: 188,
                    failed: 6,
                    skipped: 12,
                },
                failures: vec![
                    FailedControl {
                        control_id: "cis-5.2.4".to_string(),
                        severity: ControlSeverity::High,
                    },
                    FailedControl {
                        control_id: "cis-1.1.8".to_string(),
                        severity: ControlSeverity::Medium,
                    },
                ],
                scanned_at: now - Duration::hours(6),
            },
            ComplianceReport {
                environment: Environment::Staging,
                counts: ComplianceCounts {
                    passed: 170,
                    failed: 30,
                    skipped: 6,
                },
                failures: vec![FailedControl {
                    control_id: "cis-4.1.1".to_string(),
                    severity: ControlSeverity::Critical,
                }],
                scanned_at: now - Duration::hours(30),
            },
        ];

        snapshot.dr_pairs = vec![
            DrPair {
                environment: Environment::Production,
                primary_region: "us-east-1".to_string(),
                dr_region: "us-west-2".to_string(),
                replication: ReplicationStatus::Healthy,
                last_failover_test: Some(now - Duration::days(90)),
            },
            DrPair {
                environment: Environment::Staging,
                primary_region: "eu-west-1".to_string(),
                dr_region: "eu-central-1".to_string(),
                replication: ReplicationStatus::Lagging,
                last_failover_test: None,
            },
        ];

        snapshot.change_history = vec![ChangeHistory {
            environment: Environment::Production,
            recent_changes: 40,
            recent_failures: 3,
        }];

        snapshot.alerts = vec![Alert {
            alert_id: "alert-1001".to_string(),
            asset_id: "prod-web-008".to_string(),
            severity: "warning".to_string(),
            message: "image drift detected".to_string(),
            state: AlertState::Open,
            acknowledged_by: None,
            acknowledged_at: None,
        }];

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fleet.json");
        let snapshot = FleetSnapshot::demo(Utc::now());
        snapshot.save(&path).unwrap();

        let loaded = FleetSnapshot::load(&path).unwrap();
        assert_eq!(loaded.assets.len(), snapshot.assets.len());
        assert_eq!(loaded.dr_pairs, snapshot.dr_pairs);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let snapshot = FleetSnapshot::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert!(snapshot.assets.is_empty());
    }

    #[test]
    fn demo_fleet_shape() {
        let snapshot = FleetSnapshot::demo(Utc::now());
        let prod = snapshot
            .assets
            .iter()
            .filter(|a| a.environment == Environment::Production)
            .count();
        assert_eq!(prod, 150);
        let drifted = snapshot
            .assets
            .iter()
            .filter(|a| a.drift_status == DriftStatus::Drifted)
            .count();
        assert_eq!(drifted, snapshot.drift.len());
    }
}
