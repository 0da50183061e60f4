// init.rs: `fg init`, create `.fleetgov/` with a config and a demo fleet.

use std::path::Path;

use chrono::Utc;
use fg_gateway::config::CONFIG_FILE;
use fg_gateway::FleetGovConfig;
use fg_store::FleetSnapshot;

pub fn execute(project_root: &Path, config: &FleetGovConfig, force: bool) -> anyhow::Result<()> {
    let state_dir = FleetGovConfig::state_dir(project_root);
    let config_path = state_dir.join(CONFIG_FILE);

    if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
    } else {
        // Write the defaults, not `config`: its paths are already resolved.
        FleetGovConfig::default().write(&config_path)?;
        println!("Wrote {}", config_path.display());
    }

    let snapshot_path = &config.paths.snapshot;
    if snapshot_path.exists() && !force {
        println!("Fleet snapshot already exists at {}", snapshot_path.display());
    } else {
        let snapshot = FleetSnapshot::demo(Utc::now());
        snapshot.save(snapshot_path)?;
        println!(
            "Wrote demo fleet ({} assets) to {}",
            snapshot.assets.len(),
            snapshot_path.display()
        );
    }

    println!("Audit log: {}", config.paths.audit_log.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_config;
    use tempfile::tempdir;

    #[test]
    fn init_creates_config_and_snapshot_once() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        execute(dir.path(), &config, false).unwrap();
        assert!(dir.path().join(".fleetgov/config.toml").exists());
        let snapshot = FleetSnapshot::load(&config.paths.snapshot).unwrap();
        assert_eq!(snapshot.alerts.len(), 1);

        // A second run keeps what is there.
        let mut edited = snapshot.clone();
        edited.alerts.clear();
        edited.save(&config.paths.snapshot).unwrap();
        execute(dir.path(), &config, false).unwrap();
        assert!(FleetSnapshot::load(&config.paths.snapshot)
            .unwrap()
            .alerts
            .is_empty());

        execute(dir.path(), &config, true).unwrap();
        assert_eq!(
            FleetSnapshot::load(&config.paths.snapshot).unwrap().alerts.len(),
            1
        );
    }
}
