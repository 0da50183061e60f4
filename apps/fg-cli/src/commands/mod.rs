// commands/mod.rs: Subcommands and the wiring they share.

pub mod audit;
pub mod exec;
pub mod init;
pub mod proposals;
pub mod tools;

use std::sync::Arc;

use fg_approval::LoggingApprovalGate;
use fg_audit::AuditSink;
use fg_gateway::{register_all, FleetGovConfig, Registry, Services};
use fg_store::MemoryStore;

/// The store and registry for one CLI invocation.
pub struct Fleet {
    pub store: Arc<MemoryStore>,
    pub registry: Registry,
}

impl Fleet {
    /// Open the project's snapshot and build the registry. With `audited`
    /// set, every invocation is appended to the audit log.
    pub fn open(config: &FleetGovConfig, audited: bool) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::open(&config.paths.snapshot)?);
        let registry = build_registry(config, store.clone(), audited)?;
        Ok(Self { store, registry })
    }

    /// Write the store back to the snapshot file.
    pub async fn save(&self, config: &FleetGovConfig) -> anyhow::Result<()> {
        self.store.persist(&config.paths.snapshot).await?;
        Ok(())
    }
}

pub fn build_registry(
    config: &FleetGovConfig,
    store: Arc<MemoryStore>,
    audited: bool,
) -> anyhow::Result<Registry> {
    let services = Services::new(store, Arc::new(LoggingApprovalGate))
        .with_planning(config.planning.clone());
    let mut registry = Registry::new();
    if audited {
        registry.add_sink(Arc::new(AuditSink::open(&config.paths.audit_log)?));
    }
    register_all(
        &mut registry,
        Arc::new(services),
        config.registry.strict_registration,
    )?;
    Ok(registry)
}

/// Config rooted in a temporary project, for command tests.
#[cfg(test)]
pub(crate) fn test_config(dir: &std::path::Path) -> FleetGovConfig {
    FleetGovConfig::for_project(dir).unwrap()
}
