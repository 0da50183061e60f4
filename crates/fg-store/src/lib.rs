//! # fg-store
//!
//! Interfaces to the fleet data store, plus an in-process implementation.
//!
//! Tools see the store only through the [`AssetQuery`], [`ImageQuery`],
//! [`CertificateQuery`], [`ComplianceQuery`] and [`Persistence`] traits,
//! bundled as [`FleetStore`]. [`MemoryStore`] implements all of them over
//! a JSON [`FleetSnapshot`] and is what the CLI and tests run against.

pub mod error;
pub mod memory;
pub mod query;
pub mod records;
pub mod snapshot;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::{AssetQuery, CertificateQuery, ComplianceQuery, FleetStore, ImageQuery, Persistence};
pub use records::{
    Alert, AlertState, Asset, AssetFilter, AssetState, Certificate, CertificateBinding,
    ChangeHistory, ComplianceReport, DrPair, DriftDetail, DriftStatus, GoldenImage, ImageStatus,
    PhaseRow, PlanRecord, RotationRecord, RotationStatus,
};
pub use snapshot::FleetSnapshot;
