//! # fg-gateway
//!
//! The tool registry agents call through, and the fleet governance tools
//! behind it.
//!
//! A [`Registry`] is built once at start-up from [`tools::all`] (or
//! [`tools::register_all`]), given one or more invocation sinks, and then
//! shared read-only. [`Registry::execute`] is the single entry point: it
//! resolves the tool by name, runs it under the caller's [`ToolContext`]
//! and records every invocation, whatever its outcome.
//!
//! State-changing tools never act on the fleet directly. They persist a
//! proposal in `pending_approval` and hand it to the approval gate.
//!
//! [`ToolContext`]: fg_tool::ToolContext

pub mod config;
pub mod error;
pub mod registry;
pub mod tools;

pub use config::{FleetGovConfig, PlanningConfig};
pub use error::{ConfigError, RegistryError};
pub use registry::Registry;
pub use tools::{register_all, Services};
