//! # fg-audit
//!
//! Tamper-evident record of every tool invocation.
//!
//! Each registry Execute call produces one [`InvocationEvent`]: who called
//! which tool, with what declared risk and scope, how long it took and how
//! it ended. Events are appended to a JSONL [`AuditLog`] whose lines form a
//! SHA-256 hash chain, so edits after the fact are detectable with
//! [`AuditLog::verify_chain`].
//!
//! ```rust,no_run
//! use fg_audit::{AuditLog, InvocationEvent, Outcome};
//!
//! let mut log = AuditLog::open("/tmp/fleetgov-audit.jsonl").unwrap();
//! let mut event = InvocationEvent::new(uuid::Uuid::new_v4(), "agent-1", "query_assets")
//!     .with_outcome(Outcome::Success);
//! log.append(&mut event).unwrap();
//! ```

pub mod error;
pub mod event;
pub mod hasher;
pub mod log;
pub mod sink;

pub use error::AuditError;
pub use event::{InvocationEvent, Outcome};
pub use log::AuditLog;
pub use sink::{AuditSink, InvocationSink, MemorySink};
