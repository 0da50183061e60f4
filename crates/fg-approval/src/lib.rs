//! # fg-approval
//!
//! Proposal lifecycle for state-changing fleet operations.
//!
//! Tools that change fleet state never act directly. They build a
//! [`Proposal`], move it to `pending_approval` and hand it to an
//! [`ApprovalGate`]. A reviewer's [`ApprovalDecision`] then moves it to
//! `approved` or `rejected`; only approved proposals may execute.

pub mod error;
pub mod gate;
pub mod proposal;

pub use error::ApprovalError;
pub use gate::{ApprovalGate, LoggingApprovalGate};
pub use proposal::{ApprovalDecision, Proposal, ProposalState};
