// src/lib.rs

//! Hostinv: host inventory normalization and collector reporting
//!
//! The crate takes an already-collected [`InstanceSnapshot`] of OS and
//! package facts, normalizes it into the two canonical wire schemas,
//! computes content fingerprints for change detection, and drives the
//! checksum/full report protocol against a remote collector.
//!
//! # Architecture
//!
//! - Snapshot in, canonical schemas out: normalization is pure and total
//! - Stable fingerprints are order-independent; raw fingerprints are
//!   byte-exact
//! - The report cycle is a three-phase state machine with schema fallback
//!   and no cross-cycle state
//! - Transport, retries, and attribute storage live behind the `ApiCaller`
//!   and `AttributeSink` capabilities

pub mod attributes;
mod error;
pub mod fingerprint;
pub mod normalize;
pub mod provider;
pub mod report;
pub mod schema;
pub mod snapshot;

pub use attributes::{publish_snapshot, AttributeSink};
pub use error::{Error, Result};
pub use fingerprint::{fingerprint_raw, fingerprint_stable, fingerprint_stable_vm, Fingerprint};
pub use normalize::{
    normalize_current, normalize_legacy, NormalizeWarning, Normalized, RpmAliasPolicy,
};
pub use provider::{Clock, SnapshotProvider, SystemClock};
pub use report::{
    report_snapshot, ApiCaller, ApiError, ApiErrorKind, ReportCycle, ReportOutcome, ReportPhase,
    ReportResponse, ReportSchema,
};
pub use schema::{Inventory, VmInventory};
pub use snapshot::{InstanceSnapshot, PackageSet, PkgInfo, UnifiedPackage};
