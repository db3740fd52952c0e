// src/report.rs

//! Report protocol against the remote collector
//!
//! One reporting cycle moves through three phases:
//!
//! 1. **Checksum**: send a checksum-only report with the current schema. If
//!    the collector rejects the schema with `PreconditionFailed`, fall back
//!    within the same attempt to the legacy schema. Any other error aborts
//!    the cycle; the caller's retry policy owns retries.
//! 2. **Escalate**: entered only when the collector's response requests the
//!    full inventory. Resend with the operation that succeeded, full payload
//!    this time, applying the same fallback rule. A failure here is terminal
//!    for the cycle.
//! 3. **Done**.
//!
//! No state carries over between cycles: every cycle re-attempts the current
//! schema first. Hosts that only speak the legacy schema pay one extra round
//! trip per cycle in exchange for having no fallback memory to maintain.
//!
//! The [`ApiCaller`] capability is expected to apply its own retry/backoff
//! and to classify collector rejections into [`ApiErrorKind`] before this
//! state machine sees them.

use crate::normalize::{self, RpmAliasPolicy};
use crate::schema::{Inventory, VmInventory};
use crate::snapshot::InstanceSnapshot;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error classification for collector calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The collector does not support this protocol version for this host;
    /// the only kind that triggers schema fallback
    PreconditionFailed,
    /// Everything else; surfaced to the caller unchanged
    Other,
}

/// A classified error from the collector
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
}

impl ApiError {
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::PreconditionFailed,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }
}

/// Collector response to a report call
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportResponse {
    /// The collector's checksum comparison missed; resend with full payload
    pub report_full_inventory: bool,
}

/// Capability for the two report operations
///
/// Implementations own transport, auth, timeouts, and retry/backoff; the
/// `full` flag selects between a checksum-only and a full payload.
pub trait ApiCaller {
    fn report_inventory(
        &mut self,
        inventory: &Inventory,
        full: bool,
    ) -> Result<ReportResponse, ApiError>;

    fn report_vm_inventory(
        &mut self,
        inventory: &VmInventory,
        full: bool,
    ) -> Result<ReportResponse, ApiError>;
}

/// Phase of a reporting cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPhase {
    Checksum,
    Escalate,
    Done,
}

/// Which schema a call went out with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSchema {
    Current,
    Legacy,
}

/// How a completed cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOutcome {
    /// Schema of the last successful call
    pub schema: ReportSchema,
    /// Whether the collector requested (and received) a full payload
    pub escalated: bool,
}

/// One reporting cycle over a pair of canonical inventories
///
/// State is scoped to the cycle; drop it when `run` returns.
pub struct ReportCycle<'a, C: ApiCaller> {
    caller: &'a mut C,
    inventory: &'a Inventory,
    vm_inventory: &'a VmInventory,
    phase: ReportPhase,
}

impl<'a, C: ApiCaller> ReportCycle<'a, C> {
    pub fn new(caller: &'a mut C, inventory: &'a Inventory, vm_inventory: &'a VmInventory) -> Self {
        Self {
            caller,
            inventory,
            vm_inventory,
            phase: ReportPhase::Checksum,
        }
    }

    /// Execute the cycle to completion
    pub fn run(mut self) -> Result<ReportOutcome, ApiError> {
        debug!("reporting inventory checksum");
        let (schema, response) = self.attempt(ReportSchema::Current, false)?;

        if !response.report_full_inventory {
            self.phase = ReportPhase::Done;
            debug!("collector checksum matched, no full report needed");
            return Ok(ReportOutcome {
                schema,
                escalated: false,
            });
        }

        self.phase = ReportPhase::Escalate;
        info!("collector requested full inventory, resending");
        let (schema, _) = self.attempt(schema, true)?;

        self.phase = ReportPhase::Done;
        Ok(ReportOutcome {
            schema,
            escalated: true,
        })
    }

    /// One attempt at the given completeness level, starting from `from`
    ///
    /// A `PreconditionFailed` on the current schema falls back to the legacy
    /// schema within the same attempt; on the legacy schema there is nothing
    /// left to fall back to.
    fn attempt(
        &mut self,
        from: ReportSchema,
        full: bool,
    ) -> Result<(ReportSchema, ReportResponse), ApiError> {
        if from == ReportSchema::Current {
            match self.caller.report_inventory(self.inventory, full) {
                Ok(response) => return Ok((ReportSchema::Current, response)),
                Err(e) if e.kind() == ApiErrorKind::PreconditionFailed => {
                    info!("current schema not supported for this host, falling back: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        let response = self.caller.report_vm_inventory(self.vm_inventory, full)?;
        Ok((ReportSchema::Legacy, response))
    }

    /// Current phase, for observability
    pub fn phase(&self) -> ReportPhase {
        self.phase
    }
}

/// Normalize a snapshot and run one reporting cycle over it
///
/// Normalization warnings are logged here; the protocol outcome (or the
/// terminal error of the cycle) is returned to the scheduler.
pub fn report_snapshot<C: ApiCaller>(
    caller: &mut C,
    snapshot: &InstanceSnapshot,
    policy: RpmAliasPolicy,
) -> Result<ReportOutcome, ApiError> {
    let current = normalize::normalize_current(snapshot, policy);
    let legacy = normalize::normalize_legacy(snapshot);
    for warning in current.warnings.iter().chain(&legacy.warnings) {
        warn!("normalization degraded a field: {warning}");
    }

    ReportCycle::new(caller, &current.value, &legacy.value).run()
}
