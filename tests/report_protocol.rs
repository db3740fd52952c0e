// tests/report_protocol.rs

//! Full reporting cycles driven from a snapshot: normalization, fingerprint
//! comparison at the fake collector, schema fallback, and escalation.

use hostinv::fingerprint::{fingerprint_stable, fingerprint_stable_vm, Fingerprint};
use hostinv::normalize::RpmAliasPolicy;
use hostinv::report::{report_snapshot, ApiCaller, ApiError, ApiErrorKind, ReportResponse, ReportSchema};
use hostinv::schema::{Inventory, VmInventory};
use hostinv::snapshot::{InstanceSnapshot, PkgInfo};

fn snapshot() -> InstanceSnapshot {
    InstanceSnapshot {
        hostname: "h1".to_string(),
        short_name: "debian".to_string(),
        agent_version: "1.0.0".to_string(),
        installed: hostinv::snapshot::PackageSet {
            apt: vec![PkgInfo::new("vim", "amd64", "2:9.0")],
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Fake collector that compares stable fingerprints like the real one
struct FakeCollector {
    known_current: Option<Fingerprint>,
    known_legacy: Option<Fingerprint>,
    supports_current: bool,
    current_calls: Vec<bool>,
    legacy_calls: Vec<bool>,
}

impl FakeCollector {
    fn new(supports_current: bool) -> Self {
        Self {
            known_current: None,
            known_legacy: None,
            supports_current,
            current_calls: Vec::new(),
            legacy_calls: Vec::new(),
        }
    }
}

impl ApiCaller for FakeCollector {
    fn report_inventory(
        &mut self,
        inventory: &Inventory,
        full: bool,
    ) -> Result<ReportResponse, ApiError> {
        self.current_calls.push(full);
        if !self.supports_current {
            return Err(ApiError::precondition_failed(
                "inventory reporting not enabled for this host",
            ));
        }

        let fp = fingerprint_stable(inventory).map_err(|e| ApiError::other(e.to_string()))?;
        let matches = self.known_current.as_ref() == Some(&fp);
        if full || matches {
            self.known_current = Some(fp);
        }
        Ok(ReportResponse {
            report_full_inventory: !matches && !full,
        })
    }

    fn report_vm_inventory(
        &mut self,
        inventory: &VmInventory,
        full: bool,
    ) -> Result<ReportResponse, ApiError> {
        self.legacy_calls.push(full);

        let fp = fingerprint_stable_vm(inventory).map_err(|e| ApiError::other(e.to_string()))?;
        let matches = self.known_legacy.as_ref() == Some(&fp);
        if full || matches {
            self.known_legacy = Some(fp);
        }
        Ok(ReportResponse {
            report_full_inventory: !matches && !full,
        })
    }
}

#[test]
fn unknown_host_escalates_then_settles_to_checksum_only() {
    let mut collector = FakeCollector::new(true);
    let snapshot = snapshot();
    let policy = RpmAliasPolicy::default();

    // First cycle: collector has never seen this host, requests full data.
    let outcome = report_snapshot(&mut collector, &snapshot, policy).unwrap();
    assert_eq!(outcome.schema, ReportSchema::Current);
    assert!(outcome.escalated);
    assert_eq!(collector.current_calls, vec![false, true]);
    assert!(collector.legacy_calls.is_empty());

    // Second cycle with an unchanged snapshot: checksum matches, one call.
    let outcome = report_snapshot(&mut collector, &snapshot, policy).unwrap();
    assert!(!outcome.escalated);
    assert_eq!(collector.current_calls, vec![false, true, false]);
}

#[test]
fn legacy_only_host_pays_one_extra_call_per_cycle() {
    let mut collector = FakeCollector::new(false);
    let snapshot = snapshot();
    let policy = RpmAliasPolicy::default();

    let outcome = report_snapshot(&mut collector, &snapshot, policy).unwrap();
    assert_eq!(outcome.schema, ReportSchema::Legacy);
    assert!(outcome.escalated);
    // Cycle re-attempts the current schema first every time; no fallback
    // memory is carried across cycles.
    let outcome = report_snapshot(&mut collector, &snapshot, policy).unwrap();
    assert_eq!(outcome.schema, ReportSchema::Legacy);
    assert!(!outcome.escalated);

    assert_eq!(collector.current_calls, vec![false, false]);
    assert_eq!(collector.legacy_calls, vec![false, true, false]);
}

#[test]
fn changed_inventory_triggers_new_escalation() {
    let mut collector = FakeCollector::new(true);
    let policy = RpmAliasPolicy::default();

    let before = snapshot();
    report_snapshot(&mut collector, &before, policy).unwrap();

    let mut after = before.clone();
    after.installed.apt[0].version = "2:9.1".to_string();
    let outcome = report_snapshot(&mut collector, &after, policy).unwrap();
    assert!(outcome.escalated);
}

#[test]
fn opaque_collector_errors_surface_unchanged() {
    struct FailingCaller;

    impl ApiCaller for FailingCaller {
        fn report_inventory(
            &mut self,
            _inventory: &Inventory,
            _full: bool,
        ) -> Result<ReportResponse, ApiError> {
            Err(ApiError::other("unavailable"))
        }

        fn report_vm_inventory(
            &mut self,
            _inventory: &VmInventory,
            _full: bool,
        ) -> Result<ReportResponse, ApiError> {
            panic!("legacy schema must not be attempted on opaque errors");
        }
    }

    let err = report_snapshot(&mut FailingCaller, &snapshot(), RpmAliasPolicy::default())
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Other);
}
