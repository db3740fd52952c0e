// src/provider.rs

//! Snapshot assembly from abstract fact sources
//!
//! The provider composes OS facts, legacy package facts, and unified
//! collector facts into one [`InstanceSnapshot`]. How the facts are scraped
//! from the host is the sources' business; this module only combines them.
//!
//! A failing source degrades that section to its empty value with a warning.
//! A snapshot is always produced; the worst case is an empty one carrying
//! just the collection timestamp.

use crate::error::Result;
use crate::snapshot::{InstanceSnapshot, PackageSet, UnifiedPackage};
use chrono::{DateTime, Utc};
use tracing::warn;

/// OS identity facts for one host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsFacts {
    pub hostname: String,
    pub long_name: String,
    pub short_name: String,
    pub version: String,
    pub architecture: String,
    pub kernel_version: String,
    pub kernel_release: String,
}

/// Source of OS identity facts
pub trait OsFactsSource {
    fn os_facts(&self) -> Result<OsFacts>;
}

/// Source of the legacy per-manager package collections
pub trait PackageFactsSource {
    fn installed_packages(&self) -> Result<PackageSet>;
    fn package_updates(&self) -> Result<PackageSet>;
}

/// Source of the unified collector's flat records
pub trait UnifiedFactsSource {
    fn unified_packages(&self) -> Result<Vec<UnifiedPackage>>;
}

/// Time source seam so collection timestamps are testable
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Composes fact sources into snapshots
pub struct SnapshotProvider<O, P, U, C> {
    os: O,
    packages: P,
    unified: U,
    clock: C,
    agent_version: String,
}

impl<O, P, U, C> SnapshotProvider<O, P, U, C>
where
    O: OsFactsSource,
    P: PackageFactsSource,
    U: UnifiedFactsSource,
    C: Clock,
{
    pub fn new(os: O, packages: P, unified: U, clock: C, agent_version: impl Into<String>) -> Self {
        Self {
            os,
            packages,
            unified,
            clock,
            agent_version: agent_version.into(),
        }
    }

    /// Collect one snapshot, degrading per source
    pub fn collect(&self) -> InstanceSnapshot {
        let os_facts = self.os.os_facts().unwrap_or_else(|e| {
            warn!("OS facts unavailable: {e}");
            OsFacts::default()
        });
        let installed = self.packages.installed_packages().unwrap_or_else(|e| {
            warn!("installed packages unavailable: {e}");
            PackageSet::default()
        });
        let updates = self.packages.package_updates().unwrap_or_else(|e| {
            warn!("package updates unavailable: {e}");
            PackageSet::default()
        });
        let unified = self.unified.unified_packages().unwrap_or_else(|e| {
            warn!("unified packages unavailable: {e}");
            Vec::new()
        });

        InstanceSnapshot {
            hostname: os_facts.hostname,
            long_name: os_facts.long_name,
            short_name: os_facts.short_name,
            version: os_facts.version,
            architecture: os_facts.architecture,
            kernel_version: os_facts.kernel_version,
            kernel_release: os_facts.kernel_release,
            agent_version: self.agent_version.clone(),
            last_updated: Some(self.clock.now()),
            installed,
            updates,
            unified,
        }
    }
}
