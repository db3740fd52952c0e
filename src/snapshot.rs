// src/snapshot.rs

//! Instance inventory snapshot: the input to one reporting cycle
//!
//! A snapshot bundles already-collected OS facts and package facts for one
//! host. It is immutable once constructed; the normalizer derives the
//! canonical wire representations from it without mutating it.
//!
//! Package facts arrive from two generations of collectors:
//! - the legacy per-manager collections in [`PackageSet`] (one vector per
//!   package manager, plus Windows-specific record kinds), and
//! - the unified collector's flat [`UnifiedPackage`] records, which carry a
//!   free-form type tag, a package URL, and a metadata map.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All collected facts for one host at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub hostname: String,
    pub long_name: String,
    pub short_name: String,
    pub version: String,
    pub architecture: String,
    pub kernel_version: String,
    pub kernel_release: String,
    pub agent_version: String,
    /// When collection finished, if known
    pub last_updated: Option<DateTime<Utc>>,

    /// Legacy per-manager collections of installed packages
    pub installed: PackageSet,
    /// Legacy per-manager collections of available updates
    pub updates: PackageSet,
    /// Flat records from the unified, manager-agnostic collector
    pub unified: Vec<UnifiedPackage>,
}

impl InstanceSnapshot {
    /// RFC 3339 rendering of the collection timestamp, empty when unknown
    pub fn last_updated_rfc3339(&self) -> String {
        self.last_updated
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_default()
    }
}

/// Per-manager package collections
///
/// An empty vector means the manager reported nothing (or is not present on
/// the host); the normalizer emits no entries for it, never placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageSet {
    pub apt: Vec<PkgInfo>,
    pub deb: Vec<PkgInfo>,
    pub yum: Vec<PkgInfo>,
    pub zypper: Vec<PkgInfo>,
    /// Flat RPM listing; reported as the YUM or Zypper variant depending on
    /// which manager tool is present (see `normalize::RpmAliasPolicy`)
    pub rpm: Vec<PkgInfo>,
    pub googet: Vec<PkgInfo>,
    pub cos: Vec<PkgInfo>,
    /// Language-ecosystem listings; collected but not reported
    pub pip: Vec<PkgInfo>,
    pub gem: Vec<PkgInfo>,

    pub zypper_patches: Vec<ZypperPatch>,
    pub wua: Vec<WuaUpdate>,
    pub qfe: Vec<QfeHotfix>,
    pub windows_applications: Vec<WindowsApplication>,
}

impl PackageSet {
    /// True when every collection is empty
    pub fn is_empty(&self) -> bool {
        self.apt.is_empty()
            && self.deb.is_empty()
            && self.yum.is_empty()
            && self.zypper.is_empty()
            && self.rpm.is_empty()
            && self.googet.is_empty()
            && self.cos.is_empty()
            && self.pip.is_empty()
            && self.gem.is_empty()
            && self.zypper_patches.is_empty()
            && self.wua.is_empty()
            && self.qfe.is_empty()
            && self.windows_applications.is_empty()
    }
}

/// A versioned package as reported by a package manager
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PkgInfo {
    pub name: String,
    pub arch: String,
    pub version: String,
    /// Upstream source package, when the manager exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PkgSource>,
}

impl PkgInfo {
    pub fn new(name: impl Into<String>, arch: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arch: arch.into(),
            version: version.into(),
            source: None,
        }
    }
}

/// Upstream source package reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PkgSource {
    pub name: String,
    pub version: String,
}

/// A Zypper patch record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZypperPatch {
    pub name: String,
    pub category: String,
    pub severity: String,
    pub summary: String,
}

/// A Windows Update Agent record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WuaUpdate {
    pub title: String,
    pub description: String,
    /// Category names, index-aligned with `category_ids`
    pub categories: Vec<String>,
    pub category_ids: Vec<String>,
    pub kb_article_ids: Vec<String>,
    pub support_url: String,
    pub more_info_urls: Vec<String>,
    pub update_id: String,
    pub revision_number: i32,
    pub last_deployment_change_time: Option<DateTime<Utc>>,
}

/// A Windows quick-fix-engineering (hotfix) record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QfeHotfix {
    pub caption: String,
    pub description: String,
    pub hot_fix_id: String,
    /// Free-text install date in the locale "M/D/Y" form; parsed during
    /// normalization, kept verbatim here
    pub installed_on: String,
}

/// An installed Windows application (registry-derived)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowsApplication {
    pub display_name: String,
    pub display_version: String,
    pub publisher: String,
    pub install_date: Option<NaiveDate>,
    pub help_link: String,
}

/// A flat record from the unified collector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedPackage {
    pub name: String,
    /// Collector-assigned type tag ("rpm", "deb", "googet", ...)
    pub item_type: String,
    pub version: String,
    /// Package URL identifier, empty when the collector has none
    pub purl: String,
    pub location: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}
