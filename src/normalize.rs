// src/normalize.rs

//! Normalization of a snapshot into the canonical wire schemas
//!
//! Two pure, total mappings: [`normalize_current`] produces the tagged-union
//! [`Inventory`] shape, [`normalize_legacy`] the flat [`VmInventory`] shape.
//! Neither can fail for a well-formed snapshot; fields that cannot be
//! represented are dropped with a [`NormalizeWarning`] collected alongside
//! the result, so callers can assert on exactly what was lost.
//!
//! Mapping rules:
//! - Every legacy per-manager collection maps to exactly one union variant;
//!   an empty collection yields no entries.
//! - Flat RPM listings alias to the Yum or Zypper variant per
//!   [`RpmAliasPolicy`].
//! - In the legacy schema, the unified collector's records come first; the
//!   manager kinds it does not cover are appended after them and are never
//!   deduplicated against them. Until the unified collector covers those
//!   kinds, an operator may see a package counted once per collector.
//! - Pip and Gem collections are deliberately not reported by either schema.

use crate::schema::{
    Date, Inventory, InventoryItem, ItemType, OsInfo, PackageSource, SoftwarePackage,
    VersionedPackage, VmInventory, VmOsInfo, WindowsApplicationPackage, WindowsQuickFixPackage,
    WindowsUpdateCategory, WindowsUpdatePackage, ZypperPatchPackage,
};
use crate::snapshot::{InstanceSnapshot, PackageSet, PkgInfo, QfeHotfix, UnifiedPackage, WuaUpdate};
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Hotfix install dates arrive as locale "M/D/Y" strings
const QFE_DATE_FORMAT: &str = "%m/%d/%Y";

/// Which RPM-like variant flat RPM listings are reported as
///
/// The presence flags come from host tooling detection, supplied alongside
/// the snapshot. YUM wins when present; Zypper is chosen only when Zypper is
/// present and YUM is not; with neither flag set the default is YUM.
///
/// TODO: confirm the both-flags-set precedence against real dual-tool hosts;
/// today YUM wins there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RpmAliasPolicy {
    pub yum_present: bool,
    pub zypper_present: bool,
}

impl RpmAliasPolicy {
    pub fn new(yum_present: bool, zypper_present: bool) -> Self {
        Self {
            yum_present,
            zypper_present,
        }
    }

    /// True when flat RPM listings should be reported as the YUM variant
    pub fn reports_as_yum(&self) -> bool {
        self.yum_present || !self.zypper_present
    }
}

/// A per-field degradation that occurred during normalization
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeWarning {
    /// A date-like field failed to parse; the record was emitted with the
    /// field absent
    #[error("failed to parse {field} value {value:?} for {record}")]
    DateParse {
        record: String,
        field: &'static str,
        value: String,
    },

    /// A metadata value could not be serialized; the key was dropped, the
    /// item survived
    #[error("dropped unserializable metadata key {key:?} on {record}")]
    Metadata { record: String, key: String },
}

/// A normalized structure plus the warnings produced while building it
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub warnings: Vec<NormalizeWarning>,
}

/// Map a snapshot to the current (tagged-union) schema
pub fn normalize_current(snapshot: &InstanceSnapshot, policy: RpmAliasPolicy) -> Normalized<Inventory> {
    let mut warnings = Vec::new();

    let os_info = OsInfo {
        hostname: snapshot.hostname.clone(),
        long_name: snapshot.long_name.clone(),
        short_name: snapshot.short_name.clone(),
        version: snapshot.version.clone(),
        architecture: snapshot.architecture.clone(),
        kernel_version: snapshot.kernel_version.clone(),
        kernel_release: snapshot.kernel_release.clone(),
        agent_version: snapshot.agent_version.clone(),
    };

    let installed_packages = software_packages(&snapshot.installed, policy, &mut warnings);
    let available_packages = software_packages(&snapshot.updates, policy, &mut warnings);

    Normalized {
        value: Inventory {
            os_info,
            installed_packages,
            available_packages,
        },
        warnings,
    }
}

/// Map a snapshot to the legacy (flat-item) schema
pub fn normalize_legacy(snapshot: &InstanceSnapshot) -> Normalized<VmInventory> {
    let mut warnings = Vec::new();

    let os_info = VmOsInfo {
        host_name: snapshot.hostname.clone(),
        long_name: snapshot.long_name.clone(),
        short_name: snapshot.short_name.clone(),
        version: snapshot.version.clone(),
        architecture: snapshot.architecture.clone(),
        kernel_version: snapshot.kernel_version.clone(),
        kernel_release: snapshot.kernel_release.clone(),
        agent_version: snapshot.agent_version.clone(),
    };

    // Installed: unified records first, then the kinds the unified collector
    // does not cover, taken from the legacy installed collections.
    let mut installed_packages: Vec<InventoryItem> = snapshot
        .unified
        .iter()
        .map(|pkg| unified_item(pkg, &mut warnings))
        .collect();
    installed_packages.extend(uncovered_items(&snapshot.installed));

    // Available: no unified source exists for updates yet, so everything
    // comes from the legacy update collections.
    let mut available_packages = manager_items(&snapshot.updates);
    available_packages.extend(uncovered_items(&snapshot.updates));

    Normalized {
        value: VmInventory {
            os_info,
            installed_packages,
            available_packages,
        },
        warnings,
    }
}

fn software_packages(
    set: &PackageSet,
    policy: RpmAliasPolicy,
    warnings: &mut Vec<NormalizeWarning>,
) -> Vec<SoftwarePackage> {
    let mut packages = Vec::new();

    packages.extend(set.apt.iter().map(|p| SoftwarePackage::Apt(sourced(p))));
    // Plain dpkg listings share the APT variant.
    packages.extend(set.deb.iter().map(|p| SoftwarePackage::Apt(sourced(p))));
    packages.extend(set.googet.iter().map(|p| SoftwarePackage::Googet(bare(p))));
    packages.extend(set.yum.iter().map(|p| SoftwarePackage::Yum(sourced(p))));
    packages.extend(set.zypper.iter().map(|p| SoftwarePackage::Zypper(bare(p))));

    if policy.reports_as_yum() {
        packages.extend(set.rpm.iter().map(|p| SoftwarePackage::Yum(sourced(p))));
    } else {
        packages.extend(set.rpm.iter().map(|p| SoftwarePackage::Zypper(bare(p))));
    }

    packages.extend(set.zypper_patches.iter().map(|p| {
        SoftwarePackage::ZypperPatch(ZypperPatchPackage {
            patch_name: p.name.clone(),
            category: p.category.clone(),
            severity: p.severity.clone(),
            summary: p.summary.clone(),
        })
    }));
    packages.extend(
        set.wua
            .iter()
            .map(|p| SoftwarePackage::WindowsUpdate(windows_update(p))),
    );
    packages.extend(
        set.qfe
            .iter()
            .map(|p| SoftwarePackage::WindowsQuickFix(quick_fix(p, warnings))),
    );
    packages.extend(set.cos.iter().map(|p| SoftwarePackage::Cos(bare(p))));
    packages.extend(set.windows_applications.iter().map(|p| {
        SoftwarePackage::WindowsApplication(WindowsApplicationPackage {
            display_name: p.display_name.clone(),
            display_version: p.display_version.clone(),
            publisher: p.publisher.clone(),
            install_date: p.install_date.map(Date::from).unwrap_or(Date::ABSENT),
            help_link: p.help_link.clone(),
        })
    }));
    // Pip and Gem listings are collected but not reported.

    packages
}

/// Versioned package carrying the upstream source when one was reported
fn sourced(pkg: &PkgInfo) -> VersionedPackage {
    VersionedPackage {
        package_name: pkg.name.clone(),
        architecture: pkg.arch.clone(),
        version: pkg.version.clone(),
        source: pkg
            .source
            .as_ref()
            .filter(|s| !s.name.is_empty())
            .map(|s| PackageSource {
                name: s.name.clone(),
                version: s.version.clone(),
            }),
    }
}

/// Versioned package for variants that never carry a source on the wire
fn bare(pkg: &PkgInfo) -> VersionedPackage {
    VersionedPackage {
        package_name: pkg.name.clone(),
        architecture: pkg.arch.clone(),
        version: pkg.version.clone(),
        source: None,
    }
}

fn windows_update(pkg: &WuaUpdate) -> WindowsUpdatePackage {
    let categories = pkg
        .category_ids
        .iter()
        .zip(&pkg.categories)
        .map(|(id, name)| WindowsUpdateCategory {
            id: id.clone(),
            name: name.clone(),
        })
        .collect();

    WindowsUpdatePackage {
        title: pkg.title.clone(),
        description: pkg.description.clone(),
        categories,
        kb_article_ids: pkg.kb_article_ids.clone(),
        support_url: pkg.support_url.clone(),
        more_info_urls: pkg.more_info_urls.clone(),
        update_id: pkg.update_id.clone(),
        revision_number: pkg.revision_number,
        last_deployment_change_time: pkg.last_deployment_change_time,
    }
}

fn quick_fix(pkg: &QfeHotfix, warnings: &mut Vec<NormalizeWarning>) -> WindowsQuickFixPackage {
    let install_time = match NaiveDate::parse_from_str(&pkg.installed_on, QFE_DATE_FORMAT) {
        Ok(date) => Some(date.and_time(NaiveTime::MIN).and_utc()),
        Err(e) => {
            warn!(
                "failed to parse hotfix install date {:?} for {}: {}",
                pkg.installed_on, pkg.hot_fix_id, e
            );
            warnings.push(NormalizeWarning::DateParse {
                record: pkg.hot_fix_id.clone(),
                field: "installed_on",
                value: pkg.installed_on.clone(),
            });
            None
        }
    };

    WindowsQuickFixPackage {
        caption: pkg.caption.clone(),
        description: pkg.description.clone(),
        hot_fix_id: pkg.hot_fix_id.clone(),
        install_time,
    }
}

/// Legacy item from a unified-collector record
///
/// Metadata values pass through; a value that fails canonical serialization
/// drops its key with a warning rather than aborting the item.
fn unified_item(pkg: &UnifiedPackage, warnings: &mut Vec<NormalizeWarning>) -> InventoryItem {
    let mut metadata = BTreeMap::new();
    for (key, value) in &pkg.metadata {
        if serde_json::to_string(value).is_ok() {
            metadata.insert(key.clone(), value.clone());
        } else {
            warn!("dropping unserializable metadata key {:?} on {}", key, pkg.name);
            warnings.push(NormalizeWarning::Metadata {
                record: pkg.name.clone(),
                key: key.clone(),
            });
        }
    }

    InventoryItem {
        name: pkg.name.clone(),
        item_type: pkg.item_type.clone(),
        version: pkg.version.clone(),
        purl: pkg.purl.clone(),
        location: pkg.location.clone(),
        metadata,
    }
}

/// Legacy items for the plain manager collections
fn manager_items(set: &PackageSet) -> Vec<InventoryItem> {
    let mut items = Vec::new();

    for pkg in set.apt.iter().chain(&set.deb) {
        items.push(flat_item(
            pkg,
            ItemType::Deb,
            BTreeMap::from([
                ("SourceName".to_string(), json!(source_name(pkg))),
                ("SourceVersion".to_string(), json!(source_version(pkg))),
            ]),
        ));
    }
    for pkg in &set.googet {
        items.push(flat_item(pkg, ItemType::Googet, BTreeMap::new()));
    }
    for pkg in set.yum.iter().chain(&set.zypper).chain(&set.rpm) {
        items.push(flat_item(
            pkg,
            ItemType::Rpm,
            BTreeMap::from([("SourceRPM".to_string(), json!(source_name(pkg)))]),
        ));
    }
    for pkg in &set.cos {
        items.push(flat_item(pkg, ItemType::Cos, BTreeMap::new()));
    }

    items
}

/// Legacy items for the kinds the unified collector does not cover yet
fn uncovered_items(set: &PackageSet) -> Vec<InventoryItem> {
    let mut items = Vec::new();

    for patch in &set.zypper_patches {
        items.push(InventoryItem {
            name: patch.name.clone(),
            item_type: ItemType::ZypperPatch.tag().to_string(),
            version: String::new(),
            purl: String::new(),
            location: Vec::new(),
            metadata: BTreeMap::from([
                ("Category".to_string(), json!(patch.category)),
                ("Severity".to_string(), json!(patch.severity)),
                ("Summary".to_string(), json!(patch.summary)),
            ]),
        });
    }

    for update in &set.wua {
        let categories: Vec<serde_json::Value> = update
            .category_ids
            .iter()
            .zip(&update.categories)
            .map(|(id, name)| json!({"Id": id, "Name": name}))
            .collect();
        let change_time = update
            .last_deployment_change_time
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_default();

        items.push(InventoryItem {
            name: update.title.clone(),
            item_type: ItemType::WindowsUpdate.tag().to_string(),
            version: update.update_id.clone(),
            purl: update.support_url.clone(),
            location: Vec::new(),
            metadata: BTreeMap::from([
                ("Description".to_string(), json!(update.description)),
                ("Categories".to_string(), json!(categories)),
                ("CategoryIds".to_string(), json!(update.category_ids)),
                ("KbArticleId".to_string(), json!(update.kb_article_ids)),
                ("MoreInfoUrls".to_string(), json!(update.more_info_urls)),
                ("RevisionNumber".to_string(), json!(update.revision_number)),
                ("LastDeploymentChangeTime".to_string(), json!(change_time)),
            ]),
        });
    }

    for hotfix in &set.qfe {
        items.push(InventoryItem {
            name: hotfix.caption.clone(),
            item_type: ItemType::QuickFix.tag().to_string(),
            version: hotfix.hot_fix_id.clone(),
            purl: String::new(),
            location: Vec::new(),
            metadata: BTreeMap::from([
                ("Description".to_string(), json!(hotfix.description)),
                ("InstalledOn".to_string(), json!(hotfix.installed_on)),
            ]),
        });
    }

    for app in &set.windows_applications {
        let install_date = app.install_date.map(|d| d.to_string()).unwrap_or_default();
        items.push(InventoryItem {
            name: app.display_name.clone(),
            item_type: ItemType::WindowsApplication.tag().to_string(),
            version: app.display_version.clone(),
            purl: String::new(),
            location: Vec::new(),
            metadata: BTreeMap::from([
                ("Publisher".to_string(), json!(app.publisher)),
                ("InstallDate".to_string(), json!(install_date)),
                ("HelpLink".to_string(), json!(app.help_link)),
            ]),
        });
    }

    items
}

fn flat_item(pkg: &PkgInfo, item_type: ItemType, metadata: BTreeMap<String, serde_json::Value>) -> InventoryItem {
    InventoryItem {
        name: pkg.name.clone(),
        item_type: item_type.tag().to_string(),
        version: pkg.version.clone(),
        purl: String::new(),
        location: Vec::new(),
        metadata,
    }
}

fn source_name(pkg: &PkgInfo) -> String {
    pkg.source.as_ref().map(|s| s.name.clone()).unwrap_or_default()
}

fn source_version(pkg: &PkgInfo) -> String {
    pkg.source.as_ref().map(|s| s.version.clone()).unwrap_or_default()
}
