// src/schema/inventory.rs

//! Current inventory schema: tagged-union software packages
//!
//! Every package entry carries exactly one manager-specific variant. The sum
//! type keeps variant handling exhaustive at every site: adding a variant
//! forces the normalizer and the fingerprint engine to handle it.

use super::{encode_canonical, Date};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current-schema inventory payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub os_info: OsInfo,
    pub installed_packages: Vec<SoftwarePackage>,
    pub available_packages: Vec<SoftwarePackage>,
}

impl Inventory {
    /// Canonical CBOR wire encoding
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        encode_canonical(self)
    }
}

/// OS information block
///
/// Always present on the wire, even for an all-empty snapshot; fields default
/// to empty strings, the block itself is never omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsInfo {
    pub hostname: String,
    pub long_name: String,
    pub short_name: String,
    pub version: String,
    pub architecture: String,
    pub kernel_version: String,
    pub kernel_release: String,
    pub agent_version: String,
}

/// One software package, tagged by the manager that produced it
///
/// A package from manager X is never re-tagged as manager Y, with one
/// exception: flat RPM listings are reported as either `Yum` or `Zypper`
/// depending on which manager tool is present on the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum SoftwarePackage {
    Apt(VersionedPackage),
    Yum(VersionedPackage),
    Zypper(VersionedPackage),
    Googet(VersionedPackage),
    Cos(VersionedPackage),
    WindowsUpdate(WindowsUpdatePackage),
    WindowsQuickFix(WindowsQuickFixPackage),
    WindowsApplication(WindowsApplicationPackage),
    ZypperPatch(ZypperPatchPackage),
}

/// Name/architecture/version triple shared by the plain-manager variants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionedPackage {
    pub package_name: String,
    pub architecture: String,
    pub version: String,
    /// Upstream source package; entirely absent when the manager reported no
    /// source name, never an empty-string placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PackageSource>,
}

/// Upstream source package reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageSource {
    pub name: String,
    pub version: String,
}

/// Windows Update package details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowsUpdatePackage {
    pub title: String,
    pub description: String,
    /// Category list; ordering is not guaranteed stable run-to-run, which is
    /// why the stable fingerprint ignores it
    pub categories: Vec<WindowsUpdateCategory>,
    pub kb_article_ids: Vec<String>,
    pub support_url: String,
    pub more_info_urls: Vec<String>,
    pub update_id: String,
    pub revision_number: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deployment_change_time: Option<DateTime<Utc>>,
}

/// One Windows Update category (id + display name)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowsUpdateCategory {
    pub id: String,
    pub name: String,
}

/// Windows quick-fix-engineering package details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowsQuickFixPackage {
    pub caption: String,
    pub description: String,
    pub hot_fix_id: String,
    /// Absent when the free-text install date failed to parse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_time: Option<DateTime<Utc>>,
}

/// Windows application details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowsApplicationPackage {
    pub display_name: String,
    pub display_version: String,
    pub publisher: String,
    /// `Date::ABSENT` when no install date was recorded
    pub install_date: Date,
    pub help_link: String,
}

/// Zypper patch details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZypperPatchPackage {
    pub patch_name: String,
    pub category: String,
    pub severity: String,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_field_is_omitted_when_absent() {
        let pkg = SoftwarePackage::Apt(VersionedPackage {
            package_name: "vim".to_string(),
            architecture: "amd64".to_string(),
            version: "2:9.0".to_string(),
            source: None,
        });

        let json = serde_json::to_string(&pkg).unwrap();
        assert!(!json.contains("source"));

        let pkg = SoftwarePackage::Apt(VersionedPackage {
            package_name: "vim".to_string(),
            architecture: "amd64".to_string(),
            version: "2:9.0".to_string(),
            source: Some(PackageSource {
                name: "vim-src".to_string(),
                version: "2:9.0".to_string(),
            }),
        });

        let json = serde_json::to_string(&pkg).unwrap();
        assert!(json.contains("vim-src"));
    }

    #[test]
    fn test_variant_tags_are_stable() {
        let pkg = SoftwarePackage::WindowsUpdate(WindowsUpdatePackage::default());
        let json = serde_json::to_string(&pkg).unwrap();
        assert!(json.contains("\"kind\":\"windows_update\""));

        let pkg = SoftwarePackage::ZypperPatch(ZypperPatchPackage::default());
        let json = serde_json::to_string(&pkg).unwrap();
        assert!(json.contains("\"kind\":\"zypper_patch\""));
    }

    #[test]
    fn test_empty_inventory_keeps_os_info_block() {
        let inv = Inventory::default();
        let bytes = inv.to_cbor().unwrap();
        let decoded: Inventory = super::super::decode_canonical(&bytes).unwrap();
        assert_eq!(decoded.os_info, OsInfo::default());
        assert!(decoded.installed_packages.is_empty());
        assert!(decoded.available_packages.is_empty());
    }
}
