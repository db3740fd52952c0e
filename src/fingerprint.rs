// src/fingerprint.rs

//! Content fingerprints over canonical inventories
//!
//! Two flavors exist for change detection:
//! - **raw**: SHA-256 of the full canonical CBOR encoding. Any field-order
//!   or formatting difference changes it. Byte-exact change detection only.
//! - **stable**: SHA-256 of the OS-info encoding followed by every
//!   per-package fingerprint string in byte-wise lexicographic order.
//!   Invariant under any permutation of the package lists, so it tracks
//!   logical inventory change rather than encoding change.
//!
//! Windows Update entries carry a repeated category list whose order is not
//! stable run-to-run; their per-entry string is built from the stable
//! identifying fields only (title, update id, revision number) to avoid
//! fingerprint churn caused purely by category reordering.

use crate::error::{Error, Result};
use crate::schema::{encode_canonical, Inventory, InventoryItem, SoftwarePackage, VmInventory};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Hex length of a SHA-256 fingerprint
const FINGERPRINT_HEX_LEN: usize = 64;

/// A hex-encoded SHA-256 digest of a canonical inventory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    fn from_digest(digest: impl AsRef<[u8]>) -> Self {
        Self(hex::encode(digest))
    }

    /// Validate and wrap an externally supplied fingerprint string
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != FINGERPRINT_HEX_LEN {
            return Err(Error::Fingerprint(format!(
                "expected {} hex chars, got {}",
                FINGERPRINT_HEX_LEN,
                s.len()
            )));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Fingerprint(format!("invalid hex in {s:?}")));
        }
        Ok(Self(s.to_lowercase()))
    }

    /// The fingerprint as a hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Raw fingerprint: digest of the full canonical encoding
///
/// Works on either canonical schema. Not guaranteed stable under package
/// reordering; use the stable flavor to detect logical change.
pub fn fingerprint_raw<T: Serialize>(canonical: &T) -> Result<Fingerprint> {
    let bytes = encode_canonical(canonical)?;
    Ok(Fingerprint::from_digest(Sha256::digest(&bytes)))
}

/// Stable fingerprint of a current-schema inventory
pub fn fingerprint_stable(inventory: &Inventory) -> Result<Fingerprint> {
    let entries = inventory
        .installed_packages
        .iter()
        .chain(&inventory.available_packages)
        .map(package_entry)
        .collect();
    stable_digest(&inventory.os_info, entries)
}

/// Stable fingerprint of a legacy-schema inventory
pub fn fingerprint_stable_vm(inventory: &VmInventory) -> Result<Fingerprint> {
    let entries = inventory
        .installed_packages
        .iter()
        .chain(&inventory.available_packages)
        .map(item_entry)
        .collect();
    stable_digest(&inventory.os_info, entries)
}

/// Digest the OS-info encoding, then each entry string in sorted order
fn stable_digest<T: Serialize>(os_info: &T, mut entries: Vec<String>) -> Result<Fingerprint> {
    let mut hasher = Sha256::new();
    hasher.update(encode_canonical(os_info)?);

    entries.sort_unstable();
    for entry in &entries {
        hasher.update(entry.as_bytes());
    }

    Ok(Fingerprint::from_digest(hasher.finalize()))
}

/// Per-entry fingerprint string for a current-schema package
///
/// Windows Update entries reduce to their stable identity; every other
/// variant renders all fields in deterministic order.
pub fn package_entry(pkg: &SoftwarePackage) -> String {
    if let SoftwarePackage::WindowsUpdate(wua) = pkg {
        return format!("{}-{}-{}", wua.title, wua.update_id, wua.revision_number);
    }
    canonical_text(pkg)
}

/// Per-entry fingerprint string for a legacy-schema item
pub fn item_entry(item: &InventoryItem) -> String {
    canonical_text(item)
}

/// Deterministic text rendering: JSON with compile-time field order and
/// sorted metadata keys. Falls back to the debug rendering rather than
/// failing; the entry still participates in the digest.
fn canonical_text<T: Serialize + fmt::Debug>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{OsInfo, VersionedPackage, WindowsUpdateCategory, WindowsUpdatePackage};

    fn apt(name: &str, version: &str) -> SoftwarePackage {
        SoftwarePackage::Apt(VersionedPackage {
            package_name: name.to_string(),
            architecture: "amd64".to_string(),
            version: version.to_string(),
            source: None,
        })
    }

    fn inventory(installed: Vec<SoftwarePackage>) -> Inventory {
        Inventory {
            os_info: OsInfo {
                hostname: "h1".to_string(),
                ..Default::default()
            },
            installed_packages: installed,
            available_packages: vec![],
        }
    }

    #[test]
    fn test_stable_fingerprint_is_repeatable() {
        let inv = inventory(vec![apt("vim", "2:9.0"), apt("curl", "8.5")]);
        assert_eq!(
            fingerprint_stable(&inv).unwrap(),
            fingerprint_stable(&inv).unwrap()
        );
    }

    #[test]
    fn test_stable_fingerprint_ignores_package_order() {
        let forward = inventory(vec![apt("vim", "2:9.0"), apt("curl", "8.5")]);
        let reversed = inventory(vec![apt("curl", "8.5"), apt("vim", "2:9.0")]);

        assert_eq!(
            fingerprint_stable(&forward).unwrap(),
            fingerprint_stable(&reversed).unwrap()
        );
    }

    #[test]
    fn test_raw_fingerprint_tracks_encoding_order() {
        let forward = inventory(vec![apt("vim", "2:9.0"), apt("curl", "8.5")]);
        let reversed = inventory(vec![apt("curl", "8.5"), apt("vim", "2:9.0")]);

        // Encoding order differs, so the raw digests must differ while the
        // stable digests agree.
        assert_ne!(
            fingerprint_raw(&forward).unwrap(),
            fingerprint_raw(&reversed).unwrap()
        );
        assert_eq!(
            fingerprint_raw(&forward).unwrap(),
            fingerprint_raw(&forward).unwrap()
        );
    }

    #[test]
    fn test_installed_and_available_feed_one_entry_list() {
        let with_installed = inventory(vec![apt("vim", "2:9.0")]);
        let mut with_available = inventory(vec![]);
        with_available.available_packages.push(apt("vim", "2:9.0"));

        // Same entry set, same stable fingerprint, regardless of which list
        // the package sits in.
        assert_eq!(
            fingerprint_stable(&with_installed).unwrap(),
            fingerprint_stable(&with_available).unwrap()
        );
    }

    #[test]
    fn test_windows_update_entry_ignores_category_order() {
        let make = |categories: Vec<(&str, &str)>| {
            SoftwarePackage::WindowsUpdate(WindowsUpdatePackage {
                title: "Security Update".to_string(),
                update_id: "uid-1".to_string(),
                revision_number: 3,
                categories: categories
                    .into_iter()
                    .map(|(id, name)| WindowsUpdateCategory {
                        id: id.to_string(),
                        name: name.to_string(),
                    })
                    .collect(),
                ..Default::default()
            })
        };

        let a = make(vec![("c1", "Critical"), ("c2", "Security")]);
        let b = make(vec![("c2", "Security"), ("c1", "Critical")]);

        assert_eq!(package_entry(&a), package_entry(&b));
        assert_eq!(package_entry(&a), "Security Update-uid-1-3");
    }

    #[test]
    fn test_fingerprint_parse_validation() {
        let inv = inventory(vec![]);
        let fp = fingerprint_stable(&inv).unwrap();
        assert_eq!(fp.as_str().len(), 64);
        assert_eq!(Fingerprint::parse(fp.as_str()).unwrap(), fp);

        assert!(Fingerprint::parse("abc123").is_err());
        assert!(Fingerprint::parse(&"g".repeat(64)).is_err());

        let upper = fp.as_str().to_uppercase();
        assert_eq!(Fingerprint::parse(&upper).unwrap(), fp);
    }

    #[test]
    fn test_vm_inventory_stable_fingerprint_order_independent() {
        let item = |name: &str| InventoryItem {
            name: name.to_string(),
            item_type: "rpm".to_string(),
            version: "1.0".to_string(),
            ..Default::default()
        };

        let forward = VmInventory {
            installed_packages: vec![item("a"), item("b")],
            ..Default::default()
        };
        let reversed = VmInventory {
            installed_packages: vec![item("b"), item("a")],
            ..Default::default()
        };

        assert_eq!(
            fingerprint_stable_vm(&forward).unwrap(),
            fingerprint_stable_vm(&reversed).unwrap()
        );
    }
}
