// src/schema/mod.rs

//! Canonical wire schemas shared with the remote collector
//!
//! Two output shapes exist: the current [`Inventory`] schema, whose packages
//! are a tagged union over manager-specific variants, and the legacy
//! [`VmInventory`] schema of flat items with free-form type tags. Field names
//! and variant tags are a compatibility contract with the collector and must
//! not change silently.
//!
//! Both schemas encode to CBOR via [`encode_canonical`]. The encoding is
//! deterministic for these types: struct fields serialize in declaration
//! order and metadata maps are `BTreeMap`, so equal values always produce
//! equal bytes.

pub mod inventory;
pub mod vm;

pub use inventory::{
    Inventory, OsInfo, PackageSource, SoftwarePackage, VersionedPackage, WindowsApplicationPackage,
    WindowsQuickFixPackage, WindowsUpdateCategory, WindowsUpdatePackage, ZypperPatchPackage,
};
pub use vm::{InventoryItem, ItemType, VmInventory, VmOsInfo};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Encode a wire structure to canonical CBOR bytes
pub fn encode_canonical<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| Error::Encode(format!("CBOR encoding failed: {e}")))?;
    Ok(buf)
}

/// Decode a wire structure from CBOR bytes
pub fn decode_canonical<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| Error::Encode(format!("CBOR decoding failed: {e}")))
}

/// A calendar date on the wire
///
/// The all-zero value is the explicit absent-date marker. A date-like field
/// whose source uses a zero-value sentinel is emitted as `Date::ABSENT`,
/// never as the sentinel's literal day/month/year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Date {
    /// The absent-date marker
    pub const ABSENT: Date = Date {
        year: 0,
        month: 0,
        day: 0,
    };

    /// True when this is the absent-date marker
    pub fn is_absent(&self) -> bool {
        *self == Self::ABSENT
    }
}

impl From<chrono::NaiveDate> for Date {
    fn from(d: chrono::NaiveDate) -> Self {
        use chrono::Datelike;
        Date {
            year: d.year(),
            month: d.month(),
            day: d.day(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_absent_date() {
        assert!(Date::ABSENT.is_absent());
        assert!(Date::default().is_absent());

        let d = Date::from(NaiveDate::from_ymd_opt(2023, 7, 14).unwrap());
        assert!(!d.is_absent());
        assert_eq!(
            d,
            Date {
                year: 2023,
                month: 7,
                day: 14
            }
        );
    }

    #[test]
    fn test_canonical_encoding_is_deterministic() {
        let os_info = OsInfo {
            hostname: "h1".to_string(),
            short_name: "debian".to_string(),
            ..Default::default()
        };

        let a = encode_canonical(&os_info).unwrap();
        let b = encode_canonical(&os_info).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_canonical_round_trip() {
        let inv = Inventory {
            os_info: OsInfo {
                hostname: "h1".to_string(),
                ..Default::default()
            },
            installed_packages: vec![SoftwarePackage::Apt(VersionedPackage {
                package_name: "vim".to_string(),
                architecture: "amd64".to_string(),
                version: "2:9.0".to_string(),
                source: None,
            })],
            available_packages: vec![],
        };

        let bytes = encode_canonical(&inv).unwrap();
        let decoded: Inventory = decode_canonical(&bytes).unwrap();
        assert_eq!(decoded, inv);
    }
}
