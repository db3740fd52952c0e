// src/schema/vm.rs

//! Legacy inventory schema: flat items with type tags
//!
//! The legacy shape carries the same semantic OS fields under different
//! names and represents every package as a flat [`InventoryItem`] with a
//! string type tag and a metadata map. Items come primarily from the unified
//! collector; manager kinds the unified collector does not yet cover are
//! appended with synthesized tags from [`ItemType`].

use super::encode_canonical;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, IntoStaticStr};

/// Legacy-schema inventory payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmInventory {
    pub os_info: VmOsInfo,
    pub installed_packages: Vec<InventoryItem>,
    pub available_packages: Vec<InventoryItem>,
}

impl VmInventory {
    /// Canonical CBOR wire encoding
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        encode_canonical(self)
    }
}

/// OS information block, legacy field names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmOsInfo {
    pub host_name: String,
    pub long_name: String,
    pub short_name: String,
    pub version: String,
    pub architecture: String,
    pub kernel_version: String,
    pub kernel_release: String,
    pub agent_version: String,
}

/// One flat inventory item
///
/// `metadata` is a `BTreeMap` so the canonical encoding is independent of
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    /// Type tag; collector-assigned for unified records, synthesized from
    /// [`ItemType`] for appended legacy records
    pub item_type: String,
    pub version: String,
    pub purl: String,
    pub location: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Synthesized type tags for legacy records
///
/// The string forms are part of the wire contract with the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ItemType {
    #[strum(serialize = "deb")]
    Deb,
    #[strum(serialize = "rpm")]
    Rpm,
    #[strum(serialize = "googet")]
    Googet,
    #[strum(serialize = "cos")]
    Cos,
    #[strum(serialize = "ZypperPatch")]
    ZypperPatch,
    #[strum(serialize = "WUAPackage")]
    WindowsUpdate,
    #[strum(serialize = "QFEPackage")]
    QuickFix,
    #[strum(serialize = "WindowsApplication")]
    WindowsApplication,
}

impl ItemType {
    /// The wire tag for this item type
    pub fn tag(&self) -> &'static str {
        (*self).into()
    }
}
