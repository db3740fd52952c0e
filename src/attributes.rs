// src/attributes.rs

//! Guest-attribute publishing of snapshot fields
//!
//! Every scalar text field of the snapshot publishes verbatim under a path
//! derived from its canonical field name; every structured section publishes
//! as a compressed serialized blob. The field-to-path table is explicit, so
//! the publish contract does not depend on struct declaration order and can
//! be tested on its own.
//!
//! Publishes are fully isolated from each other: a failing field is logged
//! and reported back, and every remaining field is still attempted.

use crate::error::{Error, Result};
use crate::snapshot::InstanceSnapshot;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tracing::{debug, error};

/// Root path for published inventory attributes
pub const ATTRIBUTE_ROOT: &str = "guestInventory";

/// Destination for published attributes
///
/// Implementations own the store's wire format and I/O; this crate only
/// drives the side effect.
pub trait AttributeSink {
    /// Publish a scalar field verbatim
    fn publish_text(&mut self, path: &str, value: &str) -> Result<()>;

    /// Publish a structured field as a serialized value
    ///
    /// Sinks typically store the gzip+base64 form produced by
    /// [`compress_attribute`].
    fn publish_compressed(&mut self, path: &str, value: &serde_json::Value) -> Result<()>;
}

/// Publish every snapshot field to the sink, one attribute per field
///
/// Returns the paths that failed together with their errors; an empty vector
/// means every publish succeeded. Failures never stop the remaining fields.
pub fn publish_snapshot<S: AttributeSink>(
    sink: &mut S,
    snapshot: &InstanceSnapshot,
) -> Vec<(String, Error)> {
    let mut failures = Vec::new();

    let scalar_fields: [(&str, &str); 8] = [
        ("Hostname", snapshot.hostname.as_str()),
        ("LongName", snapshot.long_name.as_str()),
        ("ShortName", snapshot.short_name.as_str()),
        ("Version", snapshot.version.as_str()),
        ("Architecture", snapshot.architecture.as_str()),
        ("KernelVersion", snapshot.kernel_version.as_str()),
        ("KernelRelease", snapshot.kernel_release.as_str()),
        ("AgentVersion", snapshot.agent_version.as_str()),
    ];
    let last_updated = snapshot.last_updated_rfc3339();

    for (field, value) in scalar_fields
        .into_iter()
        .chain([("LastUpdated", last_updated.as_str())])
    {
        let path = attribute_path(field);
        debug!("publishing attribute {path}");
        if let Err(e) = sink.publish_text(&path, value) {
            error!("failed to publish {path}: {e}");
            failures.push((path, e));
        }
    }

    let structured_fields = [
        ("InstalledPackages", serde_json::to_value(&snapshot.installed)),
        ("PackageUpdates", serde_json::to_value(&snapshot.updates)),
        ("UnifiedPackages", serde_json::to_value(&snapshot.unified)),
    ];

    for (field, value) in structured_fields {
        let path = attribute_path(field);
        match value {
            Ok(value) => {
                debug!("publishing compressed attribute {path}");
                if let Err(e) = sink.publish_compressed(&path, &value) {
                    error!("failed to publish {path}: {e}");
                    failures.push((path, e));
                }
            }
            Err(e) => {
                let e = Error::Publish(format!("serializing {field}: {e}"));
                error!("{e}");
                failures.push((path, e));
            }
        }
    }

    failures
}

/// Attribute path for a canonical field name
pub fn attribute_path(field: &str) -> String {
    format!("{ATTRIBUTE_ROOT}/{field}")
}

/// Encode a structured value as a gzip-compressed, base64-wrapped blob
///
/// The canonical on-store form for structured attributes; sinks that write
/// text stores use this directly.
pub fn compress_attribute(value: &serde_json::Value) -> Result<String> {
    let json =
        serde_json::to_vec(value).map_err(|e| Error::Publish(format!("serialize: {e}")))?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| Error::Publish(format!("compress: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::Publish(format!("compress: {e}")))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
}

/// Decode a blob produced by [`compress_attribute`]
pub fn decompress_attribute(blob: &str) -> Result<serde_json::Value> {
    use std::io::Read;

    let compressed = base64::engine::general_purpose::STANDARD
        .decode(blob)
        .map_err(|e| Error::Publish(format!("base64 decode: {e}")))?;

    let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| Error::Publish(format!("decompress: {e}")))?;

    serde_json::from_slice(&json).map_err(|e| Error::Publish(format!("deserialize: {e}")))
}
