// src/error.rs

//! Central error type for hostinv
//!
//! Protocol errors from the collector keep their own type (`report::ApiError`)
//! because fallback decisions depend on the error kind; everything else in the
//! crate funnels through `Error`.

use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced outside the report protocol
#[derive(Error, Debug)]
pub enum Error {
    /// Canonical encoding of an inventory structure failed
    #[error("Encoding error: {0}")]
    Encode(String),

    /// A guest-attribute publish failed
    #[error("Attribute publish error: {0}")]
    Publish(String),

    /// A fact source failed during snapshot collection
    #[error("Collection error: {0}")]
    Collection(String),

    /// A fingerprint string failed validation
    #[error("Invalid fingerprint: {0}")]
    Fingerprint(String),
}
