//! Error type for the binary plist codec.

use thiserror::Error;

/// Failure reported by [`encode`](super::encode) or [`decode`](super::decode).
///
/// The set of variants is closed: malformed input is deterministic, so none
/// of these are worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bad magic or version, or a structurally inconsistent buffer.
    ///
    /// Covers trailers with impossible widths, references outside the
    /// object table, cyclic references and dictionary keys that are not
    /// strings.
    #[error("Invalid binary plist: {0}")]
    Format(String),

    /// The buffer ends before a declared length, offset or count.
    #[error("Truncated binary plist: {0}")]
    Truncated(String),

    /// A marker byte (or source value) with no counterpart in the value model.
    #[error("Unsupported plist object: {0}")]
    UnsupportedType(String),

    /// Text that the binary format cannot carry.
    ///
    /// Only characters of the Basic Multilingual Plane are encodable.
    #[error("Cannot encode string: {0}")]
    Encoding(String),

    /// An integer outside the signed 128-bit range.
    #[error("Integer out of range: {0}")]
    Size(String),
}
