//! Error types for IPA reading operations.
//!
//! This module defines the [`enum@Error`] enum covering all failure cases
//! when opening an IPA, locating entries in it and interpreting the property
//! lists it carries.
//!
//! Codec failures keep their own type, [`crate::bplist::Error`], and are
//! wrapped in [`Error::Plist`] here.
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use thiserror::Error;

/// Error type for IPA reading operations.
///
/// All fallible public functions outside [`crate::bplist`] return
/// [`crate::Result<T>`], which uses this error type.
///
/// # Examples
///
/// ```no_run
/// use ipa_reader::{Error, IpaReader};
///
/// match IpaReader::new().open("app.ipa") {
///     Ok(ipa) => println!("{:?}", ipa.bundle_identifier()),
///     Err(Error::EntryNotFound(pattern)) => eprintln!("No entry matching {pattern}"),
///     Err(Error::Io(e)) => eprintln!("IO error: {e}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Occurs when the IPA does not exist, cannot be read or cannot be
    /// memory-mapped.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive operation failed.
    ///
    /// The file is not a ZIP archive, or an entry could not be decompressed.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Binary property list could not be decoded or encoded.
    #[error("Binary plist error: {0}")]
    Plist(#[from] crate::bplist::Error),

    /// XML property list could not be parsed or written.
    #[error("XML plist error: {0}")]
    Xml(#[from] plist::Error),

    /// No archive entry matched a required pattern.
    ///
    /// Carries the pattern that was searched for.
    #[error("No entry matching {0}")]
    EntryNotFound(String),

    /// A metadata key holds a value of an unexpected type.
    #[error("Invalid metadata: {0}")]
    Metadata(String),

    /// An entry pattern passed to [`crate::IpaReader`] is not a valid regex.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
