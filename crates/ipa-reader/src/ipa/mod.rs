//! IPA handling module.
//!
//! Provides read access to IPA archives and the app metadata stored in them.

pub mod archive;
pub mod metadata;

pub use archive::{validate_ipa, IpaArchive};
pub use metadata::{DeviceFamily, IpaFile};

use crate::plist_file::{self, PlistFormat};
use crate::Result;
use regex::Regex;
use std::path::Path;

/// Default location of the main bundle's `Info.plist`.
pub const DEFAULT_INFO_PLIST_PATTERN: &str = r"Payload/[^/]+\.app/Info\.plist$";

/// Default location of the store metadata plist.
pub const DEFAULT_METADATA_PATTERN: &str = r"iTunesMetadata\.plist$";

/// IPA metadata reader with builder pattern API.
///
/// # Example
///
/// ```no_run
/// use ipa_reader::{IpaReader, PlistFormat};
///
/// let ipa = IpaReader::new()
///     .format(PlistFormat::Binary)
///     .open("app.ipa")?;
///
/// println!("{:?} {:?}", ipa.bundle_identifier()?, ipa.version()?);
/// # Ok::<(), ipa_reader::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct IpaReader {
    info_plist_pattern: String,
    metadata_pattern: String,
    format: PlistFormat,
}

impl IpaReader {
    /// Create a reader with the default entry patterns.
    pub fn new() -> Self {
        Self {
            info_plist_pattern: DEFAULT_INFO_PLIST_PATTERN.to_string(),
            metadata_pattern: DEFAULT_METADATA_PATTERN.to_string(),
            format: PlistFormat::Auto,
        }
    }

    /// Set the regex locating `Info.plist` inside the archive.
    pub fn info_plist_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.info_plist_pattern = pattern.into();
        self
    }

    /// Set the regex locating `iTunesMetadata.plist` inside the archive.
    pub fn metadata_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.metadata_pattern = pattern.into();
        self
    }

    /// Force the container format of `Info.plist`.
    ///
    /// `iTunesMetadata.plist` is always detected, since store tooling writes
    /// it as XML regardless of how the bundle was built.
    pub fn format(mut self, format: PlistFormat) -> Self {
        self.format = format;
        self
    }

    /// Open the IPA at `path` and decode its property lists.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Pattern`] if a configured pattern is invalid
    /// - [`crate::Error::EntryNotFound`] if no `Info.plist` matches
    /// - [`crate::Error::Plist`] or [`crate::Error::Xml`] if a plist is malformed
    /// - [`crate::Error::Metadata`] if a plist root is not a dictionary
    pub fn open(&self, path: impl AsRef<Path>) -> Result<IpaFile> {
        let info_pattern = Regex::new(&self.info_plist_pattern)?;
        let metadata_pattern = Regex::new(&self.metadata_pattern)?;

        let archive = IpaArchive::open(path)?;

        let info_data = archive.read_required(&info_pattern)?;
        let info = plist_file::load(&info_data, self.format)?;

        let metadata = archive
            .read(&metadata_pattern)?
            .map(|data| plist_file::load(&data, PlistFormat::Auto))
            .transpose()?;

        tracing::debug!(
            info_format = ?self.format.detect(&info_data),
            has_metadata = metadata.is_some(),
            "decoded IPA property lists"
        );

        IpaFile::new(archive, info, metadata)
    }
}

impl Default for IpaReader {
    fn default() -> Self {
        Self::new()
    }
}
