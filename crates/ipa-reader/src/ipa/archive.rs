//! Read-only access to IPA archive entries.
//!
//! The archive is memory-mapped once and shared by every reader; entries are
//! located by regular expression over their full path inside the ZIP.
//!
//! # Examples
//!
//! ```no_run
//! use ipa_reader::ipa::IpaArchive;
//! use regex::Regex;
//!
//! let archive = IpaArchive::open("app.ipa")?;
//! let pattern = Regex::new(r"Payload/[^/]+\.app/Info\.plist$")?;
//! let info = archive.read_required(&pattern)?;
//! println!("Info.plist is {} bytes", info.len());
//! # Ok::<(), ipa_reader::Error>(())
//! ```

use crate::{Error, Result};
use memmap2::Mmap;
use rayon::prelude::*;
use regex::Regex;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use zip::result::ZipError;
use zip::ZipArchive;

/// Memory map shared between archive handles.
#[derive(Clone)]
struct SharedMap(Arc<Mmap>);

impl AsRef<[u8]> for SharedMap {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An opened IPA file.
///
/// Cloning the underlying ZIP handle is cheap, so every read works on its own
/// handle and `&self` is enough for all operations.
pub struct IpaArchive {
    archive: ZipArchive<Cursor<SharedMap>>,
    /// File entries in archive order, directories excluded
    names: Vec<String>,
}

impl IpaArchive {
    /// Open and index the IPA at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file is missing or unreadable and
    /// [`Error::Zip`] if it is not a ZIP archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        validate_ipa(path)?;

        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let map = SharedMap(Arc::new(mmap));

        let archive = ZipArchive::new(Cursor::new(map)).map_err(Error::Zip)?;
        let names: Vec<String> = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect();

        tracing::debug!(path = %path.display(), entries = names.len(), "opened IPA");

        Ok(Self { archive, names })
    }

    /// Names of all file entries, in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Name of the first entry whose path matches `pattern`.
    pub fn find(&self, pattern: &Regex) -> Option<String> {
        let found = self.names.iter().find(|name| pattern.is_match(name)).cloned();
        tracing::trace!(pattern = pattern.as_str(), entry = ?found, "entry lookup");
        found
    }

    /// Contents of the first entry matching `pattern`, if any.
    pub fn read(&self, pattern: &Regex) -> Result<Option<Vec<u8>>> {
        match self.find(pattern) {
            Some(name) => Ok(Some(read_entry(&mut self.archive.clone(), &name)?)),
            None => Ok(None),
        }
    }

    /// Contents of the first entry matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] when no entry matches.
    pub fn read_required(&self, pattern: &Regex) -> Result<Vec<u8>> {
        self.read(pattern)?
            .ok_or_else(|| Error::EntryNotFound(pattern.as_str().to_string()))
    }

    /// Names and contents of every entry matching `pattern`, in archive order.
    ///
    /// Entries are decompressed in parallel, one ZIP handle per worker.
    pub fn read_matching(&self, pattern: &Regex) -> Result<Vec<(String, Vec<u8>)>> {
        let matches: Vec<&String> = self
            .names
            .iter()
            .filter(|name| pattern.is_match(name))
            .collect();

        tracing::debug!(
            pattern = pattern.as_str(),
            matches = matches.len(),
            "reading matching entries"
        );

        matches
            .into_par_iter()
            .map_init(
                || self.archive.clone(),
                |archive, name| -> Result<(String, Vec<u8>)> {
                    Ok((name.clone(), read_entry(archive, name)?))
                },
            )
            .collect()
    }
}

fn read_entry(archive: &mut ZipArchive<Cursor<SharedMap>>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive.by_name(name).map_err(Error::Zip)?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Leading bytes of a ZIP with entries, and of an empty one.
const ZIP_SIGNATURES: [&[u8; 4]; 2] = [b"PK\x03\x04", b"PK\x05\x06"];

/// Check that `path` is a regular file starting with a ZIP signature.
///
/// Runs before the file is mapped, so a missing path surfaces as
/// [`Error::Io`] and a foreign file as [`Error::Zip`].
pub fn validate_ipa(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no archive at {}", path.display()),
        )));
    }

    let mut signature = [0u8; 4];
    let complete = match File::open(path)?.read_exact(&mut signature) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e.into()),
    };

    if !complete || !ZIP_SIGNATURES.contains(&&signature) {
        tracing::debug!(path = %path.display(), "archive lacks a ZIP signature");
        return Err(Error::Zip(ZipError::InvalidArchive(
            "archive does not start with a ZIP signature".into(),
        )));
    }

    Ok(())
}
