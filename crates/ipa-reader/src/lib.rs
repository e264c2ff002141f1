//! Binary property list codec and IPA metadata reader.
//!
//! - [`bplist`] converts between [`Value`] graphs and `bplist00` buffers.
//! - [`plist_file`] loads binary or XML plists into the same model.
//! - [`ipa`] opens `.ipa` archives and reads app metadata through
//!   [`IpaReader`].
//!
//! # Example
//!
//! ```no_run
//! use ipa_reader::IpaReader;
//!
//! let ipa = IpaReader::new().open("app.ipa")?;
//! println!("{:?} {:?}", ipa.name()?, ipa.short_version()?);
//! for (locale, name) in ipa.localized_names()? {
//!     println!("{locale}: {name}");
//! }
//! # Ok::<(), ipa_reader::Error>(())
//! ```

pub mod bplist;
pub mod error;
pub mod ipa;
pub mod plist_file;

pub use bplist::{Date, Dictionary, Integer, Value};
pub use error::Error;
pub use ipa::{validate_ipa, DeviceFamily, IpaArchive, IpaFile, IpaReader};
pub use plist_file::PlistFormat;

pub type Result<T> = std::result::Result<T, Error>;
