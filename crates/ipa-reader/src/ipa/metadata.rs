//! App metadata read from an IPA.
//!
//! [`IpaFile`] wraps the decoded `Info.plist` of the main app bundle and the
//! optional `iTunesMetadata.plist` at the archive root, and exposes the keys
//! most tools care about.
//!
//! All accessors share one convention: a missing key yields `None` (or an
//! empty collection), a key holding the wrong type yields
//! [`Error::Metadata`].

use super::archive::IpaArchive;
use crate::bplist::{Dictionary, Value};
use crate::plist_file::{self, PlistFormat};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Device class listed in `UIDeviceFamily`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    IPhone,
    IPad,
    /// Any other family code (Apple TV, Watch, ...)
    Other(i64),
}

impl From<i64> for DeviceFamily {
    fn from(code: i64) -> Self {
        match code {
            1 => DeviceFamily::IPhone,
            2 => DeviceFamily::IPad,
            other => DeviceFamily::Other(other),
        }
    }
}

impl DeviceFamily {
    /// Numeric code as stored in `UIDeviceFamily`.
    pub fn code(self) -> i64 {
        match self {
            DeviceFamily::IPhone => 1,
            DeviceFamily::IPad => 2,
            DeviceFamily::Other(code) => code,
        }
    }
}

/// An opened IPA with its property lists decoded.
///
/// Created by [`IpaReader::open`](super::IpaReader::open).
pub struct IpaFile {
    archive: IpaArchive,
    info: Arc<Dictionary>,
    metadata: Arc<Dictionary>,
}

impl IpaFile {
    pub(crate) fn new(archive: IpaArchive, info: Value, metadata: Option<Value>) -> Result<Self> {
        let info = match &info {
            Value::Dictionary(dict) => Arc::clone(dict),
            other => {
                return Err(Error::Metadata(format!(
                    "Info.plist root is a {}, expected a dictionary",
                    other.type_name()
                )))
            }
        };

        let metadata = match &metadata {
            Some(Value::Dictionary(dict)) => Arc::clone(dict),
            Some(other) => {
                return Err(Error::Metadata(format!(
                    "iTunesMetadata.plist root is a {}, expected a dictionary",
                    other.type_name()
                )))
            }
            None => Arc::new(Dictionary::new()),
        };

        Ok(Self {
            archive,
            info,
            metadata,
        })
    }

    /// The archive this file was read from.
    pub fn archive(&self) -> &IpaArchive {
        &self.archive
    }

    /// Decoded `Info.plist` of the main app bundle.
    pub fn info_plist(&self) -> &Dictionary {
        &self.info
    }

    /// Decoded `iTunesMetadata.plist`, empty when the archive has none.
    pub fn metadata_plist(&self) -> &Dictionary {
        &self.metadata
    }

    /// `CFBundleVersion`
    pub fn version(&self) -> Result<Option<&str>> {
        string(&self.info, "CFBundleVersion")
    }

    /// `CFBundleShortVersionString`
    pub fn short_version(&self) -> Result<Option<&str>> {
        string(&self.info, "CFBundleShortVersionString")
    }

    /// `CFBundleDisplayName`
    pub fn name(&self) -> Result<Option<&str>> {
        string(&self.info, "CFBundleDisplayName")
    }

    /// `CFBundleIdentifier`
    pub fn bundle_identifier(&self) -> Result<Option<&str>> {
        string(&self.info, "CFBundleIdentifier")
    }

    /// `CFBundleExecutable`
    pub fn executable_file(&self) -> Result<Option<&str>> {
        string(&self.info, "CFBundleExecutable")
    }

    /// SDK version the app was built against, e.g. `"7.0"`.
    pub fn target_os_version(&self) -> Result<Option<&str>> {
        Ok(string(&self.info, "DTPlatformVersion")?.map(version_prefix))
    }

    /// Lowest OS version the app runs on.
    pub fn minimum_os_version(&self) -> Result<Option<&str>> {
        Ok(string(&self.info, "MinimumOSVersion")?.map(version_prefix))
    }

    /// URL schemes of the first `CFBundleURLTypes` entry.
    pub fn url_schemes(&self) -> Result<Vec<String>> {
        let Some(types) = array(&self.info, "CFBundleURLTypes")? else {
            return Ok(Vec::new());
        };
        let Some(first) = types.first() else {
            return Ok(Vec::new());
        };
        let first = first.as_dictionary().ok_or_else(|| {
            Error::Metadata(format!(
                "CFBundleURLTypes[0] is a {}, expected a dictionary",
                first.type_name()
            ))
        })?;

        array(first, "CFBundleURLSchemes")?
            .unwrap_or_default()
            .iter()
            .map(|scheme| {
                scheme.as_string().map(str::to_string).ok_or_else(|| {
                    Error::Metadata(format!(
                        "CFBundleURLSchemes holds a {}, expected strings",
                        scheme.type_name()
                    ))
                })
            })
            .collect()
    }

    /// Archive path of the app icon.
    ///
    /// Looks for the last `CFBundleIconFiles` name, then `CFBundleIconFile`,
    /// then the last primary icon of `CFBundleIcons`, and finally any
    /// `Icon@2x` file.
    pub fn icon_file(&self) -> Result<Option<String>> {
        let pattern = if let Some(files) = array(&self.info, "CFBundleIconFiles")? {
            match files.last() {
                Some(last) => format!("{}$", regex::escape(icon_name(last)?)),
                None => return Ok(None),
            }
        } else if let Some(file) = string(&self.info, "CFBundleIconFile")? {
            format!("{}$", regex::escape(file))
        } else if let Some(icons) = dictionary(&self.info, "CFBundleIcons")? {
            let files = dictionary(icons, "CFBundlePrimaryIcon")?
                .map(|primary| array(primary, "CFBundleIconFiles"))
                .transpose()?
                .flatten();
            match files.and_then(<[Value]>::last) {
                Some(last) => regex::escape(icon_name(last)?),
                None => return Ok(None),
            }
        } else {
            regex::escape("Icon@2x")
        };

        tracing::trace!(%pattern, "locating icon");
        Ok(self.archive.find(&Regex::new(&pattern)?))
    }

    /// Whether `UIPrerenderedIcon` is set to `true`.
    pub fn icon_prerendered(&self) -> bool {
        matches!(self.info.get("UIPrerenderedIcon"), Some(Value::Boolean(true)))
    }

    /// Device families listed in `UIDeviceFamily`.
    ///
    /// Accepts a single code as well as an array, and codes written as
    /// numeric strings.
    pub fn device_family(&self) -> Result<Vec<DeviceFamily>> {
        let codes = match self.info.get("UIDeviceFamily") {
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
            Some(single) => vec![single],
        };

        codes
            .into_iter()
            .map(|code| family_code(code).map(DeviceFamily::from))
            .collect()
    }

    /// Raw `embedded.mobileprovision`, if the app carries one.
    ///
    /// The profile is a signed CMS envelope and is returned undecoded.
    pub fn mobile_provision(&self) -> Result<Option<Vec<u8>>> {
        let pattern = Regex::new(r"embedded\.mobileprovision$")?;
        self.archive.read(&pattern)
    }

    /// Display name per localization, keyed by `.lproj` name.
    ///
    /// Localizations whose `InfoPlist.strings` cannot be parsed or has no
    /// `CFBundleDisplayName` are left out.
    pub fn localized_names(&self) -> Result<BTreeMap<String, String>> {
        let pattern = Regex::new(r"^Payload/[^/]+\.app/(.+)\.lproj/InfoPlist\.strings$")?;
        let entries = self.archive.read_matching(&pattern)?;

        let names = entries
            .par_iter()
            .filter_map(|(path, data)| {
                let locale = pattern.captures(path)?.get(1)?.as_str();
                let strings = match plist_file::load(data, PlistFormat::Auto) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(%path, error = %e, "skipping unreadable InfoPlist.strings");
                        return None;
                    }
                };
                let name = strings
                    .as_dictionary()?
                    .get("CFBundleDisplayName")?
                    .as_string()?;
                Some((locale.to_string(), name.to_string()))
            })
            .collect();

        Ok(names)
    }

    /// Store item id (`itemId`).
    pub fn app_id(&self) -> Result<Option<String>> {
        identifier(&self.metadata, "itemId")
    }

    /// Primary genre name.
    pub fn genre(&self) -> Result<Option<&str>> {
        string(&self.metadata, "genre")
    }

    /// Primary genre id (`genreId`), rendered as text.
    pub fn genre_id(&self) -> Result<Option<String>> {
        identifier(&self.metadata, "genreId")
    }

    /// Developer account id (`artistId`), rendered as text.
    pub fn artist_id(&self) -> Result<Option<String>> {
        identifier(&self.metadata, "artistId")
    }

    /// Developer name shown on the store page.
    pub fn artist_name(&self) -> Result<Option<&str>> {
        string(&self.metadata, "artistName")
    }

    /// Store release date.
    ///
    /// Accepts a plist date, an RFC 3339 timestamp or a bare `YYYY-MM-DD`.
    pub fn release_date(&self) -> Result<Option<NaiveDate>> {
        match self.metadata.get("releaseDate") {
            None => Ok(None),
            Some(Value::Date(date)) => {
                let time = date.to_system_time().ok_or_else(|| {
                    Error::Metadata(format!(
                        "releaseDate {} seconds from 2001 is out of range",
                        date.to_plist_seconds()
                    ))
                })?;
                Ok(Some(DateTime::<Utc>::from(time).date_naive()))
            }
            Some(Value::String(s)) => parse_date(s).map(Some),
            Some(other) => Err(wrong_type("releaseDate", other, "date")),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Ok(time.date_naive());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::Metadata(format!("releaseDate {s:?}: {e}")))
}

/// Leading run of digits and dots, e.g. `"7.0"` from `"7.0b2"`.
fn version_prefix(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    &s[..end]
}

fn icon_name(value: &Value) -> Result<&str> {
    value.as_string().ok_or_else(|| {
        Error::Metadata(format!("icon name is a {}, expected a string", value.type_name()))
    })
}

fn family_code(value: &Value) -> Result<i64> {
    let code = match value {
        Value::Integer(i) => i.as_signed(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    code.ok_or_else(|| wrong_type("UIDeviceFamily", value, "integer"))
}

fn string<'a>(dict: &'a Dictionary, key: &str) -> Result<Option<&'a str>> {
    match dict.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_ref())),
        Some(other) => Err(wrong_type(key, other, "string")),
    }
}

fn array<'a>(dict: &'a Dictionary, key: &str) -> Result<Option<&'a [Value]>> {
    match dict.get(key) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(wrong_type(key, other, "array")),
    }
}

fn dictionary<'a>(dict: &'a Dictionary, key: &str) -> Result<Option<&'a Dictionary>> {
    match dict.get(key) {
        None => Ok(None),
        Some(Value::Dictionary(inner)) => Ok(Some(inner)),
        Some(other) => Err(wrong_type(key, other, "dictionary")),
    }
}

/// Store identifiers are integers in practice; strings pass through.
fn identifier(dict: &Dictionary, key: &str) -> Result<Option<String>> {
    match dict.get(key) {
        None => Ok(None),
        Some(Value::Integer(i)) => Ok(Some(i.to_string())),
        Some(Value::String(s)) => Ok(Some(s.to_string())),
        Some(other) => Err(wrong_type(key, other, "integer")),
    }
}

fn wrong_type(key: &str, value: &Value, expected: &str) -> Error {
    Error::Metadata(format!(
        "{key} is a {}, expected {expected}",
        value.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bplist::Date;

    fn dict(entries: Vec<(&str, Value)>) -> Dictionary {
        entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
    }

    #[test]
    fn test_version_prefix() {
        assert_eq!(version_prefix("7.0"), "7.0");
        assert_eq!(version_prefix("7.0b2"), "7.0");
        assert_eq!(version_prefix("iOS"), "");
    }

    #[test]
    fn test_device_family_codes() {
        assert_eq!(DeviceFamily::from(1), DeviceFamily::IPhone);
        assert_eq!(DeviceFamily::from(2), DeviceFamily::IPad);
        assert_eq!(DeviceFamily::from(3), DeviceFamily::Other(3));
        assert_eq!(DeviceFamily::Other(4).code(), 4);
    }

    #[test]
    fn test_family_code_accepts_numeric_string() {
        assert_eq!(family_code(&Value::from("2")).unwrap(), 2);
        assert_eq!(family_code(&Value::from(1)).unwrap(), 1);
        assert!(matches!(
            family_code(&Value::from(true)),
            Err(Error::Metadata(_))
        ));
    }

    #[test]
    fn test_string_lookup() {
        let d = dict(vec![
            ("CFBundleVersion", Value::from("376")),
            ("UIDeviceFamily", Value::from(1)),
        ]);
        assert_eq!(string(&d, "CFBundleVersion").unwrap(), Some("376"));
        assert_eq!(string(&d, "Missing").unwrap(), None);
        assert!(matches!(
            string(&d, "UIDeviceFamily"),
            Err(Error::Metadata(msg)) if msg.contains("integer")
        ));
    }

    #[test]
    fn test_identifier_renders_integers() {
        let d = dict(vec![
            ("itemId", Value::from(376_101_648)),
            ("genreId", Value::from("6002")),
            ("artistId", Value::from(1.5)),
        ]);
        assert_eq!(identifier(&d, "itemId").unwrap().as_deref(), Some("376101648"));
        assert_eq!(identifier(&d, "genreId").unwrap().as_deref(), Some("6002"));
        assert!(identifier(&d, "artistId").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2013, 9, 18).unwrap();
        assert_eq!(parse_date("2013-09-18T07:00:00Z").unwrap(), expected);
        assert_eq!(parse_date("2013-09-18").unwrap(), expected);
        assert!(parse_date("September").is_err());
    }

    #[test]
    fn test_plist_date_to_naive_date() {
        // 2001-01-02T00:00:00Z
        let date = Date::from_plist_seconds(86_400.0).unwrap();
        let time = DateTime::<Utc>::from(date.to_system_time().unwrap());
        assert_eq!(time.date_naive(), NaiveDate::from_ymd_opt(2001, 1, 2).unwrap());
    }
}
