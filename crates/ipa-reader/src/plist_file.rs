//! Loading property lists in either container format.
//!
//! Binary plists go through [`crate::bplist`]; XML plists are parsed with the
//! `plist` crate and converted into the same [`Value`] model, so callers never
//! need to know which format an archive used.

use crate::bplist::{self, Date, Dictionary, Integer, Value};
use crate::Result;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;

/// Container format of a property list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlistFormat {
    /// Detect from the `bplist00` header
    #[default]
    Auto,
    /// Binary `bplist00`
    Binary,
    /// XML property list
    Xml,
}

impl PlistFormat {
    /// Resolve [`PlistFormat::Auto`] against the leading bytes of `data`.
    pub fn detect(self, data: &[u8]) -> PlistFormat {
        match self {
            PlistFormat::Auto if bplist::is_binary(data) => PlistFormat::Binary,
            PlistFormat::Auto => PlistFormat::Xml,
            explicit => explicit,
        }
    }
}

impl FromStr for PlistFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(PlistFormat::Auto),
            "binary" | "bplist" => Ok(PlistFormat::Binary),
            "xml" => Ok(PlistFormat::Xml),
            other => Err(format!("unknown plist format: {other}")),
        }
    }
}

/// Parse `data` as a property list.
///
/// # Errors
///
/// Returns [`crate::Error::Plist`] for malformed binary input or XML values
/// without a counterpart in [`Value`], and [`crate::Error::Xml`] for
/// malformed XML.
///
/// # Examples
///
/// ```
/// use ipa_reader::plist_file::{load, PlistFormat};
/// use ipa_reader::Value;
///
/// let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
/// <plist version="1.0"><dict><key>itemId</key><integer>42</integer></dict></plist>"#;
///
/// let value = load(xml, PlistFormat::Auto)?;
/// assert_eq!(value.as_dictionary().unwrap()["itemId"], Value::from(42));
/// # Ok::<(), ipa_reader::Error>(())
/// ```
pub fn load(data: &[u8], format: PlistFormat) -> Result<Value> {
    match format.detect(data) {
        PlistFormat::Binary => {
            tracing::trace!(bytes = data.len(), "loading binary plist");
            Ok(bplist::decode(data)?)
        }
        _ => {
            // iTunesMetadata.plist is commonly NUL-terminated.
            let data = data.strip_suffix(&[0]).unwrap_or(data);
            tracing::trace!(bytes = data.len(), "loading XML plist");
            let parsed = plist::Value::from_reader_xml(Cursor::new(data))?;
            Ok(from_xml_value(parsed)?)
        }
    }
}

/// Render `value` as an XML property list.
///
/// Sets have no XML representation and are written as arrays.
pub fn to_xml(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    to_xml_value(value)?.to_writer_xml(&mut buf)?;
    Ok(buf)
}

fn from_xml_value(value: plist::Value) -> bplist::Result<Value> {
    Ok(match value {
        plist::Value::Boolean(b) => Value::Boolean(b),
        plist::Value::Integer(i) => Value::Integer(from_xml_integer(i)?),
        plist::Value::Real(r) => Value::Real(r),
        plist::Value::Date(d) => Value::Date(Date::from(std::time::SystemTime::from(d))),
        plist::Value::Data(d) => Value::from(d),
        plist::Value::String(s) => Value::from(s),
        plist::Value::Array(items) => Value::Array(Arc::new(
            items
                .into_iter()
                .map(from_xml_value)
                .collect::<bplist::Result<Vec<_>>>()?,
        )),
        plist::Value::Dictionary(dict) => {
            let mut out = Dictionary::new();
            for (key, value) in dict {
                out.insert(key.into(), from_xml_value(value)?);
            }
            Value::Dictionary(Arc::new(out))
        }
        plist::Value::Uid(_) => {
            return Err(bplist::Error::UnsupportedType("keyed archiver UID".into()))
        }
        _ => return Err(bplist::Error::UnsupportedType("unknown XML plist value".into())),
    })
}

fn from_xml_integer(i: plist::Integer) -> bplist::Result<Integer> {
    if let Some(signed) = i.as_signed() {
        Ok(Integer::from(signed))
    } else if let Some(unsigned) = i.as_unsigned() {
        Ok(Integer::from(unsigned))
    } else {
        Err(bplist::Error::Size(format!("{i} does not fit in 64 bits")))
    }
}

fn to_xml_value(value: &Value) -> bplist::Result<plist::Value> {
    Ok(match value {
        Value::Boolean(b) => plist::Value::Boolean(*b),
        Value::Integer(i) => match (i.as_signed(), i.as_unsigned()) {
            (Some(signed), _) => plist::Value::Integer(signed.into()),
            (None, Some(unsigned)) => plist::Value::Integer(unsigned.into()),
            // XML integers are limited to 64 bits.
            (None, None) => plist::Value::String(i.to_string()),
        },
        Value::Real(r) => plist::Value::Real(*r),
        Value::Date(d) => {
            let time = d.to_system_time().ok_or_else(|| {
                bplist::Error::UnsupportedType(format!(
                    "date {} seconds from 2001 has no XML form",
                    d.to_plist_seconds()
                ))
            })?;
            plist::Value::Date(time.into())
        }
        Value::Data(d) => plist::Value::Data(d.to_vec()),
        Value::String(s) => plist::Value::String(s.to_string()),
        Value::Array(items) | Value::Set(items) => plist::Value::Array(
            items
                .iter()
                .map(to_xml_value)
                .collect::<bplist::Result<Vec<_>>>()?,
        ),
        Value::Dictionary(dict) => {
            let mut out = plist::Dictionary::new();
            for (key, value) in dict.iter() {
                out.insert(key.to_string(), to_xml_value(value)?);
            }
            plist::Value::Dictionary(out)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const METADATA_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>artistName</key>
    <string>Example Studio</string>
    <key>itemId</key>
    <integer>1234567890</integer>
    <key>releaseDate</key>
    <string>2020-05-01T07:00:00Z</string>
    <key>ratio</key>
    <real>0.5</real>
    <key>tags</key>
    <array>
        <string>a</string>
        <true/>
    </array>
</dict>
</plist>
"#;

    #[test]
    fn test_detect_format() {
        assert_eq!(PlistFormat::Auto.detect(b"bplist00"), PlistFormat::Binary);
        assert_eq!(PlistFormat::Auto.detect(b"<?xml"), PlistFormat::Xml);
        assert_eq!(PlistFormat::Binary.detect(b"<?xml"), PlistFormat::Binary);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("XML".parse::<PlistFormat>(), Ok(PlistFormat::Xml));
        assert_eq!("binary".parse::<PlistFormat>(), Ok(PlistFormat::Binary));
        assert!("json".parse::<PlistFormat>().is_err());
    }

    #[test]
    fn test_load_xml() {
        let value = load(METADATA_XML, PlistFormat::Auto).unwrap();
        let dict = value.as_dictionary().unwrap();

        assert_eq!(dict["artistName"].as_string(), Some("Example Studio"));
        assert_eq!(dict["itemId"], Value::from(1_234_567_890));
        assert_eq!(dict["ratio"], Value::Real(0.5));
        assert_eq!(
            dict["tags"],
            Value::array([Value::from("a"), Value::from(true)])
        );
    }

    #[test]
    fn test_load_xml_with_trailing_nul() {
        let mut data = METADATA_XML.to_vec();
        data.push(0);
        let value = load(&data, PlistFormat::Auto).unwrap();
        assert!(value.as_dictionary().unwrap().contains_key("itemId"));
    }

    #[test]
    fn test_load_binary() {
        let original = Value::dictionary([("CFBundleVersion", Value::from("42"))]);
        let bytes = bplist::encode(&original).unwrap();
        assert_eq!(load(&bytes, PlistFormat::Auto).unwrap(), original);
        assert_eq!(load(&bytes, PlistFormat::Binary).unwrap(), original);
    }

    #[test]
    fn test_load_forced_binary_rejects_xml() {
        let result = load(METADATA_XML, PlistFormat::Binary);
        assert!(matches!(result, Err(Error::Plist(_))));
    }

    #[test]
    fn test_load_malformed_xml() {
        let result = load(b"<plist><dict><key>a</key>", PlistFormat::Xml);
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_to_xml_roundtrip() {
        let value = Value::dictionary([
            ("name", Value::from("Example")),
            ("count", Value::from(-3)),
            ("blob", Value::from(vec![1u8, 2, 3])),
            ("tags", Value::set([Value::from("x")])),
        ]);
        let xml = to_xml(&value).unwrap();
        let text = String::from_utf8(xml.clone()).unwrap();
        assert!(text.contains("<key>name</key>"));

        let reloaded = load(&xml, PlistFormat::Xml).unwrap();
        let dict = reloaded.as_dictionary().unwrap();
        assert_eq!(dict["count"], Value::from(-3));
        assert_eq!(dict["blob"], Value::from(vec![1u8, 2, 3]));
        assert_eq!(dict["tags"], Value::array([Value::from("x")]));
    }

    #[test]
    fn test_to_xml_date_beyond_platform_clock() {
        let date = Date::from_plist_seconds(1e300).unwrap();
        let result = to_xml(&Value::from(date));
        assert!(matches!(
            result,
            Err(Error::Plist(bplist::Error::UnsupportedType(_)))
        ));
    }
}
