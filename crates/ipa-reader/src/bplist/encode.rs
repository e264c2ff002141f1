//! Object encoder and buffer assembly.

use super::constants::*;
use super::error::Error;
use super::flatten::{flatten, Entry};
use super::trailer::Trailer;
use super::value::Value;
use super::width::{unsigned_width, write_integer, write_marker, write_uint};
use super::Result;

/// Serialize `root` as a `bplist00` buffer.
///
/// Containers that are the same `Arc` instance are written once; all other
/// values get their own object. The output is deterministic for a given
/// graph shape.
///
/// # Errors
///
/// Returns [`Error::Encoding`] if a string contains a character outside
/// the Basic Multilingual Plane.
///
/// # Examples
///
/// ```
/// use ipa_reader::{bplist, Value};
///
/// let value = Value::dictionary([("CFBundleVersion", Value::from("1.0"))]);
/// let bytes = bplist::encode(&value)?;
/// assert!(bytes.starts_with(b"bplist00"));
/// assert_eq!(bplist::decode(&bytes)?, value);
/// # Ok::<(), ipa_reader::bplist::Error>(())
/// ```
pub fn encode(root: &Value) -> Result<Vec<u8>> {
    let table = flatten(root);
    let object_count = table.len() as u64;
    let ref_width = unsigned_width(object_count - 1);

    let mut buf = Vec::with_capacity(HEADER_LEN + table.len() * 8 + TRAILER_LEN);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(VERSION);

    let mut offsets = Vec::with_capacity(table.len());
    for entry in &table {
        offsets.push(buf.len() as u64);
        write_entry(&mut buf, entry, ref_width)?;
    }

    let offset_table_start = buf.len() as u64;
    let largest_offset = offsets.iter().copied().max().unwrap_or(0);
    let trailer = Trailer {
        offset_width: unsigned_width(largest_offset),
        ref_width,
        object_count,
        root_object: 0,
        offset_table_start,
    };
    trailer.write(&mut buf, &offsets);

    tracing::debug!(
        objects = object_count,
        ref_width,
        offset_width = trailer.offset_width,
        bytes = buf.len(),
        "encoded binary plist"
    );

    Ok(buf)
}

fn write_entry(buf: &mut Vec<u8>, entry: &Entry<'_>, ref_width: u8) -> Result<()> {
    match entry {
        Entry::Scalar(value) => write_scalar(buf, value)?,
        Entry::Key(key) => write_string(buf, key)?,
        Entry::Array(members) => write_refs(buf, KIND_ARRAY, members, ref_width),
        Entry::Set(members) => write_refs(buf, KIND_SET, members, ref_width),
        Entry::Dictionary { keys, values } => {
            write_marker(buf, KIND_DICTIONARY, keys.len());
            for index in keys.iter().chain(values) {
                write_uint(buf, *index, ref_width);
            }
        }
    }
    Ok(())
}

fn write_scalar(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Boolean(false) => buf.push(MARKER_FALSE),
        Value::Boolean(true) => buf.push(MARKER_TRUE),
        Value::Integer(i) => write_integer(buf, i.value()),
        Value::Real(r) => {
            buf.push(MARKER_REAL_64);
            buf.extend_from_slice(&r.to_be_bytes());
        }
        Value::Date(date) => {
            buf.push(MARKER_DATE);
            buf.extend_from_slice(&date.to_plist_seconds().to_be_bytes());
        }
        Value::Data(data) => {
            write_marker(buf, KIND_DATA, data.len());
            buf.extend_from_slice(data);
        }
        Value::String(s) => write_string(buf, s)?,
        Value::Array(_) | Value::Set(_) | Value::Dictionary(_) => {
            unreachable!("containers are flattened into index lists")
        }
    }
    Ok(())
}

/// Write `s` as ASCII when every byte allows it, as UTF-16BE otherwise.
fn write_string(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.is_ascii() {
        write_marker(buf, KIND_ASCII_STRING, s.len());
        buf.extend_from_slice(s.as_bytes());
        return Ok(());
    }

    if let Some(c) = s.chars().find(|c| *c as u32 > 0xFFFF) {
        return Err(Error::Encoding(format!(
            "U+{:X} is outside the Basic Multilingual Plane",
            c as u32
        )));
    }

    let units: Vec<u16> = s.encode_utf16().collect();
    write_marker(buf, KIND_UNICODE_STRING, units.len());
    for unit in units {
        buf.extend_from_slice(&unit.to_be_bytes());
    }
    Ok(())
}

fn write_refs(buf: &mut Vec<u8>, kind: u8, members: &[u64], ref_width: u8) {
    write_marker(buf, kind, members.len());
    for index in members {
        write_uint(buf, *index, ref_width);
    }
}
