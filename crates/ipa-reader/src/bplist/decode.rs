//! Object decoder.
//!
//! [`ObjectReader`] turns one fragment at a time back into an [`Object`]:
//! scalars come out as finished values, containers as index lists that the
//! unflattener resolves. Every read is bounds-checked against the buffer.

use super::constants::*;
use super::error::Error;
use super::trailer::Trailer;
use super::unflatten::unflatten;
use super::value::{Date, Integer, Value};
use super::width::read_uint;
use super::Result;
use std::sync::Arc;

/// Parse a `bplist00` buffer into a value.
///
/// References to one object index resolve to a single shared instance.
///
/// # Errors
///
/// - [`Error::Format`] for a bad header, an inconsistent trailer or
///   object graph
/// - [`Error::Truncated`] when the buffer ends before the data it declares
/// - [`Error::UnsupportedType`] for object markers outside the value model
///
/// # Examples
///
/// ```
/// use ipa_reader::{bplist, Value};
///
/// let mut bytes = b"bplist00".to_vec();
/// bytes.push(0x09); // true
/// bytes.push(0x08); // offset table
/// bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 1, 1]);
/// bytes.extend_from_slice(&1u64.to_be_bytes());
/// bytes.extend_from_slice(&0u64.to_be_bytes());
/// bytes.extend_from_slice(&9u64.to_be_bytes());
///
/// assert_eq!(bplist::decode(&bytes)?, Value::Boolean(true));
/// # Ok::<(), ipa_reader::bplist::Error>(())
/// ```
pub fn decode(data: &[u8]) -> Result<Value> {
    let reader = ObjectReader::new(data)?;
    tracing::debug!(
        objects = reader.trailer.object_count,
        ref_width = reader.trailer.ref_width,
        offset_width = reader.trailer.offset_width,
        root = reader.trailer.root_object,
        "decoding binary plist"
    );
    unflatten(&reader)
}

/// A decoded fragment.
#[derive(Debug, PartialEq)]
pub(crate) enum Object {
    Scalar(Value),
    Array(Vec<u64>),
    Set(Vec<u64>),
    Dictionary { keys: Vec<u64>, values: Vec<u64> },
}

/// Random access to the objects of one buffer.
pub(crate) struct ObjectReader<'a> {
    data: &'a [u8],
    trailer: Trailer,
}

impl<'a> ObjectReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Result<Self> {
        let trailer = Trailer::parse(data)?;
        Ok(Self { data, trailer })
    }

    pub(crate) fn root(&self) -> u64 {
        self.trailer.root_object
    }

    pub(crate) fn object_count(&self) -> u64 {
        self.trailer.object_count
    }

    /// Decode the object at table index `index`.
    pub(crate) fn read_object(&self, index: u64) -> Result<Object> {
        let offset = self.trailer.offset_of(self.data, index)?;
        self.read_at(offset)
    }

    fn read_at(&self, offset: u64) -> Result<Object> {
        let marker = self.byte(offset)?;
        let info = marker & 0x0F;
        let body = offset + 1;

        let value = match marker & 0xF0 {
            KIND_SINGLETON => match marker {
                MARKER_FALSE => Value::Boolean(false),
                MARKER_TRUE => Value::Boolean(true),
                _ => return Err(unsupported(marker, offset)),
            },
            KIND_INTEGER => {
                let (value, _) = self.read_integer(body, info, marker)?;
                Value::Integer(Integer::from(value))
            }
            KIND_REAL => Value::Real(self.read_real(body, info, marker)?),
            KIND_DATE if marker == MARKER_DATE => {
                let seconds = f64::from_be_bytes(self.array::<8>(body)?);
                let date = Date::from_plist_seconds(seconds).ok_or_else(|| {
                    Error::Format(format!("date {seconds} at offset {offset} is not finite"))
                })?;
                Value::Date(date)
            }
            KIND_DATA => {
                let (len, start) = self.read_length(body, info)?;
                Value::Data(Arc::from(self.slice(start, len)?))
            }
            KIND_ASCII_STRING => {
                let (len, start) = self.read_length(body, info)?;
                let text: String = self.slice(start, len)?.iter().map(|&b| b as char).collect();
                Value::String(Arc::from(text))
            }
            KIND_UNICODE_STRING => {
                let (len, start) = self.read_length(body, info)?;
                let byte_len = len.checked_mul(2).ok_or_else(|| overflow(offset))?;
                let units: Vec<u16> = self
                    .slice(start, byte_len)?
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                Value::String(Arc::from(String::from_utf16_lossy(&units)))
            }
            KIND_ARRAY => {
                let (len, start) = self.read_length(body, info)?;
                return Ok(Object::Array(self.read_refs(start, len)?));
            }
            KIND_SET => {
                let (len, start) = self.read_length(body, info)?;
                return Ok(Object::Set(self.read_refs(start, len)?));
            }
            KIND_DICTIONARY => {
                let (len, start) = self.read_length(body, info)?;
                let keys = self.read_refs(start, len)?;
                let values_start = start + len * self.trailer.ref_width as u64;
                let values = self.read_refs(values_start, len)?;
                return Ok(Object::Dictionary { keys, values });
            }
            _ => return Err(unsupported(marker, offset)),
        };

        Ok(Object::Scalar(value))
    }

    /// Integer payload at `offset`, returning the value and the next offset.
    fn read_integer(&self, offset: u64, info: u8, marker: u8) -> Result<(i128, u64)> {
        let value = match info {
            0 => self.byte(offset)? as i128,
            1 => u16::from_be_bytes(self.array::<2>(offset)?) as i128,
            2 => u32::from_be_bytes(self.array::<4>(offset)?) as i128,
            3 => i64::from_be_bytes(self.array::<8>(offset)?) as i128,
            4 => i128::from_be_bytes(self.array::<16>(offset)?),
            _ => return Err(unsupported(marker, offset - 1)),
        };
        Ok((value, offset + (1u64 << info)))
    }

    fn read_real(&self, offset: u64, info: u8, marker: u8) -> Result<f64> {
        match info {
            2 => Ok(f32::from_be_bytes(self.array::<4>(offset)?) as f64),
            3 => Ok(f64::from_be_bytes(self.array::<8>(offset)?)),
            _ => Err(unsupported(marker, offset - 1)),
        }
    }

    /// Resolve a length nibble, returning the length and the payload offset.
    fn read_length(&self, offset: u64, info: u8) -> Result<(u64, u64)> {
        if info != LENGTH_FOLLOWS {
            return Ok((info as u64, offset));
        }

        let marker = self.byte(offset)?;
        if marker & 0xF0 != KIND_INTEGER {
            return Err(Error::Format(format!(
                "length at offset {offset} is not an integer (marker 0x{marker:02x})"
            )));
        }

        let (len, next) = self.read_integer(offset + 1, marker & 0x0F, marker)?;
        let len = u64::try_from(len).map_err(|_| {
            Error::Format(format!("negative length {len} at offset {offset}"))
        })?;
        Ok((len, next))
    }

    fn read_refs(&self, offset: u64, count: u64) -> Result<Vec<u64>> {
        let width = self.trailer.ref_width as u64;
        let len = count.checked_mul(width).ok_or_else(|| overflow(offset))?;
        Ok(self
            .slice(offset, len)?
            .chunks_exact(width as usize)
            .map(read_uint)
            .collect())
    }

    fn byte(&self, offset: u64) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    fn array<const N: usize>(&self, offset: u64) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N as u64)?);
        Ok(out)
    }

    fn slice(&self, offset: u64, len: u64) -> Result<&'a [u8]> {
        let range = usize::try_from(offset).ok().and_then(|start| {
            let end = start.checked_add(usize::try_from(len).ok()?)?;
            Some(start..end)
        });

        range
            .and_then(|range| self.data.get(range))
            .ok_or_else(|| {
                Error::Truncated(format!(
                    "{len} bytes at offset {offset} run past the end of {} bytes",
                    self.data.len()
                ))
            })
    }
}

fn unsupported(marker: u8, offset: u64) -> Error {
    Error::UnsupportedType(format!("marker 0x{marker:02x} at offset {offset}"))
}

fn overflow(offset: u64) -> Error {
    Error::Truncated(format!("length at offset {offset} exceeds the address space"))
}
