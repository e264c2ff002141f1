//! Header, offset table and trailer handling.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Header "bplist00" (8 bytes)             │
//! ├─────────────────────────────────────────┤
//! │ Object fragments                        │
//! ├─────────────────────────────────────────┤
//! │ Offset table (count * offset_width)     │
//! ├─────────────────────────────────────────┤
//! │ Trailer (32 bytes)                      │
//! │  - reserved (6 bytes, zero)             │
//! │  - offset_width (1 byte)                │
//! │  - ref_width (1 byte)                   │
//! │  - object_count (8 bytes)               │
//! │  - root_object (8 bytes)                │
//! │  - offset_table_start (8 bytes)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! All multi-byte fields are big-endian.

use super::constants::*;
use super::error::Error;
use super::width::{read_uint, write_uint};
use super::Result;

/// Parsed or to-be-written trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Trailer {
    /// Byte width of each offset table entry
    pub offset_width: u8,
    /// Byte width of each object reference
    pub ref_width: u8,
    /// Number of objects (and offset table entries)
    pub object_count: u64,
    /// Index of the root object
    pub root_object: u64,
    /// Absolute address of the offset table
    pub offset_table_start: u64,
}

impl Trailer {
    /// Append the offset table followed by this trailer.
    pub(crate) fn write(&self, buf: &mut Vec<u8>, offsets: &[u64]) {
        for offset in offsets {
            write_uint(buf, *offset, self.offset_width);
        }

        buf.extend_from_slice(&[0u8; 6]);
        buf.push(self.offset_width);
        buf.push(self.ref_width);
        buf.extend_from_slice(&self.object_count.to_be_bytes());
        buf.extend_from_slice(&self.root_object.to_be_bytes());
        buf.extend_from_slice(&self.offset_table_start.to_be_bytes());
    }

    /// Validate the header and read the trailer of `data`.
    ///
    /// The object count is checked against the buffer length before the
    /// widths, so a buffer that lost its final byte (whose trailer is read one
    /// byte early) is reported as truncated.
    pub(crate) fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN + TRAILER_LEN {
            return Err(Error::Truncated(format!(
                "{} bytes is shorter than header and trailer ({} bytes)",
                data.len(),
                HEADER_LEN + TRAILER_LEN
            )));
        }

        if &data[..6] != MAGIC {
            return Err(Error::Format("missing bplist magic".into()));
        }
        if &data[6..8] != VERSION {
            return Err(Error::Format(format!(
                "unsupported version {:?}",
                String::from_utf8_lossy(&data[6..8])
            )));
        }

        let trailer = &data[data.len() - TRAILER_LEN..];
        let offset_width = trailer[6];
        let ref_width = trailer[7];
        let object_count = read_uint(&trailer[8..16]);
        let root_object = read_uint(&trailer[16..24]);
        let offset_table_start = read_uint(&trailer[24..32]);

        if object_count > data.len() as u64 {
            return Err(Error::Truncated(format!(
                "{} objects declared in a {}-byte buffer",
                object_count,
                data.len()
            )));
        }
        if object_count == 0 {
            return Err(Error::Format("no objects declared".into()));
        }
        if !(1..=8).contains(&offset_width) {
            return Err(Error::Format(format!("offset width {offset_width}")));
        }
        if !(1..=8).contains(&ref_width) {
            return Err(Error::Format(format!("reference width {ref_width}")));
        }
        if offset_table_start < HEADER_LEN as u64 {
            return Err(Error::Format(format!(
                "offset table at {offset_table_start} overlaps the header"
            )));
        }

        let trailer_start = (data.len() - TRAILER_LEN) as u64;
        let table_end = object_count
            .checked_mul(offset_width as u64)
            .and_then(|len| len.checked_add(offset_table_start));
        match table_end {
            Some(end) if end <= trailer_start => {}
            _ => {
                return Err(Error::Truncated(format!(
                    "offset table at {offset_table_start} for {object_count} objects runs past {trailer_start}"
                )));
            }
        }

        if root_object >= object_count {
            return Err(Error::Format(format!(
                "root object {root_object} outside {object_count} objects"
            )));
        }

        Ok(Self {
            offset_width,
            ref_width,
            object_count,
            root_object,
            offset_table_start,
        })
    }

    /// Look up the fragment address of object `index`.
    pub(crate) fn offset_of(&self, data: &[u8], index: u64) -> Result<u64> {
        if index >= self.object_count {
            return Err(Error::Format(format!(
                "object reference {index} outside {} objects",
                self.object_count
            )));
        }

        // Bounds were established by `parse`.
        let start = (self.offset_table_start + index * self.offset_width as u64) as usize;
        let entry = &data[start..start + self.offset_width as usize];
        Ok(read_uint(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Header, `true` at offset 8, one-entry offset table at 9.
    fn minimal_plist() -> Vec<u8> {
        let mut buf = b"bplist00".to_vec();
        buf.push(MARKER_TRUE);
        Trailer {
            offset_width: 1,
            ref_width: 1,
            object_count: 1,
            root_object: 0,
            offset_table_start: 9,
        }
        .write(&mut buf, &[8]);
        buf
    }

    #[test]
    fn test_write_layout() {
        let buf = minimal_plist();
        assert_eq!(buf.len(), 8 + 1 + 1 + 32);
        assert_eq!(buf[9], 8);
        assert_eq!(&buf[10..16], &[0u8; 6]);
        assert_eq!(buf[16], 1);
        assert_eq!(buf[17], 1);
        assert_eq!(&buf[18..26], &1u64.to_be_bytes());
        assert_eq!(&buf[26..34], &0u64.to_be_bytes());
        assert_eq!(&buf[34..42], &9u64.to_be_bytes());
    }

    #[test]
    fn test_parse_minimal() {
        let buf = minimal_plist();
        let trailer = Trailer::parse(&buf).unwrap();
        assert_eq!(trailer.object_count, 1);
        assert_eq!(trailer.root_object, 0);
        assert_eq!(trailer.offset_table_start, 9);
        assert_eq!(trailer.offset_of(&buf, 0).unwrap(), 8);
    }

    #[test]
    fn test_parse_too_short() {
        let result = Trailer::parse(b"bplist00");
        assert!(matches!(result, Err(Error::Truncated(_))));
    }

    #[test]
    fn test_parse_bad_magic() {
        let mut buf = minimal_plist();
        buf[0] = b'x';
        assert!(matches!(Trailer::parse(&buf), Err(Error::Format(_))));
    }

    #[test]
    fn test_parse_bad_version() {
        let mut buf = minimal_plist();
        buf[7] = b'1';
        assert!(matches!(Trailer::parse(&buf), Err(Error::Format(_))));
    }

    #[test]
    fn test_parse_missing_last_byte() {
        let buf = minimal_plist();
        let result = Trailer::parse(&buf[..buf.len() - 1]);
        assert!(matches!(result, Err(Error::Truncated(_))));
    }

    #[test]
    fn test_parse_root_out_of_range() {
        let mut buf = minimal_plist();
        let len = buf.len();
        buf[len - 9] = 1;
        assert!(matches!(Trailer::parse(&buf), Err(Error::Format(_))));
    }

    #[test]
    fn test_parse_offset_table_past_trailer() {
        let mut buf = minimal_plist();
        let len = buf.len();
        buf[len - 1] = 10;
        assert!(matches!(Trailer::parse(&buf), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_offset_of_out_of_range() {
        let buf = minimal_plist();
        let trailer = Trailer::parse(&buf).unwrap();
        assert!(matches!(trailer.offset_of(&buf, 1), Err(Error::Format(_))));
    }
}
