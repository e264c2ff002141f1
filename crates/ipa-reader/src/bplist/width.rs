//! Width selection and big-endian packing shared by the encoder and decoder.
//!
//! Object references and offsets are unsigned and sized to the largest value
//! stored in their role. Integer payloads are unsigned at 1, 2 and 4 bytes
//! and two's-complement at 8 and 16 bytes, so a negative integer always takes
//! at least 8 bytes.

use super::constants::*;

/// Smallest of 1, 2, 4 or 8 bytes able to hold `value` unsigned.
pub(crate) fn unsigned_width(value: u64) -> u8 {
    if value <= u8::MAX as u64 {
        1
    } else if value <= u16::MAX as u64 {
        2
    } else if value <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

/// Payload width of an integer fragment holding `value`.
pub(crate) fn integer_width(value: i128) -> u8 {
    if value < 0 {
        if value >= i64::MIN as i128 {
            8
        } else {
            16
        }
    } else if value <= u32::MAX as i128 {
        unsigned_width(value as u64)
    } else if value <= i64::MAX as i128 {
        8
    } else {
        16
    }
}

/// Append the low `width` bytes of `value`, big-endian.
pub(crate) fn write_uint(buf: &mut Vec<u8>, value: u64, width: u8) {
    let bytes = value.to_be_bytes();
    buf.extend_from_slice(&bytes[8 - width as usize..]);
}

/// Read an unsigned big-endian value of up to 8 bytes.
pub(crate) fn read_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Append a complete integer fragment (marker + payload).
pub(crate) fn write_integer(buf: &mut Vec<u8>, value: i128) {
    let width = integer_width(value);
    buf.push(KIND_INTEGER | width.trailing_zeros() as u8);

    match width {
        8 => buf.extend_from_slice(&(value as i64).to_be_bytes()),
        16 => buf.extend_from_slice(&value.to_be_bytes()),
        _ => write_uint(buf, value as u64, width),
    }
}

/// Append a marker byte for `kind`, with the length inline or following it.
pub(crate) fn write_marker(buf: &mut Vec<u8>, kind: u8, len: usize) {
    if len <= MAX_INLINE_LENGTH {
        buf.push(kind | len as u8);
    } else {
        buf.push(kind | LENGTH_FOLLOWS);
        write_integer(buf, len as i128);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_width_boundaries() {
        assert_eq!(unsigned_width(0), 1);
        assert_eq!(unsigned_width(0xFF), 1);
        assert_eq!(unsigned_width(0x100), 2);
        assert_eq!(unsigned_width(0xFFFF), 2);
        assert_eq!(unsigned_width(0x10000), 4);
        assert_eq!(unsigned_width(0xFFFF_FFFF), 4);
        assert_eq!(unsigned_width(0x1_0000_0000), 8);
        assert_eq!(unsigned_width(u64::MAX), 8);
    }

    #[test]
    fn test_integer_width_boundaries() {
        assert_eq!(integer_width(0xFF), 1);
        assert_eq!(integer_width(0x100), 2);
        assert_eq!(integer_width(0xFFFF_FFFF), 4);
        assert_eq!(integer_width(0x1_0000_0000), 8);
        assert_eq!(integer_width(i64::MAX as i128), 8);
        assert_eq!(integer_width(i64::MAX as i128 + 1), 16);
        assert_eq!(integer_width(u64::MAX as i128), 16);
    }

    #[test]
    fn test_integer_width_negative() {
        assert_eq!(integer_width(-1), 8);
        assert_eq!(integer_width(i64::MIN as i128), 8);
        assert_eq!(integer_width(i64::MIN as i128 - 1), 16);
        assert_eq!(integer_width(i128::MIN), 16);
    }

    #[test]
    fn test_write_integer_small() {
        let mut buf = Vec::new();
        write_integer(&mut buf, 0x2A);
        assert_eq!(buf, vec![0x10, 0x2A]);
    }

    #[test]
    fn test_write_integer_two_bytes() {
        let mut buf = Vec::new();
        write_integer(&mut buf, 0x100);
        assert_eq!(buf, vec![0x11, 0x01, 0x00]);
    }

    #[test]
    fn test_write_integer_negative_one() {
        let mut buf = Vec::new();
        write_integer(&mut buf, -1);
        assert_eq!(buf, vec![0x13, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_write_integer_sixteen_bytes() {
        let mut buf = Vec::new();
        write_integer(&mut buf, i64::MAX as i128 + 1);
        assert_eq!(buf.len(), 17);
        assert_eq!(buf[0], 0x14);
        assert_eq!(&buf[1..9], &[0u8; 8]);
        assert_eq!(buf[9], 0x80);
    }

    #[test]
    fn test_write_marker_inline() {
        let mut buf = Vec::new();
        write_marker(&mut buf, KIND_ASCII_STRING, 14);
        assert_eq!(buf, vec![0x5E]);
    }

    #[test]
    fn test_write_marker_extended() {
        let mut buf = Vec::new();
        write_marker(&mut buf, KIND_ASCII_STRING, 15);
        assert_eq!(buf, vec![0x5F, 0x10, 0x0F]);

        let mut buf = Vec::new();
        write_marker(&mut buf, KIND_ARRAY, 300);
        assert_eq!(buf, vec![0xAF, 0x11, 0x01, 0x2C]);
    }

    #[test]
    fn test_uint_round_trip() {
        let mut buf = Vec::new();
        write_uint(&mut buf, 0x0102_0304, 4);
        assert_eq!(buf, vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(read_uint(&buf), 0x0102_0304);
        assert_eq!(read_uint(&[0x01, 0x00]), 0x100);
    }
}
