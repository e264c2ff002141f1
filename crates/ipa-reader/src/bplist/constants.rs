//! Binary property list constants and marker bytes
//!
//! Every object fragment starts with a marker byte. The high nibble names the
//! object type, the low nibble carries either an inline length (0-14), the
//! [`LENGTH_FOLLOWS`] sentinel, or a type-specific detail such as the log2
//! width of an integer payload.

// =============================================================================
// Header and Trailer
// =============================================================================

/// File magic, first six bytes of every binary plist
pub const MAGIC: &[u8; 6] = b"bplist";

/// Format version following the magic
pub const VERSION: &[u8; 2] = b"00";

/// Size of the header (magic + version) in bytes
pub const HEADER_LEN: usize = 8;

/// Size of the fixed trailer in bytes
pub const TRAILER_LEN: usize = 32;

// =============================================================================
// Marker Bytes
// =============================================================================

/// Low nibble sentinel: the real length follows as an integer fragment
pub const LENGTH_FOLLOWS: u8 = 0x0F;

/// Largest length that fits in the marker's low nibble
pub const MAX_INLINE_LENGTH: usize = 14;

/// High nibble of singleton markers (null, booleans, fill)
pub const KIND_SINGLETON: u8 = 0x00;

/// Boolean `false`
pub const MARKER_FALSE: u8 = 0x08;

/// Boolean `true`
pub const MARKER_TRUE: u8 = 0x09;

/// Integer fragment; low nibble is log2 of the payload width
pub const KIND_INTEGER: u8 = 0x10;

/// Real fragment; low nibble is log2 of the payload width
pub const KIND_REAL: u8 = 0x20;

/// 8-byte real
pub const MARKER_REAL_64: u8 = 0x23;

/// Date fragment high nibble
pub const KIND_DATE: u8 = 0x30;

/// Date (8-byte real, seconds since 2001-01-01)
pub const MARKER_DATE: u8 = 0x33;

/// Data blob
pub const KIND_DATA: u8 = 0x40;

/// Single-byte (ASCII) string
pub const KIND_ASCII_STRING: u8 = 0x50;

/// UTF-16BE string
pub const KIND_UNICODE_STRING: u8 = 0x60;

/// Array of object references
pub const KIND_ARRAY: u8 = 0xA0;

/// Set of object references
pub const KIND_SET: u8 = 0xC0;

/// Dictionary: key references followed by value references
pub const KIND_DICTIONARY: u8 = 0xD0;

// =============================================================================
// Dates
// =============================================================================

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, the reference
/// date of binary plist dates.
pub const PLIST_EPOCH_UNIX_OFFSET: f64 = 978_307_200.0;
