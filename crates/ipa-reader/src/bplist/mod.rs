//! Binary property list (`bplist00`) codec.
//!
//! This module converts between an in-memory [`Value`] graph and the
//! binary property list container used throughout iOS app bundles.
//!
//! # Pipeline
//!
//! Encoding flattens the graph into an object table (each shared container
//! once), writes each table entry as a tagged fragment, and closes the buffer
//! with an offset table and a 32-byte trailer. Decoding validates the trailer,
//! reads fragments on demand, and rebuilds the graph so that every reference
//! to one object yields the same instance.
//!
//! Both directions walk the graph with explicit worklists, and dropping a
//! [`Value`] releases it the same way; nesting depth is limited by memory
//! only.
//!
//! # Examples
//!
//! ```
//! use ipa_reader::bplist::{self, Value};
//!
//! let shared = Value::dictionary([("CFBundleVersion", Value::from("1.0"))]);
//! let root = Value::array([shared.clone(), shared]);
//!
//! let bytes = bplist::encode(&root)?;
//! assert!(bplist::is_binary(&bytes));
//! assert_eq!(bplist::decode(&bytes)?, root);
//! # Ok::<(), bplist::Error>(())
//! ```

pub mod constants;
mod decode;
mod encode;
mod error;
mod flatten;
mod trailer;
mod unflatten;
mod value;
mod width;

pub use decode::decode;
pub use encode::encode;
pub use error::Error;
pub use value::{Date, Dictionary, Integer, Value};

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Whether `data` starts with the `bplist00` header.
pub fn is_binary(data: &[u8]) -> bool {
    data.len() >= constants::HEADER_LEN
        && data.starts_with(constants::MAGIC)
        && &data[6..8] == constants::VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_binary() {
        assert!(is_binary(b"bplist00\x09"));
        assert!(!is_binary(b"bplist01"));
        assert!(!is_binary(b"bplist"));
        assert!(!is_binary(b"<?xml version=\"1.0\"?>"));
    }
}
