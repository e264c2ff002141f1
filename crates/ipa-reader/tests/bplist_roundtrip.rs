//! End-to-end tests of the binary plist codec through the public API.

use ipa_reader::bplist::{self, Date, Error, Value};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Trailer fields, read directly from the last 32 bytes.
fn trailer(buf: &[u8]) -> (u8, u8, u64, u64, u64) {
    let t = &buf[buf.len() - 32..];
    let u64_at = |i: usize| u64::from_be_bytes(t[i..i + 8].try_into().unwrap());
    (t[6], t[7], u64_at(8), u64_at(16), u64_at(24))
}

fn sample_info_plist() -> Value {
    let schemes = Value::array([Value::from("fmip1")]);
    Value::dictionary([
        ("CFBundleDisplayName", Value::from("FindMyiPhone")),
        ("CFBundleIdentifier", Value::from("com.apple.mobileme.fmip1")),
        ("CFBundleVersion", Value::from("376")),
        ("CFBundleShortVersionString", Value::from("3.0")),
        ("DTPlatformVersion", Value::from("7.0")),
        ("MinimumOSVersion", Value::from("7.0")),
        ("UIPrerenderedIcon", Value::from(true)),
        (
            "UIDeviceFamily",
            Value::array([Value::from(1), Value::from(2)]),
        ),
        (
            "CFBundleURLTypes",
            Value::array([Value::dictionary([("CFBundleURLSchemes", schemes)])]),
        ),
    ])
}

#[test]
fn roundtrip_every_value_type() {
    let root = Value::dictionary([
        ("bool", Value::from(false)),
        ("small", Value::from(7)),
        ("negative", Value::from(-42)),
        ("min", Value::from(i64::MIN)),
        ("max_unsigned", Value::from(u64::MAX)),
        ("wide", Value::from(i128::MIN)),
        ("real", Value::from(3.25)),
        ("date", Value::from(Date::from_plist_seconds(400_000_000.0).unwrap())),
        ("data", Value::from(vec![0u8, 1, 2, 0xFF])),
        ("ascii", Value::from("hello")),
        ("unicode", Value::from("héllo 世界")),
        ("empty", Value::from("")),
        ("array", Value::array([Value::from(1), Value::from("two")])),
        ("set", Value::set([Value::from("a"), Value::from("b")])),
        ("nested", Value::dictionary([("inner", Value::array([]))])),
    ]);

    let bytes = bplist::encode(&root).unwrap();
    assert_eq!(&bytes[..8], b"bplist00");
    assert_eq!(bplist::decode(&bytes).unwrap(), root);
}

#[test]
fn roundtrip_info_plist() {
    let info = sample_info_plist();
    let bytes = bplist::encode(&info).unwrap();
    let decoded = bplist::decode(&bytes).unwrap();

    let dict = decoded.as_dictionary().unwrap();
    assert_eq!(dict["CFBundleVersion"].as_string(), Some("376"));
    assert_eq!(decoded, info);
}

#[test]
fn encoding_is_deterministic() {
    let info = sample_info_plist();
    assert_eq!(
        bplist::encode(&info).unwrap(),
        bplist::encode(&info.clone()).unwrap()
    );
}

#[test]
fn many_objects_use_wide_references() {
    let root = Value::array((0..1_000).map(|i| Value::from(format!("item {i}"))));
    let bytes = bplist::encode(&root).unwrap();

    let (offset_width, ref_width, count, root_index, _) = trailer(&bytes);
    assert_eq!(count, 1_001);
    assert_eq!(ref_width, 2);
    assert_eq!(offset_width, 2);
    assert_eq!(root_index, 0);
    assert_eq!(bplist::decode(&bytes).unwrap(), root);
}

#[test]
fn large_data_uses_wide_offsets() {
    let blob = vec![0xABu8; 70_000];
    let root = Value::array([Value::from(blob), Value::from("after")]);
    let bytes = bplist::encode(&root).unwrap();

    let (offset_width, ref_width, ..) = trailer(&bytes);
    assert_eq!(offset_width, 4);
    assert_eq!(ref_width, 1);
    assert_eq!(bplist::decode(&bytes).unwrap(), root);
}

#[test]
fn shared_container_written_once_and_decoded_shared() {
    let shared = Value::dictionary([("CFBundleVersion", Value::from("1.0"))]);
    let root = Value::array([shared.clone(), shared.clone(), shared]);

    let bytes = bplist::encode(&root).unwrap();
    let (_, _, count, ..) = trailer(&bytes);
    assert_eq!(count, 4);

    let decoded = bplist::decode(&bytes).unwrap();
    let items = decoded.as_array().unwrap();
    match (&items[0], &items[2]) {
        (Value::Dictionary(a), Value::Dictionary(b)) => assert!(Arc::ptr_eq(a, b)),
        other => panic!("unexpected items: {other:?}"),
    }
}

#[test]
fn equal_but_distinct_containers_written_separately() {
    let make = || Value::dictionary([("CFBundleVersion", Value::from("1.0"))]);
    let root = Value::array([make(), make(), make()]);

    let bytes = bplist::encode(&root).unwrap();
    let (_, _, count, ..) = trailer(&bytes);
    assert_eq!(count, 10);
    assert_eq!(bplist::decode(&bytes).unwrap(), root);
}

#[test]
fn repeated_blob_references_share_one_allocation() {
    // Object 0: array of 2000 one-byte references to object 1.
    let mut bytes = b"bplist00".to_vec();
    bytes.extend_from_slice(&[0xAF, 0x11, 0x07, 0xD0]);
    bytes.extend(std::iter::repeat(1u8).take(2_000));

    // Object 1: a 50,000-byte blob.
    let blob_offset = bytes.len() as u16;
    bytes.extend_from_slice(&[0x4F, 0x11, 0xC3, 0x50]);
    bytes.extend(std::iter::repeat(0x5Au8).take(50_000));

    let table_start = bytes.len() as u64;
    bytes.extend_from_slice(&8u16.to_be_bytes());
    bytes.extend_from_slice(&blob_offset.to_be_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 2, 1]);
    bytes.extend_from_slice(&2u64.to_be_bytes());
    bytes.extend_from_slice(&0u64.to_be_bytes());
    bytes.extend_from_slice(&table_start.to_be_bytes());

    let decoded = bplist::decode(&bytes).unwrap();
    let items = decoded.as_array().unwrap();
    assert_eq!(items.len(), 2_000);

    let Value::Data(first) = &items[0] else {
        panic!("unexpected member: {}", items[0].type_name());
    };
    assert_eq!(first.len(), 50_000);
    for item in items {
        match item {
            Value::Data(data) => assert!(Arc::ptr_eq(first, data)),
            other => panic!("unexpected member: {}", other.type_name()),
        }
    }
    // The decode cache is gone; only the members hold the blob.
    assert_eq!(Arc::strong_count(first), 2_000);
}

#[test]
fn dates_roundtrip_at_full_precision() {
    let times = [
        UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789),
        UNIX_EPOCH - Duration::new(12_345, 987_654_321),
        SystemTime::now(),
    ];

    for time in times {
        let root = Value::array([Value::from(Date::from(time))]);
        let decoded = bplist::decode(&bplist::encode(&root).unwrap()).unwrap();
        assert_eq!(decoded, root, "{time:?}");
    }
}

#[test]
fn missing_last_byte_is_truncated() {
    let samples = [
        Value::from(true),
        Value::from("x"),
        sample_info_plist(),
        Value::array((0..300).map(Value::from)),
        Value::array([Value::from(vec![0u8; 70_000])]),
    ];

    for value in samples {
        let bytes = bplist::encode(&value).unwrap();
        let result = bplist::decode(&bytes[..bytes.len() - 1]);
        assert!(
            matches!(result, Err(Error::Truncated(_))),
            "{}: {result:?}",
            value.type_name()
        );
    }
}

#[test]
fn arbitrary_prefixes_never_panic() {
    let bytes = bplist::encode(&sample_info_plist()).unwrap();
    for len in 0..bytes.len() {
        let result = bplist::decode(&bytes[..len]);
        assert_ne!(result.as_ref().ok(), Some(&sample_info_plist()), "prefix {len}");
    }
}

#[test]
fn short_input_is_truncated() {
    assert!(matches!(bplist::decode(b""), Err(Error::Truncated(_))));
    assert!(matches!(
        bplist::decode(b"bplist00\x09"),
        Err(Error::Truncated(_))
    ));
}

#[test]
fn wrong_version_is_format_error() {
    let mut bytes = bplist::encode(&Value::from(1)).unwrap();
    bytes[6..8].copy_from_slice(b"01");
    assert!(matches!(bplist::decode(&bytes), Err(Error::Format(_))));
}

#[test]
fn astral_plane_text_is_rejected() {
    let root = Value::dictionary([("emoji", Value::from("ok \u{1F44D}"))]);
    assert!(matches!(bplist::encode(&root), Err(Error::Encoding(_))));
}

#[test]
fn deep_nesting_roundtrips() {
    // Both graphs are also dropped at this depth.
    let depth = 200_000;
    let mut value = Value::from("leaf");
    for _ in 0..depth {
        value = Value::array([value]);
    }

    let bytes = bplist::encode(&value).unwrap();
    let decoded = bplist::decode(&bytes).unwrap();

    let mut levels = 0;
    let mut cursor = &decoded;
    while let Value::Array(items) = cursor {
        levels += 1;
        cursor = &items[0];
    }
    assert_eq!(levels, depth);
    assert_eq!(cursor, &Value::from("leaf"));
}
