use std::{collections::BTreeMap, io::Cursor};

use dashmap::DashMap;
use proptest::prelude::*;

use super::*;
use crate::{encode::Pack, options::Width};

/// Packs a value and immediately unpacks it with the same options.
fn roundtrip<T: Pack + Unpack>(value: &T, options: &Options) -> T {
    let mut cursor = Cursor::new(Vec::new());
    value.pack(&mut cursor, options).unwrap();
    cursor.set_position(0);

    T::unpack(&mut cursor, options).unwrap()
}

fn unpack_bytes<T: Unpack>(bytes: &[u8], options: &Options) -> io::Result<T> {
    T::unpack(&mut Cursor::new(bytes.to_vec()), options)
}

#[test]
fn unsigned_roundtrip() {
    for value in [0u64, 1, 127, 128, 255, 256, 16383, 16384, u64::MAX] {
        assert_eq!(roundtrip(&value, &Options::new()), value);
    }
}

#[test]
fn signed_roundtrip_with_narrow_width() {
    let options = Options::new().with(Width(2));

    for value in [0i32, 1, -1, 127, -128, 32767, -32768] {
        assert_eq!(roundtrip(&value, &options), value, "width 2: {value}");
    }
}

#[test]
fn big_endian_roundtrip() {
    let options = Options::new().with(ByteOrder::Big).with(Width(3));

    assert_eq!(roundtrip(&0x010203u32, &options), 0x010203);
    assert_eq!(roundtrip(&-70000i32, &options), -70000);
}

#[test]
fn sign_extension_from_narrow_width() {
    let options = Options::new().with(Width(1));

    assert_eq!(unpack_bytes::<i16>(&[0xFE], &options).unwrap(), -2);
    assert_eq!(unpack_bytes::<i16>(&[0x7F], &options).unwrap(), 127);
}

#[test]
fn decoded_value_out_of_range_is_rejected() {
    // 300 encoded in two bytes cannot decode into a u8.
    let options = Options::new().with(Width(2));

    let error = unpack_bytes::<u8>(&[0x2C, 0x01], &options).unwrap_err();
    assert_eq!(error.kind(), io::ErrorKind::InvalidData);
}

#[test]
fn truncated_integer_is_unexpected_eof() {
    let error = unpack_bytes::<u32>(&[1, 2], &Options::new()).unwrap_err();

    assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn bool_decodes_any_nonzero_as_true() {
    assert!(!unpack_bytes::<bool>(&[0], &Options::new()).unwrap());
    assert!(unpack_bytes::<bool>(&[1], &Options::new()).unwrap());
    assert!(unpack_bytes::<bool>(&[7], &Options::new()).unwrap());
}

#[test]
fn invalid_scalar_value_is_rejected() {
    // 0xD800 is a surrogate, not a scalar value.
    let error =
        unpack_bytes::<char>(&[0x00, 0xD8, 0x00, 0x00], &Options::new())
            .unwrap_err();

    assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    assert!(error.to_string().contains("invalid Unicode scalar value"));
}

#[test]
#[allow(clippy::float_cmp)]
fn float_roundtrip() {
    let options = Options::new().with(ByteOrder::Big);

    assert_eq!(
        roundtrip(&std::f32::consts::PI, &options),
        std::f32::consts::PI
    );
    assert_eq!(
        roundtrip(&std::f64::consts::E, &Options::new()),
        std::f64::consts::E
    );
}

#[test]
fn string_roundtrip() {
    assert_eq!(roundtrip(&String::from("Hello, World!"), &Options::new()), "Hello, World!");
    assert_eq!(roundtrip(&String::new(), &Options::new()), "");
}

#[test]
fn fixed_length_string_trims_filler() {
    let options = Options::new().with(FixedLength(6)).with(Filler(b' '));

    assert_eq!(
        unpack_bytes::<String>(b"hi    ", &options).unwrap(),
        "hi"
    );
}

#[test]
fn invalid_utf8_is_rejected() {
    let error =
        unpack_bytes::<String>(&[0x02, 0xFF, 0xFE], &Options::new())
            .unwrap_err();

    assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    assert!(error.to_string().contains("invalid UTF-8"));
}

#[test]
fn varint_too_long_is_rejected() {
    let bytes = [0xFFu8; 11];
    let error = unpack_bytes::<Vec<u8>>(&bytes, &Options::new()).unwrap_err();

    assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    assert!(error.to_string().contains("varint too long"));
}

#[test]
fn container_roundtrip() {
    let options = Options::new();

    assert_eq!(roundtrip(&vec![1u32, 2, 3], &options), vec![1, 2, 3]);
    assert_eq!(roundtrip(&[9u8, 8, 7], &options), [9, 8, 7]);
    assert_eq!(roundtrip(&Some(5u16), &options), Some(5));
    assert_eq!(roundtrip(&None::<u16>, &options), None);
    assert_eq!(
        roundtrip(&(1u8, -2i16, String::from("x")), &options),
        (1, -2, String::from("x"))
    );

    let map: BTreeMap<u8, String> =
        [(1, String::from("one")), (2, String::from("two"))].into();
    assert_eq!(roundtrip(&map, &options), map);
}

#[test]
fn dashmap_roundtrip() {
    let map: DashMap<u32, String> = DashMap::new();
    map.insert(1, String::from("one"));
    map.insert(2, String::from("two"));

    let decoded: DashMap<u32, String> = roundtrip(&map, &Options::new());

    assert_eq!(decoded.len(), 2);
    assert_eq!(
        decoded.get(&1).map(|v| v.value().clone()),
        Some(String::from("one"))
    );
    assert_eq!(
        decoded.get(&2).map(|v| v.value().clone()),
        Some(String::from("two"))
    );
}

#[test]
fn duration_roundtrip() {
    let value = Duration::new(86_400, 999_999_999);

    assert_eq!(roundtrip(&value, &Options::new()), value);
}

proptest! {
    #[test]
    fn any_u64_roundtrips(value in any::<u64>()) {
        prop_assert_eq!(roundtrip(&value, &Options::new()), value);
    }

    #[test]
    fn any_i64_roundtrips_big_endian(value in any::<i64>()) {
        let options = Options::new().with(ByteOrder::Big);
        prop_assert_eq!(roundtrip(&value, &options), value);
    }

    #[test]
    fn narrow_widths_roundtrip(value in 0u32..=0xFFFF, extra in 2usize..=8) {
        let options = Options::new().with(Width(extra));
        prop_assert_eq!(roundtrip(&value, &options), value);
    }

    #[test]
    fn any_string_roundtrips(value in ".*") {
        prop_assert_eq!(roundtrip(&value, &Options::new()), value);
    }
}
