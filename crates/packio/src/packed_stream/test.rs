use std::io::Cursor;

use super::*;
use crate::{
    descriptor::{packed, typed},
    options::{ByteOrder, Width},
    position_delta,
};

fn empty_stream() -> PackedStream<Cursor<Vec<u8>>> {
    PackedStream::new(Cursor::new(Vec::new()))
}

#[test]
fn write_then_read_values() {
    let mut stream = empty_stream();

    let written = stream
        .write_values((packed(&42u32), packed("hi")))
        .unwrap();
    // 4 bytes of u32, 1 length byte, 2 content bytes.
    assert_eq!(written, 7);
    assert_eq!(stream.position().unwrap(), 7);

    stream.seek_to(0).unwrap();
    let (answer, greeting) = stream
        .read_values((typed::<u32>(), typed::<String>()))
        .unwrap();

    assert_eq!(answer, Some(42));
    assert_eq!(greeting.as_deref(), Some("hi"));
}

#[test]
fn bare_values_pack_with_default_options() {
    let mut stream = empty_stream();

    let written = stream.write_values((&42u32, "hi")).unwrap();
    assert_eq!(written, 7);
}

#[test]
fn single_descriptor_reads_scalar() {
    let mut stream = empty_stream();
    stream.write_value(&7u16).unwrap();
    stream.seek_to(0).unwrap();

    let value = stream.read_values(typed::<u16>()).unwrap();
    assert_eq!(value, Some(7));
}

#[test]
fn descriptor_options_change_the_wire_layout() {
    let mut stream = empty_stream();

    let written = stream
        .write_values((
            packed(&300u32).with(Width(2)),
            packed(&1u16).with(ByteOrder::Big).with(Width(4)),
        ))
        .unwrap();
    assert_eq!(written, 6);

    stream.seek_to(0).unwrap();
    let (narrow, wide) = stream
        .read_values((
            typed::<u32>().with(Width(2)),
            typed::<u16>().with(ByteOrder::Big).with(Width(4)),
        ))
        .unwrap();

    assert_eq!(narrow, Some(300));
    assert_eq!(wide, Some(1));
}

#[test]
fn raw_write_bypasses_packing() {
    let mut stream = empty_stream();

    assert_eq!(stream.write_raw(b"abc").unwrap(), 3);
    // Byte-for-byte the native write: no length prefix, no codec.
    assert_eq!(stream.get_ref().get_ref(), b"abc");
}

#[test]
fn packed_write_of_bytes_differs_from_raw() {
    let mut stream = empty_stream();

    let written = stream.write_values((packed(&b"abc"[..]),)).unwrap();

    // Length prefix plus one byte per element.
    assert_eq!(written, 4);
    assert_eq!(stream.get_ref().get_ref(), &[3, b'a', b'b', b'c']);
}

#[test]
fn raw_read_bypasses_packing() {
    let mut stream = PackedStream::new(Cursor::new(b"\x02hi".to_vec()));

    assert_eq!(stream.read_raw(Some(1)).unwrap(), [2]);
    assert_eq!(stream.read_raw(None).unwrap(), b"hi");
}

#[test]
fn tolerant_eof_yields_absent_values() {
    let mut stream = empty_stream();
    stream.write_value(&5u8).unwrap();
    stream.seek_to(0).unwrap();

    let (first, second) = stream
        .read_values((typed::<u8>(), typed::<u8>()))
        .unwrap();

    assert_eq!(first, Some(5));
    assert_eq!(second, None);

    // Reading an empty stream yields nothing at all.
    let value = stream.read_value::<u64>().unwrap();
    assert_eq!(value, None);
}

#[test]
fn failing_eof_reports_the_attempted_type() {
    let mut stream =
        PackedStream::new(Cursor::new(Vec::new())).fail_on_eof(true);
    assert!(stream.fails_on_eof());

    stream.write_value(&5u8).unwrap();
    stream.seek_to(0).unwrap();

    assert_eq!(stream.read_value::<u8>().unwrap(), Some(5));

    let position = stream.position().unwrap();
    let error = stream.read_value::<u64>().unwrap_err();

    assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    assert!(error.to_string().contains("u64"));
    // The failed attempt must not move the stream.
    assert_eq!(stream.position().unwrap(), position);
}

#[test]
fn values_yields_each_encoded_value_in_order() {
    let mut stream = empty_stream();
    for value in [10u16, 20, 30] {
        stream.write_value(&value).unwrap();
    }
    stream.seek_to(0).unwrap();

    let decoded: Vec<u16> = stream
        .values::<u16>()
        .collect::<io::Result<_>>()
        .unwrap();

    assert_eq!(decoded, [10, 20, 30]);
}

#[test]
fn values_on_an_exhausted_stream_is_empty() {
    let mut stream = empty_stream();

    assert_eq!(stream.values::<u32>().count(), 0);
}

#[test]
fn values_is_lazy() {
    let mut stream = empty_stream();
    for value in [1u8, 2, 3, 4] {
        stream.write_value(&value).unwrap();
    }
    stream.seek_to(0).unwrap();

    let first = stream.values::<u8>().next().unwrap().unwrap();
    assert_eq!(first, 1);

    // Only one decode happened; the rest of the stream is untouched.
    assert_eq!(stream.position().unwrap(), 1);
}

#[test]
fn values_stops_after_a_decode_error() {
    // One complete u32 and then a truncated one.
    let mut stream = PackedStream::new(Cursor::new(vec![1, 0, 0, 0, 9, 9]));

    let mut values = stream.values::<u32>();
    assert_eq!(values.next().unwrap().unwrap(), 1);

    let error = values.next().unwrap().unwrap_err();
    assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);

    assert!(values.next().is_none());
}

#[test]
fn values_with_options_applies_them_per_step() {
    let mut stream = empty_stream();
    stream.write_raw(&[1, 2, 3]).unwrap();
    stream.seek_to(0).unwrap();

    let options = Options::new().with(Width(1));
    let decoded: Vec<u32> = stream
        .values_with::<u32>(options)
        .collect::<io::Result<_>>()
        .unwrap();

    assert_eq!(decoded, [1, 2, 3]);
}

#[test]
fn chunks_delegate_to_the_native_read() {
    let mut stream = PackedStream::new(Cursor::new(b"abcdefg".to_vec()));

    let chunks: Vec<Vec<u8>> =
        stream.chunks(3).collect::<io::Result<_>>().unwrap();

    assert_eq!(chunks, [b"abc".to_vec(), b"def".to_vec(), b"g".to_vec()]);
}

#[test]
fn position_delta_matches_the_reported_write_count() {
    let mut stream = empty_stream();
    let mut reported = 0;

    let delta = position_delta(&mut stream, |stream| {
        reported = stream
            .write_values((packed(&1u64), packed("four")))?;
        Ok(())
    })
    .unwrap();

    assert_eq!(delta, i64::try_from(reported).unwrap());
}

#[test]
fn always_packed_view_packs_bare_buffers() {
    let mut stream = empty_stream();

    let mut view = stream.always_packed();
    let written = view.write(&b"abc"[..]).unwrap();

    // Unlike write_raw, the buffer went through its codec.
    assert_eq!(written, 4);

    let adapter = view.into_inner();
    assert_eq!(adapter.get_ref().get_ref(), &[3, b'a', b'b', b'c']);
}

#[test]
fn always_packed_scoped_use() {
    let mut stream = empty_stream();

    let written = stream
        .with_always_packed(|view| {
            let mut written = view.write(&1u8)?;
            written += view.write_values((packed(&2u8), packed(&3u8)))?;
            Ok::<_, io::Error>(written)
        })
        .unwrap();

    assert_eq!(written, 3);
    assert_eq!(stream.get_ref().get_ref(), &[1, 2, 3]);
}

#[test]
fn sink_accumulates_pushed_values() {
    let mut destination = empty_stream();

    let mut sink = destination.sink_with::<u16>(
        Options::new().with(Width(1)),
    );
    sink.push(&7).unwrap();
    sink.push(&8).unwrap();
    assert_eq!(sink.total_written(), 2);

    assert_eq!(destination.get_ref().get_ref(), &[7, 8]);
}

#[test]
fn sink_drains_a_source_stream() {
    let mut source = empty_stream();
    for value in [100u32, 200, 300] {
        source.write_value(&value).unwrap();
    }
    source.seek_to(0).unwrap();

    let mut destination = empty_stream();
    let mut sink = destination.sink::<u32>();
    let written = sink.drain_from(&mut source).unwrap();

    assert_eq!(written, 12);
    assert_eq!(sink.total_written(), 12);

    destination.seek_to(0).unwrap();
    let drained: Vec<u32> = destination
        .values::<u32>()
        .collect::<io::Result<_>>()
        .unwrap();
    assert_eq!(drained, [100, 200, 300]);
}

#[test]
fn adapter_passes_through_as_a_raw_stream() {
    let mut stream = empty_stream();
    stream.write_value(&1u8).unwrap();

    // The adapter itself satisfies the raw-stream contract.
    let delta = position_delta(&mut stream, |stream| {
        stream.write_raw(b"xy").map(|_| ())
    })
    .unwrap();

    assert_eq!(delta, 2);
    assert!(stream.at_end().unwrap());
}

#[test]
fn mid_call_failure_fails_the_whole_call() {
    let mut stream = empty_stream();

    let error = stream
        .write_values((
            packed(&1u8),
            packed(&300u32).with(Width(1)),
            packed(&2u8),
        ))
        .unwrap_err();

    assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    // The first descriptor had already been written when the call failed.
    assert_eq!(stream.get_ref().get_ref(), &[1]);
}
