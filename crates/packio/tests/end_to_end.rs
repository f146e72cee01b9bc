//! End-to-end coverage over real streams: in-memory cursors and files
//! behave identically behind the packing adapter.

use std::io::Cursor;

use packio::{
    packed, position_delta, typed, ByteOrder, FixedLength, Filler, Options,
    PackedStream, Width,
};

#[test]
fn file_backed_stream_roundtrip() {
    let file = tempfile::tempfile().expect("could not create temp file");
    let mut stream = PackedStream::new(file);

    let written = stream
        .write_values((
            packed(&0xDEAD_BEEFu32).with(ByteOrder::Big),
            packed("record").with(FixedLength(16)).with(Filler(b' ')),
            packed(&-17i64),
        ))
        .unwrap();
    assert_eq!(written, 4 + 16 + 8);

    stream.seek_to(0).unwrap();
    let (magic, name, offset) = stream
        .read_values((
            typed::<u32>().with(ByteOrder::Big),
            typed::<String>().with(FixedLength(16)).with(Filler(b' ')),
            typed::<i64>(),
        ))
        .unwrap();

    assert_eq!(magic, Some(0xDEAD_BEEF));
    assert_eq!(name.as_deref(), Some("record"));
    assert_eq!(offset, Some(-17));
    assert!(stream.at_end().unwrap());
}

#[test]
fn file_and_cursor_produce_identical_bytes() {
    let values = (packed(&1u16).with(Width(1)), packed("ab"), packed(&9u64));

    let mut cursor = PackedStream::new(Cursor::new(Vec::new()));
    cursor.write_values(values).unwrap();
    let from_cursor = cursor.into_inner().into_inner();

    let file = tempfile::tempfile().expect("could not create temp file");
    let mut stream = PackedStream::new(file);
    let values = (packed(&1u16).with(Width(1)), packed("ab"), packed(&9u64));
    stream.write_values(values).unwrap();

    stream.seek_to(0).unwrap();
    let from_file = stream.read_raw(None).unwrap();

    assert_eq!(from_cursor, from_file);
}

#[test]
fn transfer_between_streams() {
    // Fill the source with length-prefixed strings.
    let mut source = PackedStream::new(Cursor::new(Vec::new()));
    for word in ["pull", "items", "across"] {
        source.write_value(word).unwrap();
    }
    source.seek_to(0).unwrap();

    // Pull them all into a file-backed destination.
    let file = tempfile::tempfile().expect("could not create temp file");
    let mut destination = PackedStream::new(file);
    let moved = destination.sink::<String>().drain_from(&mut source).unwrap();

    assert!(source.at_end().unwrap());

    destination.seek_to(0).unwrap();
    let words: Vec<String> = destination
        .values::<String>()
        .collect::<std::io::Result<_>>()
        .unwrap();
    assert_eq!(words, ["pull", "items", "across"]);

    let delta = position_delta(&mut destination, |stream| {
        stream.seek_to(0).map(|_| ())
    })
    .unwrap();
    assert_eq!(delta, -i64::try_from(moved).unwrap());
}

#[test]
fn presets_work_across_call_sites() {
    Options::register_preset("e2e_word_be", || {
        Options::new().with(Width(2)).with(ByteOrder::Big)
    });

    let mut stream = PackedStream::new(Cursor::new(Vec::new()));
    stream
        .write_values((packed(&0x0102u32)
            .with_options(Options::preset("e2e_word_be").unwrap()),))
        .unwrap();

    assert_eq!(stream.get_ref().get_ref(), &[0x01, 0x02]);

    stream.seek_to(0).unwrap();
    let value = stream
        .read_values(
            typed::<u32>()
                .with_options(Options::preset("e2e_word_be").unwrap()),
        )
        .unwrap();
    assert_eq!(value, Some(0x0102));
}
