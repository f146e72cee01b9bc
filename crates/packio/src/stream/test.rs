use std::io::Cursor;

use super::*;

#[test]
fn raw_write_then_read() {
    let mut stream = Cursor::new(Vec::new());

    assert_eq!(stream.write_raw(b"hello").unwrap(), 5);
    assert_eq!(RawStream::position(&mut stream).unwrap(), 5);

    stream.seek_to(0).unwrap();
    assert_eq!(stream.read_raw(Some(5)).unwrap(), b"hello");
}

#[test]
fn read_raw_is_short_near_the_end() {
    let mut stream = Cursor::new(b"abc".to_vec());

    assert_eq!(stream.read_raw(Some(10)).unwrap(), b"abc");
    assert!(stream.read_raw(Some(10)).unwrap().is_empty());
}

#[test]
fn read_raw_to_end() {
    let mut stream = Cursor::new(b"abcdef".to_vec());
    stream.seek_to(2).unwrap();

    assert_eq!(stream.read_raw(None).unwrap(), b"cdef");
}

#[test]
fn read_exact_raw_fails_on_short_stream() {
    let mut stream = Cursor::new(b"ab".to_vec());

    let error = stream.read_exact_raw(4).unwrap_err();
    assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn at_end_does_not_consume() {
    let mut stream = Cursor::new(b"xy".to_vec());

    assert!(!stream.at_end().unwrap());
    assert_eq!(RawStream::position(&mut stream).unwrap(), 0);

    assert_eq!(stream.read_raw(Some(2)).unwrap(), b"xy");
    assert!(stream.at_end().unwrap());
    assert_eq!(RawStream::position(&mut stream).unwrap(), 2);
}

#[test]
fn position_delta_of_a_write() {
    let mut stream = Cursor::new(Vec::new());

    let delta = position_delta(&mut stream, |stream| {
        stream.write_raw(b"1234").map(|_| ())
    })
    .unwrap();

    assert_eq!(delta, 4);
}

#[test]
fn position_delta_can_be_negative() {
    let mut stream = Cursor::new(b"123456".to_vec());
    stream.seek_to(6).unwrap();

    let delta =
        position_delta(&mut stream, |stream| stream.seek_to(2)).unwrap();

    assert_eq!(delta, -4);
}

#[test]
fn position_delta_propagates_body_errors() {
    let mut stream = Cursor::new(Vec::new());

    let error = position_delta(&mut stream, |stream| {
        stream.read_exact_raw(1).map(|_| ())
    })
    .unwrap_err();

    assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
}
