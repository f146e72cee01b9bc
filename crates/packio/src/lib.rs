//! Packio Typed Stream Packing Library
//!
//! This crate provides a dispatch layer between application code that wants
//! to read and write typed values on a byte stream, and per-type codecs that
//! know how to turn values into bytes and back.
//!
//! # Overview
//!
//! The crate is built from five pieces:
//!
//! - [`RawStream`]: Low-level contract for a position-aware byte stream
//!   (raw reads and writes, position, seeking, end-of-stream detection).
//!   Implemented for anything that is `Read + Write + Seek`.
//! - [`Pack`] / [`Unpack`]: Per-type codec traits. A codec encodes a value
//!   onto a stream (reporting the bytes it wrote) or decodes one from it,
//!   honoring the options it was handed.
//! - [`Options`]: A type-keyed map of per-call options, including the
//!   [`DecodeOverride`] and [`EncodeOverride`] callables that replace a
//!   type's stock codec for a single call.
//! - [`descriptor`]: Normalizes call shapes (a bare type, a
//!   (type, options) pair, or tuples thereof) into ordered descriptor
//!   sets consumed by the adapter.
//! - [`PackedStream`]: The adapter itself. Wraps a raw stream and routes
//!   typed reads and writes through codecs, applies the end-of-stream
//!   policy, and exposes lazy sequential decoding alongside explicit raw
//!   pass-through entry points.
//!
//! # Example
//!
//! ```ignore
//! use std::io::Cursor;
//!
//! use packio::{packed, typed, PackedStream, Width};
//!
//! let mut stream = PackedStream::new(Cursor::new(Vec::new()));
//!
//! // Write a u32 and a length-prefixed string through their codecs.
//! let written = stream.write_values((packed(&42u32), packed("hi")))?;
//!
//! // Rewind and read them back in the same order.
//! stream.seek_to(0)?;
//! let (answer, greeting) =
//!     stream.read_values((typed::<u32>(), typed::<String>()))?;
//! assert_eq!(answer, Some(42));
//! assert_eq!(greeting.as_deref(), Some("hi"));
//!
//! // Options change the wire layout per call.
//! stream.write_values((packed(&7u64).with(Width(2)),))?;
//! ```

pub mod decode;
pub mod descriptor;
pub mod encode;
pub mod options;
pub mod packed_stream;
pub mod stream;

// Re-export the main traits and types at the crate root for convenience
pub use decode::Unpack;
pub use descriptor::{
    packed, typed, ReadDescriptor, ReadDescriptorSet, WriteDescriptor,
    WriteDescriptorSet, WriteItem,
};
pub use encode::Pack;
pub use options::{
    ByteOrder, DecodeOverride, EncodeOverride, Filler, FixedLength, Options,
    Width,
};
pub use packed_stream::{AlwaysPacked, Chunks, PackedStream, Sink, Values};
pub use stream::{position_delta, RawStream};
