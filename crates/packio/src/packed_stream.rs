//! The packing stream adapter.
//!
//! [`PackedStream`] wraps a [`RawStream`] and translates "read/write typed
//! values" requests into codec invocations. It is a pure composition
//! layer: it holds no buffer of its own, borrows the stream for its
//! lifetime, and falls back to the wrapped stream's native operations for
//! the explicit raw entry points ([`read_raw`](PackedStream::read_raw),
//! [`write_raw`](PackedStream::write_raw),
//! [`chunks`](PackedStream::chunks)).
//!
//! # Dispatch
//!
//! Every typed operation resolves to the same per-descriptor sequence:
//!
//! 1. On reads, check end-of-stream first and apply the adapter's EOF
//!    policy: fail with the attempted type, or yield an absent value.
//! 2. If the options carry an override callable for the target type,
//!    invoke it with the stream.
//! 3. Otherwise dispatch to the type's [`Pack`]/[`Unpack`] codec.
//!
//! Codec failures are never retried or recovered here; they propagate to
//! the caller unchanged, and a failing descriptor fails the whole call.
//!
//! # Example
//!
//! ```ignore
//! use std::io::Cursor;
//!
//! use packio::{packed, typed, PackedStream};
//!
//! let mut stream = PackedStream::new(Cursor::new(Vec::new()));
//! stream.write_values((packed(&1u16), packed(&2u16)))?;
//! stream.seek_to(0)?;
//!
//! for value in stream.values::<u16>() {
//!     println!("{}", value?);
//! }
//! ```

use std::{any::type_name, io, marker::PhantomData};

use crate::{
    decode::Unpack,
    descriptor::{ReadDescriptorSet, WriteDescriptorSet},
    encode::Pack,
    options::{DecodeOverride, EncodeOverride, Options},
    stream::RawStream,
};

/// An adapter routing typed reads and writes on a raw stream through
/// per-type codecs.
///
/// The adapter is single-threaded and blocking, exactly like the stream
/// it wraps. It keeps no state across calls beyond the construction-time
/// end-of-stream policy.
///
/// # End-of-stream policy
///
/// By default, decoding at end-of-stream yields an absent value (`None`)
/// per descriptor. With [`fail_on_eof`](Self::fail_on_eof), it instead
/// fails with [`io::ErrorKind::UnexpectedEof`] and the attempted type in
/// the message. The policy is fixed before use and read-only thereafter.
#[derive(Debug)]
pub struct PackedStream<S> {
    inner: S,
    fail_on_eof: bool,
}

impl<S: RawStream> PackedStream<S> {
    /// Wraps a raw stream with the tolerant end-of-stream policy.
    #[must_use]
    pub const fn new(inner: S) -> Self { Self { inner, fail_on_eof: false } }

    /// Sets the end-of-stream policy: `true` fails typed reads past the
    /// end, `false` yields absent values. Part of construction:
    /// `PackedStream::new(stream).fail_on_eof(true)`.
    #[must_use]
    pub const fn fail_on_eof(mut self, fail: bool) -> Self {
        self.fail_on_eof = fail;
        self
    }

    /// Returns `true` if typed reads past end-of-stream fail.
    #[must_use]
    pub const fn fails_on_eof(&self) -> bool { self.fail_on_eof }

    /// Returns a reference to the wrapped stream.
    #[must_use]
    pub const fn get_ref(&self) -> &S { &self.inner }

    /// Returns a mutable reference to the wrapped stream.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn get_mut(&mut self) -> &mut S { &mut self.inner }

    /// Consumes the adapter and returns the wrapped stream.
    #[must_use]
    pub fn into_inner(self) -> S { self.inner }

    // =========================================================================
    // Typed reads
    // =========================================================================

    /// Reads one value of type `T` with default options.
    ///
    /// Returns `Ok(None)` at end-of-stream under the tolerant policy; see
    /// [`read_value_with`](Self::read_value_with).
    pub fn read_value<T: Unpack + 'static>(
        &mut self,
    ) -> io::Result<Option<T>> {
        self.read_value_with(&Options::new())
    }

    /// Reads one value of type `T` with the given options.
    ///
    /// End-of-stream is checked before anything is consumed: under the
    /// failing policy the error reports the attempted type and options
    /// and the stream position is untouched; under the tolerant policy
    /// the result is `Ok(None)`. Otherwise the value is produced by the
    /// options' [`DecodeOverride<T>`] if present, or by `T`'s codec.
    pub fn read_value_with<T: Unpack + 'static>(
        &mut self,
        options: &Options,
    ) -> io::Result<Option<T>> {
        if self.inner.at_end()? {
            if self.fail_on_eof {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "unexpected end of stream while reading `{}` with \
                         {options:?}",
                        type_name::<T>()
                    ),
                ));
            }

            return Ok(None);
        }

        tracing::trace!(ty = type_name::<T>(), "typed read");

        let value = match options.get::<DecodeOverride<T>>() {
            Some(decode) => decode.call(&mut self.inner)?,
            None => T::unpack(&mut self.inner, options)?,
        };

        Ok(Some(value))
    }

    /// Reads one value per descriptor, in order.
    ///
    /// A lone descriptor yields a scalar `Option<T>`; a tuple of
    /// descriptors yields a tuple of `Option`s matching 1:1 with its
    /// elements. Any failing descriptor fails the whole call.
    pub fn read_values<D: ReadDescriptorSet>(
        &mut self,
        descriptors: D,
    ) -> io::Result<D::Output> {
        descriptors.read_from(self)
    }

    /// Reads raw bytes from the wrapped stream, unaffected by packing.
    ///
    /// This is the native read: `Some(len)` reads up to `len` bytes,
    /// `None` reads to the end.
    pub fn read_raw(&mut self, len: Option<usize>) -> io::Result<Vec<u8>> {
        self.inner.read_raw(len)
    }

    // =========================================================================
    // Typed writes
    // =========================================================================

    /// Pack-writes one value with default options, returning the bytes
    /// written.
    pub fn write_value<T: Pack + ?Sized + 'static>(
        &mut self,
        value: &T,
    ) -> io::Result<u64> {
        self.write_value_with(value, &Options::new())
    }

    /// Pack-writes one value with the given options, returning the bytes
    /// written.
    ///
    /// The bytes are produced by the options' [`EncodeOverride<T>`] if
    /// present, or by `T`'s codec. Debug builds assert the reported
    /// count against the observed position change.
    pub fn write_value_with<T: Pack + ?Sized + 'static>(
        &mut self,
        value: &T,
        options: &Options,
    ) -> io::Result<u64> {
        tracing::trace!(ty = type_name::<T>(), "typed write");

        #[cfg(debug_assertions)]
        let before = self.inner.position()?;

        let written = match options.get::<EncodeOverride<T>>() {
            Some(encode) => encode.call(value, &mut self.inner)?,
            None => value.pack(&mut self.inner, options)?,
        };

        #[cfg(debug_assertions)]
        {
            let after = self.inner.position()?;
            debug_assert_eq!(
                after.wrapping_sub(before),
                written,
                "codec for `{}` misreported its byte count",
                type_name::<T>()
            );
        }

        Ok(written)
    }

    /// Pack-writes every item of the set in order, returning the summed
    /// byte count. Items are written strictly sequentially, never
    /// reordered or batched; any failing item fails the whole call.
    pub fn write_values<W: WriteDescriptorSet>(
        &mut self,
        values: W,
    ) -> io::Result<u64> {
        values.write_all(self)
    }

    /// Writes raw bytes to the wrapped stream, unaffected by packing.
    ///
    /// This is the native write: the degenerate single-buffer case that
    /// bypasses per-type codecs entirely. Everything else goes through
    /// [`write_values`](Self::write_values).
    pub fn write_raw(&mut self, bytes: &[u8]) -> io::Result<u64> {
        self.inner.write_raw(bytes)
    }

    // =========================================================================
    // Lazy iteration
    // =========================================================================

    /// Lazily decodes values of type `T` with default options until
    /// end-of-stream.
    pub fn values<T: Unpack + 'static>(&mut self) -> Values<'_, S, T> {
        self.values_with(Options::new())
    }

    /// Lazily decodes values of type `T` with the given options until
    /// end-of-stream.
    ///
    /// End-of-stream is checked before each step, so a stream already at
    /// the end yields an empty sequence. The iterator borrows the
    /// adapter, produces one value per step, and is not restartable; a
    /// decode error ends the sequence after being yielded.
    pub fn values_with<T: Unpack + 'static>(
        &mut self,
        options: Options,
    ) -> Values<'_, S, T> {
        Values {
            stream: self,
            options,
            failed: false,
            _marker: PhantomData,
        }
    }

    /// Lazily reads raw chunks of up to `len` bytes until end-of-stream,
    /// unaffected by packing. The final chunk may be short.
    pub fn chunks(&mut self, len: usize) -> Chunks<'_, S> {
        Chunks { stream: self, len, failed: false }
    }

    // =========================================================================
    // Views and helpers
    // =========================================================================

    /// Returns a view on the same stream whose write entry point always
    /// packs, even for bare byte buffers.
    pub fn always_packed(&mut self) -> AlwaysPacked<'_, S> {
        AlwaysPacked { stream: self }
    }

    /// Hands an [`AlwaysPacked`] view to the closure; the forced mode
    /// ends with the closure.
    pub fn with_always_packed<R>(
        &mut self,
        f: impl FnOnce(&mut AlwaysPacked<'_, S>) -> R,
    ) -> R {
        f(&mut self.always_packed())
    }

    /// Returns a sink that pack-writes pushed values of type `T` into
    /// this stream with default options.
    pub fn sink<T: Pack + 'static>(&mut self) -> Sink<'_, S, T> {
        self.sink_with(Options::new())
    }

    /// Returns a sink that pack-writes pushed values of type `T` into
    /// this stream with the given options.
    pub fn sink_with<T: Pack + 'static>(
        &mut self,
        options: Options,
    ) -> Sink<'_, S, T> {
        Sink { stream: self, options, total: 0, _marker: PhantomData }
    }

    /// Returns the current position of the wrapped stream.
    pub fn position(&mut self) -> io::Result<u64> { self.inner.position() }

    /// Moves the wrapped stream to the given byte offset.
    pub fn seek_to(&mut self, position: u64) -> io::Result<()> {
        self.inner.seek_to(position)
    }

    /// Returns `true` if the wrapped stream has no bytes left to read.
    pub fn at_end(&mut self) -> io::Result<bool> { self.inner.at_end() }
}

// The adapter passes `Read`/`Write`/`Seek` through to the wrapped stream,
// so an adapter over an io stream is itself a [`RawStream`]: adapters
// nest, and [`position_delta`](crate::position_delta) can measure bodies
// that operate on the adapter.

impl<S: io::Read> io::Read for PackedStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<S: io::Write> io::Write for PackedStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> { self.inner.flush() }
}

impl<S: io::Seek> io::Seek for PackedStream<S> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

// =============================================================================
// Lazy iterators
// =============================================================================

/// A lazy sequence of decoded values; see
/// [`PackedStream::values_with`].
pub struct Values<'a, S, T> {
    stream: &'a mut PackedStream<S>,
    options: Options,
    failed: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<S: RawStream, T: Unpack + 'static> Iterator for Values<'_, S, T> {
    type Item = io::Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.stream.at_end() {
            Ok(true) => None,
            Ok(false) => {
                match self.stream.read_value_with::<T>(&self.options) {
                    Ok(Some(value)) => Some(Ok(value)),
                    // Unreachable after the end-of-stream check, but
                    // terminating is the only sensible answer.
                    Ok(None) => None,
                    Err(error) => {
                        self.failed = true;
                        Some(Err(error))
                    }
                }
            }
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}

impl<S, T> std::fmt::Debug for Values<'_, S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Values")
            .field("ty", &type_name::<T>())
            .finish_non_exhaustive()
    }
}

/// A lazy sequence of raw byte chunks; see [`PackedStream::chunks`].
pub struct Chunks<'a, S> {
    stream: &'a mut PackedStream<S>,
    len: usize,
    failed: bool,
}

impl<S: RawStream> Iterator for Chunks<'_, S> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.len == 0 {
            return None;
        }

        match self.stream.at_end() {
            Ok(true) => None,
            Ok(false) => match self.stream.read_raw(Some(self.len)) {
                Ok(bytes) if bytes.is_empty() => None,
                Ok(bytes) => Some(Ok(bytes)),
                Err(error) => {
                    self.failed = true;
                    Some(Err(error))
                }
            },
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}

impl<S> std::fmt::Debug for Chunks<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunks")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Bypass view
// =============================================================================

/// A view on a [`PackedStream`] whose write entry point always packs.
///
/// On the adapter, writing a bare byte buffer is a raw pass-through
/// ([`PackedStream::write_raw`]). On this view there is no raw entry
/// point at all: [`write`](Self::write) routes every value, byte
/// buffers included, through its codec. Useful when composing with code
/// that expects a generic "write this value" interface and must always
/// get packing semantics.
///
/// The view borrows the adapter; [`into_inner`](Self::into_inner) exits
/// the forced mode and hands the adapter back.
#[derive(Debug)]
pub struct AlwaysPacked<'a, S> {
    stream: &'a mut PackedStream<S>,
}

impl<'a, S: RawStream> AlwaysPacked<'a, S> {
    /// Pack-writes one value with default options, returning the bytes
    /// written.
    pub fn write<T: Pack + ?Sized + 'static>(
        &mut self,
        value: &T,
    ) -> io::Result<u64> {
        self.stream.write_value(value)
    }

    /// Pack-writes one value with the given options, returning the bytes
    /// written.
    pub fn write_with<T: Pack + ?Sized + 'static>(
        &mut self,
        value: &T,
        options: &Options,
    ) -> io::Result<u64> {
        self.stream.write_value_with(value, options)
    }

    /// Pack-writes every item of the set in order; same as
    /// [`PackedStream::write_values`].
    pub fn write_values<W: WriteDescriptorSet>(
        &mut self,
        values: W,
    ) -> io::Result<u64> {
        self.stream.write_values(values)
    }

    /// Exits the forced-packing mode, returning the adapter.
    #[must_use]
    pub fn into_inner(self) -> &'a mut PackedStream<S> { self.stream }
}

// =============================================================================
// Stream-as-sink helper
// =============================================================================

/// A one-shot handle that pack-writes values into its captured stream.
///
/// A sink captures a destination stream and a (type, options) selector;
/// its only operations are pushing one value at a time and draining a
/// source stream. It models the "pull items out of one stream, push them
/// into another" idiom:
///
/// ```ignore
/// let mut sink = destination.sink::<u32>();
/// sink.drain_from(&mut source)?;
/// ```
pub struct Sink<'a, S, T> {
    stream: &'a mut PackedStream<S>,
    options: Options,
    total: u64,
    _marker: PhantomData<fn(&T)>,
}

impl<S: RawStream, T: Pack + 'static> Sink<'_, S, T> {
    /// Pack-writes one value into the captured stream, returning the
    /// bytes written.
    pub fn push(&mut self, value: &T) -> io::Result<u64> {
        let written = self.stream.write_value_with(value, &self.options)?;
        self.total += written;

        Ok(written)
    }

    /// Decodes values of `T` from `source` until its end-of-stream,
    /// pushing each into the captured stream. The sink's options apply
    /// to both sides. Returns the bytes written.
    pub fn drain_from<R: RawStream>(
        &mut self,
        source: &mut PackedStream<R>,
    ) -> io::Result<u64>
    where
        T: Unpack,
    {
        let mut written = 0;

        while !source.at_end()? {
            match source.read_value_with::<T>(&self.options)? {
                Some(value) => written += self.push(&value)?,
                None => break,
            }
        }

        Ok(written)
    }

    /// Returns the total bytes written through this sink so far.
    #[must_use]
    pub const fn total_written(&self) -> u64 { self.total }
}

impl<S, T> std::fmt::Debug for Sink<'_, S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("ty", &type_name::<T>())
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test;
