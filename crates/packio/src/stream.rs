//! The raw byte-stream contract consumed by the packing layer.
//!
//! [`RawStream`] describes what the adapter needs from an underlying
//! stream: raw reads and writes, a readable position, seeking, and
//! end-of-stream detection. A blanket implementation covers anything that
//! is `Read + Write + Seek`, so in-memory cursors and files work out of
//! the box. The trait is object safe, which is what allows per-call
//! overrides to be stored type-erased in an options container.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// A position-aware byte stream.
///
/// All operations are blocking and the stream is not safe for concurrent
/// use: the position is shared mutable state, and interleaved access from
/// multiple handles corrupts both sequential decoding and position-delta
/// accounting.
pub trait RawStream {
    /// Reads raw bytes, unaffected by packing.
    ///
    /// `Some(len)` reads *up to* `len` bytes with native short-read
    /// semantics near the end of the stream; `None` reads everything up
    /// to the end. Codecs that need an exact byte count use
    /// [`read_exact_raw`](Self::read_exact_raw) instead.
    fn read_raw(&mut self, len: Option<usize>) -> io::Result<Vec<u8>>;

    /// Writes raw bytes, unaffected by packing. Returns the number of
    /// bytes written.
    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<u64>;

    /// Returns the current stream position as a byte offset.
    fn position(&mut self) -> io::Result<u64>;

    /// Moves the stream position to the given byte offset.
    fn seek_to(&mut self, position: u64) -> io::Result<()>;

    /// Returns `true` if the stream has no bytes left to read.
    ///
    /// Probing must not consume input or move the observable position.
    fn at_end(&mut self) -> io::Result<bool>;

    /// Reads exactly `len` bytes, failing with
    /// [`io::ErrorKind::UnexpectedEof`] if the stream ends first.
    fn read_exact_raw(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let bytes = self.read_raw(Some(len))?;

        if bytes.len() != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "expected {len} bytes, stream ended after {}",
                    bytes.len()
                ),
            ));
        }

        Ok(bytes)
    }
}

impl<S: Read + Write + Seek> RawStream for S {
    fn read_raw(&mut self, len: Option<usize>) -> io::Result<Vec<u8>> {
        match len {
            Some(len) => {
                let mut buffer = vec![0u8; len];
                let mut filled = 0;

                while filled < len {
                    match self.read(&mut buffer[filled..]) {
                        Ok(0) => break,
                        Ok(read) => filled += read,
                        Err(error)
                            if error.kind() == io::ErrorKind::Interrupted => {}
                        Err(error) => return Err(error),
                    }
                }

                buffer.truncate(filled);
                Ok(buffer)
            }
            None => {
                let mut buffer = Vec::new();
                self.read_to_end(&mut buffer)?;
                Ok(buffer)
            }
        }
    }

    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<u64> {
        self.write_all(bytes)?;
        Ok(bytes.len() as u64)
    }

    fn position(&mut self) -> io::Result<u64> { self.stream_position() }

    fn seek_to(&mut self, position: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(position)).map(|_| ())
    }

    fn at_end(&mut self) -> io::Result<bool> {
        // Probe one byte and step back; Seek has no cheaper EOF test.
        let mut probe = [0u8; 1];

        loop {
            match self.read(&mut probe) {
                Ok(0) => return Ok(true),
                Ok(_) => {
                    self.seek(SeekFrom::Current(-1))?;
                    return Ok(false);
                }
                Err(error)
                    if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
    }
}

/// Returns the net change in stream position caused by `body`.
///
/// The position is captured immediately before and immediately after the
/// body runs against the same handle; the signed difference is returned.
/// The measurement is only meaningful if nothing else touches the stream
/// through another handle in between; that is the caller's
/// responsibility, not enforced here. Has nothing to do with packing, but
/// it pairs naturally with codecs that report byte counts.
///
/// # Example
///
/// ```ignore
/// use packio::{position_delta, RawStream};
///
/// let delta = position_delta(&mut stream, |stream| {
///     stream.write_raw(b"abc").map(|_| ())
/// })?;
/// assert_eq!(delta, 3);
/// ```
#[allow(clippy::cast_possible_wrap)]
pub fn position_delta<S, F>(stream: &mut S, body: F) -> io::Result<i64>
where
    S: RawStream + ?Sized,
    F: FnOnce(&mut S) -> io::Result<()>,
{
    let before = stream.position()?;
    body(stream)?;
    let after = stream.position()?;

    Ok(after as i64 - before as i64)
}

#[cfg(test)]
mod test;
