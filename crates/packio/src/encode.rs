//! The encode half of the codec contract, plus the stock codecs.
//!
//! [`Pack`] is what the packing adapter dispatches writes through: a codec
//! receives the stream and the per-call options, writes its value, and
//! reports the number of bytes it produced. This module also carries the
//! built-in implementations for primitives and common containers.
//!
//! # Wire layout of the stock codecs
//!
//! - **Integers**: fixed-width little-endian at the type's native size,
//!   unless [`Width`](crate::Width) and/or [`ByteOrder`](crate::ByteOrder)
//!   say otherwise. A value that does not fit the requested width is an
//!   error, never silently truncated.
//! - **Strings and slices**: a LEB128 varint length prefix followed by the
//!   contents. With [`FixedLength`](crate::FixedLength), a string instead
//!   occupies exactly that many bytes, padded with the
//!   [`Filler`](crate::Filler) byte.
//! - **Containers**: a varint element count followed by the elements,
//!   each packed with the same options.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    hash::BuildHasher,
    io,
    mem::size_of,
    rc::Rc,
    sync::Arc,
    time::Duration,
};

use dashmap::{DashMap, DashSet};

use crate::{
    options::{int_layout, ByteOrder, Filler, FixedLength, Options},
    stream::RawStream,
};

/// A trait for types that can be packed onto a raw stream.
///
/// Implementations write the encoded form of `self` and return the number
/// of bytes written. The options container carries per-call settings; a
/// codec is free to ignore entries it does not recognize, and options
/// flow through container codecs to their elements unchanged.
///
/// # Errors
///
/// Returns an error if the underlying stream operation fails or if the
/// value cannot be represented under the requested options (for example
/// an integer wider than its [`Width`](crate::Width)).
pub trait Pack {
    /// Packs this value onto the stream, returning the bytes written.
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64>;
}

// =============================================================================
// Varint helpers
// =============================================================================

/// Maximum number of bytes in a varint-encoded u64.
pub(crate) const MAX_VARINT_U64_BYTES: usize = 10;

/// Encodes an unsigned 64-bit integer as a LEB128 varint into the buffer.
/// Returns the number of bytes written.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn encode_varint_u64(
    mut value: u64,
    buf: &mut [u8; MAX_VARINT_U64_BYTES],
) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}

/// Writes a varint length prefix, returning the bytes written.
pub(crate) fn write_len_prefix<S: RawStream + ?Sized>(
    stream: &mut S,
    len: usize,
) -> io::Result<u64> {
    let mut buf = [0u8; MAX_VARINT_U64_BYTES];
    let written = encode_varint_u64(len as u64, &mut buf);

    stream.write_raw(&buf[..written])
}

// =============================================================================
// Fixed-width integer helpers
// =============================================================================

/// Packs an unsigned integer into `width` bytes in the given byte order.
fn pack_uint<S: RawStream + ?Sized>(
    stream: &mut S,
    value: u128,
    width: usize,
    order: ByteOrder,
) -> io::Result<u64> {
    if width == 0 || width > 16 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported integer width: {width}"),
        ));
    }

    if width < 16 && value >> (width * 8) != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("value {value} does not fit in {width} bytes"),
        ));
    }

    let le = value.to_le_bytes();
    let mut buf = [0u8; 16];
    buf[..width].copy_from_slice(&le[..width]);

    if order == ByteOrder::Big {
        buf[..width].reverse();
    }

    stream.write_raw(&buf[..width])
}

/// Packs a signed integer into `width` bytes, two's complement, in the
/// given byte order.
#[allow(clippy::cast_sign_loss)]
fn pack_int<S: RawStream + ?Sized>(
    stream: &mut S,
    value: i128,
    width: usize,
    order: ByteOrder,
) -> io::Result<u64> {
    if width == 0 || width > 16 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported integer width: {width}"),
        ));
    }

    if width < 16 {
        let bits = width as u32 * 8;
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;

        if value < min || value > max {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("value {value} does not fit in {width} bytes"),
            ));
        }
    }

    let le = value.to_le_bytes();
    let mut buf = [0u8; 16];
    buf[..width].copy_from_slice(&le[..width]);

    if order == ByteOrder::Big {
        buf[..width].reverse();
    }

    stream.write_raw(&buf[..width])
}

// =============================================================================
// Implementations for primitive types
// =============================================================================

macro_rules! impl_pack_unsigned {
    ($($ty:ty),+) => {$(
        impl Pack for $ty {
            fn pack<S: RawStream + ?Sized>(
                &self,
                stream: &mut S,
                options: &Options,
            ) -> io::Result<u64> {
                let (width, order) = int_layout(options, size_of::<$ty>());

                pack_uint(stream, u128::from(*self), width, order)
            }
        }
    )+};
}

impl_pack_unsigned!(u8, u16, u32, u64, u128);

macro_rules! impl_pack_signed {
    ($($ty:ty),+) => {$(
        impl Pack for $ty {
            fn pack<S: RawStream + ?Sized>(
                &self,
                stream: &mut S,
                options: &Options,
            ) -> io::Result<u64> {
                let (width, order) = int_layout(options, size_of::<$ty>());

                pack_int(stream, i128::from(*self), width, order)
            }
        }
    )+};
}

impl_pack_signed!(i8, i16, i32, i64, i128);

impl Pack for usize {
    /// Packed as a 64-bit value for portability.
    #[allow(clippy::cast_lossless)]
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let (width, order) = int_layout(options, size_of::<u64>());

        pack_uint(stream, *self as u128, width, order)
    }
}

impl Pack for isize {
    /// Packed as a 64-bit value for portability.
    #[allow(clippy::cast_lossless)]
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let (width, order) = int_layout(options, size_of::<i64>());

        pack_int(stream, *self as i128, width, order)
    }
}

impl Pack for bool {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        _options: &Options,
    ) -> io::Result<u64> {
        stream.write_raw(&[u8::from(*self)])
    }
}

impl Pack for char {
    /// Packed as the 32-bit Unicode scalar value.
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let order = options.get::<ByteOrder>().copied().unwrap_or_default();

        pack_uint(stream, u128::from(u32::from(*self)), 4, order)
    }
}

impl Pack for f32 {
    /// IEEE 754 binary representation.
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        match options.get::<ByteOrder>().copied().unwrap_or_default() {
            ByteOrder::Little => stream.write_raw(&self.to_le_bytes()),
            ByteOrder::Big => stream.write_raw(&self.to_be_bytes()),
        }
    }
}

impl Pack for f64 {
    /// IEEE 754 binary representation.
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        match options.get::<ByteOrder>().copied().unwrap_or_default() {
            ByteOrder::Little => stream.write_raw(&self.to_le_bytes()),
            ByteOrder::Big => stream.write_raw(&self.to_be_bytes()),
        }
    }
}

impl Pack for str {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let bytes = self.as_bytes();

        if let Some(fixed) = options.get::<FixedLength>() {
            if bytes.len() > fixed.0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "string of {} bytes does not fit fixed length {}",
                        bytes.len(),
                        fixed.0
                    ),
                ));
            }

            let filler =
                options.get::<Filler>().map_or(0, |filler| filler.0);
            let mut buf = vec![filler; fixed.0];
            buf[..bytes.len()].copy_from_slice(bytes);

            return stream.write_raw(&buf);
        }

        let mut written = write_len_prefix(stream, bytes.len())?;
        written += stream.write_raw(bytes)?;

        Ok(written)
    }
}

impl Pack for String {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        self.as_str().pack(stream, options)
    }
}

// =============================================================================
// Implementations for references and smart pointers
// =============================================================================

impl<T: Pack + ?Sized> Pack for &T {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        (**self).pack(stream, options)
    }
}

impl<T: Pack + ?Sized> Pack for &mut T {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        (**self).pack(stream, options)
    }
}

impl<T: Pack + ?Sized> Pack for Box<T> {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        (**self).pack(stream, options)
    }
}

impl<T: Pack + ?Sized> Pack for Rc<T> {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        (**self).pack(stream, options)
    }
}

impl<T: Pack + ?Sized> Pack for Arc<T> {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        (**self).pack(stream, options)
    }
}

impl<T: Pack + ToOwned + ?Sized> Pack for Cow<'_, T> {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        (**self).pack(stream, options)
    }
}

// =============================================================================
// Implementations for Option and collections
// =============================================================================

impl<T: Pack> Pack for Option<T> {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        match self {
            Some(value) => {
                let mut written = true.pack(stream, options)?;
                written += value.pack(stream, options)?;
                Ok(written)
            }
            None => false.pack(stream, options),
        }
    }
}

impl<T: Pack> Pack for [T] {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let mut written = write_len_prefix(stream, self.len())?;
        for item in self {
            written += item.pack(stream, options)?;
        }
        Ok(written)
    }
}

impl<T: Pack> Pack for Vec<T> {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        self.as_slice().pack(stream, options)
    }
}

impl<T: Pack, const N: usize> Pack for [T; N] {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let mut written = 0;
        for item in self {
            written += item.pack(stream, options)?;
        }
        Ok(written)
    }
}

impl<K: Pack, V: Pack, H: BuildHasher> Pack for HashMap<K, V, H> {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let mut written = write_len_prefix(stream, self.len())?;
        for (key, value) in self {
            written += key.pack(stream, options)?;
            written += value.pack(stream, options)?;
        }
        Ok(written)
    }
}

impl<T: Pack, H: BuildHasher> Pack for HashSet<T, H> {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let mut written = write_len_prefix(stream, self.len())?;
        for item in self {
            written += item.pack(stream, options)?;
        }
        Ok(written)
    }
}

impl<K: Pack, V: Pack> Pack for BTreeMap<K, V> {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let mut written = write_len_prefix(stream, self.len())?;
        for (key, value) in self {
            written += key.pack(stream, options)?;
            written += value.pack(stream, options)?;
        }
        Ok(written)
    }
}

impl<T: Pack> Pack for BTreeSet<T> {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let mut written = write_len_prefix(stream, self.len())?;
        for item in self {
            written += item.pack(stream, options)?;
        }
        Ok(written)
    }
}

impl<K, V, H> Pack for DashMap<K, V, H>
where
    K: Pack + Eq + std::hash::Hash,
    V: Pack,
    H: BuildHasher + Clone,
{
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let mut written = write_len_prefix(stream, self.len())?;
        for entry in self.iter() {
            written += entry.key().pack(stream, options)?;
            written += entry.value().pack(stream, options)?;
        }
        Ok(written)
    }
}

impl<T, H> Pack for DashSet<T, H>
where
    T: Pack + Eq + std::hash::Hash,
    H: BuildHasher + Clone,
{
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let mut written = write_len_prefix(stream, self.len())?;
        for entry in self.iter() {
            written += entry.key().pack(stream, options)?;
        }
        Ok(written)
    }
}

// =============================================================================
// Implementations for tuples and special types
// =============================================================================

impl Pack for () {
    fn pack<S: RawStream + ?Sized>(
        &self,
        _stream: &mut S,
        _options: &Options,
    ) -> io::Result<u64> {
        Ok(0)
    }
}

macro_rules! impl_pack_tuple {
    ($($name:ident),+) => {
        impl<$($name: Pack),+> Pack for ($($name,)+) {
            #[allow(non_snake_case)]
            fn pack<S: RawStream + ?Sized>(
                &self,
                stream: &mut S,
                options: &Options,
            ) -> io::Result<u64> {
                let ($($name,)+) = self;
                let mut written = 0;
                $(
                    written += $name.pack(stream, options)?;
                )+
                Ok(written)
            }
        }
    };
}

impl_pack_tuple!(A);
impl_pack_tuple!(A, B);
impl_pack_tuple!(A, B, C);
impl_pack_tuple!(A, B, C, D);
impl_pack_tuple!(A, B, C, D, E);
impl_pack_tuple!(A, B, C, D, E, F);
impl_pack_tuple!(A, B, C, D, E, F, G);
impl_pack_tuple!(A, B, C, D, E, F, G, H);

impl Pack for Duration {
    fn pack<S: RawStream + ?Sized>(
        &self,
        stream: &mut S,
        options: &Options,
    ) -> io::Result<u64> {
        let mut written = self.as_secs().pack(stream, options)?;
        written += self.subsec_nanos().pack(stream, options)?;
        Ok(written)
    }
}
