//! The decode half of the codec contract, plus the stock codecs.
//!
//! [`Unpack`] is what the packing adapter dispatches reads through: a
//! codec receives the stream and the per-call options and produces a
//! value. The wire layouts mirror the encode side exactly; see
//! [`encode`](crate::encode) for the layout rules.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    hash::{BuildHasher, Hash},
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

/// A trait for types that can be unpacked from a raw stream.
///
/// Implementations consume exactly the bytes their encoded form occupies
/// and produce the decoded value. The options container carries per-call
/// settings and flows through container codecs to their elements
/// unchanged.
///
/// # Errors
///
/// Returns an error if the underlying stream operation fails or if the
/// data is invalid for the requested layout.
pub trait Unpack: Sized {
    /// Unpacks a value from the stream.
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self>;
}

// =============================================================================
// Varint helpers
// =============================================================================

/// Reads a LEB128 varint-encoded u64.
pub(crate) fn read_varint_u64<S: RawStream + ?Sized>(
    stream: &mut S,
) -> io::Result<u64> {
    let mut result: u64 = 0;
    let mut shift = 0;

    loop {
        let byte = stream.read_exact_raw(1)?[0];

        if shift >= 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "varint too long for u64",
            ));
        }

        result |= u64::from(byte & 0x7F) << shift;

        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;
    }
}

/// Reads a varint length prefix as a `usize`.
pub(crate) fn read_len_prefix<S: RawStream + ?Sized>(
    stream: &mut S,
) -> io::Result<usize> {
    let len = read_varint_u64(stream)?;

    usize::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "length prefix out of range for this platform",
        )
    })
}

// =============================================================================
// Fixed-width integer helpers
// =============================================================================

/// Unpacks an unsigned integer of `width` bytes in the given byte order.
fn unpack_uint<S: RawStream + ?Sized>(
    stream: &mut S,
    width: usize,
    order: ByteOrder,
) -> io::Result<u128> {
    if width == 0 || width > 16 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported integer width: {width}"),
        ));
    }

    let mut bytes = stream.read_exact_raw(width)?;

    if order == ByteOrder::Big {
        bytes.reverse();
    }

    let mut value = 0u128;
    for (i, byte) in bytes.iter().enumerate() {
        value |= u128::from(*byte) << (i * 8);
    }

    Ok(value)
}

/// Unpacks a signed integer of `width` bytes, sign-extending from the
/// encoded width.
#[allow(clippy::cast_possible_wrap)]
fn unpack_int<S: RawStream + ?Sized>(
    stream: &mut S,
    width: usize,
    order: ByteOrder,
) -> io::Result<i128> {
    let raw = unpack_uint(stream, width, order)?;

    if width == 16 {
        return Ok(raw as i128);
    }

    let bits = width * 8;
    let sign = 1u128 << (bits - 1);

    if raw & sign != 0 {
        Ok((raw | (!0u128 << bits)) as i128)
    } else {
        Ok(raw as i128)
    }
}

// =============================================================================
// Implementations for primitive types
// =============================================================================

macro_rules! impl_unpack_unsigned {
    ($($ty:ty),+) => {$(
        impl Unpack for $ty {
            fn unpack<S: RawStream + ?Sized>(
                stream: &mut S,
                options: &Options,
            ) -> io::Result<Self> {
                let (width, order) = int_layout(options, size_of::<$ty>());
                let value = unpack_uint(stream, width, order)?;

                <$ty>::try_from(value).map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "decoded value {value} out of range for {}",
                            stringify!($ty)
                        ),
                    )
                })
            }
        }
    )+};
}

impl_unpack_unsigned!(u8, u16, u32, u64, u128);

macro_rules! impl_unpack_signed {
    ($($ty:ty),+) => {$(
        impl Unpack for $ty {
            fn unpack<S: RawStream + ?Sized>(
                stream: &mut S,
                options: &Options,
            ) -> io::Result<Self> {
                let (width, order) = int_layout(options, size_of::<$ty>());
                let value = unpack_int(stream, width, order)?;

                <$ty>::try_from(value).map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "decoded value {value} out of range for {}",
                            stringify!($ty)
                        ),
                    )
                })
            }
        }
    )+};
}

impl_unpack_signed!(i8, i16, i32, i64, i128);

impl Unpack for usize {
    /// Unpacked from a 64-bit value for portability.
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let (width, order) = int_layout(options, size_of::<u64>());
        let value = unpack_uint(stream, width, order)?;

        Self::try_from(value).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "usize value out of range for this platform",
            )
        })
    }
}

impl Unpack for isize {
    /// Unpacked from a 64-bit value for portability.
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let (width, order) = int_layout(options, size_of::<i64>());
        let value = unpack_int(stream, width, order)?;

        Self::try_from(value).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "isize value out of range for this platform",
            )
        })
    }
}

impl Unpack for bool {
    /// `0` decodes as `false`, any non-zero value as `true`.
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        _options: &Options,
    ) -> io::Result<Self> {
        Ok(stream.read_exact_raw(1)?[0] != 0)
    }
}

impl Unpack for char {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let order = options.get::<ByteOrder>().copied().unwrap_or_default();
        let value = unpack_uint(stream, 4, order)?;
        let code = u32::try_from(value).expect("4-byte read fits in u32");

        char::from_u32(code).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid Unicode scalar value: {code}"),
            )
        })
    }
}

impl Unpack for f32 {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let bytes = stream.read_exact_raw(4)?;
        let bytes: [u8; 4] =
            bytes.try_into().expect("read_exact_raw returned 4 bytes");

        Ok(match options.get::<ByteOrder>().copied().unwrap_or_default() {
            ByteOrder::Little => Self::from_le_bytes(bytes),
            ByteOrder::Big => Self::from_be_bytes(bytes),
        })
    }
}

impl Unpack for f64 {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let bytes = stream.read_exact_raw(8)?;
        let bytes: [u8; 8] =
            bytes.try_into().expect("read_exact_raw returned 8 bytes");

        Ok(match options.get::<ByteOrder>().copied().unwrap_or_default() {
            ByteOrder::Little => Self::from_le_bytes(bytes),
            ByteOrder::Big => Self::from_be_bytes(bytes),
        })
    }
}

impl Unpack for String {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let bytes = if let Some(fixed) = options.get::<FixedLength>() {
            let filler =
                options.get::<Filler>().map_or(0, |filler| filler.0);
            let mut bytes = stream.read_exact_raw(fixed.0)?;

            while bytes.last() == Some(&filler) {
                bytes.pop();
            }

            bytes
        } else {
            let len = read_len_prefix(stream)?;
            stream.read_exact_raw(len)?
        };

        Self::from_utf8(bytes).map_err(|error| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid UTF-8: {error}"),
            )
        })
    }
}

// =============================================================================
// Implementations for smart pointers
// =============================================================================

impl<T: Unpack> Unpack for Box<T> {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        Ok(Self::new(T::unpack(stream, options)?))
    }
}

impl<T: Unpack> Unpack for Rc<T> {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        Ok(Self::new(T::unpack(stream, options)?))
    }
}

impl<T: Unpack> Unpack for Arc<T> {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        Ok(Self::new(T::unpack(stream, options)?))
    }
}

impl<T: ToOwned + ?Sized> Unpack for Cow<'_, T>
where
    T::Owned: Unpack,
{
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        Ok(Cow::Owned(T::Owned::unpack(stream, options)?))
    }
}

// =============================================================================
// Implementations for Option and collections
// =============================================================================

impl<T: Unpack> Unpack for Option<T> {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let is_some = bool::unpack(stream, options)?;

        if is_some {
            Ok(Some(T::unpack(stream, options)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Unpack> Unpack for Vec<T> {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let len = read_len_prefix(stream)?;
        let mut vec = Self::with_capacity(len);

        for _ in 0..len {
            vec.push(T::unpack(stream, options)?);
        }

        Ok(vec)
    }
}

impl<T: Unpack, const N: usize> Unpack for [T; N] {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let mut vec = Vec::with_capacity(N);

        for _ in 0..N {
            vec.push(T::unpack(stream, options)?);
        }

        // The length is N by construction.
        Ok(vec.try_into().unwrap_or_else(|_| unreachable!()))
    }
}

impl<K, V, H> Unpack for HashMap<K, V, H>
where
    K: Unpack + Eq + Hash,
    V: Unpack,
    H: BuildHasher + Default,
{
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let len = read_len_prefix(stream)?;
        let mut map = Self::with_capacity_and_hasher(len, H::default());

        for _ in 0..len {
            let key = K::unpack(stream, options)?;
            let value = V::unpack(stream, options)?;
            map.insert(key, value);
        }

        Ok(map)
    }
}

impl<T, H> Unpack for HashSet<T, H>
where
    T: Unpack + Eq + Hash,
    H: BuildHasher + Default,
{
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let len = read_len_prefix(stream)?;
        let mut set = Self::with_capacity_and_hasher(len, H::default());

        for _ in 0..len {
            set.insert(T::unpack(stream, options)?);
        }

        Ok(set)
    }
}

impl<K: Unpack + Ord, V: Unpack> Unpack for BTreeMap<K, V> {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let len = read_len_prefix(stream)?;
        let mut map = Self::new();

        for _ in 0..len {
            let key = K::unpack(stream, options)?;
            let value = V::unpack(stream, options)?;
            map.insert(key, value);
        }

        Ok(map)
    }
}

impl<T: Unpack + Ord> Unpack for BTreeSet<T> {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let len = read_len_prefix(stream)?;
        let mut set = Self::new();

        for _ in 0..len {
            set.insert(T::unpack(stream, options)?);
        }

        Ok(set)
    }
}

impl<K, V, H> Unpack for DashMap<K, V, H>
where
    K: Unpack + Eq + Hash,
    V: Unpack,
    H: BuildHasher + Default + Clone,
{
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let len = read_len_prefix(stream)?;
        let map = Self::with_capacity_and_hasher(len, H::default());

        for _ in 0..len {
            let key = K::unpack(stream, options)?;
            let value = V::unpack(stream, options)?;
            map.insert(key, value);
        }

        Ok(map)
    }
}

impl<T, H> Unpack for DashSet<T, H>
where
    T: Unpack + Eq + Hash,
    H: BuildHasher + Default + Clone,
{
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let len = read_len_prefix(stream)?;
        let set = Self::with_capacity_and_hasher(len, H::default());

        for _ in 0..len {
            set.insert(T::unpack(stream, options)?);
        }

        Ok(set)
    }
}

// =============================================================================
// Implementations for tuples and special types
// =============================================================================

impl Unpack for () {
    fn unpack<S: RawStream + ?Sized>(
        _stream: &mut S,
        _options: &Options,
    ) -> io::Result<Self> {
        Ok(())
    }
}

macro_rules! impl_unpack_tuple {
    ($($name:ident),+) => {
        impl<$($name: Unpack),+> Unpack for ($($name,)+) {
            fn unpack<S: RawStream + ?Sized>(
                stream: &mut S,
                options: &Options,
            ) -> io::Result<Self> {
                Ok(($(
                    $name::unpack(stream, options)?,
                )+))
            }
        }
    };
}

impl_unpack_tuple!(A);
impl_unpack_tuple!(A, B);
impl_unpack_tuple!(A, B, C);
impl_unpack_tuple!(A, B, C, D);
impl_unpack_tuple!(A, B, C, D, E);
impl_unpack_tuple!(A, B, C, D, E, F);
impl_unpack_tuple!(A, B, C, D, E, F, G);
impl_unpack_tuple!(A, B, C, D, E, F, G, H);

impl Unpack for Duration {
    fn unpack<S: RawStream + ?Sized>(
        stream: &mut S,
        options: &Options,
    ) -> io::Result<Self> {
        let secs = u64::unpack(stream, options)?;
        let nanos = u32::unpack(stream, options)?;

        Ok(Self::new(secs, nanos))
    }
}

#[cfg(test)]
mod test;
