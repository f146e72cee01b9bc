//! Descriptors: the boundary that normalizes call shapes.
//!
//! A caller describes what goes on the wire as descriptors: "a value of
//! type `T` with these options" for reads, "this value with these
//! options" for writes. The adapter takes one descriptor or a tuple
//! of them. The descriptor-set traits turn those shapes into the ordered
//! dispatch sequence the adapter executes, one codec invocation per
//! descriptor, in argument order.
//!
//! The accepted shapes:
//!
//! - a bare type: `typed::<u32>()`
//! - a (type, options) pair: `typed::<u32>().with(Width(2))`
//! - a bare value: `&42u32` (write side)
//! - a (value, options) pair: `packed(&42u32).with(Width(2))`
//! - a registered preset: `typed::<u32>().with_options(
//!   Options::preset("word_be").unwrap())`
//! - tuples mixing any of the above, up to arity 8
//!
//! A lone read descriptor produces a scalar result; a tuple of
//! descriptors produces a tuple of results, matching 1:1 in order.

use std::{any::Any, io, marker::PhantomData};

use crate::{
    decode::Unpack, encode::Pack, options::Options,
    packed_stream::PackedStream, stream::RawStream,
};

/// A read descriptor: a target type together with per-call options.
pub struct ReadDescriptor<T> {
    pub(crate) options: Options,
    _marker: PhantomData<fn() -> T>,
}

/// Builds a read descriptor for `T` with default options.
#[must_use]
pub fn typed<T: Unpack>() -> ReadDescriptor<T> {
    ReadDescriptor { options: Options::new(), _marker: PhantomData }
}

impl<T: Unpack> ReadDescriptor<T> {
    /// Adds a single option, consuming and returning the descriptor.
    #[must_use]
    pub fn with<O: Any + Send + Sync>(mut self, option: O) -> Self {
        self.options.insert(option);
        self
    }

    /// Replaces the descriptor's options wholesale.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Returns the descriptor's options.
    #[must_use]
    pub fn options(&self) -> &Options { &self.options }
}

impl<T: Unpack> Default for ReadDescriptor<T> {
    fn default() -> Self { typed() }
}

impl<T> std::fmt::Debug for ReadDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadDescriptor")
            .field("ty", &std::any::type_name::<T>())
            .field("options", &self.options)
            .finish()
    }
}

/// An ordered set of read descriptors, executed left to right.
pub trait ReadDescriptorSet {
    /// The decoded result shape: `Option<T>` for a lone descriptor, a
    /// tuple of `Option`s for a tuple of descriptors. Absent values only
    /// occur under the tolerant end-of-stream policy.
    type Output;

    /// Performs one typed read per descriptor against the stream.
    fn read_from<S: RawStream>(
        self,
        stream: &mut PackedStream<S>,
    ) -> io::Result<Self::Output>;
}

impl<T: Unpack + 'static> ReadDescriptorSet for ReadDescriptor<T> {
    type Output = Option<T>;

    fn read_from<S: RawStream>(
        self,
        stream: &mut PackedStream<S>,
    ) -> io::Result<Self::Output> {
        stream.read_value_with(&self.options)
    }
}

macro_rules! impl_read_descriptor_set {
    ($($name:ident),+) => {
        impl<$($name: Unpack + 'static),+> ReadDescriptorSet
            for ($(ReadDescriptor<$name>,)+)
        {
            type Output = ($(Option<$name>,)+);

            #[allow(non_snake_case)]
            fn read_from<S: RawStream>(
                self,
                stream: &mut PackedStream<S>,
            ) -> io::Result<Self::Output> {
                let ($($name,)+) = self;

                Ok(($(
                    stream.read_value_with::<$name>(&$name.options)?,
                )+))
            }
        }
    };
}

impl_read_descriptor_set!(A);
impl_read_descriptor_set!(A, B);
impl_read_descriptor_set!(A, B, C);
impl_read_descriptor_set!(A, B, C, D);
impl_read_descriptor_set!(A, B, C, D, E);
impl_read_descriptor_set!(A, B, C, D, E, F);
impl_read_descriptor_set!(A, B, C, D, E, F, G);
impl_read_descriptor_set!(A, B, C, D, E, F, G, H);

/// A write descriptor: a borrowed value together with per-call options.
pub struct WriteDescriptor<'a, T: Pack + ?Sized> {
    pub(crate) value: &'a T,
    pub(crate) options: Options,
}

/// Builds a write descriptor for `value` with default options.
#[must_use]
pub fn packed<T: Pack + ?Sized>(value: &T) -> WriteDescriptor<'_, T> {
    WriteDescriptor { value, options: Options::new() }
}

impl<'a, T: Pack + ?Sized> WriteDescriptor<'a, T> {
    /// Adds a single option, consuming and returning the descriptor.
    #[must_use]
    pub fn with<O: Any + Send + Sync>(mut self, option: O) -> Self {
        self.options.insert(option);
        self
    }

    /// Replaces the descriptor's options wholesale.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

impl<T: Pack + ?Sized> std::fmt::Debug for WriteDescriptor<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteDescriptor")
            .field("ty", &std::any::type_name::<T>())
            .field("options", &self.options)
            .finish()
    }
}

/// One element of a write-descriptor set: either a bare `&value` (packed
/// with default options) or a [`WriteDescriptor`] pair.
pub trait WriteItem {
    /// Pack-writes this item, returning the bytes written.
    fn write_one<S: RawStream>(
        self,
        stream: &mut PackedStream<S>,
    ) -> io::Result<u64>;
}

impl<T: Pack + ?Sized + 'static> WriteItem for &T {
    fn write_one<S: RawStream>(
        self,
        stream: &mut PackedStream<S>,
    ) -> io::Result<u64> {
        stream.write_value(self)
    }
}

impl<T: Pack + ?Sized + 'static> WriteItem for WriteDescriptor<'_, T> {
    fn write_one<S: RawStream>(
        self,
        stream: &mut PackedStream<S>,
    ) -> io::Result<u64> {
        stream.write_value_with(self.value, &self.options)
    }
}

/// An ordered set of write items, executed left to right. The total byte
/// count is the sum over the items.
pub trait WriteDescriptorSet {
    /// Pack-writes every item in order, returning the summed byte count.
    fn write_all<S: RawStream>(
        self,
        stream: &mut PackedStream<S>,
    ) -> io::Result<u64>;
}

impl<T: Pack + ?Sized + 'static> WriteDescriptorSet for &T {
    fn write_all<S: RawStream>(
        self,
        stream: &mut PackedStream<S>,
    ) -> io::Result<u64> {
        self.write_one(stream)
    }
}

impl<T: Pack + ?Sized + 'static> WriteDescriptorSet
    for WriteDescriptor<'_, T>
{
    fn write_all<S: RawStream>(
        self,
        stream: &mut PackedStream<S>,
    ) -> io::Result<u64> {
        self.write_one(stream)
    }
}

macro_rules! impl_write_descriptor_set {
    ($($name:ident),+) => {
        impl<$($name: WriteItem),+> WriteDescriptorSet for ($($name,)+) {
            #[allow(non_snake_case)]
            fn write_all<S: RawStream>(
                self,
                stream: &mut PackedStream<S>,
            ) -> io::Result<u64> {
                let ($($name,)+) = self;
                let mut written = 0;
                $(
                    written += $name.write_one(stream)?;
                )+
                Ok(written)
            }
        }
    };
}

impl_write_descriptor_set!(A);
impl_write_descriptor_set!(A, B);
impl_write_descriptor_set!(A, B, C);
impl_write_descriptor_set!(A, B, C, D);
impl_write_descriptor_set!(A, B, C, D, E);
impl_write_descriptor_set!(A, B, C, D, E, F);
impl_write_descriptor_set!(A, B, C, D, E, F, G);
impl_write_descriptor_set!(A, B, C, D, E, F, G, H);
