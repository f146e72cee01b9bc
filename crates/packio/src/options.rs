//! Per-call options for packing and unpacking operations.
//!
//! This module provides a type-safe options container that travels with
//! every packed read or write. Options are keyed by type, allowing codecs
//! and callers to store and retrieve their own settings without conflicts:
//! the stock integer codecs look up [`Width`] and [`ByteOrder`], the string
//! codecs look up [`FixedLength`] and [`Filler`], and the adapter itself
//! looks up the [`DecodeOverride`] / [`EncodeOverride`] callables that
//! replace a type's codec for a single call.
//!
//! Frequently used option combinations can be registered once as a named
//! preset and recalled by name at any call site.
//!
//! # Example
//!
//! ```ignore
//! use packio::{ByteOrder, Options, Width};
//!
//! let options = Options::new().with(Width(2)).with(ByteOrder::Big);
//!
//! assert_eq!(options.get::<Width>().map(|w| w.0), Some(2));
//! ```

use std::{
    any::{Any, TypeId},
    io,
    sync::{Arc, LazyLock},
};

use fxhash::FxHashMap;
use parking_lot::RwLock;

use crate::stream::RawStream;

/// A type-safe container for per-call options.
///
/// [`Options`] carries arbitrary settings into packing and unpacking
/// operations. Each option is identified by its type, ensuring type-safe
/// access without runtime string keys.
///
/// Options flow through container codecs unchanged: packing a `Vec<u32>`
/// with a [`Width`] option applies that width to every element.
#[derive(Default)]
pub struct Options {
    entries: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Options {
    /// Creates a new empty options container.
    #[must_use]
    pub fn new() -> Self { Self { entries: FxHashMap::default() } }

    /// Inserts an option value, consuming and returning `self`.
    ///
    /// This is the builder-style companion of [`insert`](Self::insert),
    /// convenient for assembling options inline at a call site.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    /// Inserts an option value into the container.
    ///
    /// If an option of the same type already exists, it is replaced and
    /// the old value is returned.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.entries
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Returns a reference to an option value if it exists.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Returns a mutable reference to an option value if it exists.
    pub fn get_mut<T: Any + Send + Sync>(&mut self) -> Option<&mut T> {
        self.entries
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut())
    }

    /// Removes an option value from the container, returning it if it
    /// existed.
    pub fn remove<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.entries
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Returns `true` if the container holds an option of the given type.
    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of options in the container.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Returns `true` if the container has no options.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Removes all options from the container.
    pub fn clear(&mut self) { self.entries.clear(); }

    /// Registers a named options preset.
    ///
    /// The builder closure is invoked each time the preset is recalled, so
    /// presets containing non-cloneable entries (such as overrides) work
    /// naturally. Registering a name that already exists replaces the
    /// previous builder.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use packio::{ByteOrder, Options, Width};
    ///
    /// Options::register_preset("word_be", || {
    ///     Options::new().with(Width(2)).with(ByteOrder::Big)
    /// });
    ///
    /// let options = Options::preset("word_be").unwrap();
    /// assert!(options.contains::<Width>());
    /// ```
    pub fn register_preset<F>(name: impl Into<String>, build: F)
    where
        F: Fn() -> Options + Send + Sync + 'static,
    {
        presets().write().insert(name.into(), Arc::new(build));
    }

    /// Builds the options registered under the given preset name, or
    /// `None` if no such preset exists.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        let build = presets().read().get(name).cloned();
        build.map(|build| build())
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("count", &self.entries.len())
            .finish_non_exhaustive()
    }
}

type PresetBuilder = Arc<dyn Fn() -> Options + Send + Sync>;

fn presets() -> &'static RwLock<FxHashMap<String, PresetBuilder>> {
    static PRESETS: LazyLock<RwLock<FxHashMap<String, PresetBuilder>>> =
        LazyLock::new(|| RwLock::new(FxHashMap::default()));

    &PRESETS
}

// =============================================================================
// Stock option types
// =============================================================================

/// Byte width for integer codecs.
///
/// The default width of an integer is its native size; `Width` narrows or
/// widens the encoded form. Packing a value that does not fit the
/// requested width is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Width(pub usize);

/// Byte order for multi-byte codecs. Defaults to little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Fixed on-wire size for string and byte-field codecs.
///
/// With `FixedLength(n)`, a string occupies exactly `n` bytes: shorter
/// values are padded with the [`Filler`] byte on write, and trailing
/// filler is trimmed on read. A value longer than `n` bytes is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLength(pub usize);

/// Padding byte used by [`FixedLength`] fields. Defaults to `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filler(pub u8);

/// Resolves the integer layout requested by the options.
pub(crate) fn int_layout(
    options: &Options,
    default_width: usize,
) -> (usize, ByteOrder) {
    let width = options.get::<Width>().map_or(default_width, |width| width.0);
    let order = options.get::<ByteOrder>().copied().unwrap_or_default();

    (width, order)
}

// =============================================================================
// Per-call codec overrides
// =============================================================================

/// A per-call replacement for a type's decode logic.
///
/// When an `Options` container holds a `DecodeOverride<T>`, the adapter
/// invokes the callable with the stream instead of dispatching to
/// `T`'s [`Unpack`](crate::Unpack) implementation.
///
/// # Example
///
/// ```ignore
/// use packio::{DecodeOverride, Options, RawStream};
///
/// // Decode a u32 from a single byte, whatever its codec would do.
/// let options = Options::new().with(DecodeOverride::new(
///     |stream: &mut dyn RawStream| {
///         Ok(u32::from(stream.read_exact_raw(1)?[0]))
///     },
/// ));
/// ```
pub struct DecodeOverride<T> {
    decode: Arc<dyn Fn(&mut dyn RawStream) -> io::Result<T> + Send + Sync>,
}

impl<T> DecodeOverride<T> {
    /// Wraps a callable that produces a `T` from the stream.
    pub fn new<F>(decode: F) -> Self
    where
        F: Fn(&mut dyn RawStream) -> io::Result<T> + Send + Sync + 'static,
    {
        Self { decode: Arc::new(decode) }
    }

    /// Invokes the override against the given stream.
    pub fn call(&self, stream: &mut dyn RawStream) -> io::Result<T> {
        (self.decode)(stream)
    }
}

impl<T> Clone for DecodeOverride<T> {
    fn clone(&self) -> Self { Self { decode: self.decode.clone() } }
}

impl<T> std::fmt::Debug for DecodeOverride<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeOverride").finish_non_exhaustive()
    }
}

/// A per-call replacement for a type's encode logic.
///
/// When an `Options` container holds an `EncodeOverride<T>`, the adapter
/// invokes the callable with the value and the stream instead of
/// dispatching to `T`'s [`Pack`](crate::Pack) implementation. The
/// callable reports the number of bytes it wrote.
pub struct EncodeOverride<T: ?Sized> {
    encode:
        Arc<dyn Fn(&T, &mut dyn RawStream) -> io::Result<u64> + Send + Sync>,
}

impl<T: ?Sized> EncodeOverride<T> {
    /// Wraps a callable that writes a `T` onto the stream.
    pub fn new<F>(encode: F) -> Self
    where
        F: Fn(&T, &mut dyn RawStream) -> io::Result<u64>
            + Send
            + Sync
            + 'static,
    {
        Self { encode: Arc::new(encode) }
    }

    /// Invokes the override against the given value and stream.
    pub fn call(
        &self,
        value: &T,
        stream: &mut dyn RawStream,
    ) -> io::Result<u64> {
        (self.encode)(value, stream)
    }
}

impl<T: ?Sized> Clone for EncodeOverride<T> {
    fn clone(&self) -> Self { Self { encode: self.encode.clone() } }
}

impl<T: ?Sized> std::fmt::Debug for EncodeOverride<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodeOverride").finish_non_exhaustive()
    }
}
