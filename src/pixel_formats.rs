// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Pixel format keys for reload programs.
//!
//! Every device builds one reload program per format it supports. The formats form a
//! fixed, closed set: [`FormatKey`] names each member, and its declaration order is the
//! canonical order in which programs are generated and laid out. Changing that order
//! changes the layout of every device's program buffer, so new formats go at the end.
//!
//! # Available Formats
//!
//! ## Single Channel
//! - [`R8UNorm`] - 8-bit normalized unsigned integer (0-255 mapped to 0.0-1.0)
//! - [`R16Float`] - 16-bit half-precision float
//! - [`R32Float`] - 32-bit single-precision float
//! - [`R32SInt`] - 32-bit signed integer
//!
//! ## Multi-Channel
//! - [`RGFloat`] - 2-channel 32-bit float (8 bytes total)
//! - [`RGBA8UNorm`] - 4-channel 8-bit normalized (4 bytes total)
//! - [`RGBA8UnormSRGB`] - 4-channel 8-bit normalized with sRGB encoding
//! - [`BGRA8UNormSRGB`] - 4-channel 8-bit normalized with sRGB encoding (BGRA order)
//! - [`RGBA16Unorm`] - 4-channel 16-bit normalized (8 bytes total)
//! - [`RGBA32Float`] - 4-channel 32-bit float (16 bytes total)
//!
//! # Examples
//!
//! ```
//! use reload_programs::pixel_formats::{FormatKey, FormatSet, RGBA8UNorm, PixelFormat};
//!
//! let set = FormatSet::empty().with(FormatKey::R8UNorm).with(RGBA8UNorm::KEY);
//! assert_eq!(set.len(), 2);
//! assert!(set.contains(FormatKey::RGBA8UNorm));
//! ```

/*
Quick note on type design.  The zero-sized format types are what callers use when they know
the format statically (`device.reload_program_for::<R8UNorm>()`), while the packer and the
table need a runtime value they can iterate and index with.  So each type maps to exactly one
`FormatKey`, and everything below the public API works with keys.
 */

use crate::pixel_formats::sealed::Sealed;
use std::fmt::Debug;

/// The kind of value a shader reads when it samples a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    /// Normalized, float and half formats all sample as 32-bit floats.
    Float,
    /// Signed integer formats sample as 32-bit signed integers.
    Sint,
}

/// One member of the fixed set of formats a reload program can be built for.
///
/// `Ord` follows declaration order, which is the canonical generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FormatKey {
    R8UNorm,
    R16Float,
    R32Float,
    R32SInt,
    RGFloat,
    RGBA8UNorm,
    RGBA8UnormSRGB,
    BGRA8UNormSRGB,
    RGBA16Unorm,
    RGBA32Float,
}

impl FormatKey {
    /// Number of formats in the set.
    pub const COUNT: usize = 10;

    /// Every format, in canonical order.
    pub const ALL: [FormatKey; FormatKey::COUNT] = [
        FormatKey::R8UNorm,
        FormatKey::R16Float,
        FormatKey::R32Float,
        FormatKey::R32SInt,
        FormatKey::RGFloat,
        FormatKey::RGBA8UNorm,
        FormatKey::RGBA8UnormSRGB,
        FormatKey::BGRA8UNormSRGB,
        FormatKey::RGBA16Unorm,
        FormatKey::RGBA32Float,
    ];

    /// Position of this format in canonical order.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`FormatKey::index`].
    pub const fn from_index(index: usize) -> Option<FormatKey> {
        if index < FormatKey::COUNT {
            Some(FormatKey::ALL[index])
        } else {
            None
        }
    }

    pub const fn bytes_per_pixel(self) -> u8 {
        match self {
            FormatKey::R8UNorm => 1,
            FormatKey::R16Float => 2,
            FormatKey::R32Float | FormatKey::R32SInt => 4,
            FormatKey::RGFloat => 8,
            FormatKey::RGBA8UNorm | FormatKey::RGBA8UnormSRGB | FormatKey::BGRA8UNormSRGB => 4,
            FormatKey::RGBA16Unorm => 8,
            FormatKey::RGBA32Float => 16,
        }
    }

    pub const fn channels(self) -> u8 {
        match self {
            FormatKey::R8UNorm | FormatKey::R16Float | FormatKey::R32Float | FormatKey::R32SInt => 1,
            FormatKey::RGFloat => 2,
            _ => 4,
        }
    }

    pub const fn sample_kind(self) -> SampleKind {
        match self {
            FormatKey::R32SInt => SampleKind::Sint,
            _ => SampleKind::Float,
        }
    }

    pub const fn is_srgb(self) -> bool {
        matches!(self, FormatKey::RGBA8UnormSRGB | FormatKey::BGRA8UNormSRGB)
    }

    /// Short lowercase name, matching the WebGPU spelling of the format.
    pub const fn name(self) -> &'static str {
        match self {
            FormatKey::R8UNorm => "r8unorm",
            FormatKey::R16Float => "r16float",
            FormatKey::R32Float => "r32float",
            FormatKey::R32SInt => "r32sint",
            FormatKey::RGFloat => "rg32float",
            FormatKey::RGBA8UNorm => "rgba8unorm",
            FormatKey::RGBA8UnormSRGB => "rgba8unorm-srgb",
            FormatKey::BGRA8UNormSRGB => "bgra8unorm-srgb",
            FormatKey::RGBA16Unorm => "rgba16unorm",
            FormatKey::RGBA32Float => "rgba32float",
        }
    }
}

const _: () = assert!(FormatKey::COUNT <= u16::BITS as usize);

/// A subset of [`FormatKey`]s, iterated in canonical order.
///
/// This is the "format set" a device builds reload programs for.  It is `Copy` and
/// fixed once handed to a build.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatSet {
    bits: u16,
}

impl FormatSet {
    pub const fn empty() -> Self {
        FormatSet { bits: 0 }
    }

    /// Every format in [`FormatKey::ALL`].
    pub const fn all() -> Self {
        FormatSet {
            bits: ((1u32 << FormatKey::COUNT) - 1) as u16,
        }
    }

    #[must_use]
    pub const fn with(self, key: FormatKey) -> Self {
        FormatSet {
            bits: self.bits | (1 << key.index()),
        }
    }

    #[must_use]
    pub const fn without(self, key: FormatKey) -> Self {
        FormatSet {
            bits: self.bits & !(1 << key.index()),
        }
    }

    pub const fn contains(self, key: FormatKey) -> bool {
        self.bits & (1 << key.index()) != 0
    }

    pub const fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Members in canonical order.
    pub fn iter(self) -> Iter {
        Iter { bits: self.bits }
    }
}

impl Default for FormatSet {
    fn default() -> Self {
        FormatSet::all()
    }
}

impl Debug for FormatSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<FormatKey> for FormatSet {
    fn from(key: FormatKey) -> Self {
        FormatSet::empty().with(key)
    }
}

impl FromIterator<FormatKey> for FormatSet {
    fn from_iter<T: IntoIterator<Item = FormatKey>>(iter: T) -> Self {
        iter.into_iter().fold(FormatSet::empty(), FormatSet::with)
    }
}

impl IntoIterator for FormatSet {
    type Item = FormatKey;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

/// Iterator over a [`FormatSet`] in canonical order.
#[derive(Debug, Clone)]
pub struct Iter {
    bits: u16,
}

impl Iterator for Iter {
    type Item = FormatKey;

    fn next(&mut self) -> Option<FormatKey> {
        if self.bits == 0 {
            return None;
        }
        let index = self.bits.trailing_zeros() as usize;
        //clear the lowest set bit
        self.bits &= self.bits - 1;
        FormatKey::from_index(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.bits.count_ones() as usize;
        (len, Some(len))
    }
}

impl ExactSizeIterator for Iter {}

/// Sealed trait pattern for the format types below.
///
/// Only the formats defined in this crate can be used for typed lookups.
pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A zero-sized type standing for one [`FormatKey`].
///
/// This trait is sealed and cannot be implemented outside this crate.
pub trait PixelFormat: Sealed + Debug + Send + Sync + 'static {
    /// The runtime key for this format.
    const KEY: FormatKey;
    /// Number of bytes per pixel for this format.
    const BYTES_PER_PIXEL: u8 = Self::KEY.bytes_per_pixel();
}

macro_rules! pixel_format {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name;
        impl Sealed for $name {}
        impl PixelFormat for $name {
            const KEY: FormatKey = FormatKey::$name;
        }
    };
}

pixel_format!(
    /// 8-bit normalized unsigned integer format with a single red channel.
    R8UNorm
);
pixel_format!(
    /// 16-bit half-precision float format with a single red channel.
    R16Float
);
pixel_format!(
    /// 32-bit float format with a single red channel.
    R32Float
);
pixel_format!(
    /// 32-bit signed integer format with a single red channel.
    ///
    /// The only format whose reload program samples integers.
    R32SInt
);
pixel_format!(
    /// Two-channel 32-bit floating point format.
    RGFloat
);
pixel_format!(
    /// 8-bit normalized RGBA.
    RGBA8UNorm
);
pixel_format!(
    /// 8-bit normalized RGBA, sRGB encoded.
    RGBA8UnormSRGB
);
pixel_format!(
    /// 8-bit normalized BGRA, sRGB encoded.  Common swapchain format.
    BGRA8UNormSRGB
);
pixel_format!(
    /// 16-bit normalized RGBA.
    RGBA16Unorm
);
pixel_format!(
    /// 32-bit float RGBA.
    RGBA32Float
);
