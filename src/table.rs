// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The reload program address table.
//!
//! Built once by [`crate::build_reload_table`], then never modified.  Lookups index a fixed
//! array, so they neither allocate nor lock and can run from any number of threads.

use crate::memory::DeviceAddress;
use crate::pixel_formats::{FormatKey, FormatSet, PixelFormat};

/// One placed reload program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReloadEntry {
    format: FormatKey,
    address: DeviceAddress,
    offset: usize,
    len: usize,
}

impl ReloadEntry {
    pub fn format(&self) -> FormatKey {
        self.format
    }
    pub fn address(&self) -> DeviceAddress {
        self.address
    }
    /// Offset of the program from the start of the program buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }
    /// Length of the program, without alignment padding.
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A lookup for a format the table was not built with.
///
/// Callers are expected to recover, e.g. by falling back to a generic path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no reload program was built for {0:?}")]
pub struct UnsupportedFormat(pub FormatKey);

/// Format → device address of its reload program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadTable {
    entries: [Option<ReloadEntry>; FormatKey::COUNT],
    formats: FormatSet,
    used: usize,
}

impl ReloadTable {
    pub fn lookup(&self, format: FormatKey) -> Result<DeviceAddress, UnsupportedFormat> {
        self.entry(format).map(ReloadEntry::address)
    }

    /// Typed form of [`ReloadTable::lookup`].
    pub fn lookup_for<F: PixelFormat>(&self) -> Result<DeviceAddress, UnsupportedFormat> {
        self.lookup(F::KEY)
    }

    pub fn entry(&self, format: FormatKey) -> Result<&ReloadEntry, UnsupportedFormat> {
        self.entries[format.index()]
            .as_ref()
            .ok_or(UnsupportedFormat(format))
    }

    /// The formats this table was built for.
    pub fn formats(&self) -> FormatSet {
        self.formats
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Bytes of the program buffer in use, including padding after the last program.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &ReloadEntry> {
        self.entries.iter().flatten()
    }
}

/// Accumulates entries during a build.  Only [`TableBuilder::freeze`] produces a table.
#[derive(Debug)]
pub(crate) struct TableBuilder {
    entries: [Option<ReloadEntry>; FormatKey::COUNT],
    formats: FormatSet,
}

impl TableBuilder {
    pub fn new(formats: FormatSet) -> Self {
        TableBuilder {
            entries: [None; FormatKey::COUNT],
            formats,
        }
    }

    pub fn record(&mut self, format: FormatKey, address: DeviceAddress, offset: usize, len: usize) {
        debug_assert!(self.formats.contains(format), "{format:?} is not being built");
        let slot = &mut self.entries[format.index()];
        debug_assert!(slot.is_none(), "{format:?} recorded twice");
        *slot = Some(ReloadEntry {
            format,
            address,
            offset,
            len,
        });
    }

    pub fn freeze(self, used: usize) -> ReloadTable {
        debug_assert!(
            self.formats.iter().all(|f| self.entries[f.index()].is_some()),
            "table frozen before every format was recorded"
        );
        ReloadTable {
            entries: self.entries,
            formats: self.formats,
            used,
        }
    }
}
