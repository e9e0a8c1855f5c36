// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Bump placement into [`ProgramMemory`].

Every program starts on a [`PROGRAM_ALIGNMENT`] boundary because the GPU fetches code from
aligned addresses.  Space is never reused.  The capacity check lives in
[`ProgramArena::reserve`] and nowhere else.
*/

use crate::memory::{DeviceAddress, ProgramMemory};

/// Required alignment of every program's start, in bytes.
pub const PROGRAM_ALIGNMENT: usize = 128;

/// Program buffer size a device allocates unless told otherwise.
pub const DEFAULT_CAPACITY: usize = 4096;

/// `len` rounded up to [`PROGRAM_ALIGNMENT`].
pub const fn aligned_len(len: usize) -> usize {
    len.next_multiple_of(PROGRAM_ALIGNMENT)
}

/// Bytes needed to place `count` programs of at most `max_len` bytes each.
///
/// For callers that know their worst case statically:
///
/// ```
/// use reload_programs::{packed_len, DEFAULT_CAPACITY};
/// const _: () = assert!(packed_len(10, 384) <= DEFAULT_CAPACITY);
/// ```
pub const fn packed_len(count: usize, max_len: usize) -> usize {
    count * aligned_len(max_len)
}

/// Where a program landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    offset: usize,
    len: usize,
    address: DeviceAddress,
}

impl Placement {
    /// Byte offset from the start of the region.  Always aligned.
    pub fn offset(&self) -> usize {
        self.offset
    }
    /// Unpadded length.
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn address(&self) -> DeviceAddress {
        self.address
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("placing {len} bytes at offset {offset} overflows the {capacity}-byte program buffer")]
pub struct Overflow {
    pub offset: usize,
    pub len: usize,
    pub capacity: usize,
}

/// Exclusive cursor over a [`ProgramMemory`] for the length of one build.
pub(crate) struct ProgramArena<'m, M: ProgramMemory + ?Sized> {
    memory: &'m mut M,
    cursor: usize,
}

impl<'m, M: ProgramMemory + ?Sized> ProgramArena<'m, M> {
    pub fn new(memory: &'m mut M) -> Self {
        ProgramArena { memory, cursor: 0 }
    }

    /// Claims the next aligned slot of `len` bytes.
    ///
    /// The whole padded slot must fit, and the slot must start inside the region even when
    /// `len` is zero, so every address handed out is contained.  With a capacity that is not a
    /// multiple of [`PROGRAM_ALIGNMENT`] the tail past the last full slot is never used.
    /// The padded slot must also be addressable from the memory's base without wrapping.
    pub fn reserve(&mut self, len: usize) -> Result<Placement, Overflow> {
        let capacity = self.memory.capacity();
        let overflow = Overflow {
            offset: self.cursor,
            len,
            capacity,
        };
        let end = self
            .cursor
            .checked_add(len)
            .and_then(|end| end.checked_next_multiple_of(PROGRAM_ALIGNMENT))
            .ok_or(overflow)?;
        if end > capacity || self.cursor >= capacity {
            return Err(overflow);
        }
        let base = self.memory.device_base();
        if base.checked_offset(end.saturating_sub(1)).is_none() {
            return Err(overflow);
        }
        let address = base.checked_offset(self.cursor).ok_or(overflow)?;
        let placement = Placement {
            offset: self.cursor,
            len,
            address,
        };
        self.cursor = end;
        Ok(placement)
    }

    /// Reserves a slot for `bytes` and copies them in.
    pub fn place(&mut self, bytes: &[u8]) -> Result<Placement, Overflow> {
        let placement = self.reserve(bytes.len())?;
        self.memory.write(placement.offset, bytes);
        Ok(placement)
    }

    /// Bytes consumed so far, padding included.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Ends the build, making the written programs visible to the GPU.
    pub fn publish(self) {
        self.memory.publish();
    }
}
