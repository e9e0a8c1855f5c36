// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! GPU-visible program memory.
//!
//! Programs live in one fixed-size region that the CPU writes and the GPU executes from.
//! [`ProgramMemory`] is what the packer needs from whoever allocated that region; the region
//! itself belongs to the device.

use std::fmt::{Debug, Display, Formatter};

/// An address in the GPU's view of memory.
///
/// Distinct from any CPU pointer into the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DeviceAddress(u64);

impl DeviceAddress {
    pub const fn new(address: u64) -> Self {
        DeviceAddress(address)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The address `bytes` past this one, or `None` if that is not a valid `u64` address.
    pub const fn checked_offset(self, bytes: usize) -> Option<Self> {
        match self.0.checked_add(bytes as u64) {
            Some(address) => Some(DeviceAddress(address)),
            None => None,
        }
    }
}

impl Display for DeviceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl std::fmt::LowerHex for DeviceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

/// A fixed-capacity region addressable by both the CPU and the GPU.
///
/// Implementations never grow or move the region.  Writes are only made through the packer's
/// arena, which guarantees `offset + bytes.len() <= capacity()`.
///
/// Nothing written is visible to the GPU before [`ProgramMemory::publish`].
pub trait ProgramMemory: Debug + Send + Sync {
    /// Size of the region in bytes.
    fn capacity(&self) -> usize;

    /// GPU address of byte 0.
    fn device_base(&self) -> DeviceAddress;

    /// CPU-visible contents, `capacity()` bytes long.
    fn contents(&self) -> &[u8];

    /// Copies `bytes` into the region at `offset`.
    ///
    /// # Panics
    /// If the range is outside the region.
    fn write(&mut self, offset: usize, bytes: &[u8]);

    /// Makes everything written so far visible to the GPU.  Called once, after the last write.
    fn publish(&mut self);
}

/// [`ProgramMemory`] backed by ordinary host memory.
///
/// Used when the "device" is the CPU itself, and in tests.  The base address is whatever the
/// caller says it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMemory {
    bytes: Box<[u8]>,
    base: DeviceAddress,
    published: bool,
}

impl HostMemory {
    pub fn new(capacity: usize, base: DeviceAddress) -> Self {
        HostMemory {
            bytes: vec![0; capacity].into_boxed_slice(),
            base,
            published: false,
        }
    }

    pub fn is_published(&self) -> bool {
        self.published
    }
}

impl ProgramMemory for HostMemory {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn device_base(&self) -> DeviceAddress {
        self.base
    }

    fn contents(&self) -> &[u8] {
        &self.bytes
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        debug_assert!(!self.published, "write after publish");
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn publish(&mut self) {
        self.published = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_formatting() {
        let address = DeviceAddress::new(0x1000).checked_offset(0x80).unwrap();
        assert_eq!(address.get(), 0x1080);
        assert_eq!(address.to_string(), "0x1080");
        assert_eq!(format!("{address:x}"), "1080");
    }

    #[test]
    fn host_memory_writes_in_place() {
        let mut memory = HostMemory::new(16, DeviceAddress::new(0x40));
        memory.write(4, &[1, 2, 3]);
        assert_eq!(&memory.contents()[..8], &[0, 0, 0, 0, 1, 2, 3, 0]);
        assert_eq!(memory.capacity(), 16);
        assert_eq!(memory.device_base(), DeviceAddress::new(0x40));
        assert!(!memory.is_published());
        memory.publish();
        assert!(memory.is_published());
    }

    #[test]
    #[should_panic]
    fn host_memory_rejects_out_of_range_writes() {
        let mut memory = HostMemory::new(8, DeviceAddress::default());
        memory.write(6, &[0; 4]);
    }
}
