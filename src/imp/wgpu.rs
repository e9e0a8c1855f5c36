// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! wgpu-backed program memory.
//!
//! wgpu does not expose buffer device addresses, so addresses in this memory are offsets into
//! [`WgpuProgramMemory::buffer`] (the base is 0).  Writes go to a CPU mirror and reach the GPU
//! in one `write_buffer` upload when the build publishes, so the GPU never sees a partially
//! built buffer.
use crate::memory::{DeviceAddress, ProgramMemory};
use wgpu::{BufferDescriptor, BufferUsages, Label};

#[derive(Debug)]
pub struct WgpuProgramMemory {
    buffer: wgpu::Buffer,
    queue: wgpu::Queue,
    mirror: Box<[u8]>,
    capacity: usize,
    published: bool,
}

impl WgpuProgramMemory {
    /// Allocates a `capacity`-byte storage buffer on `device`.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, capacity: usize, debug_name: &str) -> Self {
        //write_buffer wants sizes in multiples of COPY_BUFFER_ALIGNMENT
        let padded = capacity.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize);
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Label::from(debug_name),
            size: padded as u64,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        logwise::info_sync!(
            "allocated {size} byte program buffer {name}",
            size = padded,
            name = logwise::privacy::LogIt(&debug_name)
        );
        WgpuProgramMemory {
            buffer,
            queue: queue.clone(),
            mirror: vec![0; padded].into_boxed_slice(),
            capacity,
            published: false,
        }
    }

    /// The GPU buffer holding the programs.  Offsets in it equal the table's addresses.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Whether the programs have been uploaded to [`WgpuProgramMemory::buffer`].
    pub fn is_published(&self) -> bool {
        self.published
    }
}

impl ProgramMemory for WgpuProgramMemory {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn device_base(&self) -> DeviceAddress {
        DeviceAddress::new(0)
    }

    fn contents(&self) -> &[u8] {
        &self.mirror[..self.capacity]
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        debug_assert!(!self.published, "write after publish");
        assert!(offset + bytes.len() <= self.capacity, "write past capacity");
        self.mirror[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn publish(&mut self) {
        self.queue.write_buffer(&self.buffer, 0, &self.mirror);
        self.queue.submit(std::iter::empty());
        self.published = true;
    }
}
