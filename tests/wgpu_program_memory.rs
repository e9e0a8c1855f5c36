// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Reload programs in a wgpu buffer, on wgpu's noop adapter so no GPU is needed.

#![cfg(all(feature = "backend_wgpu", not(target_arch = "wasm32")))]

use reload_programs::codegen::WgslGenerator;
use reload_programs::ir::Program;
use reload_programs::memory::{DeviceAddress, ProgramMemory};
use reload_programs::pixel_formats::{FormatKey, FormatSet};
use reload_programs::{
    BuildError, DEFAULT_CAPACITY, Device, DeviceConfig, PROGRAM_ALIGNMENT, WgpuProgramMemory,
    build_reload_table,
};

fn noop_device() -> (wgpu::Device, wgpu::Queue) {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::NOOP,
        backend_options: wgpu::BackendOptions {
            noop: wgpu::NoopBackendOptions { enable: true },
            ..Default::default()
        },
        ..Default::default()
    });
    let adapter = test_executors::spin_on(
        instance.request_adapter(&wgpu::RequestAdapterOptions::default()),
    )
    .expect("noop adapter");
    test_executors::spin_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))
        .expect("noop device")
}

#[test]
fn addresses_are_buffer_offsets() {
    let (device, queue) = noop_device();
    //not a multiple of COPY_BUFFER_ALIGNMENT
    let capacity = 4094;
    let mut memory = WgpuProgramMemory::new(&device, &queue, capacity, "reload programs");
    assert_eq!(memory.capacity(), capacity);
    assert_eq!(memory.contents().len(), capacity);
    assert_eq!(memory.buffer().size(), 4096);
    assert_eq!(memory.device_base(), DeviceAddress::new(0));

    let table = build_reload_table(
        FormatSet::all(),
        &Program::reload(),
        &mut WgslGenerator,
        &mut memory,
    )
    .unwrap();
    assert!(memory.is_published());
    for entry in table.iter() {
        assert_eq!(entry.address().get(), entry.offset() as u64);
        assert_eq!(entry.offset() % PROGRAM_ALIGNMENT, 0);
        let bytes = &memory.contents()[entry.offset()..entry.offset() + entry.len()];
        let text = std::str::from_utf8(bytes).unwrap();
        assert!(text.starts_with(&format!("// reload {} (internal)", entry.format().name())));
    }
}

#[test]
fn failed_build_is_never_uploaded() {
    let (device, queue) = noop_device();
    let mut memory = WgpuProgramMemory::new(&device, &queue, 1000, "too small");
    let err = build_reload_table(
        FormatSet::all(),
        &Program::reload(),
        &mut WgslGenerator,
        &mut memory,
    )
    .unwrap_err();
    assert!(matches!(err, BuildError::CapacityExceeded { .. }));
    assert!(!memory.is_published());
}

#[test]
fn device_over_wgpu_memory() {
    let (device, queue) = noop_device();
    let memory = WgpuProgramMemory::new(&device, &queue, DEFAULT_CAPACITY, "reload programs");
    let reload = Device::new(DeviceConfig::default(), Box::new(memory), &mut WgslGenerator).unwrap();
    let entry = reload.reload_table().entry(FormatKey::RGBA32Float).unwrap();
    assert_eq!(
        reload.reload_program(FormatKey::RGBA32Float),
        Ok(DeviceAddress::new(entry.offset() as u64))
    );
    assert_eq!(reload.memory().capacity(), DEFAULT_CAPACITY);
}
