// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Device handle owning the reload programs.
//!
//! A [`Device`] builds its reload table exactly once, in [`Device::new`], and is not handed
//! out until that build succeeds.  After that the table and the program buffer are read-only
//! and the handle can be cloned and shared freely.
use std::fmt::Formatter;
use std::sync::Arc;

use crate::arena::DEFAULT_CAPACITY;
use crate::codegen::{CodeGenerator, WgslGenerator};
use crate::ir::Program;
use crate::memory::{DeviceAddress, HostMemory, ProgramMemory};
use crate::pack::{BuildError, build_reload_table};
use crate::pixel_formats::{FormatKey, FormatSet, PixelFormat};
use crate::table::{ReloadTable, UnsupportedFormat};

/// Device construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Formats to build reload programs for.
    pub formats: FormatSet,
    pub debug_name: &'static str,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            formats: FormatSet::all(),
            debug_name: "reload device",
        }
    }
}

///platform-independent error type
#[derive(Debug)]
pub struct DeviceError(BuildError);

impl DeviceError {
    pub fn build_error(&self) -> &BuildError {
        &self.0
    }
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Owns the GPU resources; shared behind an `Arc` by every clone of the [`Device`].
#[derive(Debug)]
struct DeviceResources {
    memory: Box<dyn ProgramMemory>,
    reload: ReloadTable,
    debug_name: &'static str,
}

/// A device with its reload programs built.
///
/// Clones share the same underlying resources.
#[derive(Debug, Clone)]
pub struct Device {
    resources: Arc<DeviceResources>,
}

impl Device {
    /// Builds reload programs for `config.formats` into `memory` and returns the device.
    ///
    /// Fails if any program cannot be generated or the programs do not fit `memory`; in that
    /// case no device exists and `memory` is dropped unpublished.
    pub fn new<G: CodeGenerator + ?Sized>(
        config: DeviceConfig,
        mut memory: Box<dyn ProgramMemory>,
        generator: &mut G,
    ) -> Result<Self, DeviceError> {
        logwise::info_sync!(
            "Device::new() started for {name}",
            name = logwise::privacy::LogIt(&config.debug_name)
        );
        let template = Program::reload();
        let reload = build_reload_table(config.formats, &template, generator, &mut *memory)
            .map_err(|err| {
                logwise::error_sync!(
                    "{name}: reload program build failed: {err}",
                    name = logwise::privacy::LogIt(&config.debug_name),
                    err = logwise::privacy::LogIt(&err)
                );
                DeviceError(err)
            })?;
        logwise::info_sync!(
            "Device::new() completed for {name}",
            name = logwise::privacy::LogIt(&config.debug_name)
        );
        Ok(Device {
            resources: Arc::new(DeviceResources {
                memory,
                reload,
                debug_name: config.debug_name,
            }),
        })
    }

    /// A device whose programs live in host memory at address 0, generated as WGSL.
    pub fn host(config: DeviceConfig) -> Result<Self, DeviceError> {
        let memory = HostMemory::new(DEFAULT_CAPACITY, DeviceAddress::default());
        Device::new(config, Box::new(memory), &mut WgslGenerator)
    }

    /// Address of the reload program for `format`.
    ///
    /// This is the rendering fast path: it does not allocate, lock or log.
    pub fn reload_program(&self, format: FormatKey) -> Result<DeviceAddress, UnsupportedFormat> {
        self.resources.reload.lookup(format)
    }

    /// Typed form of [`Device::reload_program`].
    pub fn reload_program_for<F: PixelFormat>(&self) -> Result<DeviceAddress, UnsupportedFormat> {
        self.reload_program(F::KEY)
    }

    pub fn reload_table(&self) -> &ReloadTable {
        &self.resources.reload
    }

    /// The generated bytes of the reload program for `format`, as placed in program memory.
    pub fn program_bytes(&self, format: FormatKey) -> Result<&[u8], UnsupportedFormat> {
        let entry = self.resources.reload.entry(format).inspect_err(|_| {
            logwise::warn_sync!(
                "{name}: no reload program for {key}",
                name = logwise::privacy::LogIt(&self.resources.debug_name),
                key = logwise::privacy::LogIt(&format)
            );
        })?;
        Ok(&self.resources.memory.contents()[entry.offset()..entry.offset() + entry.len()])
    }

    /// The program buffer backing this device.
    pub fn memory(&self) -> &dyn ProgramMemory {
        &*self.resources.memory
    }

    pub fn debug_name(&self) -> &str {
        self.resources.debug_name
    }
}

// Boilerplate implementations

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        // Two Devices are equal if they share the same underlying resources.
        Arc::ptr_eq(&self.resources, &other.resources)
    }
}

impl Eq for Device {}

impl std::hash::Hash for Device {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.resources), state);
    }
}
