/*! reload_programs builds the per-format reload programs a tile-based GPU driver needs, and
  packs them into one GPU-visible buffer.

A *reload program* is a tiny internal fragment program that reads a pixel back out of an
attachment and writes it to the colour output, for example to restore tile memory at the
start of a render pass.  The arithmetic is the same for every pixel format, but the generated
code is not, so a device builds one program per format it supports.

# The build pass

Once per device:

1. [`ir::Program::reload`] builds one format-independent template.
2. For each [`pixel_formats::FormatKey`] in the device's [`pixel_formats::FormatSet`], in
   canonical order, a clone of the template goes to a [`codegen::CodeGenerator`] together with a
   [`codegen::ShaderKey`] naming the format.
3. The resulting bytes are bump-placed into [`memory::ProgramMemory`] on
   [`PROGRAM_ALIGNMENT`]-byte boundaries.
4. The device address of each program is recorded in a [`table::ReloadTable`].

The buffer has a fixed capacity sized for the worst case.  Running out of space is a fatal
[`BuildError`]; no device is created from a partial table.

```
use reload_programs::{Device, DeviceConfig};
use reload_programs::pixel_formats::FormatKey;

let device = Device::host(DeviceConfig::default()).unwrap();
let address = device.reload_program(FormatKey::RGBA8UNorm).unwrap();
assert_eq!(address.get() % 128, 0);
```

# Backends

Program memory is a trait.  [`memory::HostMemory`] keeps programs in ordinary memory; with the
`backend_wgpu` feature (default), `WgpuProgramMemory` keeps them in a wgpu storage buffer.
*/

pub mod pixel_formats;
pub mod ir;
pub mod codegen;
pub mod memory;
pub mod table;
mod arena;
mod pack;
mod device;
mod imp;

pub use arena::{DEFAULT_CAPACITY, Overflow, PROGRAM_ALIGNMENT, aligned_len, packed_len};
pub use device::{Device, DeviceConfig, DeviceError};
pub use pack::{BuildError, build_reload_table};

#[cfg(all(feature = "backend_wgpu", not(target_arch = "wasm32")))]
pub use imp::WgpuProgramMemory;
