// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//at the moment the only GPU-backed program memory is wgpu

#[cfg(all(feature = "backend_wgpu", not(target_arch = "wasm32")))]
mod wgpu;

#[cfg(all(feature = "backend_wgpu", not(target_arch = "wasm32")))]
pub use self::wgpu::WgpuProgramMemory;
