// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The code generator seam.
//!
//! The packer does not know how programs become machine code.  It hands a [`CodeGenerator`]
//! one program clone and one [`ShaderKey`] per variant and places whatever bytes come back.

pub mod wgsl;

use crate::ir::Program;
use crate::pixel_formats::FormatKey;

pub use wgsl::{GenerateError, WgslGenerator};

/// Number of colour attachments a key can describe.
pub const MAX_RENDER_TARGETS: usize = 8;

/// Variant parameters a program is specialized against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderKey {
    /// Format of each colour attachment (and of the tile data a reload reads back).
    pub render_targets: [Option<FormatKey>; MAX_RENDER_TARGETS],
}

impl ShaderKey {
    /// Key for the reload program of `format`: attachment 0 only.
    pub fn reload(format: FormatKey) -> Self {
        let mut key = ShaderKey::default();
        key.render_targets[0] = Some(format);
        key
    }

    pub fn render_target(&self, index: usize) -> Option<FormatKey> {
        self.render_targets.get(index).copied().flatten()
    }
}

/// Generated machine code for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Binary {
    bytes: Vec<u8>,
}

impl Binary {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Binary { bytes }
    }
}

/// Turns a program and a key into a [`Binary`].
///
/// Implementations must be deterministic: the same program and key always produce the same
/// bytes.  Generation takes the program by value; callers that need it again clone first.
pub trait CodeGenerator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn generate(&mut self, program: Program, key: &ShaderKey) -> Result<Binary, Self::Error>;
}

impl<G: CodeGenerator + ?Sized> CodeGenerator for &mut G {
    type Error = G::Error;

    fn generate(&mut self, program: Program, key: &ShaderKey) -> Result<Binary, Self::Error> {
        (**self).generate(program, key)
    }
}
