// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The build pass: one reload program per format, packed into one buffer.

For each format in canonical order the template is cloned, specialized by key, generated, and
placed at the next aligned offset.  Either every format is placed and the table is returned,
or the pass fails and nothing is returned and nothing is published.
*/

use crate::arena::{Overflow, ProgramArena};
use crate::codegen::{CodeGenerator, ShaderKey};
use crate::ir::Program;
use crate::memory::ProgramMemory;
use crate::pixel_formats::{FormatKey, FormatSet};
use crate::table::{ReloadTable, TableBuilder};

/// Why a build pass failed.  Both kinds are fatal to the device being built.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The programs do not fit the buffer.  The buffer was sized for a known worst case, so
    /// this is a layout defect, not something to retry.
    #[error("reload program for {format:?} does not fit")]
    CapacityExceeded {
        format: FormatKey,
        #[source]
        source: Overflow,
    },
    #[error("code generation failed for {format:?}")]
    Generate {
        format: FormatKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BuildError {
    /// The format being built when the pass failed.
    pub fn format(&self) -> FormatKey {
        match self {
            BuildError::CapacityExceeded { format, .. } | BuildError::Generate { format, .. } => {
                *format
            }
        }
    }
}

/// Builds the reload table for `formats` into `memory`.
///
/// `memory` is borrowed exclusively for the pass; on success it has been published and holds
/// every program at the address recorded in the returned table.  Runs synchronously to
/// completion.
pub fn build_reload_table<G, M>(
    formats: FormatSet,
    template: &Program,
    generator: &mut G,
    memory: &mut M,
) -> Result<ReloadTable, BuildError>
where
    G: CodeGenerator + ?Sized,
    M: ProgramMemory + ?Sized,
{
    logwise::info_sync!(
        "building {count} reload programs into {capacity} bytes",
        count = formats.len(),
        capacity = memory.capacity()
    );

    let mut arena = ProgramArena::new(memory);
    let mut table = TableBuilder::new(formats);
    for format in formats {
        let key = ShaderKey::reload(format);
        //the clone is consumed by the generator and the binary is dropped at the end of
        //the iteration, so nothing accumulates across formats
        let binary = generator
            .generate(template.clone(), &key)
            .map_err(|e| BuildError::Generate {
                format,
                source: Box::new(e),
            })?;
        let placement = arena
            .place(binary.as_bytes())
            .map_err(|source| BuildError::CapacityExceeded { format, source })?;
        logwise::trace_sync!(
            "placed {key} at offset {offset} ({len} bytes)",
            key = logwise::privacy::LogIt(&format),
            offset = placement.offset(),
            len = placement.len()
        );
        table.record(format, placement.address(), placement.offset(), placement.len());
    }

    let used = arena.used();
    arena.publish();
    logwise::info_sync!("reload programs use {used} bytes", used = used);
    Ok(table.freeze(used))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::Binary;
    use crate::memory::{DeviceAddress, HostMemory};

    /// Emits `sizes[format]` bytes of `format.index()`, counting calls.
    struct SizedGenerator {
        sizes: [usize; FormatKey::COUNT],
        calls: Vec<FormatKey>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("refused")]
    struct Refused;

    impl CodeGenerator for SizedGenerator {
        type Error = Refused;
        fn generate(&mut self, program: Program, key: &ShaderKey) -> Result<Binary, Refused> {
            assert_eq!(program, Program::reload());
            let format = key.render_target(0).ok_or(Refused)?;
            self.calls.push(format);
            Ok(Binary::from(vec![format.index() as u8; self.sizes[format.index()]]))
        }
    }

    #[test]
    fn one_generation_per_format_in_canonical_order() {
        let mut generator = SizedGenerator {
            sizes: [16; FormatKey::COUNT],
            calls: Vec::new(),
        };
        let mut memory = HostMemory::new(4096, DeviceAddress::new(0x1000));
        let formats = FormatSet::empty()
            .with(FormatKey::RGBA32Float)
            .with(FormatKey::R16Float);
        let table =
            build_reload_table(formats, &Program::reload(), &mut generator, &mut memory).unwrap();
        assert_eq!(generator.calls, vec![FormatKey::R16Float, FormatKey::RGBA32Float]);
        assert_eq!(table.lookup(FormatKey::R16Float), Ok(DeviceAddress::new(0x1000)));
        assert_eq!(table.lookup(FormatKey::RGBA32Float), Ok(DeviceAddress::new(0x1080)));
        assert!(memory.is_published());
        assert_eq!(memory.contents()[0x80], FormatKey::RGBA32Float.index() as u8);
    }

    #[test]
    fn overflow_publishes_nothing() {
        let mut generator = SizedGenerator {
            sizes: [300; FormatKey::COUNT],
            calls: Vec::new(),
        };
        let mut memory = HostMemory::new(1024, DeviceAddress::default());
        let err = build_reload_table(
            FormatSet::all(),
            &Program::reload(),
            &mut generator,
            &mut memory,
        )
        .unwrap_err();
        //300 pads to 384: two fit in 1024, the third does not
        assert_eq!(err.format(), FormatKey::R32Float);
        let BuildError::CapacityExceeded { source, .. } = err else {
            panic!("expected capacity failure, got {err:?}");
        };
        assert_eq!(source.offset, 768);
        assert_eq!(generator.calls.len(), 3);
        assert!(!memory.is_published());
    }

    #[test]
    fn generator_failure_is_fatal() {
        struct Failing;
        impl CodeGenerator for Failing {
            type Error = Refused;
            fn generate(&mut self, _: Program, _: &ShaderKey) -> Result<Binary, Refused> {
                Err(Refused)
            }
        }
        let mut memory = HostMemory::new(4096, DeviceAddress::default());
        let err = build_reload_table(
            FormatSet::all(),
            &Program::reload(),
            &mut Failing,
            &mut memory,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Generate {
                format: FormatKey::R8UNorm,
                ..
            }
        ));
        assert_eq!(err.to_string(), "code generation failed for R8UNorm");
        assert!(!memory.is_published());
    }

    #[test]
    fn empty_set_builds_empty_table() {
        let mut generator = SizedGenerator {
            sizes: [16; FormatKey::COUNT],
            calls: Vec::new(),
        };
        let mut memory = HostMemory::new(128, DeviceAddress::default());
        let table = build_reload_table(
            FormatSet::empty(),
            &Program::reload(),
            &mut generator,
            &mut memory,
        )
        .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.used(), 0);
        assert!(generator.calls.is_empty());
    }
}
