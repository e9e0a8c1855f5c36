// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A [`CodeGenerator`] that lowers programs to WGSL source.

The "binary" is the UTF-8 text of one fragment entry point.  Output is a pure function of the
program and the key, so packing it is reproducible.

Bindings: texture slot `n` is `@group(0) @binding(n)`, and the sampler for a normalized
sample of slot `n` is `@group(1) @binding(n)`.
*/

use crate::codegen::{Binary, CodeGenerator, ShaderKey};
use crate::ir::{ComponentMask, Instr, OutputLocation, Program, SamplerDim, Value};
use crate::pixel_formats::{FormatKey, SampleKind};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("shader key has no format for render target {0}")]
    MissingFormat(usize),
    #[error("{format:?} cannot be sampled through a filtering sampler")]
    UnfilterableSample { format: FormatKey },
    #[error("expected exactly one output, program declares {0}")]
    UnsupportedOutputs(usize),
    #[error("{0:?} is not a valid entry point name")]
    InvalidName(String),
    #[error("value v{value} has no component {component}")]
    MissingComponent { value: u32, component: u8 },
}

/// Lowers [`Program`]s to WGSL.
#[derive(Debug, Clone, Copy, Default)]
pub struct WgslGenerator;

impl CodeGenerator for WgslGenerator {
    type Error = GenerateError;

    fn generate(&mut self, program: Program, key: &ShaderKey) -> Result<Binary, GenerateError> {
        let [output] = program.outputs() else {
            return Err(GenerateError::UnsupportedOutputs(program.outputs().len()));
        };
        let OutputLocation::Data(slot) = output.location;
        let format = key
            .render_target(slot as usize)
            .ok_or(GenerateError::MissingFormat(slot as usize))?;
        if !is_identifier(program.name()) {
            return Err(GenerateError::InvalidName(program.name().to_string()));
        }
        let scalar = scalar_type(format.sample_kind());
        let out_type = value_type(scalar, output.components);

        //binding -> needs a sampler
        let mut bindings = BTreeMap::new();
        for instr in program.body() {
            if let Instr::Texture(tex) = instr {
                let filtered = tex.dim == SamplerDim::TwoD;
                if filtered && format.sample_kind() == SampleKind::Sint {
                    return Err(GenerateError::UnfilterableSample { format });
                }
                *bindings.entry(tex.binding).or_insert(false) |= filtered;
            }
        }

        let mut src = String::new();
        src.push_str(&format!("// {} {}", program.name(), format.name()));
        if program.is_internal() {
            src.push_str(" (internal)");
        }
        src.push('\n');
        for (binding, filtered) in &bindings {
            src.push_str(&format!(
                "@group(0) @binding({binding}) var input{binding}: texture_2d<{scalar}>;\n"
            ));
            if *filtered {
                src.push_str(&format!(
                    "@group(1) @binding({binding}) var sampler{binding}: sampler;\n"
                ));
            }
        }
        src.push_str("\n@fragment\n");
        src.push_str(&format!(
            "fn {}(@builtin(position) frag_coord: vec4<f32>) -> @location({slot}) {out_type} {{\n",
            program.name()
        ));
        src.push_str(&format!("    var out0: {out_type};\n"));

        for instr in program.body() {
            match instr {
                Instr::LoadFragCoord { dst } => {
                    src.push_str(&format!("    let v{} = frag_coord;\n", dst.index()));
                }
                Instr::Channels { dst, src: from, mask } => {
                    missing_component(*from, mask.components())?;
                    src.push_str(&format!(
                        "    let v{} = v{}.{};\n",
                        dst.index(),
                        from.index(),
                        swizzle(*mask)
                    ));
                }
                Instr::Texture(tex) => {
                    let line = match tex.dim {
                        SamplerDim::Rect => format!(
                            "    let v{} = textureLoad(input{}, vec2<i32>(v{}), 0);\n",
                            tex.dst.index(),
                            tex.binding,
                            tex.coord.index()
                        ),
                        SamplerDim::TwoD => format!(
                            "    let v{} = textureSampleLevel(input{b}, sampler{b}, v{}, 0.0);\n",
                            tex.dst.index(),
                            tex.coord.index(),
                            b = tex.binding
                        ),
                    };
                    src.push_str(&line);
                }
                Instr::StoreOutput {
                    output: index,
                    src: value,
                    mask,
                } => {
                    store(&mut src, *index, output.components, *value, *mask)?;
                }
            }
        }

        src.push_str("    return out0;\n}\n");
        Ok(Binary::from(src.into_bytes()))
    }
}

fn missing_component(
    value: Value,
    mut components: impl Iterator<Item = u8>,
) -> Result<(), GenerateError> {
    match components.find(|c| *c >= value.components()) {
        Some(component) => Err(GenerateError::MissingComponent {
            value: value.index(),
            component,
        }),
        None => Ok(()),
    }
}

fn store(
    src: &mut String,
    output: usize,
    width: u8,
    value: Value,
    mask: ComponentMask,
) -> Result<(), GenerateError> {
    if mask.covers(width) && value.components() == width {
        src.push_str(&format!("    out{output} = v{};\n", value.index()));
        return Ok(());
    }
    //scalars broadcast to every written component
    if value.components() > 1 {
        missing_component(value, mask.components().filter(|c| *c < width))?;
    }
    for component in mask.components().filter(|c| *c < width) {
        let lane = component_name(component);
        let source = if value.components() == 1 {
            format!("v{}", value.index())
        } else {
            format!("v{}.{lane}", value.index())
        };
        if width == 1 {
            src.push_str(&format!("    out{output} = {source};\n"));
        } else {
            src.push_str(&format!("    out{output}.{lane} = {source};\n"));
        }
    }
    Ok(())
}

fn scalar_type(kind: SampleKind) -> &'static str {
    match kind {
        SampleKind::Float => "f32",
        SampleKind::Sint => "i32",
    }
}

fn value_type(scalar: &str, components: u8) -> String {
    match components {
        1 => scalar.to_string(),
        n => format!("vec{n}<{scalar}>"),
    }
}

fn component_name(component: u8) -> char {
    ['x', 'y', 'z', 'w'][component as usize]
}

fn swizzle(mask: ComponentMask) -> String {
    mask.components().map(component_name).collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name != "_" && !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
