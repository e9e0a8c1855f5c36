// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Format-independent program IR.

A [`Program`] is a small SSA fragment program: a list of [`Instr`]s over [`Value`]s, plus the
outputs they store to.  It carries no format information; a code generator specializes it
against a [`crate::codegen::ShaderKey`].

Generation consumes its input, so a program that is reused across variants is kept as a
read-only template and each variant gets its own clone.  See [`Program::reload`].
*/

/// An SSA value produced by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value {
    index: u32,
    components: u8,
}

impl Value {
    pub fn index(self) -> u32 {
        self.index
    }
    /// Vector width, 1 through 4.
    pub fn components(self) -> u8 {
        self.components
    }
}

/// A subset of the four vector components, `x` in bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentMask(u8);

impl ComponentMask {
    pub const X: ComponentMask = ComponentMask(0b0001);
    pub const XY: ComponentMask = ComponentMask(0b0011);
    pub const XYZW: ComponentMask = ComponentMask(0b1111);

    /// Bits above `w` are discarded.
    pub const fn new(bits: u8) -> Self {
        ComponentMask(bits & 0b1111)
    }
    pub const fn bits(self) -> u8 {
        self.0
    }
    pub const fn count(self) -> u8 {
        self.0.count_ones() as u8
    }
    pub const fn contains(self, component: u8) -> bool {
        component < 4 && self.0 & (1 << component) != 0
    }
    /// Component indices in the mask, ascending.
    pub fn components(self) -> impl Iterator<Item = u8> {
        (0..4).filter(move |c| self.contains(*c))
    }
    /// True if every component below `width` is written.
    pub const fn covers(self, width: u8) -> bool {
        let full = (1u8 << width) - 1;
        self.0 & full == full
    }
}

/// Where an output is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputLocation {
    /// Colour attachment `n`.
    Data(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Output {
    pub location: OutputLocation,
    pub components: u8,
}

/// Coordinate domain of a texture instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    /// Unnormalized texel coordinates, no filtering.
    Rect,
    /// Normalized coordinates through a sampler.
    TwoD,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureOp {
    /// Plain sample, implicit level 0.
    Tex,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureInstr {
    pub dst: Value,
    pub op: TextureOp,
    pub dim: SamplerDim,
    pub coord: Value,
    /// Input binding slot.  The reload program uses the implicit binding 0.
    pub binding: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instr {
    /// Fragment position in window coordinates (4 components).
    LoadFragCoord { dst: Value },
    /// Select the components in `mask`, packed.
    Channels {
        dst: Value,
        src: Value,
        mask: ComponentMask,
    },
    Texture(TextureInstr),
    /// Write the components of `src` selected by `mask` to output `output`.
    StoreOutput {
        output: usize,
        src: Value,
        mask: ComponentMask,
    },
}

/// A fragment program.  Cheap to clone; clones are independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Program {
    name: String,
    internal: bool,
    outputs: Vec<Output>,
    body: Vec<Instr>,
}

impl Program {
    /// The reload program template.
    ///
    /// Reads the fragment position, keeps `xy` as a texel coordinate, samples the input
    /// attachment there with a rect sampler and writes all four components to colour output 0.
    /// The format of that attachment is not part of the program; it comes from the key at
    /// generation time.
    pub fn reload() -> Program {
        let mut b = Builder::fragment("reload");
        b.set_internal(true);
        let out = b.output(OutputLocation::Data(0), 4);

        let frag_coord = b.load_frag_coord();
        let coord = b.channels(frag_coord, ComponentMask::XY);
        let texel = b.texture(TextureOp::Tex, SamplerDim::Rect, coord, 0);
        b.store_output(out, texel, ComponentMask::XYZW);
        b.finish()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    /// Internal programs are driver-generated and never visible to applications.
    pub fn is_internal(&self) -> bool {
        self.internal
    }
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }
    pub fn body(&self) -> &[Instr] {
        &self.body
    }
}

/// Appends instructions to a [`Program`], allocating SSA values as it goes.
#[derive(Debug)]
pub struct Builder {
    program: Program,
    next_value: u32,
}

impl Builder {
    pub fn fragment(name: &str) -> Self {
        Builder {
            program: Program {
                name: name.to_string(),
                internal: false,
                outputs: Vec::new(),
                body: Vec::new(),
            },
            next_value: 0,
        }
    }

    pub fn set_internal(&mut self, internal: bool) {
        self.program.internal = internal;
    }

    /// Declares an output, returning its index for [`Builder::store_output`].
    pub fn output(&mut self, location: OutputLocation, components: u8) -> usize {
        debug_assert!((1..=4).contains(&components));
        self.program.outputs.push(Output {
            location,
            components,
        });
        self.program.outputs.len() - 1
    }

    fn value(&mut self, components: u8) -> Value {
        let value = Value {
            index: self.next_value,
            components,
        };
        self.next_value += 1;
        value
    }

    pub fn load_frag_coord(&mut self) -> Value {
        let dst = self.value(4);
        self.program.body.push(Instr::LoadFragCoord { dst });
        dst
    }

    pub fn channels(&mut self, src: Value, mask: ComponentMask) -> Value {
        debug_assert!(
            mask.components().all(|c| c < src.components),
            "mask selects components the source does not have"
        );
        let dst = self.value(mask.count());
        self.program.body.push(Instr::Channels { dst, src, mask });
        dst
    }

    /// Samples binding `binding` at `coord`, producing 4 components.
    pub fn texture(&mut self, op: TextureOp, dim: SamplerDim, coord: Value, binding: u32) -> Value {
        debug_assert_eq!(coord.components, 2, "only 2D coordinates are supported");
        let dst = self.value(4);
        self.program.body.push(Instr::Texture(TextureInstr {
            dst,
            op,
            dim,
            coord,
            binding,
        }));
        dst
    }

    pub fn store_output(&mut self, output: usize, src: Value, mask: ComponentMask) {
        debug_assert!(output < self.program.outputs.len(), "undeclared output");
        self.program
            .body
            .push(Instr::StoreOutput { output, src, mask });
    }

    pub fn finish(self) -> Program {
        self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reload_template_shape() {
        let program = Program::reload();
        assert_eq!(program.name(), "reload");
        assert!(program.is_internal());
        assert_eq!(
            program.outputs(),
            &[Output {
                location: OutputLocation::Data(0),
                components: 4
            }]
        );

        let body = program.body();
        assert_eq!(body.len(), 4);
        let Instr::LoadFragCoord { dst: frag_coord } = body[0] else {
            panic!("expected frag coord load, got {:?}", body[0]);
        };
        let Instr::Channels { dst: coord, src, mask } = body[1] else {
            panic!("expected channels, got {:?}", body[1]);
        };
        assert_eq!(src, frag_coord);
        assert_eq!(mask, ComponentMask::XY);
        assert_eq!(coord.components(), 2);
        let Instr::Texture(ref tex) = body[2] else {
            panic!("expected texture, got {:?}", body[2]);
        };
        assert_eq!(tex.coord, coord);
        assert_eq!(tex.dim, SamplerDim::Rect);
        assert_eq!(tex.op, TextureOp::Tex);
        assert_eq!(tex.binding, 0);
        assert_eq!(tex.dst.components(), 4);
        assert_eq!(
            body[3],
            Instr::StoreOutput {
                output: 0,
                src: tex.dst,
                mask: ComponentMask::XYZW
            }
        );
    }

    #[test]
    fn template_is_deterministic() {
        assert_eq!(Program::reload(), Program::reload());
    }

    #[test]
    fn clones_are_independent() {
        let template = Program::reload();
        let mut variant = template.clone();
        variant.body.clear();
        assert_eq!(template.body().len(), 4);
    }

    #[test]
    fn masks() {
        assert_eq!(ComponentMask::new(0xFF), ComponentMask::XYZW);
        assert_eq!(ComponentMask::XY.components().collect::<Vec<_>>(), vec![0, 1]);
        assert!(ComponentMask::XYZW.covers(4));
        assert!(ComponentMask::XY.covers(2));
        assert!(!ComponentMask::XY.covers(3));
        assert_eq!(ComponentMask::new(0b0101).count(), 2);
    }
}
