// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Every generated reload program must be WGSL that naga accepts.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use reload_programs::codegen::{CodeGenerator, ShaderKey, WgslGenerator};
use reload_programs::ir::{Builder, ComponentMask, OutputLocation, Program, SamplerDim, TextureOp};
use reload_programs::pixel_formats::FormatKey;
use reload_programs::{Device, DeviceConfig};

fn validate(name: &str, source: &str) {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(e) => panic!("{name}: {}\n{source}", e.emit_to_string(source)),
    };
    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    if let Err(e) = validator.validate(&module) {
        panic!("{name}: {e:?}\n{source}");
    }
    assert_eq!(module.entry_points.len(), 1, "{name}");
    assert_eq!(module.entry_points[0].stage, naga::ShaderStage::Fragment, "{name}");
}

#[test]
fn packed_reload_programs_validate() {
    let device = Device::host(DeviceConfig::default()).unwrap();
    for format in FormatKey::ALL {
        let bytes = device.program_bytes(format).unwrap();
        let source = std::str::from_utf8(bytes).unwrap();
        validate(format.name(), source);
    }
}

#[test]
fn filtered_and_partial_variants_validate() {
    let mut b = Builder::fragment("resolve");
    let out = b.output(OutputLocation::Data(0), 4);
    let frag_coord = b.load_frag_coord();
    let coord = b.channels(frag_coord, ComponentMask::XY);
    let texel = b.texture(TextureOp::Tex, SamplerDim::TwoD, coord, 1);
    b.store_output(out, texel, ComponentMask::XY);
    let program: Program = b.finish();

    for format in [FormatKey::RGBA8UnormSRGB, FormatKey::R16Float, FormatKey::RGBA32Float] {
        let binary = WgslGenerator
            .generate(program.clone(), &ShaderKey::reload(format))
            .unwrap();
        let source = std::str::from_utf8(binary.as_bytes()).unwrap();
        validate(format.name(), source);
    }
}
