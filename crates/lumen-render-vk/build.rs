use std::error::Error;
use std::{env, fs, path::PathBuf};

// Procedural triangle: positions and colours indexed by gl_VertexIndex.
// Winding matches vertex::TRIANGLE (clockwise, y down).
const PROCEDURAL_VS: &str = r#"
#version 450
layout(location = 0) out vec3 vColor;

const vec2 POS[3] = vec2[](vec2(0.0, -0.5), vec2(0.5, 0.5), vec2(-0.5, 0.5));
const vec3 COL[3] = vec3[](vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0), vec3(0.0, 0.0, 1.0));

void main() {
    vColor = COL[gl_VertexIndex];
    gl_Position = vec4(POS[gl_VertexIndex], 0.0, 1.0);
}
"#;

// Matches Vertex: binding 0, location 0 pos, location 1 color.
const BUFFERED_VS: &str = r#"
#version 450
layout(location = 0) in vec3 inPos;
layout(location = 1) in vec3 inColor;

layout(location = 0) out vec3 vColor;

void main() {
    vColor = inColor;
    gl_Position = vec4(inPos, 1.0);
}
"#;

const TRI_FS: &str = r#"
#version 450
layout(location = 0) in vec3 vColor;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = vec4(vColor, 1.0);
}
"#;

fn main() -> Result<(), Box<dyn Error>> {
    let out = PathBuf::from(env::var("OUT_DIR")?);

    let comp = shaderc::Compiler::new().ok_or("shaderc compiler unavailable")?;
    let mut opts = shaderc::CompileOptions::new().ok_or("shaderc options unavailable")?;
    opts.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_0 as u32,
    );
    opts.set_optimization_level(shaderc::OptimizationLevel::Performance);

    let shaders = [
        (PROCEDURAL_VS, shaderc::ShaderKind::Vertex, "tri_procedural.vert"),
        (BUFFERED_VS, shaderc::ShaderKind::Vertex, "tri_buffered.vert"),
        (TRI_FS, shaderc::ShaderKind::Fragment, "tri.frag"),
    ];
    for (src, kind, name) in shaders {
        let spv = comp.compile_into_spirv(src, kind, name, "main", Some(&opts))?;
        fs::write(out.join(format!("{name}.spv")), spv.as_binary_u8())?;
    }

    // Inline sources live here.
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
