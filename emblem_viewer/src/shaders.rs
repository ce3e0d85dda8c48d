use bytemuck::{Pod, Zeroable};

pub(crate) const PARTICLE_SHADER_SOURCE: &str = r#"
struct Uniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    model: mat4x4<f32>,
    color: vec4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexIn {
    @location(0) corner: vec2<f32>,
    @location(1) center: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) local_pos: vec2<f32>,
};

@vertex
fn vs_main(input: VertexIn) -> VertexOutput {
    let world = uniforms.model * vec4<f32>(input.center, 1.0);
    var eye = uniforms.view * world;
    // Offsetting in eye space keeps sprites camera-facing and shrinks them with distance.
    let size = uniforms.params.x;
    eye = vec4<f32>(eye.xy + input.corner * size, eye.z, eye.w);
    var out: VertexOutput;
    out.position = uniforms.proj * eye;
    out.local_pos = input.corner * 2.0;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let radius = length(input.local_pos);
    let falloff = 1.0 - smoothstep(0.75, 1.0, radius);
    if falloff <= 0.0 {
        discard;
    }
    return vec4<f32>(uniforms.color.rgb, uniforms.color.a * falloff);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct CornerVertex {
    pub corner: [f32; 2],
}

/// Two triangles spanning a unit sprite centered on the particle.
pub(crate) const SPRITE_CORNERS: [CornerVertex; 6] = [
    CornerVertex {
        corner: [-0.5, -0.5],
    },
    CornerVertex {
        corner: [0.5, -0.5],
    },
    CornerVertex {
        corner: [-0.5, 0.5],
    },
    CornerVertex {
        corner: [-0.5, 0.5],
    },
    CornerVertex {
        corner: [0.5, -0.5],
    },
    CornerVertex {
        corner: [0.5, 0.5],
    },
];

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct ParticleUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// rgb + opacity
    pub color: [f32; 4],
    /// x = point size, rest unused
    pub params: [f32; 4],
}
