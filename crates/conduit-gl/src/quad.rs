//! Full-surface textured quad.

use bytemuck::{Pod, Zeroable};

pub const QUAD_VERTEX_SHADER: &str = r#"#version 330 core
layout(location = 0) in vec2 position;
layout(location = 1) in vec2 texCoord;
out vec2 vTexCoord;

void main() {
    gl_Position = vec4(position, 0.0, 1.0);
    vTexCoord = texCoord;
}
"#;

pub const QUAD_FRAGMENT_SHADER: &str = r#"#version 330 core
in vec2 vTexCoord;
out vec4 fragColor;
uniform sampler2D textureSampler;

void main() {
    fragColor = texture(textureSampler, vTexCoord);
}
"#;

/// Name of the sampler uniform, bound to texture unit 0.
pub const SAMPLER_UNIFORM: &str = "textureSampler";

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
}

/// Clip-space corners. Texture row 0 (the image's top row) maps to the top
/// edge of the surface.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, 1.0], tex_coord: [0.0, 0.0] },
    QuadVertex { position: [1.0, 1.0], tex_coord: [1.0, 0.0] },
    QuadVertex { position: [1.0, -1.0], tex_coord: [1.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0], tex_coord: [0.0, 1.0] },
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];
