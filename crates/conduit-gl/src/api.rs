use anyhow::Result;

use crate::quad::QuadVertex;

/// GL texture name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GlTexture(pub u32);

/// Linked GL program name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GlProgram(pub u32);

/// Vertex array plus its vertex and index buffers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlGeometry {
    pub vao: u32,
    pub vbo: u32,
    pub ibo: u32,
    pub index_count: i32,
}

/// The slice of OpenGL the bridge uses.
///
/// Every call must happen on the thread whose GL context is current.
pub trait GlApi {
    /// Compiles and links a vertex + fragment program.
    ///
    /// The error carries the compile or link info log.
    fn create_program(&mut self, vertex_src: &str, fragment_src: &str) -> Result<GlProgram>;
    fn delete_program(&mut self, program: GlProgram);

    /// Uploads an indexed quad and wires its attributes (location 0:
    /// position, location 1: texture coordinate).
    fn create_geometry(&mut self, vertices: &[QuadVertex], indices: &[u32]) -> Result<GlGeometry>;
    fn delete_geometry(&mut self, geometry: GlGeometry);

    /// Creates an empty RGBA texture with linear filtering and edge clamping.
    fn create_texture(&mut self) -> GlTexture;

    /// Uploads tightly packed RGBA8 rows, top row first.
    ///
    /// `reallocate` selects a full `TexImage2D` (size changed) over an
    /// in-place `TexSubImage2D`.
    fn upload_rgba(&mut self, texture: GlTexture, width: u32, height: u32, pixels: &[u8], reallocate: bool);
    fn delete_texture(&mut self, texture: GlTexture);

    fn viewport(&mut self, width: u32, height: u32);
    fn clear(&mut self, color: [f32; 4]);

    /// Draws `geometry` with `program`, sampling `texture` on unit 0.
    fn draw(&mut self, program: GlProgram, geometry: &GlGeometry, texture: GlTexture);
}
