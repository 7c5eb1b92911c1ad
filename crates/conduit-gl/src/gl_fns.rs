use std::ffi::{CString, c_void};

use anyhow::{Context, Result, bail};
use gl::types::{GLchar, GLenum, GLint, GLsizei, GLsizeiptr, GLuint};

use crate::api::{GlApi, GlGeometry, GlProgram, GlTexture};
use crate::quad::{QuadVertex, SAMPLER_UNIFORM};

/// [`GlApi`] over the global function pointers of the `gl` crate.
///
/// Construct it with [`GlFunctions::load_with`] once the host's context is
/// current; the pointers are process-wide afterwards.
#[derive(Debug)]
pub struct GlFunctions {
    _loaded: (),
}

impl GlFunctions {
    pub fn load_with(loader: impl FnMut(&'static str) -> *const c_void) -> Self {
        gl::load_with(loader);
        Self { _loaded: () }
    }
}

fn info_log(len: GLint, fetch: impl FnOnce(GLsizei, *mut GLchar)) -> String {
    let mut buf = vec![0u8; len.max(1) as usize];
    fetch(buf.len() as GLsizei, buf.as_mut_ptr().cast());
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).trim_end().to_owned()
}

fn compile_shader(kind: GLenum, source: &str) -> Result<GLuint> {
    let source = CString::new(source).context("shader source contains a NUL byte")?;

    unsafe {
        let shader = gl::CreateShader(kind);
        gl::ShaderSource(shader, 1, &source.as_ptr(), std::ptr::null());
        gl::CompileShader(shader);

        let mut status = 0;
        gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
        if status == gl::TRUE as GLint {
            return Ok(shader);
        }

        let mut len = 0;
        gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len);
        let log = info_log(len, |cap, buf| {
            gl::GetShaderInfoLog(shader, cap, std::ptr::null_mut(), buf)
        });
        gl::DeleteShader(shader);

        let stage = if kind == gl::VERTEX_SHADER { "vertex" } else { "fragment" };
        bail!("{stage} shader failed to compile: {log}")
    }
}

impl GlApi for GlFunctions {
    fn create_program(&mut self, vertex_src: &str, fragment_src: &str) -> Result<GlProgram> {
        let vs = compile_shader(gl::VERTEX_SHADER, vertex_src)?;
        let fs = match compile_shader(gl::FRAGMENT_SHADER, fragment_src) {
            Ok(fs) => fs,
            Err(err) => {
                unsafe { gl::DeleteShader(vs) };
                return Err(err);
            }
        };

        unsafe {
            let program = gl::CreateProgram();
            gl::AttachShader(program, vs);
            gl::AttachShader(program, fs);
            gl::LinkProgram(program);

            // Shaders are owned by the program once linked.
            gl::DetachShader(program, vs);
            gl::DetachShader(program, fs);
            gl::DeleteShader(vs);
            gl::DeleteShader(fs);

            let mut status = 0;
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
            if status != gl::TRUE as GLint {
                let mut len = 0;
                gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);
                let log = info_log(len, |cap, buf| {
                    gl::GetProgramInfoLog(program, cap, std::ptr::null_mut(), buf)
                });
                gl::DeleteProgram(program);
                bail!("program failed to link: {log}");
            }

            let sampler = CString::new(SAMPLER_UNIFORM).context("uniform name")?;
            gl::UseProgram(program);
            gl::Uniform1i(gl::GetUniformLocation(program, sampler.as_ptr()), 0);
            gl::UseProgram(0);

            Ok(GlProgram(program))
        }
    }

    fn delete_program(&mut self, program: GlProgram) {
        unsafe { gl::DeleteProgram(program.0) };
    }

    fn create_geometry(&mut self, vertices: &[QuadVertex], indices: &[u32]) -> Result<GlGeometry> {
        let index_count = GLint::try_from(indices.len()).context("too many indices")?;
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let stride = std::mem::size_of::<QuadVertex>() as GLsizei;

        unsafe {
            let mut vao = 0;
            let mut buffers = [0; 2];
            gl::GenVertexArrays(1, &mut vao);
            gl::GenBuffers(2, buffers.as_mut_ptr());
            let [vbo, ibo] = buffers;

            gl::BindVertexArray(vao);

            gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                vertex_bytes.len() as GLsizeiptr,
                vertex_bytes.as_ptr().cast(),
                gl::STATIC_DRAW,
            );

            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, ibo);
            gl::BufferData(
                gl::ELEMENT_ARRAY_BUFFER,
                index_bytes.len() as GLsizeiptr,
                index_bytes.as_ptr().cast(),
                gl::STATIC_DRAW,
            );

            gl::EnableVertexAttribArray(0);
            gl::VertexAttribPointer(0, 2, gl::FLOAT, gl::FALSE, stride, std::ptr::null());
            gl::EnableVertexAttribArray(1);
            gl::VertexAttribPointer(
                1,
                2,
                gl::FLOAT,
                gl::FALSE,
                stride,
                std::mem::offset_of!(QuadVertex, tex_coord) as *const c_void,
            );

            gl::BindVertexArray(0);
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);

            Ok(GlGeometry {
                vao,
                vbo,
                ibo,
                index_count,
            })
        }
    }

    fn delete_geometry(&mut self, geometry: GlGeometry) {
        unsafe {
            gl::DeleteVertexArrays(1, &geometry.vao);
            gl::DeleteBuffers(2, [geometry.vbo, geometry.ibo].as_ptr());
        }
    }

    fn create_texture(&mut self) -> GlTexture {
        let mut id = 0;
        unsafe {
            gl::GenTextures(1, &mut id);
            gl::BindTexture(gl::TEXTURE_2D, id);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as GLint);
            gl::BindTexture(gl::TEXTURE_2D, 0);
        }
        GlTexture(id)
    }

    fn upload_rgba(&mut self, texture: GlTexture, width: u32, height: u32, pixels: &[u8], reallocate: bool) {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        let (w, h) = (width as GLsizei, height as GLsizei);

        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, texture.0);
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
            if reallocate {
                gl::TexImage2D(
                    gl::TEXTURE_2D,
                    0,
                    gl::RGBA8 as GLint,
                    w,
                    h,
                    0,
                    gl::RGBA,
                    gl::UNSIGNED_BYTE,
                    pixels.as_ptr().cast(),
                );
            } else {
                gl::TexSubImage2D(
                    gl::TEXTURE_2D,
                    0,
                    0,
                    0,
                    w,
                    h,
                    gl::RGBA,
                    gl::UNSIGNED_BYTE,
                    pixels.as_ptr().cast(),
                );
            }
            gl::BindTexture(gl::TEXTURE_2D, 0);
        }
    }

    fn delete_texture(&mut self, texture: GlTexture) {
        unsafe { gl::DeleteTextures(1, &texture.0) };
    }

    fn viewport(&mut self, width: u32, height: u32) {
        unsafe { gl::Viewport(0, 0, width as GLsizei, height as GLsizei) };
    }

    fn clear(&mut self, [r, g, b, a]: [f32; 4]) {
        unsafe {
            gl::ClearColor(r, g, b, a);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }
    }

    fn draw(&mut self, program: GlProgram, geometry: &GlGeometry, texture: GlTexture) {
        unsafe {
            gl::UseProgram(program.0);
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, texture.0);
            gl::BindVertexArray(geometry.vao);
            gl::DrawElements(
                gl::TRIANGLES,
                geometry.index_count,
                gl::UNSIGNED_INT,
                std::ptr::null(),
            );
            gl::BindVertexArray(0);
            gl::BindTexture(gl::TEXTURE_2D, 0);
            gl::UseProgram(0);
        }
    }
}
