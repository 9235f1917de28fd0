//! The narrow slice of GL the effect renderer issues.
//!
//! The browser build implements [`Gl`] on top of `WebGlRenderingContext`;
//! anything else (tests, headless tooling) can provide its own recording or
//! no-op implementation.

use std::fmt;

use crate::error::GlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// How a float attribute is laid out inside the interleaved vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    pub components: i32,
    pub stride: i32,
    pub offset: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Power-of-two images: build a mip chain.
    Mipmapped,
    /// Everything else: clamp to edge, linear filtering, no mips.
    ClampLinear,
}

impl Sampling {
    pub fn for_size(width: u32, height: u32) -> Self {
        if width.is_power_of_two() && height.is_power_of_two() {
            Sampling::Mipmapped
        } else {
            Sampling::ClampLinear
        }
    }
}

pub trait Gl {
    type Shader;
    type Program;
    type Buffer;
    type Texture;
    type Uniform;
    /// A decoded image the backend can upload into a texture.
    type Image;

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader, GlError>;
    fn delete_shader(&self, shader: &Self::Shader);
    fn link_program(
        &self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, GlError>;
    fn use_program(&self, program: &Self::Program);
    fn delete_program(&self, program: &Self::Program);

    fn create_vertex_buffer(&self, vertices: &[f32]) -> Result<Self::Buffer, GlError>;
    fn delete_buffer(&self, buffer: &Self::Buffer);
    /// Enables the named attribute and points it into the bound buffer.
    /// Returns `false` when the program has no such active attribute.
    fn bind_attribute(&self, program: &Self::Program, name: &str, layout: AttributeLayout) -> bool;

    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<Self::Uniform>;
    fn set_uniform_f32(&self, location: &Self::Uniform, value: f32);
    fn set_uniform_vec2(&self, location: &Self::Uniform, value: [f32; 2]);
    fn set_uniform_sampler(&self, location: &Self::Uniform, unit: i32);

    fn create_texture(&self) -> Result<Self::Texture, GlError>;
    fn fill_texture(
        &self,
        texture: &Self::Texture,
        width: i32,
        height: i32,
        rgba: &[u8],
    ) -> Result<(), GlError>;
    /// Uploads `image` and returns its pixel size.
    fn upload_image(
        &self,
        texture: &Self::Texture,
        image: &Self::Image,
    ) -> Result<(u32, u32), GlError>;
    fn set_sampling(&self, texture: &Self::Texture, sampling: Sampling);
    fn bind_texture(&self, unit: u32, texture: &Self::Texture);
    fn delete_texture(&self, texture: &Self::Texture);

    /// Viewport to the surface, clear to transparent, enable "over" blending.
    fn begin_frame(&self, width: u32, height: u32);
    fn draw_triangles(&self, vertex_count: i32);
}
