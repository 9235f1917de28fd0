use tracing::debug;
use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, HtmlImageElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext as GL,
    WebGlShader, WebGlTexture, WebGlUniformLocation,
};

use crate::error::GlError;
use crate::gl::{AttributeLayout, Gl, Sampling, ShaderStage};

/// [`Gl`] over a WebGL 1 context. The effect shaders are GLSL ES 1.00, so
/// the WebGL 1 context ids are all that is tried.
pub struct WebGl {
    gl: GL,
}

impl WebGl {
    pub fn acquire(canvas: &HtmlCanvasElement) -> Option<Self> {
        for id in ["webgl", "experimental-webgl"] {
            match canvas.get_context(id) {
                Ok(Some(context)) => match context.dyn_into::<GL>() {
                    Ok(gl) => return Some(Self { gl }),
                    Err(_) => debug!(id, "context is not a WebGLRenderingContext"),
                },
                Ok(None) => debug!(id, "context id unavailable"),
                Err(error) => debug!(id, ?error, "getContext threw"),
            }
        }
        None
    }
}

fn upload_error(error: wasm_bindgen::JsValue) -> GlError {
    GlError::Upload(format!("{error:?}"))
}

impl Gl for WebGl {
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type Texture = WebGlTexture;
    type Uniform = WebGlUniformLocation;
    type Image = HtmlImageElement;

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<WebGlShader, GlError> {
        let kind = match stage {
            ShaderStage::Vertex => GL::VERTEX_SHADER,
            ShaderStage::Fragment => GL::FRAGMENT_SHADER,
        };
        let shader = self.gl.create_shader(kind).ok_or(GlError::Create("shader"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        let compiled = self
            .gl
            .get_shader_parameter(&shader, GL::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if compiled {
            Ok(shader)
        } else {
            let log = self.gl.get_shader_info_log(&shader).unwrap_or_default();
            self.gl.delete_shader(Some(&shader));
            Err(GlError::Compile { stage, log })
        }
    }

    fn delete_shader(&self, shader: &WebGlShader) {
        self.gl.delete_shader(Some(shader));
    }

    fn link_program(
        &self,
        vertex: &WebGlShader,
        fragment: &WebGlShader,
    ) -> Result<WebGlProgram, GlError> {
        let program = self.gl.create_program().ok_or(GlError::Create("program"))?;
        self.gl.attach_shader(&program, vertex);
        self.gl.attach_shader(&program, fragment);
        self.gl.link_program(&program);

        let linked = self
            .gl
            .get_program_parameter(&program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if linked {
            Ok(program)
        } else {
            let log = self.gl.get_program_info_log(&program).unwrap_or_default();
            self.gl.delete_program(Some(&program));
            Err(GlError::Link { log })
        }
    }

    fn use_program(&self, program: &WebGlProgram) {
        self.gl.use_program(Some(program));
    }

    fn delete_program(&self, program: &WebGlProgram) {
        self.gl.delete_program(Some(program));
    }

    fn create_vertex_buffer(&self, vertices: &[f32]) -> Result<WebGlBuffer, GlError> {
        let buffer = self.gl.create_buffer().ok_or(GlError::Create("vertex buffer"))?;
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        let view = js_sys::Float32Array::from(vertices);
        self.gl
            .buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &view, GL::STATIC_DRAW);
        Ok(buffer)
    }

    fn delete_buffer(&self, buffer: &WebGlBuffer) {
        self.gl.delete_buffer(Some(buffer));
    }

    fn bind_attribute(&self, program: &WebGlProgram, name: &str, layout: AttributeLayout) -> bool {
        let Ok(location) = u32::try_from(self.gl.get_attrib_location(program, name)) else {
            return false;
        };
        self.gl.enable_vertex_attrib_array(location);
        self.gl.vertex_attrib_pointer_with_i32(
            location,
            layout.components,
            GL::FLOAT,
            false,
            layout.stride,
            layout.offset,
        );
        true
    }

    fn uniform_location(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn set_uniform_f32(&self, location: &WebGlUniformLocation, value: f32) {
        self.gl.uniform1f(Some(location), value);
    }

    fn set_uniform_vec2(&self, location: &WebGlUniformLocation, value: [f32; 2]) {
        self.gl.uniform2f(Some(location), value[0], value[1]);
    }

    fn set_uniform_sampler(&self, location: &WebGlUniformLocation, unit: i32) {
        self.gl.uniform1i(Some(location), unit);
    }

    fn create_texture(&self) -> Result<WebGlTexture, GlError> {
        self.gl.create_texture().ok_or(GlError::Create("texture"))
    }

    fn fill_texture(
        &self,
        texture: &WebGlTexture,
        width: i32,
        height: i32,
        rgba: &[u8],
    ) -> Result<(), GlError> {
        self.gl.bind_texture(GL::TEXTURE_2D, Some(texture));
        self.gl
            .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                GL::TEXTURE_2D,
                0,
                GL::RGBA as i32,
                width,
                height,
                0,
                GL::RGBA,
                GL::UNSIGNED_BYTE,
                Some(rgba),
            )
            .map_err(upload_error)
    }

    fn upload_image(
        &self,
        texture: &WebGlTexture,
        image: &HtmlImageElement,
    ) -> Result<(u32, u32), GlError> {
        self.gl.bind_texture(GL::TEXTURE_2D, Some(texture));
        self.gl
            .tex_image_2d_with_u32_and_u32_and_image(
                GL::TEXTURE_2D,
                0,
                GL::RGBA as i32,
                GL::RGBA,
                GL::UNSIGNED_BYTE,
                image,
            )
            .map_err(upload_error)?;
        Ok((image.natural_width(), image.natural_height()))
    }

    fn set_sampling(&self, texture: &WebGlTexture, sampling: Sampling) {
        self.gl.bind_texture(GL::TEXTURE_2D, Some(texture));
        let (wrap, min_filter) = match sampling {
            Sampling::Mipmapped => {
                self.gl.generate_mipmap(GL::TEXTURE_2D);
                (GL::REPEAT, GL::LINEAR_MIPMAP_LINEAR)
            }
            Sampling::ClampLinear => (GL::CLAMP_TO_EDGE, GL::LINEAR),
        };
        self.gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_S, wrap as i32);
        self.gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_T, wrap as i32);
        self.gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MIN_FILTER, min_filter as i32);
        self.gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MAG_FILTER, GL::LINEAR as i32);
    }

    fn bind_texture(&self, unit: u32, texture: &WebGlTexture) {
        self.gl.active_texture(GL::TEXTURE0 + unit);
        self.gl.bind_texture(GL::TEXTURE_2D, Some(texture));
    }

    fn delete_texture(&self, texture: &WebGlTexture) {
        self.gl.delete_texture(Some(texture));
    }

    fn begin_frame(&self, width: u32, height: u32) {
        self.gl.viewport(0, 0, width as i32, height as i32);
        self.gl.clear_color(0.0, 0.0, 0.0, 0.0);
        self.gl.clear(GL::COLOR_BUFFER_BIT);
        self.gl.enable(GL::BLEND);
        self.gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
    }

    fn draw_triangles(&self, vertex_count: i32) {
        self.gl.draw_arrays(GL::TRIANGLES, 0, vertex_count);
    }
}
