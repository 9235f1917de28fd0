//! Recording GL backend and spy frame scheduler for host-side tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use shader_fx_wasm::frame_loop::FrameScheduler;
use shader_fx_wasm::gl::{AttributeLayout, Gl, Sampling, ShaderStage};
use shader_fx_wasm::{EffectConfig, GlError};

pub const SRC: &str = "data:image/png;base64,iVBORw0KGgo=";

pub fn config(effect: &str) -> EffectConfig {
    EffectConfig::new(SRC, 64, 48, effect)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    Vec2([f32; 2]),
    Sampler(i32),
}

#[derive(Debug, Default)]
pub struct GlLog {
    next_id: Cell<u32>,
    pub compiled: RefCell<Vec<ShaderStage>>,
    pub live_shaders: RefCell<Vec<u32>>,
    pub live_programs: RefCell<Vec<u32>>,
    pub live_buffers: RefCell<Vec<u32>>,
    pub live_textures: RefCell<Vec<u32>>,
    pub attributes: RefCell<Vec<(String, AttributeLayout)>>,
    pub uniforms: RefCell<Vec<(String, UniformValue)>>,
    pub fills: RefCell<Vec<(i32, i32, Vec<u8>)>>,
    pub uploads: Cell<u32>,
    pub sampling: RefCell<Vec<Sampling>>,
    pub frames: RefCell<Vec<(u32, u32)>>,
    pub draws: RefCell<Vec<i32>>,
}

impl GlLog {
    fn id(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    pub fn draw_count(&self) -> usize {
        self.draws.borrow().len()
    }

    pub fn time_values(&self) -> Vec<f32> {
        self.uniforms
            .borrow()
            .iter()
            .filter_map(|(name, value)| match (name.as_str(), value) {
                ("u_time", UniformValue::F32(t)) => Some(*t),
                _ => None,
            })
            .collect()
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .borrow()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    pub fn live_objects(&self) -> usize {
        self.live_shaders.borrow().len()
            + self.live_programs.borrow().len()
            + self.live_buffers.borrow().len()
            + self.live_textures.borrow().len()
    }
}

fn forget(list: &RefCell<Vec<u32>>, id: u32) {
    let mut list = list.borrow_mut();
    let before = list.len();
    list.retain(|&live| live != id);
    assert_eq!(before, list.len() + 1, "object {id} deleted twice or never created");
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Faults {
    pub vertex: bool,
    pub fragment: bool,
    pub link: bool,
    pub buffer: bool,
    pub texture: bool,
}

pub struct RecordingGl {
    log: Rc<GlLog>,
    faults: Faults,
}

impl RecordingGl {
    pub fn new() -> (Self, Rc<GlLog>) {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> (Self, Rc<GlLog>) {
        let log = Rc::new(GlLog::default());
        (
            Self {
                log: log.clone(),
                faults,
            },
            log,
        )
    }
}

pub struct TestImage {
    pub width: u32,
    pub height: u32,
    pub corrupt: bool,
}

impl TestImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            corrupt: false,
        }
    }
}

impl Gl for RecordingGl {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type Texture = u32;
    type Uniform = String;
    type Image = TestImage;

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<u32, GlError> {
        assert!(!source.is_empty());
        self.log.compiled.borrow_mut().push(stage);
        let fail = match stage {
            ShaderStage::Vertex => self.faults.vertex,
            ShaderStage::Fragment => self.faults.fragment,
        };
        if fail {
            return Err(GlError::Compile {
                stage,
                log: "ERROR: 0:1: syntax error".into(),
            });
        }
        let id = self.log.id();
        self.log.live_shaders.borrow_mut().push(id);
        Ok(id)
    }

    fn delete_shader(&self, shader: &u32) {
        forget(&self.log.live_shaders, *shader);
    }

    fn link_program(&self, vertex: &u32, fragment: &u32) -> Result<u32, GlError> {
        let live = self.log.live_shaders.borrow();
        assert!(live.contains(vertex) && live.contains(fragment));
        if self.faults.link {
            return Err(GlError::Link {
                log: "varying mismatch".into(),
            });
        }
        let id = self.log.id();
        self.log.live_programs.borrow_mut().push(id);
        Ok(id)
    }

    fn use_program(&self, program: &u32) {
        assert!(self.log.live_programs.borrow().contains(program));
    }

    fn delete_program(&self, program: &u32) {
        forget(&self.log.live_programs, *program);
    }

    fn create_vertex_buffer(&self, vertices: &[f32]) -> Result<u32, GlError> {
        assert_eq!(vertices.len(), 24);
        if self.faults.buffer {
            return Err(GlError::Create("vertex buffer"));
        }
        let id = self.log.id();
        self.log.live_buffers.borrow_mut().push(id);
        Ok(id)
    }

    fn delete_buffer(&self, buffer: &u32) {
        forget(&self.log.live_buffers, *buffer);
    }

    fn bind_attribute(&self, _program: &u32, name: &str, layout: AttributeLayout) -> bool {
        self.log.attributes.borrow_mut().push((name.to_owned(), layout));
        matches!(name, "a_position" | "a_texCoord")
    }

    fn uniform_location(&self, _program: &u32, name: &str) -> Option<String> {
        matches!(name, "u_time" | "u_resolution" | "u_texture").then(|| name.to_owned())
    }

    fn set_uniform_f32(&self, location: &String, value: f32) {
        self.log
            .uniforms
            .borrow_mut()
            .push((location.clone(), UniformValue::F32(value)));
    }

    fn set_uniform_vec2(&self, location: &String, value: [f32; 2]) {
        self.log
            .uniforms
            .borrow_mut()
            .push((location.clone(), UniformValue::Vec2(value)));
    }

    fn set_uniform_sampler(&self, location: &String, unit: i32) {
        self.log
            .uniforms
            .borrow_mut()
            .push((location.clone(), UniformValue::Sampler(unit)));
    }

    fn create_texture(&self) -> Result<u32, GlError> {
        if self.faults.texture {
            return Err(GlError::Create("texture"));
        }
        let id = self.log.id();
        self.log.live_textures.borrow_mut().push(id);
        Ok(id)
    }

    fn fill_texture(
        &self,
        texture: &u32,
        width: i32,
        height: i32,
        rgba: &[u8],
    ) -> Result<(), GlError> {
        assert!(self.log.live_textures.borrow().contains(texture));
        self.log.fills.borrow_mut().push((width, height, rgba.to_vec()));
        Ok(())
    }

    fn upload_image(&self, texture: &u32, image: &TestImage) -> Result<(u32, u32), GlError> {
        assert!(self.log.live_textures.borrow().contains(texture));
        if image.corrupt {
            return Err(GlError::Upload("decode error".into()));
        }
        self.log.uploads.set(self.log.uploads.get() + 1);
        Ok((image.width, image.height))
    }

    fn set_sampling(&self, _texture: &u32, sampling: Sampling) {
        self.log.sampling.borrow_mut().push(sampling);
    }

    fn bind_texture(&self, unit: u32, texture: &u32) {
        assert_eq!(unit, 0);
        assert!(self.log.live_textures.borrow().contains(texture));
    }

    fn delete_texture(&self, texture: &u32) {
        forget(&self.log.live_textures, *texture);
    }

    fn begin_frame(&self, width: u32, height: u32) {
        self.log.frames.borrow_mut().push((width, height));
    }

    fn draw_triangles(&self, vertex_count: i32) {
        self.log.draws.borrow_mut().push(vertex_count);
    }
}

#[derive(Debug, Default)]
pub struct ScheduleLog {
    next: Cell<u32>,
    pub requested: RefCell<Vec<u32>>,
    pub cancelled: RefCell<Vec<u32>>,
}

pub struct SpyScheduler {
    log: Rc<ScheduleLog>,
    pub refuse: bool,
}

impl SpyScheduler {
    pub fn new() -> (Self, Rc<ScheduleLog>) {
        let log = Rc::new(ScheduleLog::default());
        (
            Self {
                log: log.clone(),
                refuse: false,
            },
            log,
        )
    }
}

impl FrameScheduler for SpyScheduler {
    type Handle = u32;

    fn request_frame(&mut self) -> Option<u32> {
        if self.refuse {
            return None;
        }
        let handle = self.log.next.get() + 1;
        self.log.next.set(handle);
        self.log.requested.borrow_mut().push(handle);
        Some(handle)
    }

    fn cancel_frame(&mut self, handle: u32) {
        self.log.cancelled.borrow_mut().push(handle);
    }
}
