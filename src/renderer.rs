//! Effect renderer state machine.
//!
//! A [`Renderer`] owns one compiled effect program, one full-surface quad and
//! one source texture on a single [`Gl`] backend. It never blocks: the host
//! drives it by calling [`Renderer::render_frame`] once per display refresh,
//! and feeds texture loads back in through [`Renderer::on_texture_loaded`].

use tracing::{debug, error, info, warn};

use crate::config::EffectConfig;
use crate::effect::Effect;
use crate::error::GlError;
use crate::gl::{AttributeLayout, Gl, Sampling, ShaderStage};

/// Two triangles covering clip space, interleaved as `x, y, u, v`.
#[rustfmt::skip]
pub const QUAD_VERTICES: [f32; 24] = [
    -1.0, -1.0,  0.0, 0.0,
     1.0, -1.0,  1.0, 0.0,
    -1.0,  1.0,  0.0, 1.0,
    -1.0,  1.0,  0.0, 1.0,
     1.0, -1.0,  1.0, 0.0,
     1.0,  1.0,  1.0, 1.0,
];
pub const QUAD_VERTEX_COUNT: i32 = 6;

pub const POSITION_LAYOUT: AttributeLayout = AttributeLayout {
    components: 2,
    stride: 16,
    offset: 0,
};
pub const TEX_COORD_LAYOUT: AttributeLayout = AttributeLayout {
    components: 2,
    stride: 16,
    offset: 8,
};

/// Opaque black, bound until the real image arrives.
pub const PLACEHOLDER_PIXEL: [u8; 4] = [0, 0, 0, 255];

/// Seconds since the first frame callback after (re)initialization, drawn
/// or skipped. Never decreases.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    start_ms: Option<f64>,
    last: f32,
}

impl FrameClock {
    pub fn elapsed(&mut self, now_ms: f64) -> f32 {
        let start = *self.start_ms.get_or_insert(now_ms);
        let seconds = ((now_ms - start) / 1000.0) as f32;
        self.last = self.last.max(seconds);
        self.last
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A texture load the host should start. `generation` must be handed back
/// with the result so stale completions can be told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRequest {
    pub src: String,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// Program or texture not ready yet; nothing was drawn.
    Skipped,
    /// No context, or already torn down.
    Inert,
}

struct EffectProgram<G: Gl> {
    effect: Effect,
    program: G::Program,
    time: Option<G::Uniform>,
}

struct SourceTexture<G: Gl> {
    texture: G::Texture,
    src: String,
    generation: u64,
    ready: bool,
}

pub struct Renderer<G: Gl> {
    gl: Option<G>,
    width: u32,
    height: u32,
    src: String,
    effect: Effect,
    program: Option<EffectProgram<G>>,
    quad: Option<G::Buffer>,
    texture: Option<SourceTexture<G>>,
    generation: u64,
    pending_load: Option<TextureRequest>,
    clock: FrameClock,
    draw_calls: u64,
    released: bool,
}

impl<G: Gl> Renderer<G> {
    /// Runs the initialization sequence. `gl == None` means no context could
    /// be acquired; the renderer is then permanently inert.
    pub fn new(gl: Option<G>, config: &EffectConfig) -> Self {
        let mut renderer = Self {
            gl,
            width: config.width,
            height: config.height,
            src: config.src.clone(),
            effect: config.resolved_effect(),
            program: None,
            quad: None,
            texture: None,
            generation: 0,
            pending_load: None,
            clock: FrameClock::default(),
            draw_calls: 0,
            released: false,
        };
        if renderer.gl.is_none() {
            error!(
                error = %GlError::ContextUnavailable,
                src = %renderer.src,
                "image effect disabled"
            );
            return renderer;
        }
        renderer.initialize();
        renderer
    }

    fn initialize(&mut self) {
        let Some(gl) = self.gl.as_ref() else {
            return;
        };
        self.generation += 1;
        self.clock.reset();

        let sources = self.effect.sources();
        let vertex = compile_stage(gl, ShaderStage::Vertex, sources.vertex);
        let fragment = compile_stage(gl, ShaderStage::Fragment, sources.fragment);
        let program = match (vertex, fragment) {
            (Some(vertex), Some(fragment)) => {
                let linked = gl.link_program(&vertex, &fragment);
                gl.delete_shader(&vertex);
                gl.delete_shader(&fragment);
                match linked {
                    Ok(program) => Some(prepare_program(
                        gl,
                        self.effect,
                        program,
                        self.width,
                        self.height,
                    )),
                    Err(error) => {
                        error!(%error, effect = %self.effect, "effect program unavailable");
                        None
                    }
                }
            }
            (vertex, fragment) => {
                for shader in vertex.iter().chain(fragment.iter()) {
                    gl.delete_shader(shader);
                }
                warn!(effect = %self.effect, "skipping program link after shader compile failure");
                None
            }
        };

        if let Some(linked) = &program {
            match gl.create_vertex_buffer(&QUAD_VERTICES) {
                Ok(buffer) => {
                    let attributes =
                        [("a_position", POSITION_LAYOUT), ("a_texCoord", TEX_COORD_LAYOUT)];
                    for (name, layout) in attributes {
                        if !gl.bind_attribute(&linked.program, name, layout) {
                            warn!(attribute = name, "attribute not active in effect program");
                        }
                    }
                    self.quad = Some(buffer);
                }
                Err(error) => error!(%error, "quad upload failed"),
            }
        }
        self.program = program;

        match gl.create_texture() {
            Ok(texture) => {
                if let Err(error) = gl.fill_texture(&texture, 1, 1, &PLACEHOLDER_PIXEL) {
                    warn!(%error, "placeholder upload failed");
                }
                gl.set_sampling(&texture, Sampling::ClampLinear);
                self.texture = Some(SourceTexture {
                    texture,
                    src: self.src.clone(),
                    generation: self.generation,
                    ready: false,
                });
                self.pending_load = Some(TextureRequest {
                    src: self.src.clone(),
                    generation: self.generation,
                });
            }
            Err(error) => error!(%error, src = %self.src, "source texture unavailable"),
        }

        debug!(
            effect = %self.effect,
            generation = self.generation,
            linked = self.program.is_some(),
            "effect renderer initialized"
        );
    }

    /// Hands out the texture load started by the last (re)initialization.
    pub fn take_texture_request(&mut self) -> Option<TextureRequest> {
        self.pending_load.take()
    }

    /// Swaps the decoded image into the live texture. Returns `false` when
    /// the completion is stale (superseded generation or torn down).
    pub fn on_texture_loaded(&mut self, generation: u64, image: &G::Image) -> bool {
        if self.released {
            debug!(generation, "texture arrived after teardown, ignoring");
            return false;
        }
        let Some(gl) = self.gl.as_ref() else {
            return false;
        };
        let Some(texture) = self.texture.as_mut().filter(|t| t.generation == generation) else {
            debug!(generation, current = self.generation, "stale texture load ignored");
            return false;
        };
        match gl.upload_image(&texture.texture, image) {
            Ok((width, height)) => {
                gl.set_sampling(&texture.texture, Sampling::for_size(width, height));
                texture.ready = true;
                info!(src = %texture.src, width, height, "source texture ready");
                true
            }
            Err(error) => {
                error!(%error, src = %texture.src, "keeping placeholder texture");
                false
            }
        }
    }

    pub fn on_texture_failed(&mut self, generation: u64, reason: &str) {
        match &self.texture {
            Some(texture) if !self.released && texture.generation == generation => {
                error!(src = %texture.src, reason, "texture load failed, keeping placeholder");
            }
            _ => debug!(generation, reason, "stale texture failure ignored"),
        }
    }

    /// Draws one frame at host time `now_ms` (milliseconds, monotonic).
    pub fn render_frame(&mut self, now_ms: f64) -> FrameOutcome {
        if self.released {
            return FrameOutcome::Inert;
        }
        let Some(gl) = self.gl.as_ref() else {
            return FrameOutcome::Inert;
        };
        let elapsed = self.clock.elapsed(now_ms);
        let (Some(program), Some(texture), Some(_)) = (&self.program, &self.texture, &self.quad)
        else {
            return FrameOutcome::Skipped;
        };
        if !texture.ready {
            return FrameOutcome::Skipped;
        }

        gl.begin_frame(self.width, self.height);
        gl.use_program(&program.program);
        gl.bind_texture(0, &texture.texture);
        if let Some(time) = &program.time {
            gl.set_uniform_f32(time, elapsed);
        }
        gl.draw_triangles(QUAD_VERTEX_COUNT);
        self.draw_calls += 1;
        FrameOutcome::Drawn
    }

    /// Points the renderer at a new image. Rebuilds everything and restarts
    /// the clock; a no-op when `src` is unchanged.
    pub fn set_source(&mut self, src: &str) {
        if self.src == src || !self.reconfigurable() {
            return;
        }
        self.release_resources();
        self.src = src.to_owned();
        self.initialize();
    }

    /// Switches effect by name, with the usual refraction fallback. Rebuilds
    /// everything and restarts the clock unless the effect is unchanged.
    pub fn set_effect(&mut self, name: &str) {
        let effect = Effect::from_name(name);
        if self.effect == effect || !self.reconfigurable() {
            return;
        }
        self.release_resources();
        self.effect = effect;
        self.initialize();
    }

    fn reconfigurable(&self) -> bool {
        if self.released {
            warn!("reconfiguration after teardown ignored");
            return false;
        }
        true
    }

    /// Deletes every GPU object. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.release_resources();
        debug!(draw_calls = self.draw_calls, "effect renderer released");
    }

    fn release_resources(&mut self) {
        self.pending_load = None;
        let Some(gl) = self.gl.as_ref() else {
            return;
        };
        if let Some(texture) = self.texture.take() {
            gl.delete_texture(&texture.texture);
        }
        if let Some(buffer) = self.quad.take() {
            gl.delete_buffer(&buffer);
        }
        if let Some(program) = self.program.take() {
            gl.delete_program(&program.program);
        }
    }

    pub fn is_inert(&self) -> bool {
        self.gl.is_none() || self.released
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    pub fn texture_ready(&self) -> bool {
        self.texture.as_ref().is_some_and(|t| t.ready)
    }

    pub fn effect(&self) -> Effect {
        self.program.as_ref().map_or(self.effect, |p| p.effect)
    }

    pub fn source(&self) -> &str {
        &self.src
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn backend(&self) -> Option<&G> {
        self.gl.as_ref()
    }
}

impl<G: Gl> Drop for Renderer<G> {
    fn drop(&mut self) {
        self.release();
    }
}

fn compile_stage<G: Gl>(gl: &G, stage: ShaderStage, source: &str) -> Option<G::Shader> {
    match gl.compile_shader(stage, source) {
        Ok(shader) => Some(shader),
        Err(error) => {
            error!(%error, %stage, "shader stage unavailable");
            None
        }
    }
}

fn prepare_program<G: Gl>(
    gl: &G,
    effect: Effect,
    program: G::Program,
    width: u32,
    height: u32,
) -> EffectProgram<G> {
    gl.use_program(&program);
    if let Some(resolution) = gl.uniform_location(&program, "u_resolution") {
        gl.set_uniform_vec2(&resolution, [width as f32, height as f32]);
    }
    if let Some(sampler) = gl.uniform_location(&program, "u_texture") {
        gl.set_uniform_sampler(&sampler, 0);
    }
    let time = gl.uniform_location(&program, "u_time");
    EffectProgram { effect, program, time }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_first_frame_and_never_runs_backwards() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.elapsed(5_000.0), 0.0);
        assert_eq!(clock.elapsed(6_500.0), 1.5);
        assert_eq!(clock.elapsed(6_000.0), 1.5);
        clock.reset();
        assert_eq!(clock.elapsed(9_000.0), 0.0);
    }

    #[test]
    fn quad_covers_clip_space() {
        let corners: Vec<[f32; 2]> = QUAD_VERTICES.chunks(4).map(|v| [v[0], v[1]]).collect();
        assert_eq!(corners.len(), QUAD_VERTEX_COUNT as usize);
        for corner in [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]] {
            assert!(corners.contains(&corner));
        }
        for vertex in QUAD_VERTICES.chunks(4) {
            assert_eq!(vertex[2], (vertex[0] + 1.0) / 2.0);
            assert_eq!(vertex[3], (vertex[1] + 1.0) / 2.0);
        }
    }
}
