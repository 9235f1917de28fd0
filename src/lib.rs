#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

//! Animated WebGL image effects (refraction, smoke dissolve, pixelate glitch)
//! for a single image on a fixed-size canvas.
//!
//! Everything outside the `wasm` module is host-independent and is what the
//! tests exercise; the browser glue only compiles for wasm32.

pub mod config;
pub mod effect;
pub mod error;
pub mod frame_loop;
pub mod gl;
pub mod images;
pub mod math;
pub mod renderer;

pub use config::EffectConfig;
pub use effect::Effect;
pub use error::{ConfigError, GlError, SearchError};
pub use frame_loop::{FrameScheduler, RenderLoop};
pub use gl::{Gl, ShaderStage};
pub use renderer::{FrameOutcome, Renderer, TextureRequest};

// Only compile wasm-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
mod wasm {
    use wasm_bindgen::prelude::*;

    mod backend;
    mod console;
    pub(crate) mod render;
    pub(crate) mod search;

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        console::init();
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let attached = render::attach_all(&document)?;
        tracing::info!(attached, "image effects attached");
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::render::ImageEffect;
#[cfg(target_arch = "wasm32")]
pub use wasm::search::{
    build_image_url_for_page, fetch_single_image, optimized_image_url_for_window, preload_images,
    search_images,
};
