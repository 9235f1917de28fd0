use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, error, warn};
use wasm_bindgen::prelude::*;
use web_sys::{window, Document, HtmlCanvasElement, HtmlImageElement, Window};

use super::backend::WebGl;
use crate::config::EffectConfig;
use crate::frame_loop::{FrameScheduler, RenderLoop};
use crate::renderer::{Renderer, TextureRequest};

type SharedLoop = Rc<RefCell<RenderLoop<WebGl, AnimationFrames>>>;

// `callback` holds the animation-frame closure so that every tick can hand
// the same function back to `request_animation_frame`. Storing it inside an
// `Option` lets us create the scheduler first and install the closure once
// the loop it drives exists.
type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// `requestAnimationFrame` / `cancelAnimationFrame` on the page window.
pub struct AnimationFrames {
    window: Option<Window>,
    callback: FrameCallback,
}

impl FrameScheduler for AnimationFrames {
    type Handle = i32;

    fn request_frame(&mut self) -> Option<i32> {
        let window = self.window.as_ref()?;
        let callback = self.callback.borrow();
        let closure = callback.as_ref()?;
        match window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            Ok(handle) => Some(handle),
            Err(error) => {
                warn!(?error, "requestAnimationFrame failed");
                None
            }
        }
    }

    fn cancel_frame(&mut self, handle: i32) {
        if let Some(window) = &self.window {
            if let Err(error) = window.cancel_animation_frame(handle) {
                debug!(?error, handle, "cancelAnimationFrame failed");
            }
        }
    }
}

/// An in-flight image decode. Handlers are detached before the closures are
/// dropped so a late `load` event never calls into freed memory.
struct PendingImage {
    image: HtmlImageElement,
    _onload: Closure<dyn FnMut()>,
    _onerror: Closure<dyn FnMut(web_sys::Event)>,
}

impl Drop for PendingImage {
    fn drop(&mut self) {
        self.image.set_onload(None);
        self.image.set_onerror(None);
    }
}

fn load_texture(shared: &SharedLoop, request: TextureRequest) -> Result<PendingImage, JsValue> {
    let image = HtmlImageElement::new()?;
    image.set_cross_origin(Some("anonymous"));
    let TextureRequest { src, generation } = request;

    let onload = {
        let target = Rc::downgrade(shared);
        let decoded = image.clone();
        Closure::wrap(Box::new(move || match target.upgrade() {
            Some(shared) => {
                shared
                    .borrow_mut()
                    .renderer_mut()
                    .on_texture_loaded(generation, &decoded);
            }
            None => debug!(generation, "image decoded after its effect was dropped"),
        }) as Box<dyn FnMut()>)
    };

    let onerror = {
        let target = Rc::downgrade(shared);
        let src = src.clone();
        Closure::wrap(Box::new(move |_event: web_sys::Event| {
            if let Some(shared) = target.upgrade() {
                shared
                    .borrow_mut()
                    .renderer_mut()
                    .on_texture_failed(generation, &format!("could not load {src}"));
            }
        }) as Box<dyn FnMut(web_sys::Event)>)
    };

    image.set_onload(Some(onload.as_ref().unchecked_ref()));
    image.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    image.set_src(&src);

    Ok(PendingImage {
        image,
        _onload: onload,
        _onerror: onerror,
    })
}

/// Animated effect bound to one canvas. Dropping it (`free()` from JS) stops
/// the loop and releases every GPU object.
#[wasm_bindgen]
pub struct ImageEffect {
    shared: SharedLoop,
    pending: Option<PendingImage>,
}

#[wasm_bindgen]
impl ImageEffect {
    /// Uses the canvas' current `width`/`height` as the surface size.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, src: String, effect: Option<String>) -> ImageEffect {
        let config = EffectConfig::new(
            src,
            canvas.width(),
            canvas.height(),
            effect.as_deref().unwrap_or_default(),
        );
        Self::with_config(&canvas, &config)
    }

    /// Builds from a JSON `{ src, width, height, effect }` object; returns
    /// `undefined` when the config is unusable.
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(canvas: HtmlCanvasElement, json: &str) -> Option<ImageEffect> {
        match EffectConfig::from_json(json) {
            Ok(config) => Some(Self::with_config(&canvas, &config)),
            Err(error) => {
                error!(%error, "image effect not created");
                None
            }
        }
    }

    #[wasm_bindgen(js_name = setSource)]
    pub fn set_source(&mut self, src: &str) {
        self.shared.borrow_mut().renderer_mut().set_source(src);
        self.start_pending_load();
    }

    #[wasm_bindgen(js_name = setEffect)]
    pub fn set_effect(&mut self, name: &str) {
        self.shared.borrow_mut().renderer_mut().set_effect(name);
        self.start_pending_load();
    }

    pub fn stop(&mut self) {
        self.shared.borrow_mut().stop();
        self.pending = None;
    }

    #[wasm_bindgen(getter)]
    pub fn effect(&self) -> String {
        self.shared.borrow().renderer().effect().name().to_owned()
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.shared.borrow().is_running()
    }

    /// Whether the effect program compiled and linked.
    #[wasm_bindgen(js_name = isLinked)]
    pub fn is_linked(&self) -> bool {
        self.shared.borrow().renderer().has_program()
    }

    #[wasm_bindgen(js_name = textureReady)]
    pub fn texture_ready(&self) -> bool {
        self.shared.borrow().renderer().texture_ready()
    }

    #[wasm_bindgen(js_name = drawCalls)]
    pub fn draw_calls(&self) -> f64 {
        self.shared.borrow().renderer().draw_calls() as f64
    }
}

impl ImageEffect {
    fn with_config(canvas: &HtmlCanvasElement, config: &EffectConfig) -> ImageEffect {
        canvas.set_width(config.width);
        canvas.set_height(config.height);

        let renderer = Renderer::new(WebGl::acquire(canvas), config);
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let scheduler = AnimationFrames {
            window: window(),
            callback: callback.clone(),
        };
        let shared: SharedLoop = Rc::new(RefCell::new(RenderLoop::new(renderer, scheduler)));

        let target = Rc::downgrade(&shared);
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
            if let Some(shared) = target.upgrade() {
                shared.borrow_mut().tick(timestamp);
            }
        }) as Box<dyn FnMut(f64)>));

        let mut effect = ImageEffect {
            shared,
            pending: None,
        };
        effect.start_pending_load();
        effect.shared.borrow_mut().start();
        effect
    }

    fn start_pending_load(&mut self) {
        let request = self.shared.borrow_mut().renderer_mut().take_texture_request();
        let Some(request) = request else {
            return;
        };
        match load_texture(&self.shared, request) {
            Ok(pending) => self.pending = Some(pending),
            Err(error) => error!(?error, "could not start image load"),
        }
    }
}

thread_local! {
    static ATTACHED: RefCell<Vec<ImageEffect>> = const { RefCell::new(Vec::new()) };
}

/// Starts an effect on every `<canvas data-effect-src="…" data-effect="…">`
/// in the document. Returns how many were attached.
pub fn attach_all(document: &Document) -> Result<u32, JsValue> {
    let canvases = document.query_selector_all("canvas[data-effect-src]")?;
    let mut attached = 0;
    for index in 0..canvases.length() {
        let Some(canvas) = canvases
            .get(index)
            .and_then(|node| node.dyn_into::<HtmlCanvasElement>().ok())
        else {
            continue;
        };
        let Some(src) = canvas.get_attribute("data-effect-src").filter(|s| !s.is_empty()) else {
            continue;
        };
        let effect = ImageEffect::new(canvas.clone(), src, canvas.get_attribute("data-effect"));
        ATTACHED.with(|effects| effects.borrow_mut().push(effect));
        attached += 1;
    }
    Ok(attached)
}
