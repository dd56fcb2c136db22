#![cfg(target_arch = "wasm32")]
use memphis_core::{Scene, SceneConfig};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

mod audio;
mod dom;
mod events;
mod frame;
mod input;
mod keymap;
mod surface;

use audio::WebAudioBackend;

const CANVAS_ID: &str = "memphis-canvas";

pub(crate) type WebScene = Scene<WebAudioBackend>;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("memphis-web starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

async fn init() -> anyhow::Result<()> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let document = dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;

    let canvas: web::HtmlCanvasElement = document
        .get_element_by_id(CANVAS_ID)
        .ok_or_else(|| anyhow::anyhow!("missing #{}", CANVAS_ID))?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
    let ctx: web::CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(|e| anyhow::anyhow!(format!("getContext failed: {:?}", e)))?
        .ok_or_else(|| anyhow::anyhow!("no 2d context"))?
        .dyn_into::<web::CanvasRenderingContext2d>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;

    let size = dom::sync_canvas_backing_size(&canvas);
    let mut config = SceneConfig {
        width: size.css_width,
        height: size.css_height,
        ..Default::default()
    };
    if let Some(n) = dom::population_attribute(&canvas) {
        config.population = n;
    }

    // The context starts suspended; the first pointer press resumes it.
    let backend = WebAudioBackend::new()?;
    let scene = Rc::new(RefCell::new(Scene::new(config, backend)));
    log::info!(
        "[init] canvas {:.0}x{:.0} css @{}x, population {}",
        size.css_width,
        size.css_height,
        size.dpr,
        scene.borrow().population_count()
    );

    events::wire_pointer(&canvas, scene.clone());
    events::wire_keyboard(&window, scene.clone());
    events::wire_resize(&window, &canvas, scene.clone());
    events::wire_teardown(&window, scene.clone());

    let frame_ctx = Rc::new(RefCell::new(frame::FrameContext::new(scene, canvas, ctx)));
    frame::start_loop(frame_ctx);
    Ok(())
}
