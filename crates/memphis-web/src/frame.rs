use crate::dom;
use crate::surface::Canvas2dSurface;
use crate::WebScene;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

/// Log a frame summary this often.
const STATS_EVERY_FRAMES: u64 = 600;

pub struct FrameContext {
    pub scene: Rc<RefCell<WebScene>>,
    pub canvas: web::HtmlCanvasElement,
    pub ctx: web::CanvasRenderingContext2d,
    pub surface: Canvas2dSurface,
    pub frames: u64,
    pub contacts: u64,
    pub notes: u64,
}

impl FrameContext {
    pub fn new(
        scene: Rc<RefCell<WebScene>>,
        canvas: web::HtmlCanvasElement,
        ctx: web::CanvasRenderingContext2d,
    ) -> Self {
        let surface = Canvas2dSurface::new(ctx.clone());
        Self {
            scene,
            canvas,
            ctx,
            surface,
            frames: 0,
            contacts: 0,
            notes: 0,
        }
    }

    /// One animation frame. Returns false once the scene is gone.
    pub fn frame(&mut self) -> bool {
        let mut scene = self.scene.borrow_mut();
        if scene.is_disposed() {
            return false;
        }
        let stats = scene.tick();
        self.frames += 1;
        self.contacts += stats.contacts as u64;
        self.notes += stats.notes_played as u64;

        let dpr = web::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0);
        dom::apply_dpr_transform(&self.ctx, dpr);
        scene.render(&mut self.surface);

        if self.frames % STATS_EVERY_FRAMES == 0 {
            log::debug!(
                "[frame] frames={} contacts={} notes={} canvas={}x{}",
                self.frames,
                self.contacts,
                self.notes,
                self.canvas.width(),
                self.canvas.height()
            );
        }
        true
    }
}

fn request_frame(w: &web::Window, cb: &Closure<dyn FnMut()>) {
    if let Err(e) = w.request_animation_frame(cb.as_ref().unchecked_ref()) {
        log::error!("[frame] requestAnimationFrame failed: {:?}", e);
    }
}

pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext>>) {
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if !frame_ctx.borrow_mut().frame() {
            log::info!("[frame] scene disposed; stopping loop");
            return;
        }
        if let (Some(w), Some(cb)) = (web::window(), tick_clone.borrow().as_ref()) {
            request_frame(&w, cb);
        }
    }) as Box<dyn FnMut()>));
    if let (Some(w), Some(cb)) = (web::window(), tick.borrow().as_ref()) {
        request_frame(&w, cb);
    }
}
