use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

/// Canvas size in CSS pixels plus the device pixel ratio used for the
/// backing store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasSize {
    pub css_width: f32,
    pub css_height: f32,
    pub dpr: f64,
}

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

/// Match the canvas backing store to its CSS box times devicePixelRatio.
pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement) -> CanvasSize {
    let dpr = web::window()
        .map(|w| w.device_pixel_ratio())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(1.0);
    let rect = canvas.get_bounding_client_rect();
    let w_px = (rect.width() * dpr) as u32;
    let h_px = (rect.height() * dpr) as u32;
    if canvas.width() != w_px.max(1) {
        canvas.set_width(w_px.max(1));
    }
    if canvas.height() != h_px.max(1) {
        canvas.set_height(h_px.max(1));
    }
    CanvasSize {
        css_width: rect.width().max(1.0) as f32,
        css_height: rect.height().max(1.0) as f32,
        dpr,
    }
}

/// Draw in CSS pixels on a backing store scaled by `dpr`.
#[inline]
pub fn apply_dpr_transform(ctx: &web::CanvasRenderingContext2d, dpr: f64) {
    let _ = ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
}

/// Initial population from the canvas `data-population` attribute.
pub fn population_attribute(canvas: &web::HtmlCanvasElement) -> Option<usize> {
    canvas
        .get_attribute("data-population")
        .and_then(|v| v.trim().parse().ok())
}

/// Attach a listener for the lifetime of the page.
pub fn add_listener<E>(target: &web::EventTarget, event: &str, handler: impl FnMut(E) + 'static)
where
    E: wasm_bindgen::convert::FromWasmAbi + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(E)>);
    if let Err(e) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
        log::error!("[dom] failed to listen for {}: {:?}", event, e);
    }
    closure.forget();
}
