use glam::Vec2;
use web_sys as web;

/// Client coordinates relative to an element's top-left corner.
#[inline]
pub fn client_to_local(client: Vec2, rect_origin: Vec2) -> Vec2 {
    client - rect_origin
}

/// Pointer position in canvas CSS pixels.
#[inline]
pub fn pointer_canvas_css(ev: &web::PointerEvent, canvas: &web::HtmlCanvasElement) -> Vec2 {
    let rect = canvas.get_bounding_client_rect();
    client_to_local(
        Vec2::new(ev.client_x() as f32, ev.client_y() as f32),
        Vec2::new(rect.left() as f32, rect.top() as f32),
    )
}

/// Motion since the previous pointer event, falling back to the difference
/// from `last` when the browser reports no movement.
#[inline]
pub fn movement_or_delta(reported: Vec2, current: Vec2, last: Option<Vec2>) -> Vec2 {
    if reported != Vec2::ZERO {
        return reported;
    }
    last.map(|l| current - l).unwrap_or(Vec2::ZERO)
}

#[inline]
pub fn pointer_movement(ev: &web::PointerEvent) -> Vec2 {
    Vec2::new(ev.movement_x() as f32, ev.movement_y() as f32)
}
