use glam::Vec2;
use memphis_core::Surface;
use web_sys as web;

/// Draws the scene through a 2D canvas context.
pub struct Canvas2dSurface {
    ctx: web::CanvasRenderingContext2d,
}

impl Canvas2dSurface {
    pub fn new(ctx: web::CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }
}

impl Surface for Canvas2dSurface {
    fn fill_background(&mut self, color: &str, width: f32, height: f32) {
        self.ctx.set_global_alpha(1.0);
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(0.0, 0.0, width as f64, height as f64);
    }

    fn stroke_bezier(&mut self, from: Vec2, c1: Vec2, c2: Vec2, to: Vec2, color: &str, alpha: f32) {
        let ctx = &self.ctx;
        ctx.set_global_alpha(alpha as f64);
        ctx.set_stroke_style_str(color);
        ctx.set_line_width(1.0);
        ctx.begin_path();
        ctx.move_to(from.x as f64, from.y as f64);
        ctx.bezier_curve_to(
            c1.x as f64,
            c1.y as f64,
            c2.x as f64,
            c2.y as f64,
            to.x as f64,
            to.y as f64,
        );
        ctx.stroke();
        ctx.set_global_alpha(1.0);
    }

    fn draw_polygon(&mut self, points: &[Vec2], fill: &str, stroke: &str, line_width: f32) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        let ctx = &self.ctx;
        ctx.begin_path();
        ctx.move_to(first.x as f64, first.y as f64);
        for p in rest {
            ctx.line_to(p.x as f64, p.y as f64);
        }
        ctx.close_path();
        ctx.set_fill_style_str(fill);
        ctx.fill();
        if line_width > 0.0 {
            ctx.set_stroke_style_str(stroke);
            ctx.set_line_width(line_width as f64);
            ctx.stroke();
        }
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: &str) {
        let ctx = &self.ctx;
        ctx.begin_path();
        let _ = ctx.arc(
            center.x as f64,
            center.y as f64,
            radius.max(0.0) as f64,
            0.0,
            std::f64::consts::TAU,
        );
        ctx.set_fill_style_str(color);
        ctx.fill();
    }
}
