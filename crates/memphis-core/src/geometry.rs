//! Outline helpers for bodies. Collision detection
//! itself lives in the physics pipeline.

use glam::Vec2;
use rapier2d::parry::transformation;
use rapier2d::prelude::point;

/// Axis-aligned bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_points(points: &[Vec2]) -> Self {
        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        if points.is_empty() {
            min = Vec2::ZERO;
            max = Vec2::ZERO;
        }
        Self { min, max }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Convex hull of the finite points, counter-clockwise. Fewer than three
/// distinct points come back unchanged.
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut pts: Vec<Vec2> = points.iter().copied().filter(|p| p.is_finite()).collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }
    let cloud: Vec<_> = pts.iter().map(|p| point![p.x, p.y]).collect();
    transformation::convex_hull(&cloud)
        .into_iter()
        .map(|p| Vec2::new(p.x, p.y))
        .collect()
}

/// Point-in-convex-polygon test (boundary counts as inside). Works for either
/// winding.
pub fn contains_point(poly: &[Vec2], p: Vec2) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let mut sign = 0.0_f32;
    for i in 0..poly.len() {
        let c = (poly[(i + 1) % poly.len()] - poly[i]).perp_dot(p - poly[i]);
        if c == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = c.signum();
        } else if c.signum() != sign {
            return false;
        }
    }
    true
}
