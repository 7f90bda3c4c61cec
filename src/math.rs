//! Geometric value types shared by paths, images and renderers.
//!
//! Vector and matrix math comes from `glam`; this module only adds the
//! small value types the rest of the crate needs on top of it: boxes,
//! colors, gradient stops and raster sample buffers.

use std::fmt;
use std::sync::Arc;

use glam::{dvec2, DMat2, DMat3, DVec2};

/// A 2D point.
pub type P2 = DVec2;
/// A 2D vector.
pub type V2 = DVec2;
/// A 2×2 matrix.
pub type M2 = DMat2;
/// A 3×3 matrix, used as a 2D affine transform.
pub type M3 = DMat3;
/// A width/height pair.
pub type Size2 = DVec2;

/// Axis-aligned rectangle.
///
/// The empty box is represented with inverted infinite bounds so that
/// expanding it with any point yields the degenerate box on that point.
#[derive(Debug, Clone, Copy)]
pub struct Box2 {
    pub min: P2,
    pub max: P2,
}

impl Box2 {
    /// The empty box.
    pub const EMPTY: Box2 = Box2 {
        min: DVec2::new(f64::INFINITY, f64::INFINITY),
        max: DVec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
    };

    pub const fn new(min: P2, max: P2) -> Self {
        Box2 { min, max }
    }

    /// Smallest box containing both points.
    pub fn from_points(p: P2, q: P2) -> Self {
        Box2 {
            min: p.min(q),
            max: p.max(q),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn w(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn h(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Size2 {
        self.max - self.min
    }

    pub fn mid(&self) -> P2 {
        (self.min + self.max) * 0.5
    }

    /// Grow the box so it contains `p`.
    pub fn expand_point(&mut self, p: P2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Box2) -> Box2 {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Box2 {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Closed containment test.
    pub fn contains(&self, p: P2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Axis-aligned hull of the box mapped through the affine transform `m`.
    pub fn tr(&self, m: M3) -> Box2 {
        if self.is_empty() {
            return Box2::EMPTY;
        }
        let mut b = Box2::EMPTY;
        b.expand_point(m.transform_point2(self.min));
        b.expand_point(m.transform_point2(dvec2(self.max.x, self.min.y)));
        b.expand_point(m.transform_point2(self.max));
        b.expand_point(m.transform_point2(dvec2(self.min.x, self.max.y)));
        b
    }
}

impl PartialEq for Box2 {
    fn eq(&self, other: &Self) -> bool {
        // All empty boxes are the one empty box.
        if self.is_empty() || other.is_empty() {
            return self.is_empty() && other.is_empty();
        }
        self.min == other.min && self.max == other.max
    }
}

impl fmt::Display for Box2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(box2 empty)");
        }
        write!(
            f,
            "(box2 ({} {}) ({} {}))",
            self.min.x, self.min.y, self.max.x, self.max.y
        )
    }
}

/// Straight-alpha RGBA color, components nominally in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Opaque color from RGB components.
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Color { r, g, b, a }
    }

    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    /// Clamps all components to [0, 1].
    pub fn clamped(self) -> Self {
        Color {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({} {} {} {})", self.r, self.g, self.b, self.a)
    }
}

/// A single gradient stop.
///
/// `t` is expected in [0, 1] and stop sequences are expected sorted by
/// non-decreasing `t`; renderers may clamp or sort at build time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub t: f64,
    pub color: Color,
}

impl ColorStop {
    pub const fn new(t: f64, color: Color) -> Self {
        ColorStop { t, color }
    }
}

/// Ordered gradient stops.
pub type Stops = Vec<ColorStop>;

/// Opaque raster sample buffer.
///
/// The interpretation of the samples belongs to the backend; the core only
/// needs cheap clones, equality and a total order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Raster {
    size: (u32, u32),
    samples: Arc<[u8]>,
}

impl Raster {
    pub fn new(w: u32, h: u32, samples: impl Into<Arc<[u8]>>) -> Self {
        Raster {
            size: (w, h),
            samples: samples.into(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}

impl fmt::Display for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(raster {}x{} {} bytes)",
            self.size.0,
            self.size.1,
            self.samples.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec2;

    #[test]
    fn empty_box_expands_to_point() {
        let mut b = Box2::EMPTY;
        assert!(b.is_empty());
        b.expand_point(dvec2(2.0, -1.0));
        assert!(!b.is_empty());
        assert_eq!(b.min, dvec2(2.0, -1.0));
        assert_eq!(b.max, dvec2(2.0, -1.0));
    }

    #[test]
    fn empty_boxes_are_equal() {
        let b = Box2::new(dvec2(1.0, 1.0), dvec2(0.0, 0.0));
        assert!(b.is_empty());
        assert_eq!(b, Box2::EMPTY);
    }

    #[test]
    fn box_transform_is_hull_of_corners() {
        let b = Box2::new(dvec2(0.0, 0.0), dvec2(1.0, 1.0));
        let rot = M3::from_angle(std::f64::consts::FRAC_PI_4);
        let t = b.tr(rot);
        let half_diag = std::f64::consts::SQRT_2 / 2.0;
        assert!((t.min.x - (-half_diag)).abs() < 1e-12);
        assert!((t.max.y - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn raster_equality_is_by_contents() {
        let a = Raster::new(2, 1, vec![1u8, 2, 3, 4]);
        let b = Raster::new(2, 1, vec![1u8, 2, 3, 4]);
        let c = Raster::new(2, 1, vec![1u8, 2, 3, 5]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }
}
