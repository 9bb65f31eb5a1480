//! Vector helpers and the axis-aligned rectangle every body is tested with.

use glam::DVec2;

pub fn add(a: DVec2, b: DVec2) -> DVec2 {
    a + b
}

pub fn subtract(a: DVec2, b: DVec2) -> DVec2 {
    a - b
}

pub fn scale(v: DVec2, s: f64) -> DVec2 {
    v * s
}

pub fn dot(a: DVec2, b: DVec2) -> f64 {
    a.dot(b)
}

pub fn distance(a: DVec2, b: DVec2) -> f64 {
    (a - b).length()
}

/// Unit vector in the direction of `v`, or zero when `v` has no usable length.
pub fn unit(v: DVec2) -> DVec2 {
    v.normalize_or_zero()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// Axis-aligned rectangle. `x`, `y` is the minimum corner.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Aabb {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Aabb {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_center(center: DVec2, half_extents: DVec2) -> Self {
        Self {
            x: center.x - half_extents.x,
            y: center.y - half_extents.y,
            width: half_extents.x * 2.0,
            height: half_extents.y * 2.0,
        }
    }

    pub fn min(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn max(&self) -> DVec2 {
        DVec2::new(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn half_extents(&self) -> DVec2 {
        DVec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Positive-area overlap on both axes. Shared edges are not an overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        let depth = a_max.min(b_max) - a_min.max(b_min);

        depth.x > 0.0 && depth.y > 0.0
    }

    pub fn contains_point(&self, point: DVec2) -> bool {
        let max = self.max();

        (self.x <= point.x && point.x < max.x) && (self.y <= point.y && point.y < max.y)
    }

    /// Signed translation per axis that moves `self` out of `other` by the
    /// shortest way along that axis. `None` when the two do not overlap.
    pub fn separation(&self, other: &Aabb) -> Option<DVec2> {
        if !self.overlaps(other) {
            return None;
        }

        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());

        let pick = |push_negative: f64, push_positive: f64| {
            if push_negative <= push_positive {
                -push_negative
            } else {
                push_positive
            }
        };

        Some(DVec2::new(
            pick(a_max.x - b_min.x, b_max.x - a_min.x),
            pick(a_max.y - b_min.y, b_max.y - a_min.y),
        ))
    }
}
