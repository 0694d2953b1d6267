use serde::{Deserialize, Serialize};

use crate::vec::Vec2;

/// Axis-aligned planar bounding box.
///
/// Serializes as `[min_x, min_y, max_x, max_y]` to match the wire format.
/// A bbox is valid iff `max_x > min_x` and `max_y > min_y`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bbox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bbox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.max_x > self.min_x && self.max_y > self.min_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Pure translation; width and height are preserved exactly.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.min_x + dx,
            self.min_y + dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }

    /// Scale about the center. `factor == 1.0` callers that need an exact
    /// identity should skip the call: recomputing from the center can
    /// introduce rounding.
    pub fn scaled_about_center(&self, factor: f64) -> Self {
        let c = self.center();
        let half_w = self.width() * factor / 2.0;
        let half_h = self.height() * factor / 2.0;
        Self::new(c.x - half_w, c.y - half_h, c.x + half_w, c.y + half_h)
    }
}

impl From<[f64; 4]> for Bbox {
    fn from(b: [f64; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

impl From<Bbox> for [f64; 4] {
    fn from(b: Bbox) -> Self {
        [b.min_x, b.min_y, b.max_x, b.max_y]
    }
}
