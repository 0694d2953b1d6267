use serde::{Deserialize, Serialize};

use crate::vec::Vec2;

/// Simple polygon over planar points, in vertex order.
///
/// Fewer than 3 vertices is degenerate; containment callers treat a
/// degenerate polygon as "unconstrained" rather than as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon(pub Vec<Vec2>);

impl Polygon {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Vec2] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_degenerate(&self) -> bool {
        self.0.len() < 3
    }

    /// Vertex centroid (arithmetic mean of the vertices).
    pub fn centroid(&self) -> Option<Vec2> {
        if self.0.is_empty() {
            return None;
        }
        let n = self.0.len() as f64;
        let sum = self
            .0
            .iter()
            .fold(Vec2::new(0.0, 0.0), |acc, p| acc + *p);
        Some(sum.scaled(1.0 / n))
    }

    /// Ray-casting containment with an edge tolerance.
    ///
    /// A point within `epsilon` of any edge counts as inside, so a point
    /// exactly on the boundary is never rejected by rounding. Returns
    /// `false` for a degenerate polygon; callers that mean "unconstrained"
    /// must check `is_degenerate` first.
    pub fn contains(&self, p: Vec2, epsilon: f64) -> bool {
        let pts = &self.0;
        if pts.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = pts.len() - 1;
        for i in 0..pts.len() {
            let a = pts[j];
            let b = pts[i];

            if distance_to_segment(p, a, b) <= epsilon {
                return true;
            }

            // Even-odd crossing: edge straddles the horizontal ray through p.
            if (a.y > p.y) != (b.y > p.y) {
                let x_at_y = a.x + (b.x - a.x) * (p.y - a.y) / (b.y - a.y);
                if p.x < x_at_y {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Distance from `p` to the closed segment `ab`.
fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let len2 = ab.dot(ab);
    if len2 <= 0.0 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    let closest = a + ab.scaled(t);
    (p - closest).length()
}
