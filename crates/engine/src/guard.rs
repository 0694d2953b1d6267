//! Pure viewport geometry against the hard boundary.
//!
//! Containment is tested against the bbox **center** only: at high zoom the
//! viewport edges may extend outside the polygon. That is the intended
//! behavior, pinned by tests rather than assumed.

use planar::Polygon;
use store::Viewport;

/// `true` when the viewport center lies inside the bounds polygon.
///
/// A missing or degenerate (< 3 vertices) polygon means unconstrained.
/// Points within `epsilon` of an edge count as inside.
pub fn is_inside_bounds(viewport: &Viewport, bounds: Option<&Polygon>, epsilon: f64) -> bool {
    match bounds {
        Some(polygon) if !polygon.is_degenerate() => polygon.contains(viewport.center(), epsilon),
        _ => true,
    }
}

/// Candidate viewport for a pan step.
///
/// `direction` may contain any combination of the substrings
/// `north|south|east|west` (e.g. `"northeast"`); each match contributes an
/// independent translation of `height * delta` or `width * delta` on its
/// axis. The result is a pure translation with corners recomputed.
pub fn pan_viewport(viewport: &Viewport, direction: &str, delta: f64) -> Viewport {
    let dir = direction.to_ascii_lowercase();
    let width = viewport.bbox.width();
    let height = viewport.bbox.height();

    let mut dx = 0.0;
    let mut dy = 0.0;
    if dir.contains("north") {
        dy += height * delta;
    }
    if dir.contains("south") {
        dy -= height * delta;
    }
    if dir.contains("east") {
        dx += width * delta;
    }
    if dir.contains("west") {
        dx -= width * delta;
    }

    viewport.with_bbox(viewport.bbox.translated(dx, dy))
}

/// Candidate viewport for a zoom step: the bbox scales about its center by
/// `2^-(new_zoom - zoom)`. Equal zoom returns the input bbox verbatim so a
/// no-op zoom is an exact identity, not a rounding artifact.
pub fn zoom_viewport(viewport: &Viewport, new_zoom: f64) -> Viewport {
    if new_zoom == viewport.zoom {
        return viewport.with_bbox(viewport.bbox);
    }
    let factor = (-(new_zoom - viewport.zoom)).exp2();
    viewport.with_bbox_and_zoom(viewport.bbox.scaled_about_center(factor), new_zoom)
}
