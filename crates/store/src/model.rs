//! Shared state model mirrored from the backend.
//!
//! Everything here is created by the backend on the initial fetch and then
//! mutated either by local optimistic commands or by inbound notifications.
//! Nothing is durably persisted client-side.

use std::collections::BTreeMap;

use planar::{Bbox, Polygon, Vec2};
use serde::{Deserialize, Serialize};

/// Legacy flat layer map: layer id → enabled.
pub type LayerState = BTreeMap<String, bool>;

/// Per-layer animation toggles, independent of layer visibility.
pub type AnimationState = BTreeMap<String, bool>;

/// Operator-defined navigable-area boundary; absence means unconstrained.
pub type BoundsPolygon = Polygon;

/// Layer ids that always live in the flat legacy `LayerState` map.
pub const LEGACY_LAYER_IDS: [&str; 5] = ["model", "roads", "parcels", "majorRoads", "smallRoads"];

pub fn is_legacy_layer(id: &str) -> bool {
    LEGACY_LAYER_IDS.contains(&id)
}

/// Random per-session token, stamped on every outbound command so inbound
/// self-echoes can be filtered. The embedding app generates the token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Corner points of a viewport bbox, kept alongside it for consumers that
/// want them precomputed. Always derived from the bbox, never authoritative.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corners {
    pub sw: Vec2,
    pub se: Vec2,
    pub nw: Vec2,
    pub ne: Vec2,
}

impl Corners {
    pub fn from_bbox(bbox: &Bbox) -> Self {
        Self {
            sw: Vec2::new(bbox.min_x, bbox.min_y),
            se: Vec2::new(bbox.max_x, bbox.min_y),
            nw: Vec2::new(bbox.min_x, bbox.max_y),
            ne: Vec2::new(bbox.max_x, bbox.max_y),
        }
    }
}

/// The shared pan/zoom window into the planar dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bbox: Bbox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corners: Option<Corners>,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(bbox: Bbox, zoom: f64) -> Self {
        Self {
            bbox,
            corners: Some(Corners::from_bbox(&bbox)),
            zoom,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.bbox.center()
    }

    /// Same zoom, new bbox, corners recomputed.
    pub fn with_bbox(&self, bbox: Bbox) -> Self {
        Self::new(bbox, self.zoom)
    }

    pub fn with_bbox_and_zoom(&self, bbox: Bbox, zoom: f64) -> Self {
        Self::new(bbox, zoom)
    }
}

/// One layer toggle inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerToggle {
    pub id: String,
    pub enabled: bool,
}

/// Hierarchical layer grouping. Membership is fixed at config time; the
/// `enabled` flags are the only mutable field. `LayerToggle::enabled` is
/// authoritative for rendering; `LayerGroup::enabled` is a shortcut-setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGroup {
    pub id: String,
    pub enabled: bool,
    pub layers: Vec<LayerToggle>,
}

/// Drive velocity in planar units/second. Ephemeral: exists only while a
/// drive input is active, never persisted.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }
}

#[cfg(test)]
mod tests {
    use planar::Bbox;
    use pretty_assertions::assert_eq;

    use super::{Corners, Viewport, is_legacy_layer};

    #[test]
    fn corners_follow_bbox() {
        let v = Viewport::new(Bbox::new(0.0, 0.0, 2.0, 4.0), 12.0);
        let c = v.corners.expect("corners");
        assert_eq!(c, Corners::from_bbox(&v.bbox));
        assert_eq!(c.ne.x, 2.0);
        assert_eq!(c.ne.y, 4.0);

        let moved = v.with_bbox(v.bbox.translated(1.0, 0.0));
        let c2 = moved.corners.expect("corners");
        assert_eq!(c2.sw.x, 1.0);
        assert_eq!(moved.zoom, 12.0);
    }

    #[test]
    fn legacy_ids() {
        assert!(is_legacy_layer("model"));
        assert!(is_legacy_layer("majorRoads"));
        assert!(!is_legacy_layer("hydro.rivers"));
    }

    #[test]
    fn viewport_wire_shape() {
        let v = Viewport::new(Bbox::new(4.0, 4.0, 6.0, 6.0), 14.0);
        let json = serde_json::to_value(&v).expect("serialize");
        assert_eq!(json["bbox"], serde_json::json!([4.0, 4.0, 6.0, 6.0]));
        assert_eq!(json["zoom"], serde_json::json!(14.0));
        assert_eq!(json["corners"]["sw"], serde_json::json!([4.0, 4.0]));

        // `corners` is optional on the way in.
        let bare: Viewport =
            serde_json::from_str(r#"{"bbox":[0.0,0.0,1.0,1.0],"zoom":10.0}"#).expect("parse");
        assert!(bare.corners.is_none());
    }
}
