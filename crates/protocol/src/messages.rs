//! Inbound transport messages.
//!
//! The wire format is JSON, type-tagged with SCREAMING_SNAKE_CASE tags and
//! camelCase field names, matching what the backend broadcasts. The
//! transport abstraction (reconnect, framing) is an external collaborator;
//! this crate only defines the payloads.

use serde::{Deserialize, Serialize};
use store::{ClientId, Viewport};

/// Notification broadcast by the backend over the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    /// The authoritative viewport changed. The payload is optional: when
    /// absent, clients refetch the full state instead.
    #[serde(rename_all = "camelCase")]
    ViewportChanged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        viewport: Option<Viewport>,
        source_id: ClientId,
        #[serde(rename = "timestamp")]
        timestamp_ms: f64,
    },

    /// Another client's drive velocity, for renderers that draw it.
    VelocitySync { vx: f64, vy: f64 },

    /// Flat layer state changed; refetch.
    LayersChanged,

    /// Layer groups changed; refetch.
    LayerGroupsChanged,

    /// Animation toggles changed. Inline fields allow a single-key patch.
    #[serde(rename_all = "camelCase")]
    AnimationChanged {
        #[serde(default)]
        layer_id: Option<String>,
        #[serde(default)]
        enabled: Option<bool>,
    },

    /// The bounds polygon changed; refetch.
    BoundsChanged,
}

/// Transport lifecycle callbacks (not wire messages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Error { message: String },
}
