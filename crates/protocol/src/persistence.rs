//! Outbound persistence requests and their completions.
//!
//! The engine never performs I/O itself: command methods enqueue a
//! `PersistenceRequest` stamped with a fresh `CommandSeq`, the embedding
//! transport drains the queue, and later reports the result back through
//! `Session::complete(seq, result)`.

use planar::Polygon;
use serde::{Deserialize, Serialize};
use store::{AnimationState, ClientId, LayerGroup, LayerState, Viewport};

/// Monotonic per-session command identifier, echoed back on completion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandSeq(pub u64);

/// Why a full-state fetch is being requested.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchReason {
    Initial,
    ViewportChanged,
    LayersChanged,
    AnimationChanged,
    BoundsChanged,
}

/// Discrete viewport command, pre-validated client-side; the server
/// recomputes from `base_viewport` and is free to reject or normalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum CommandAction {
    Pan { direction: String, delta: f64 },
    Zoom { zoom: f64 },
}

/// Envelope for `executeCommand`: the action plus origin stamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    pub seq: CommandSeq,
    #[serde(flatten)]
    pub action: CommandAction,
    pub source_id: ClientId,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: f64,
    pub base_viewport: Viewport,
}

/// Request for the persistence API (external collaborator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PersistenceRequest {
    /// Fetch the full shared state; the result comes back through
    /// `Session::apply_snapshot`, not `complete`.
    FetchState { reason: FetchReason },

    ExecuteCommand(CommandEnvelope),

    /// Forwarded GIS drag-pan proposal. Not optimistically applied, so no
    /// seq: the server's own notification is the source of truth.
    #[serde(rename_all = "camelCase")]
    UpdateViewport {
        viewport: Viewport,
        source_id: ClientId,
        #[serde(rename = "timestamp")]
        timestamp_ms: f64,
    },

    UpdateLayers {
        seq: CommandSeq,
        layers: LayerState,
    },

    UpdateLayerGroups {
        seq: CommandSeq,
        groups: Vec<LayerGroup>,
    },

    UpdateAnimations {
        seq: CommandSeq,
        animations: AnimationState,
    },

    SaveBounds {
        seq: CommandSeq,
        polygon: Polygon,
    },

    /// Occasional velocity broadcast for other clients to render; the input
    /// device throttles this, not the engine.
    #[serde(rename_all = "camelCase")]
    VelocityUpdate {
        vx: f64,
        vy: f64,
        source_id: ClientId,
        #[serde(rename = "timestamp")]
        timestamp_ms: f64,
    },
}

impl PersistenceRequest {
    /// The seq this request expects a completion for, if any.
    pub fn seq(&self) -> Option<CommandSeq> {
        match self {
            Self::ExecuteCommand(envelope) => Some(envelope.seq),
            Self::UpdateLayers { seq, .. }
            | Self::UpdateLayerGroups { seq, .. }
            | Self::UpdateAnimations { seq, .. }
            | Self::SaveBounds { seq, .. } => Some(*seq),
            Self::FetchState { .. } | Self::UpdateViewport { .. } | Self::VelocityUpdate { .. } => {
                None
            }
        }
    }
}

/// Full shared state as returned by `getState`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(default)]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub layers: Option<LayerState>,
    #[serde(default)]
    pub layer_groups: Option<Vec<LayerGroup>>,
    #[serde(default)]
    pub animations: Option<AnimationState>,
    #[serde(default)]
    pub bounds: Option<Polygon>,
}

/// Successful completion payload for a sequenced request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Completion {
    Ack,
    /// `saveBounds` result; the server may return a normalized polygon.
    SavedBounds { bounds: Option<Polygon> },
}

/// A persistence call failed; the engine rolls back the optimistic write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistError {
    pub code: Option<String>,
    pub message: String,
}

impl PersistError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "persistence failed ({code}): {}", self.message),
            None => write!(f, "persistence failed: {}", self.message),
        }
    }
}

impl std::error::Error for PersistError {}
