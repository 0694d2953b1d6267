use planar::Polygon;

use crate::model::{AnimationState, LayerGroup, LayerState, Velocity, Viewport};
use crate::slot::Slot;

/// Slices of shared state that optimistic commands can mutate and roll back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SliceKind {
    Viewport,
    Layers,
    LayerGroups,
    Animations,
    Bounds,
}

/// Typed per-slice cache of the backend's shared state.
///
/// One `Slot` per slice; every slot carries its own subscribers and write
/// generation. The store itself has no opinions about who may write — that
/// is the arbiter's job, enforced inside the session facade.
#[derive(Debug, Default)]
pub struct StateStore {
    pub viewport: Slot<Viewport>,
    pub layers: Slot<LayerState>,
    pub layer_groups: Slot<Vec<LayerGroup>>,
    pub animations: Slot<AnimationState>,
    pub bounds: Slot<Option<Polygon>>,
    pub connection: Slot<bool>,
    pub remote_velocity: Slot<Velocity>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(&self) -> bool {
        self.connection.get().copied().unwrap_or(false)
    }

    /// The cached bounds polygon, if any. `None` means unconstrained.
    pub fn bounds_polygon(&self) -> Option<&Polygon> {
        self.bounds.get().and_then(|b| b.as_ref())
    }

    pub fn generation_of(&self, slice: SliceKind) -> u64 {
        match slice {
            SliceKind::Viewport => self.viewport.generation(),
            SliceKind::Layers => self.layers.generation(),
            SliceKind::LayerGroups => self.layer_groups.generation(),
            SliceKind::Animations => self.animations.generation(),
            SliceKind::Bounds => self.bounds.generation(),
        }
    }
}
