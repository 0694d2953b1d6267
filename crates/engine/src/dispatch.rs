use std::collections::BTreeMap;

use planar::Polygon;
use protocol::{CommandSeq, Completion, PersistError};
use store::{AnimationState, LayerGroup, LayerState, SliceKind, StateStore, Viewport};

/// Pre-mutation copy of the one slice a command touches.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Viewport(Viewport),
    Layers(LayerState),
    LayerGroups(Vec<LayerGroup>),
    Animations(AnimationState),
    Bounds(Option<Polygon>),
}

impl Snapshot {
    pub fn slice(&self) -> SliceKind {
        match self {
            Snapshot::Viewport(_) => SliceKind::Viewport,
            Snapshot::Layers(_) => SliceKind::Layers,
            Snapshot::LayerGroups(_) => SliceKind::LayerGroups,
            Snapshot::Animations(_) => SliceKind::Animations,
            Snapshot::Bounds(_) => SliceKind::Bounds,
        }
    }
}

#[derive(Debug)]
struct Pending {
    snapshot: Snapshot,
    /// Slice generation right after the optimistic write, used to detect a
    /// rollback that a later command has superseded.
    generation_at_write: u64,
}

/// Bookkeeping for optimistic mutation with rollback.
///
/// Command methods capture the pre-mutation snapshot synchronously, apply
/// the optimistic write, then call `begin` so the failure path is always
/// well-defined. Sequence numbers are monotonic per session and echoed back
/// by the transport on completion.
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    next_seq: u64,
    pending: BTreeMap<CommandSeq, Pending>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// `true` while any discrete viewport command awaits completion.
    pub fn viewport_in_flight(&self) -> bool {
        self.pending
            .values()
            .any(|p| p.snapshot.slice() == SliceKind::Viewport)
    }

    /// Register a command whose optimistic write was just applied to the
    /// store. Must be called after the `set()`, so the recorded generation
    /// is the one the optimistic write produced.
    pub fn begin(&mut self, snapshot: Snapshot, store: &StateStore) -> CommandSeq {
        self.next_seq += 1;
        let seq = CommandSeq(self.next_seq);
        let generation_at_write = store.generation_of(snapshot.slice());
        self.pending.insert(
            seq,
            Pending {
                snapshot,
                generation_at_write,
            },
        );
        seq
    }

    /// Settle a command. On failure the pre-mutation snapshot is restored,
    /// unless a later write already superseded it. Returns `false` for an
    /// unknown (already settled) seq.
    pub fn complete(
        &mut self,
        seq: CommandSeq,
        result: Result<Completion, PersistError>,
        store: &mut StateStore,
    ) -> bool {
        let Some(pending) = self.pending.remove(&seq) else {
            tracing::warn!(seq = seq.0, "completion for unknown command seq");
            return false;
        };

        match result {
            Ok(Completion::Ack) => {}
            Ok(Completion::SavedBounds { bounds }) => {
                // Adopt the server-normalized polygon when one comes back.
                if let Some(polygon) = bounds {
                    store.bounds.set(Some(polygon));
                }
            }
            Err(err) => {
                let slice = pending.snapshot.slice();
                if store.generation_of(slice) != pending.generation_at_write {
                    tracing::warn!(
                        seq = seq.0,
                        error = %err,
                        "skipping rollback: slice superseded by a later write"
                    );
                } else {
                    tracing::debug!(seq = seq.0, error = %err, "persistence failed, rolling back");
                    restore(pending.snapshot, store);
                }
            }
        }
        true
    }
}

fn restore(snapshot: Snapshot, store: &mut StateStore) {
    match snapshot {
        Snapshot::Viewport(v) => store.viewport.set(v),
        Snapshot::Layers(l) => store.layers.set(l),
        Snapshot::LayerGroups(g) => store.layer_groups.set(g),
        Snapshot::Animations(a) => store.animations.set(a),
        Snapshot::Bounds(b) => store.bounds.set(b),
    }
}
