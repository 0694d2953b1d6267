//! The facade other modules depend on.
//!
//! One `Session` per application root, constructed explicitly and injected
//! into consumers. It mirrors backend state, arbitrates writers, integrates
//! drive velocity per frame, and runs every discrete command through the
//! optimistic-mutation-with-rollback path.
//!
//! No method panics or returns a Rust error for a guard refusal: commands
//! resolve to `CommandOutcome`, and a rejection is a silent no-op apart
//! from a trace event ("fail closed, fail quiet").

use planar::Polygon;
use protocol::{
    CommandAction, CommandEnvelope, CommandSeq, Completion, FetchReason, Notification,
    PersistError, PersistenceRequest, StateSnapshot, TransportEvent,
};
use store::{
    AnimationState, ClientId, LayerGroup, LayerState, StateStore, SubscriberId, Velocity,
    Viewport, is_legacy_layer,
};

use crate::arbiter::{GisVerdict, InteractionArbiter};
use crate::config::SessionConfig;
use crate::dispatch::{CommandDispatcher, Snapshot};
use crate::drive::{TickOutcome, VelocityIntegrator};
use crate::guard;
use crate::outbound::Outbound;
use crate::reconcile::NotificationReconciler;

/// Why a command was refused. Every rejection is a no-op: no store write,
/// nothing enqueued.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Transport is down; all commands are no-ops until reconnect.
    Disconnected,
    /// The relevant state slice has not been fetched yet.
    NotReady,
    /// The candidate viewport center would leave the bounds polygon.
    OutOfBounds,
    /// Another writer currently owns the viewport.
    InteractionGuard,
    /// `save_bounds` with fewer than 3 vertices.
    InvalidBounds { vertices: usize },
    /// A group toggle named a group that does not exist.
    UnknownGroup,
}

/// Resolution of a command method.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Optimistically applied and enqueued; settle via `complete(seq, ..)`.
    Accepted(CommandSeq),
    /// Forwarded to persistence without a local write (GIS proposals).
    Forwarded,
    Rejected(RejectReason),
}

impl CommandOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_) | Self::Forwarded)
    }

    pub fn seq(&self) -> Option<CommandSeq> {
        match self {
            Self::Accepted(seq) => Some(*seq),
            _ => None,
        }
    }
}

/// Client-side constrained viewport synchronization engine.
pub struct Session {
    config: SessionConfig,
    store: StateStore,
    drive: VelocityIntegrator,
    arbiter: InteractionArbiter,
    dispatcher: CommandDispatcher,
    reconciler: NotificationReconciler,
    outbound: Outbound,
}

impl Session {
    pub fn new(config: SessionConfig, client_id: ClientId) -> Self {
        let arbiter = InteractionArbiter::new(client_id, config.staleness_window_ms);
        Self {
            config,
            store: StateStore::new(),
            drive: VelocityIntegrator::new(),
            arbiter,
            dispatcher: CommandDispatcher::new(),
            reconciler: NotificationReconciler::new(),
            outbound: Outbound::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn client_id(&self) -> &ClientId {
        self.arbiter.client_id()
    }

    // --- reads ---

    pub fn connected(&self) -> bool {
        self.store.connected()
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.store.viewport.get()
    }

    pub fn layers(&self) -> Option<&LayerState> {
        self.store.layers.get()
    }

    pub fn layer_groups(&self) -> Option<&[LayerGroup]> {
        self.store.layer_groups.get().map(Vec::as_slice)
    }

    pub fn animations(&self) -> Option<&AnimationState> {
        self.store.animations.get()
    }

    pub fn bounds(&self) -> Option<&Polygon> {
        self.store.bounds_polygon()
    }

    pub fn remote_velocity(&self) -> Option<Velocity> {
        self.store.remote_velocity.get().copied()
    }

    pub fn commands_in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    // --- subscriptions (replay current value, then every set) ---

    pub fn subscribe_viewport(&mut self, cb: impl FnMut(&Viewport) + 'static) -> SubscriberId {
        self.store.viewport.subscribe(cb)
    }

    pub fn unsubscribe_viewport(&mut self, id: SubscriberId) -> bool {
        self.store.viewport.unsubscribe(id)
    }

    pub fn subscribe_layers(&mut self, cb: impl FnMut(&LayerState) + 'static) -> SubscriberId {
        self.store.layers.subscribe(cb)
    }

    pub fn unsubscribe_layers(&mut self, id: SubscriberId) -> bool {
        self.store.layers.unsubscribe(id)
    }

    pub fn subscribe_layer_groups(
        &mut self,
        cb: impl FnMut(&Vec<LayerGroup>) + 'static,
    ) -> SubscriberId {
        self.store.layer_groups.subscribe(cb)
    }

    pub fn unsubscribe_layer_groups(&mut self, id: SubscriberId) -> bool {
        self.store.layer_groups.unsubscribe(id)
    }

    pub fn subscribe_animations(
        &mut self,
        cb: impl FnMut(&AnimationState) + 'static,
    ) -> SubscriberId {
        self.store.animations.subscribe(cb)
    }

    pub fn unsubscribe_animations(&mut self, id: SubscriberId) -> bool {
        self.store.animations.unsubscribe(id)
    }

    pub fn subscribe_bounds(
        &mut self,
        cb: impl FnMut(&Option<Polygon>) + 'static,
    ) -> SubscriberId {
        self.store.bounds.subscribe(cb)
    }

    pub fn unsubscribe_bounds(&mut self, id: SubscriberId) -> bool {
        self.store.bounds.unsubscribe(id)
    }

    pub fn subscribe_connection(&mut self, cb: impl FnMut(&bool) + 'static) -> SubscriberId {
        self.store.connection.subscribe(cb)
    }

    pub fn unsubscribe_connection(&mut self, id: SubscriberId) -> bool {
        self.store.connection.unsubscribe(id)
    }

    pub fn subscribe_remote_velocity(
        &mut self,
        cb: impl FnMut(&Velocity) + 'static,
    ) -> SubscriberId {
        self.store.remote_velocity.subscribe(cb)
    }

    pub fn unsubscribe_remote_velocity(&mut self, id: SubscriberId) -> bool {
        self.store.remote_velocity.unsubscribe(id)
    }

    // --- discrete commands ---

    /// Pan one default step (`default_pan_delta` of the viewport extent).
    pub fn pan(&mut self, direction: &str, now_ms: f64) -> CommandOutcome {
        self.pan_by(direction, self.config.default_pan_delta, now_ms)
    }

    pub fn pan_by(&mut self, direction: &str, delta: f64, now_ms: f64) -> CommandOutcome {
        let current = match self.current_viewport() {
            Ok(v) => v,
            Err(reason) => return CommandOutcome::Rejected(reason),
        };

        let candidate = guard::pan_viewport(&current, direction, delta);
        if !self.candidate_inside(&candidate) {
            tracing::debug!(direction, delta, "pan rejected: candidate outside bounds");
            return CommandOutcome::Rejected(RejectReason::OutOfBounds);
        }

        let seq = self.commit_viewport(current.clone(), candidate, now_ms);
        self.outbound
            .push(PersistenceRequest::ExecuteCommand(CommandEnvelope {
                seq,
                action: CommandAction::Pan {
                    direction: direction.to_string(),
                    delta,
                },
                source_id: self.arbiter.client_id().clone(),
                timestamp_ms: now_ms,
                base_viewport: current,
            }));
        CommandOutcome::Accepted(seq)
    }

    /// Zoom to an absolute level, clamped into the configured range.
    pub fn zoom(&mut self, new_zoom: f64, now_ms: f64) -> CommandOutcome {
        let current = match self.current_viewport() {
            Ok(v) => v,
            Err(reason) => return CommandOutcome::Rejected(reason),
        };

        let clamped = new_zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        let candidate = guard::zoom_viewport(&current, clamped);
        if !self.candidate_inside(&candidate) {
            tracing::debug!(zoom = clamped, "zoom rejected: candidate outside bounds");
            return CommandOutcome::Rejected(RejectReason::OutOfBounds);
        }

        let seq = self.commit_viewport(current.clone(), candidate, now_ms);
        self.outbound
            .push(PersistenceRequest::ExecuteCommand(CommandEnvelope {
                seq,
                action: CommandAction::Zoom { zoom: clamped },
                source_id: self.arbiter.client_id().clone(),
                timestamp_ms: now_ms,
                base_viewport: current,
            }));
        CommandOutcome::Accepted(seq)
    }

    /// Toggle a single layer. Legacy ids mutate the flat map; other ids
    /// resolve as `group.layer` against the group hierarchy, falling back
    /// to the flat map when the groups are unavailable or the id does not
    /// resolve.
    pub fn toggle_layer(&mut self, layer_id: &str, enabled: bool) -> CommandOutcome {
        if !self.connected() {
            return CommandOutcome::Rejected(RejectReason::Disconnected);
        }

        if !is_legacy_layer(layer_id)
            && let Some((group_idx, layer_idx)) = self.resolve_group_layer(layer_id)
        {
            let groups = match self.store.layer_groups.get().cloned() {
                Some(g) => g,
                None => return CommandOutcome::Rejected(RejectReason::NotReady),
            };
            let snapshot = Snapshot::LayerGroups(groups.clone());
            let mut updated = groups;
            updated[group_idx].layers[layer_idx].enabled = enabled;
            self.store.layer_groups.set(updated.clone());
            let seq = self.dispatcher.begin(snapshot, &self.store);
            self.outbound.push(PersistenceRequest::UpdateLayerGroups {
                seq,
                groups: updated,
            });
            return CommandOutcome::Accepted(seq);
        }

        // Flat legacy map, also the fallback for unresolvable ids.
        let layers = self.store.layers.get().cloned().unwrap_or_default();
        let snapshot = Snapshot::Layers(layers.clone());
        let mut updated = layers;
        updated.insert(layer_id.to_string(), enabled);
        self.store.layers.set(updated.clone());
        let seq = self.dispatcher.begin(snapshot, &self.store);
        self.outbound.push(PersistenceRequest::UpdateLayers {
            seq,
            layers: updated,
        });
        CommandOutcome::Accepted(seq)
    }

    /// Toggle a whole group: sets `group.enabled` and cascades to every
    /// layer inside it. Rendering still treats each layer's own flag as
    /// authoritative; the group flag is only a shortcut-setter.
    pub fn toggle_group(&mut self, group_id: &str, enabled: bool) -> CommandOutcome {
        if !self.connected() {
            return CommandOutcome::Rejected(RejectReason::Disconnected);
        }
        let groups = match self.store.layer_groups.get().cloned() {
            Some(g) => g,
            None => return CommandOutcome::Rejected(RejectReason::NotReady),
        };
        let Some(group_idx) = groups.iter().position(|g| g.id == group_id) else {
            tracing::debug!(group_id, "toggle_group: unknown group");
            return CommandOutcome::Rejected(RejectReason::UnknownGroup);
        };

        let snapshot = Snapshot::LayerGroups(groups.clone());
        let mut updated = groups;
        updated[group_idx].enabled = enabled;
        for layer in &mut updated[group_idx].layers {
            layer.enabled = enabled;
        }
        self.store.layer_groups.set(updated.clone());
        let seq = self.dispatcher.begin(snapshot, &self.store);
        self.outbound.push(PersistenceRequest::UpdateLayerGroups {
            seq,
            groups: updated,
        });
        CommandOutcome::Accepted(seq)
    }

    pub fn toggle_animation(&mut self, layer_id: &str, enabled: bool) -> CommandOutcome {
        if !self.connected() {
            return CommandOutcome::Rejected(RejectReason::Disconnected);
        }
        let animations = self.store.animations.get().cloned().unwrap_or_default();
        let snapshot = Snapshot::Animations(animations.clone());
        let mut updated = animations;
        updated.insert(layer_id.to_string(), enabled);
        self.store.animations.set(updated.clone());
        let seq = self.dispatcher.begin(snapshot, &self.store);
        self.outbound.push(PersistenceRequest::UpdateAnimations {
            seq,
            animations: updated,
        });
        CommandOutcome::Accepted(seq)
    }

    /// Propose a replacement bounds polygon. Fails fast, with no network
    /// call, on fewer than 3 vertices.
    pub fn save_bounds(&mut self, polygon: Polygon) -> CommandOutcome {
        if !self.connected() {
            return CommandOutcome::Rejected(RejectReason::Disconnected);
        }
        if polygon.len() < 3 {
            tracing::debug!(
                vertices = polygon.len(),
                "save_bounds rejected: polygon needs at least 3 vertices"
            );
            return CommandOutcome::Rejected(RejectReason::InvalidBounds {
                vertices: polygon.len(),
            });
        }

        let snapshot = Snapshot::Bounds(self.store.bounds.get().cloned().unwrap_or(None));
        self.store.bounds.set(Some(polygon.clone()));
        let seq = self.dispatcher.begin(snapshot, &self.store);
        self.outbound
            .push(PersistenceRequest::SaveBounds { seq, polygon });
        CommandOutcome::Accepted(seq)
    }

    // --- continuous drive ---

    /// Feed the drive velocity read by the next `tick`. Purely local; use
    /// `publish_velocity` to broadcast it for other clients.
    pub fn send_velocity(&mut self, vx: f64, vy: f64, now_ms: f64) {
        if !self.connected() {
            return;
        }
        self.drive.set_velocity(vx, vy, now_ms);
    }

    /// Enqueue the current drive velocity for other clients to render. The
    /// input device throttles calls to this (≤ ~10/sec), not the engine.
    pub fn publish_velocity(&mut self, now_ms: f64) {
        if !self.connected() {
            return;
        }
        let velocity = self.drive.velocity();
        self.outbound.push(PersistenceRequest::VelocityUpdate {
            vx: velocity.vx,
            vy: velocity.vy,
            source_id: self.arbiter.client_id().clone(),
            timestamp_ms: now_ms,
        });
    }

    pub fn drive_moving(&self) -> bool {
        self.drive.is_moving()
    }

    /// One frame of velocity integration. Commits straight to the store —
    /// no network round trip per frame.
    pub fn tick(&mut self, now_ms: f64) -> TickOutcome {
        let Some(viewport) = self.store.viewport.get().cloned() else {
            return TickOutcome::NoChange;
        };
        let outcome = self.drive.tick(
            now_ms,
            &viewport,
            self.store.bounds_polygon(),
            self.config.max_tick_dt_s,
            self.config.containment_epsilon,
        );
        if let TickOutcome::Moved(moved) = &outcome {
            self.arbiter.note_local_write(now_ms);
            self.store.viewport.set(moved.clone());
        }
        outcome
    }

    // --- GIS drag-pan ---

    /// A drag-pan proposal from the GIS surface. Accepted proposals are
    /// forwarded to persistence without a local write: the server's own
    /// notification is the source of truth, which avoids feedback with a
    /// conflicting locally-queued pan.
    pub fn propose_gis_viewport(&mut self, viewport: Viewport, now_ms: f64) -> CommandOutcome {
        if !self.connected() {
            return CommandOutcome::Rejected(RejectReason::Disconnected);
        }
        match self
            .arbiter
            .gis_verdict(self.drive.is_moving(), self.dispatcher.viewport_in_flight())
        {
            GisVerdict::RejectInteractionGuard => {
                tracing::debug!("gis viewport rejected: another writer owns the viewport");
                CommandOutcome::Rejected(RejectReason::InteractionGuard)
            }
            GisVerdict::Forward => {
                self.outbound.push(PersistenceRequest::UpdateViewport {
                    viewport,
                    source_id: self.arbiter.client_id().clone(),
                    timestamp_ms: now_ms,
                });
                CommandOutcome::Forwarded
            }
        }
    }

    // --- transport inbound ---

    pub fn handle_notification(&mut self, message: Notification) {
        self.reconciler
            .apply(message, &mut self.store, &self.arbiter, &mut self.outbound);
    }

    pub fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.store.connection.set(true);
                self.outbound.push(PersistenceRequest::FetchState {
                    reason: FetchReason::Initial,
                });
            }
            TransportEvent::Disconnected => {
                self.store.connection.set(false);
            }
            TransportEvent::Error { message } => {
                tracing::warn!(message = %message, "transport error");
                self.store.connection.set(false);
            }
        }
    }

    /// Apply a full-state fetch result. Idempotent; used for the initial
    /// fetch and every refetch.
    pub fn apply_snapshot(&mut self, snapshot: StateSnapshot) {
        if let Some(viewport) = snapshot.viewport {
            self.store.viewport.set(viewport);
        }
        if let Some(layers) = snapshot.layers {
            self.store.layers.set(layers);
        }
        if let Some(groups) = snapshot.layer_groups {
            self.store.layer_groups.set(groups);
        }
        if let Some(animations) = snapshot.animations {
            self.store.animations.set(animations);
        }
        // Absent bounds means unconstrained, which is itself state.
        self.store.bounds.set(snapshot.bounds);
    }

    /// Settle a previously enqueued command.
    pub fn complete(
        &mut self,
        seq: CommandSeq,
        result: Result<Completion, PersistError>,
    ) -> bool {
        self.dispatcher.complete(seq, result, &mut self.store)
    }

    // --- transport outbound ---

    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    pub fn peek_outbound(&self) -> &[PersistenceRequest] {
        self.outbound.peek()
    }

    pub fn drain_outbound(&mut self) -> Vec<PersistenceRequest> {
        self.outbound.drain()
    }

    // --- helpers ---

    fn current_viewport(&self) -> Result<Viewport, RejectReason> {
        if !self.connected() {
            return Err(RejectReason::Disconnected);
        }
        self.store
            .viewport
            .get()
            .cloned()
            .ok_or(RejectReason::NotReady)
    }

    fn candidate_inside(&self, candidate: &Viewport) -> bool {
        guard::is_inside_bounds(
            candidate,
            self.store.bounds_polygon(),
            self.config.containment_epsilon,
        )
    }

    /// Optimistic viewport write shared by pan and zoom: snapshot, write,
    /// register with the dispatcher.
    fn commit_viewport(&mut self, previous: Viewport, candidate: Viewport, now_ms: f64) -> CommandSeq {
        let snapshot = Snapshot::Viewport(previous);
        self.store.viewport.set(candidate);
        self.arbiter.note_local_write(now_ms);
        self.dispatcher.begin(snapshot, &self.store)
    }

    fn resolve_group_layer(&self, layer_id: &str) -> Option<(usize, usize)> {
        let (group_id, rest) = layer_id.split_once('.')?;
        let groups = self.store.layer_groups.get()?;
        let group_idx = groups.iter().position(|g| g.id == group_id)?;
        let layer_idx = groups[group_idx]
            .layers
            .iter()
            .position(|l| l.id == rest)?;
        Some((group_idx, layer_idx))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client_id", self.arbiter.client_id())
            .field("connected", &self.connected())
            .field("drive_moving", &self.drive.is_moving())
            .field("in_flight", &self.dispatcher.in_flight())
            .field("pending_outbound", &self.outbound.len())
            .finish()
    }
}
