use protocol::{FetchReason, Notification, PersistenceRequest};
use store::{StateStore, Velocity};

use crate::arbiter::{InboundVerdict, InteractionArbiter};
use crate::outbound::Outbound;

/// Maps inbound transport messages onto store updates.
///
/// Viewport notifications pass through the arbiter's self-echo and
/// staleness filters first. Layer and layer-group changes always refetch
/// the full state: the two representations are interdependent and partial
/// patching risks drift. Animation changes are independent, so an inline
/// payload patches a single key; otherwise they refetch too.
#[derive(Debug, Default)]
pub struct NotificationReconciler;

impl NotificationReconciler {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(
        &self,
        message: Notification,
        store: &mut StateStore,
        arbiter: &InteractionArbiter,
        outbound: &mut Outbound,
    ) {
        match message {
            Notification::ViewportChanged {
                viewport,
                source_id,
                timestamp_ms,
            } => match arbiter.filter_viewport_notification(&source_id, timestamp_ms) {
                InboundVerdict::DropSelfEcho => {
                    tracing::debug!(source = source_id.as_str(), "dropping self-echoed viewport");
                }
                InboundVerdict::DropStale => {
                    tracing::debug!(
                        timestamp_ms,
                        "dropping stale viewport notification"
                    );
                }
                InboundVerdict::Apply => match viewport {
                    // Embedded payload skips the refetch round trip.
                    Some(v) => store.viewport.set(v),
                    None => outbound.push(PersistenceRequest::FetchState {
                        reason: FetchReason::ViewportChanged,
                    }),
                },
            },

            Notification::VelocitySync { vx, vy } => {
                store.remote_velocity.set(Velocity::new(vx, vy));
            }

            Notification::LayersChanged | Notification::LayerGroupsChanged => {
                outbound.push(PersistenceRequest::FetchState {
                    reason: FetchReason::LayersChanged,
                });
            }

            Notification::AnimationChanged {
                layer_id: Some(layer_id),
                enabled: Some(enabled),
            } => {
                let mut animations = store.animations.get().cloned().unwrap_or_default();
                animations.insert(layer_id, enabled);
                store.animations.set(animations);
            }
            Notification::AnimationChanged { .. } => {
                outbound.push(PersistenceRequest::FetchState {
                    reason: FetchReason::AnimationChanged,
                });
            }

            Notification::BoundsChanged => {
                outbound.push(PersistenceRequest::FetchState {
                    reason: FetchReason::BoundsChanged,
                });
            }
        }
    }
}
