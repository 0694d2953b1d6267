use std::cell::RefCell;
use std::rc::Rc;

use engine::{CommandOutcome, RejectReason, Session, SessionConfig, TickOutcome};
use planar::{Bbox, Polygon, Vec2};
use pretty_assertions::assert_eq;
use protocol::{
    Completion, FetchReason, Notification, PersistError, PersistenceRequest, StateSnapshot,
    TransportEvent,
};
use store::{ClientId, LayerGroup, LayerToggle, Viewport};

fn square_bounds() -> Polygon {
    Polygon::new(vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(10.0, 0.0),
        Vec2::new(10.0, 10.0),
        Vec2::new(0.0, 10.0),
    ])
}

fn groups_fixture() -> Vec<LayerGroup> {
    vec![
        LayerGroup {
            id: "g1".into(),
            enabled: true,
            layers: vec![
                LayerToggle {
                    id: "a".into(),
                    enabled: true,
                },
                LayerToggle {
                    id: "b".into(),
                    enabled: false,
                },
            ],
        },
        LayerGroup {
            id: "g2".into(),
            enabled: true,
            layers: vec![LayerToggle {
                id: "c".into(),
                enabled: true,
            }],
        },
    ]
}

/// Connect, drain the initial fetch, and apply a snapshot: a square bounds
/// polygon and a viewport centered inside it.
fn connected_session() -> Session {
    let mut session = Session::new(SessionConfig::default(), ClientId::new("local"));
    session.handle_transport(TransportEvent::Connected);

    let initial = session.drain_outbound();
    assert_eq!(
        initial,
        vec![PersistenceRequest::FetchState {
            reason: FetchReason::Initial
        }]
    );

    session.apply_snapshot(StateSnapshot {
        viewport: Some(Viewport::new(Bbox::new(4.0, 4.0, 6.0, 6.0), 14.0)),
        layers: Some(
            [("roads".to_string(), true), ("model".to_string(), true)]
                .into_iter()
                .collect(),
        ),
        layer_groups: Some(groups_fixture()),
        animations: Some([("storm".to_string(), false)].into_iter().collect()),
        bounds: Some(square_bounds()),
    });
    session
}

#[test]
fn pan_east_walks_to_the_wall_and_stops() {
    let mut session = connected_session();

    // Center (5,5) -> (7,5): inside.
    assert!(session.pan_by("east", 1.0, 100.0).is_accepted());
    assert_eq!(
        session.viewport().map(|v| v.bbox),
        Some(Bbox::new(6.0, 4.0, 8.0, 6.0))
    );

    // (7,5) -> (9,5): still inside.
    assert!(session.pan_by("east", 1.0, 200.0).is_accepted());
    assert_eq!(
        session.viewport().map(|v| v.bbox),
        Some(Bbox::new(8.0, 4.0, 10.0, 6.0))
    );

    // (9,5) -> (11,5): outside, silently dropped.
    let outcome = session.pan_by("east", 1.0, 300.0);
    assert_eq!(outcome, CommandOutcome::Rejected(RejectReason::OutOfBounds));
    assert_eq!(
        session.viewport().map(|v| v.bbox),
        Some(Bbox::new(8.0, 4.0, 10.0, 6.0))
    );

    // Exactly the two accepted commands were enqueued.
    let sent = session.drain_outbound();
    assert_eq!(sent.len(), 2);
    assert!(sent
        .iter()
        .all(|r| matches!(r, PersistenceRequest::ExecuteCommand { .. })));
}

#[test]
fn noop_zoom_keeps_the_bbox_identical() {
    let mut session = connected_session();
    let before = session.viewport().cloned().expect("viewport");

    assert!(session.zoom(before.zoom, 50.0).is_accepted());
    let after = session.viewport().cloned().expect("viewport");
    assert_eq!(after.bbox, before.bbox);
    assert_eq!(after.zoom, before.zoom);
}

#[test]
fn zoom_clamps_into_range() {
    let mut session = connected_session();
    assert!(session.zoom(42.0, 50.0).is_accepted());
    assert_eq!(session.viewport().map(|v| v.zoom), Some(19.0));

    assert!(session.zoom(1.0, 60.0).is_accepted());
    assert_eq!(session.viewport().map(|v| v.zoom), Some(10.0));
}

#[test]
fn failed_toggle_layer_rolls_back_exactly() {
    let mut session = connected_session();
    let before = session.layers().cloned().expect("layers");

    let outcome = session.toggle_layer("roads", false);
    let seq = outcome.seq().expect("accepted");
    assert_eq!(session.layers().and_then(|l| l.get("roads")).copied(), Some(false));

    assert!(session.complete(seq, Err(PersistError::new("db down"))));
    assert_eq!(session.layers(), Some(&before));
}

#[test]
fn superseded_failure_does_not_clobber_the_newer_toggle() {
    let mut session = connected_session();

    let first = session.toggle_layer("roads", false).seq().expect("first");
    let _second = session.toggle_layer("model", false).seq().expect("second");

    // The slow first command fails after the second already wrote the
    // layers slice; its rollback must be skipped.
    session.complete(first, Err(PersistError::new("timeout")));
    assert_eq!(session.layers().and_then(|l| l.get("model")).copied(), Some(false));
}

#[test]
fn toggle_grouped_layer_and_flat_fallback() {
    let mut session = connected_session();

    assert!(session.toggle_layer("g1.b", true).is_accepted());
    let groups = session.layer_groups().expect("groups");
    assert!(groups[0].layers[1].enabled);

    // Unresolvable id falls back to the flat map.
    assert!(session.toggle_layer("mystery", true).is_accepted());
    assert_eq!(
        session.layers().and_then(|l| l.get("mystery")).copied(),
        Some(true)
    );
}

#[test]
fn toggle_group_cascades_and_leaves_other_groups_alone() {
    let mut session = connected_session();

    assert!(session.toggle_group("g1", false).is_accepted());
    let groups = session.layer_groups().expect("groups");
    assert!(!groups[0].enabled);
    assert!(groups[0].layers.iter().all(|l| !l.enabled));
    assert!(groups[1].enabled);
    assert!(groups[1].layers.iter().all(|l| l.enabled));

    assert_eq!(
        session.toggle_group("nope", true),
        CommandOutcome::Rejected(RejectReason::UnknownGroup)
    );
}

#[test]
fn save_bounds_validates_before_any_network_call() {
    let mut session = connected_session();
    session.drain_outbound();

    let degenerate = Polygon::new(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
    assert_eq!(
        session.save_bounds(degenerate),
        CommandOutcome::Rejected(RejectReason::InvalidBounds { vertices: 2 })
    );
    assert_eq!(session.pending_outbound(), 0);
    assert_eq!(session.bounds(), Some(&square_bounds()));
}

#[test]
fn save_bounds_adopts_normalized_and_reverts_on_failure() {
    let mut session = connected_session();

    let proposed = Polygon::new(vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(20.0, 0.0),
        Vec2::new(0.0, 20.0),
    ]);
    let seq = session.save_bounds(proposed.clone()).seq().expect("seq");
    assert_eq!(session.bounds(), Some(&proposed));

    let normalized = Polygon::new(vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(20.0, 0.0),
        Vec2::new(20.0, 20.0),
        Vec2::new(0.0, 20.0),
    ]);
    session.complete(
        seq,
        Ok(Completion::SavedBounds {
            bounds: Some(normalized.clone()),
        }),
    );
    assert_eq!(session.bounds(), Some(&normalized));

    // A second proposal whose persistence fails reverts to the adopted one.
    let seq = session
        .save_bounds(proposed.clone())
        .seq()
        .expect("second seq");
    session.complete(seq, Err(PersistError::new("rejected")));
    assert_eq!(session.bounds(), Some(&normalized));
}

#[test]
fn self_echo_never_reaches_viewport_subscribers() {
    let mut session = connected_session();

    let notifications = Rc::new(RefCell::new(0usize));
    let counter = notifications.clone();
    session.subscribe_viewport(move |_| *counter.borrow_mut() += 1);
    assert_eq!(*notifications.borrow(), 1); // replay of the current value

    session.handle_notification(Notification::ViewportChanged {
        viewport: Some(Viewport::new(Bbox::new(0.0, 0.0, 1.0, 1.0), 12.0)),
        source_id: ClientId::new("local"),
        timestamp_ms: 999_999.0,
    });
    assert_eq!(*notifications.borrow(), 1);
    assert_eq!(
        session.viewport().map(|v| v.bbox),
        Some(Bbox::new(4.0, 4.0, 6.0, 6.0))
    );
}

#[test]
fn stale_notification_is_dropped() {
    let mut session = connected_session();

    // A local write at t=1000 sets the staleness reference.
    assert!(session.pan_by("east", 0.1, 1000.0).is_accepted());
    let current = session.viewport().cloned().expect("viewport");

    session.handle_notification(Notification::ViewportChanged {
        viewport: Some(Viewport::new(Bbox::new(0.0, 0.0, 1.0, 1.0), 12.0)),
        source_id: ClientId::new("other"),
        timestamp_ms: 700.0,
    });
    assert_eq!(session.viewport(), Some(&current));

    // Inside the 200 ms window it applies.
    let fresh = Viewport::new(Bbox::new(1.0, 1.0, 3.0, 3.0), 12.0);
    session.handle_notification(Notification::ViewportChanged {
        viewport: Some(fresh.clone()),
        source_id: ClientId::new("other"),
        timestamp_ms: 900.0,
    });
    assert_eq!(session.viewport(), Some(&fresh));
}

#[test]
fn drive_slides_along_the_north_wall() {
    let mut session = connected_session();
    session.apply_snapshot(StateSnapshot {
        viewport: Some(Viewport::new(Bbox::new(4.0, 8.0, 6.0, 10.0), 14.0)),
        bounds: Some(square_bounds()),
        ..StateSnapshot::default()
    });

    session.send_velocity(1.0, 20.0, 0.0);
    match session.tick(100.0) {
        TickOutcome::Moved(v) => assert_eq!(v.bbox, Bbox::new(4.1, 8.0, 6.1, 10.0)),
        other => panic!("expected Moved, got {other:?}"),
    }
    assert!(session.drive_moving());
}

#[test]
fn gis_proposals_yield_to_active_writers() {
    let mut session = connected_session();
    let proposal = Viewport::new(Bbox::new(3.0, 3.0, 5.0, 5.0), 14.0);

    // Remote discrete command in flight: gis loses.
    let seq = session.pan_by("east", 0.1, 10.0).seq().expect("seq");
    assert_eq!(
        session.propose_gis_viewport(proposal.clone(), 20.0),
        CommandOutcome::Rejected(RejectReason::InteractionGuard)
    );
    session.complete(seq, Ok(Completion::Ack));

    // Drive active: gis loses.
    session.send_velocity(1.0, 0.0, 30.0);
    assert_eq!(
        session.propose_gis_viewport(proposal.clone(), 40.0),
        CommandOutcome::Rejected(RejectReason::InteractionGuard)
    );
    session.send_velocity(0.0, 0.0, 50.0);

    // Free: forwarded to persistence, not written locally.
    let before = session.viewport().cloned().expect("viewport");
    session.drain_outbound();
    assert_eq!(
        session.propose_gis_viewport(proposal.clone(), 60.0),
        CommandOutcome::Forwarded
    );
    assert_eq!(session.viewport(), Some(&before));
    let sent = session.drain_outbound();
    assert!(matches!(
        sent.as_slice(),
        [PersistenceRequest::UpdateViewport { viewport, .. }] if *viewport == proposal
    ));
}

#[test]
fn disconnected_session_ignores_every_command() {
    let mut session = connected_session();
    session.handle_transport(TransportEvent::Disconnected);
    session.drain_outbound();

    assert_eq!(
        session.pan("east", 10.0),
        CommandOutcome::Rejected(RejectReason::Disconnected)
    );
    assert_eq!(
        session.toggle_layer("roads", false),
        CommandOutcome::Rejected(RejectReason::Disconnected)
    );
    assert_eq!(
        session.save_bounds(square_bounds()),
        CommandOutcome::Rejected(RejectReason::Disconnected)
    );
    session.send_velocity(1.0, 0.0, 10.0);
    assert!(!session.drive_moving());
    assert_eq!(session.pending_outbound(), 0);
}

#[test]
fn transport_error_counts_as_disconnect() {
    let mut session = connected_session();
    session.handle_transport(TransportEvent::Error {
        message: "socket closed".into(),
    });
    assert!(!session.connected());
}

#[test]
fn layers_changed_notification_triggers_refetch_and_snapshot_applies() {
    let mut session = connected_session();
    session.drain_outbound();

    session.handle_notification(Notification::LayersChanged);
    let sent = session.drain_outbound();
    assert_eq!(
        sent,
        vec![PersistenceRequest::FetchState {
            reason: FetchReason::LayersChanged
        }]
    );

    let mut groups = groups_fixture();
    groups[0].enabled = false;
    session.apply_snapshot(StateSnapshot {
        layer_groups: Some(groups.clone()),
        ..StateSnapshot::default()
    });
    assert_eq!(session.layer_groups(), Some(groups.as_slice()));
}

#[test]
fn publish_velocity_stamps_source_and_timestamp() {
    let mut session = connected_session();
    session.drain_outbound();

    session.send_velocity(2.0, -1.0, 100.0);
    session.publish_velocity(120.0);
    let sent = session.drain_outbound();
    match sent.as_slice() {
        [PersistenceRequest::VelocityUpdate {
            vx,
            vy,
            source_id,
            timestamp_ms,
        }] => {
            assert_eq!((*vx, *vy), (2.0, -1.0));
            assert_eq!(source_id, &ClientId::new("local"));
            assert_eq!(*timestamp_ms, 120.0);
        }
        other => panic!("unexpected outbound: {other:?}"),
    }
}
