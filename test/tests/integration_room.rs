/// Room lifecycle, outbound envelopes, and the legacy document mode.
use serde_json::json;

use replica_client::{Envelope, OpCode, PatchOp, Room, RoomLifecycle};
use replica_shared::{ChangeBatch, ChangeKey, ChangeOp, ChangeRecord, NodeRegistry, Value};

use replica_test::{player_record, Recorder, TestTransport};

fn test_room(name: &str) -> (Room, TestTransport) {
    let _ = env_logger::builder().is_test(true).try_init();
    let transport = TestTransport::new();
    let room = Room::new(name, Box::new(transport.clone()));
    log::info!("created test room {}", name);
    (room, transport)
}

#[test]
fn set_id_fires_join_on_every_assignment() {
    let (mut room, _transport) = test_room("arena");
    let recorder = Recorder::new();

    assert_eq!(room.id(), 0);
    assert_eq!(room.lifecycle(), RoomLifecycle::Detached);

    let log = recorder.clone();
    room.on_join(move || log.push("join"));

    room.set_id(5);
    assert_eq!(room.id(), 5);
    assert_eq!(room.lifecycle(), RoomLifecycle::Joined);
    assert_eq!(recorder.count_of("join"), 1);

    // assignment, not transition, is the trigger
    room.set_id(5);
    assert_eq!(recorder.count_of("join"), 2);
}

#[test]
fn send_wraps_payload_in_data_envelope() {
    let (mut room, transport) = test_room("arena");
    room.set_id(5);

    room.send(json!({"move": "north"})).unwrap();

    let sent = transport.sent();
    assert_eq!(
        sent,
        vec![Envelope::RoomData {
            room_id: 5,
            payload: json!({"move": "north"}),
        }]
    );
    assert_eq!(sent[0].opcode(), OpCode::RoomData);
    assert_eq!(sent[0].encode(), json!([13, 5, {"move": "north"}]));
}

#[test]
fn graceful_leave_waits_for_server_teardown() {
    let (mut room, transport) = test_room("arena");
    let recorder = Recorder::new();
    let log = recorder.clone();
    room.on_leave(move || log.push("leave"));

    room.set_id(5);
    room.leave(true).unwrap();

    assert_eq!(room.lifecycle(), RoomLifecycle::Leaving);
    assert_eq!(transport.sent(), vec![Envelope::LeaveRoom { room_id: 5 }]);
    assert_eq!(transport.sent()[0].encode(), json!([12, 5]));
    // no synchronous leave event
    assert!(recorder.entries().is_empty());

    room.confirm_leave();
    assert_eq!(room.lifecycle(), RoomLifecycle::Left);
    assert_eq!(recorder.take(), vec!["leave"]);
}

#[test]
fn forced_leave_fires_immediately() {
    let (mut room, transport) = test_room("arena");
    let recorder = Recorder::new();
    let log = recorder.clone();
    room.on_leave(move || log.push("leave"));

    room.set_id(5);
    room.leave(false).unwrap();

    assert_eq!(room.lifecycle(), RoomLifecycle::Left);
    assert_eq!(transport.sent_count(), 0);
    assert_eq!(recorder.take(), vec!["leave"]);
}

#[test]
fn leave_before_join_is_a_local_leave() {
    let (mut room, transport) = test_room("arena");
    let recorder = Recorder::new();
    let log = recorder.clone();
    room.on_leave(move || log.push("leave"));

    room.leave(true).unwrap();

    assert_eq!(room.lifecycle(), RoomLifecycle::Left);
    assert_eq!(transport.sent_count(), 0);
    assert_eq!(recorder.take(), vec!["leave"]);
}

#[test]
fn apply_patch_fires_patch_then_state_updated() {
    let (mut room, _transport) = test_room("arena");
    let recorder = Recorder::new();

    room.set_state(json!({"score": 1}));

    let log = recorder.clone();
    room.on_patch(move |ops| {
        log.push(&format!("patch:{}", ops.len()));
    });
    let log = recorder.clone();
    room.on_state_updated(move |state, patch| {
        log.push(&format!(
            "updated:{}:{}",
            state["score"],
            patch.map(|ops| ops.len()).unwrap_or(0)
        ));
    });

    let ops = vec![PatchOp::Replace {
        path: "/score".to_string(),
        value: json!(42),
    }];
    room.apply_patch(ops).unwrap();

    assert_eq!(room.state(), Some(&json!({"score": 42})));
    // two distinct ordered notifications
    assert_eq!(recorder.take(), vec!["patch:1", "updated:42:1"]);
}

#[test]
fn set_state_fires_state_updated_unconditionally() {
    let (mut room, _transport) = test_room("arena");
    let recorder = Recorder::new();

    let log = recorder.clone();
    room.on_state_updated(move |_, patch| {
        assert!(patch.is_none());
        log.push("updated");
    });

    room.set_state(json!({"score": 1}));
    room.set_state(json!({"score": 1}));
    assert_eq!(recorder.count_of("updated"), 2);
}

#[test]
fn sync_state_diffs_against_held_snapshot() {
    let (mut room, _transport) = test_room("arena");
    let recorder = Recorder::new();

    room.set_state(json!({"score": 1, "lives": 3}));

    let log = recorder.clone();
    room.on_patch(move |ops| {
        for op in ops {
            log.push(&format!("op:{}", op.path()));
        }
    });

    room.sync_state(json!({"score": 2, "lives": 3})).unwrap();

    assert_eq!(recorder.take(), vec!["op:/score"]);
    assert_eq!(room.state(), Some(&json!({"score": 2, "lives": 3})));
}

#[test]
fn process_changes_reports_state_replaced_once_per_batch() {
    let (mut room, _transport) = test_room("arena");
    let recorder = Recorder::new();

    let mut nodes = NodeRegistry::new();
    nodes.register(1, player_record("alice", 1));
    room.set_root(1);

    let log = recorder.clone();
    room.on_state_replaced(move || log.push("replaced"));
    let log = recorder.clone();
    room.callbacks().on_field_change(1, "score", move |_, _| {
        log.push("field");
        Ok(())
    });

    let batch = ChangeBatch::from(vec![
        ChangeRecord::new(1, ChangeKey::name("score"), ChangeOp::Replace, Value::Int(2), Value::Int(1)),
        ChangeRecord::new(1, ChangeKey::name("score"), ChangeOp::Replace, Value::Int(3), Value::Int(2)),
    ]);
    room.process_changes(&nodes, &batch);

    assert_eq!(recorder.take(), vec!["field", "field", "replaced"]);
}

#[test]
fn receive_paths_fire_their_events() {
    let (mut room, _transport) = test_room("arena");
    let recorder = Recorder::new();

    let log = recorder.clone();
    room.on_data(move |payload| log.push(&format!("data:{}", payload)));
    let log = recorder.clone();
    room.on_error(move |payload| log.push(&format!("error:{}", payload)));

    room.receive_data(json!("hello"));
    room.receive_error(json!({"code": 4}));

    assert_eq!(recorder.take(), vec!["data:\"hello\"", "error:{\"code\":4}"]);
}

#[test]
fn removed_listener_stops_firing() {
    let (mut room, _transport) = test_room("arena");
    let recorder = Recorder::new();

    let log = recorder.clone();
    let token = room.on_join(move || log.push("join"));

    room.set_id(1);
    room.remove_listener(&token);
    room.set_id(2);

    assert_eq!(recorder.count_of("join"), 1);
}
