/// Field mirroring and deferred collection bindings.
use std::cell::RefCell;
use std::rc::Rc;

use replica_client::{CallbackRegistry, FieldMirror, Handler, MirrorError};
use replica_shared::{
    ChangeBatch, ChangeKey, ChangeOp, ChangeRecord, Node, NodeRegistry, RecordNode, Value,
};

use replica_test::{map_of_ints, player_record, Recorder};

#[derive(Default)]
struct PlayerView {
    name: String,
    score: i64,
}

#[test]
fn bind_fields_copies_declared_fields_on_replace() {
    let mut nodes = NodeRegistry::new();
    nodes.register(1, player_record("alice", 3));

    let registry = CallbackRegistry::new();
    let view = Rc::new(RefCell::new(PlayerView::default()));

    let mirror = FieldMirror::new()
        .str_field("name", |view: &mut PlayerView, name| {
            view.name = name.to_string();
        })
        .int_field("score", |view: &mut PlayerView, score| view.score = score);
    registry
        .bind_fields(1, nodes.get(1).unwrap(), view.clone(), mirror)
        .unwrap();

    let batch = ChangeBatch::from(vec![ChangeRecord::new(
        1,
        ChangeKey::name("score"),
        ChangeOp::Replace,
        Value::Int(4),
        Value::Int(3),
    )]);
    registry.process_batch(&nodes, &batch);

    assert_eq!(view.borrow().name, "alice");
    assert_eq!(view.borrow().score, 3);

    // the mirror reads the node, so give the graph the decoder's view
    nodes.register(1, player_record("alice", 4));
    registry.process_batch(&nodes, &batch);
    assert_eq!(view.borrow().score, 4);
}

#[test]
fn bind_fields_skips_incompatible_declarations() {
    let mut nodes = NodeRegistry::new();
    nodes.register(1, player_record("alice", 3));

    let registry = CallbackRegistry::new();
    let view = Rc::new(RefCell::new(PlayerView::default()));

    let mirror = FieldMirror::new()
        // wrong kind: "name" holds a string on the source
        .int_field("name", |view: &mut PlayerView, value| view.score = value)
        // no such field on the source
        .int_field("level", |view: &mut PlayerView, value| view.score = value)
        .int_field("score", |view: &mut PlayerView, score| view.score = score);
    registry
        .bind_fields(1, nodes.get(1).unwrap(), view.clone(), mirror)
        .unwrap();

    let batch = ChangeBatch::from(vec![ChangeRecord::new(
        1,
        ChangeKey::name("score"),
        ChangeOp::Replace,
        Value::Int(9),
        Value::Int(3),
    )]);
    registry.process_batch(&nodes, &batch);

    // only the compatible declaration mirrored
    assert_eq!(view.borrow().score, 3);
    assert_eq!(view.borrow().name, "");
}

#[test]
fn bind_fields_rejects_non_record_source() {
    let mut nodes = NodeRegistry::new();
    nodes.register(3, map_of_ints(&[("hp", 1)]));

    let registry = CallbackRegistry::new();
    let view = Rc::new(RefCell::new(PlayerView::default()));

    let result = registry.bind_fields(3, nodes.get(3).unwrap(), view, FieldMirror::new());
    assert_eq!(result.err(), Some(MirrorError::NotARecord { ref_id: 3 }));
}

fn availability_fixture() -> (NodeRegistry, CallbackRegistry, Recorder) {
    let mut nodes = NodeRegistry::new();
    nodes.register(
        1,
        Node::Record(RecordNode::new().with_field("inventory", Value::Nil)),
    );
    nodes.register(3, map_of_ints(&[]));
    (nodes, CallbackRegistry::new(), Recorder::new())
}

fn assign_inventory() -> ChangeBatch {
    ChangeBatch::from(vec![ChangeRecord::new(
        1,
        ChangeKey::name("inventory"),
        ChangeOp::Replace,
        Value::Ref(3),
        Value::Nil,
    )])
}

fn add_sword() -> ChangeBatch {
    ChangeBatch::from(vec![ChangeRecord::new(
        3,
        ChangeKey::name("sword"),
        ChangeOp::Add,
        Value::Int(1),
        Value::Nil,
    )])
}

#[test]
fn when_available_binds_on_first_assignment() {
    let (nodes, registry, recorder) = availability_fixture();

    let log = recorder.clone();
    registry.when_available(
        1,
        "inventory",
        Handler::EntryAdded(Box::new(move |key, value| {
            log.push(&format!("add:{}:{:?}", key, value));
            Ok(())
        })),
    );

    // nothing bound yet: adds to the collection go unobserved
    registry.process_batch(&nodes, &add_sword());
    assert!(recorder.entries().is_empty());

    registry.process_batch(&nodes, &assign_inventory());
    registry.process_batch(&nodes, &add_sword());

    assert_eq!(recorder.take(), vec!["add:sword:Int(1)"]);
}

#[test]
fn deferred_token_cancels_before_availability() {
    let (nodes, registry, recorder) = availability_fixture();

    let log = recorder.clone();
    let token = registry.when_available(
        1,
        "inventory",
        Handler::EntryAdded(Box::new(move |_, _| {
            log.push("add");
            Ok(())
        })),
    );
    token.unsubscribe();

    registry.process_batch(&nodes, &assign_inventory());
    registry.process_batch(&nodes, &add_sword());

    assert!(recorder.entries().is_empty());
}

#[test]
fn deferred_token_cancels_after_availability() {
    let (nodes, registry, recorder) = availability_fixture();

    let log = recorder.clone();
    let token = registry.when_available(
        1,
        "inventory",
        Handler::EntryAdded(Box::new(move |_, _| {
            log.push("add");
            Ok(())
        })),
    );

    registry.process_batch(&nodes, &assign_inventory());
    registry.process_batch(&nodes, &add_sword());
    assert_eq!(recorder.take(), vec!["add"]);

    token.unsubscribe();
    registry.process_batch(&nodes, &add_sword());
    assert!(recorder.entries().is_empty());
}
