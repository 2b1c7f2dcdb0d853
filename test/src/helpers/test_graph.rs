use replica_shared::{ListNode, MapNode, Node, RecordNode, RefId, Value};

/// A record node shaped like the usual player schema.
pub fn player_record(name: &str, score: i64) -> Node {
    Node::Record(
        RecordNode::new()
            .with_field("name", Value::Str(name.to_string()))
            .with_field("score", Value::Int(score)),
    )
}

/// A record holding a single node reference under `field`.
pub fn record_with_child(field: &str, child: RefId) -> Node {
    Node::Record(RecordNode::new().with_field(field, Value::Ref(child)))
}

/// An int-valued map with sentinel 0, as a non-ref collection.
pub fn map_of_ints(entries: &[(&str, i64)]) -> Node {
    let mut map = MapNode::new(Value::Int(0), false);
    for (key, value) in entries {
        map.set(key, Value::Int(*value));
    }
    Node::Map(map)
}

/// An int-valued list with sentinel 0, as a non-ref collection.
pub fn list_of_ints(items: &[i64]) -> Node {
    let mut list = ListNode::new(Value::Int(0), false);
    for item in items {
        list.push(Value::Int(*item));
    }
    Node::List(list)
}
