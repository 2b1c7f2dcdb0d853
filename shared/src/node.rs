use crate::{
    change::ChangeKey,
    types::RefId,
    value::Value,
};

/// Capability contract satisfied by every keyed/indexed container node.
///
/// The dispatcher only needs three things from a collection: its entries,
/// the "never populated" sentinel for its element type, and whether entry
/// values are themselves node references (which controls whether removal
/// cascades a release through the registry).
pub trait CollectionType {
    fn entries(&self) -> Vec<(ChangeKey, &Value)>;
    fn unset_value(&self) -> &Value;
    fn holds_refs(&self) -> bool;
}

/// A record node: ordered named fields, each holding a scalar or a
/// reference to another node. Field order is declaration order, which the
/// field-mirroring layer relies on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordNode {
    fields: Vec<(String, Value)>,
}

impl RecordNode {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn set_field(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name.to_string(), value));
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// An ordered list node.
#[derive(Clone, Debug, PartialEq)]
pub struct ListNode {
    items: Vec<Value>,
    unset: Value,
    holds_refs: bool,
}

impl ListNode {
    pub fn new(unset: Value, holds_refs: bool) -> Self {
        Self {
            items: Vec::new(),
            unset,
            holds_refs,
        }
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn set(&mut self, index: usize, value: Value) {
        if index >= self.items.len() {
            self.items.resize(index + 1, self.unset.clone());
        }
        self.items[index] = value;
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CollectionType for ListNode {
    fn entries(&self) -> Vec<(ChangeKey, &Value)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, value)| (ChangeKey::Index(index), value))
            .collect()
    }

    fn unset_value(&self) -> &Value {
        &self.unset
    }

    fn holds_refs(&self) -> bool {
        self.holds_refs
    }
}

/// An associative map node with string keys. Entries keep insertion order
/// so dispatch output stays deterministic.
#[derive(Clone, Debug, PartialEq)]
pub struct MapNode {
    entries: Vec<(String, Value)>,
    unset: Value,
    holds_refs: bool,
}

impl MapNode {
    pub fn new(unset: Value, holds_refs: bool) -> Self {
        Self {
            entries: Vec::new(),
            unset,
            holds_refs,
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl CollectionType for MapNode {
    fn entries(&self) -> Vec<(ChangeKey, &Value)> {
        self.entries
            .iter()
            .map(|(key, value)| (ChangeKey::Name(key.clone()), value))
            .collect()
    }

    fn unset_value(&self) -> &Value {
        &self.unset
    }

    fn holds_refs(&self) -> bool {
        self.holds_refs
    }
}

/// A set node: indexed storage like a list, but slot identity carries no
/// meaning beyond membership.
#[derive(Clone, Debug, PartialEq)]
pub struct SetNode {
    items: Vec<Value>,
    unset: Value,
    holds_refs: bool,
}

impl SetNode {
    pub fn new(unset: Value, holds_refs: bool) -> Self {
        Self {
            items: Vec::new(),
            unset,
            holds_refs,
        }
    }

    pub fn insert(&mut self, value: Value) {
        if !self.items.contains(&value) {
            self.items.push(value);
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.items.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl CollectionType for SetNode {
    fn entries(&self) -> Vec<(ChangeKey, &Value)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, value)| (ChangeKey::Index(index), value))
            .collect()
    }

    fn unset_value(&self) -> &Value {
        &self.unset
    }

    fn holds_refs(&self) -> bool {
        self.holds_refs
    }
}

/// A unit of synchronized state. The Decoder's graph exclusively owns all
/// nodes; this engine reads them through the registry and never mutates
/// them during dispatch.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Record(RecordNode),
    List(ListNode),
    Map(MapNode),
    Set(SetNode),
}

impl Node {
    pub fn is_record(&self) -> bool {
        matches!(self, Node::Record(_))
    }

    pub fn as_record(&self) -> Option<&RecordNode> {
        match self {
            Node::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&dyn CollectionType> {
        match self {
            Node::Record(_) => None,
            Node::List(list) => Some(list),
            Node::Map(map) => Some(map),
            Node::Set(set) => Some(set),
        }
    }

    /// Ids of all nodes this node's slots reference. For collections that
    /// hold plain scalars this is empty regardless of contents.
    pub fn child_refs(&self) -> Vec<RefId> {
        match self {
            Node::Record(record) => record
                .fields()
                .filter_map(|(_, value)| value.as_ref_id())
                .collect(),
            Node::List(list) => collection_refs(list),
            Node::Map(map) => collection_refs(map),
            Node::Set(set) => collection_refs(set),
        }
    }
}

fn collection_refs(collection: &dyn CollectionType) -> Vec<RefId> {
    if !collection.holds_refs() {
        return Vec::new();
    }
    collection
        .entries()
        .iter()
        .filter_map(|(_, value)| value.as_ref_id())
        .collect()
}
