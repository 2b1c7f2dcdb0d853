use thiserror::Error;

use replica_shared::{ChangeKey, ChangeOp, Node, Value};

/// Failure reported by a subscriber callback. Caught per invocation and
/// routed to the diagnostics log; never aborts the batch being dispatched.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

pub type HandlerResult = Result<(), HandlerError>;

pub type FieldChangedFn = Box<dyn FnMut(&Value, &Value) -> HandlerResult>;
pub type NodeFn = Box<dyn FnMut(&Node) -> HandlerResult>;
pub type EntryFn = Box<dyn FnMut(&ChangeKey, &Value) -> HandlerResult>;

/// A registered callback. Which variant fires for a given change record is
/// decided by matching, so two variants can share a registration key:
/// `NodeRemoved`/`EntryRemoved` both live under the delete key,
/// `NodeReplaced`/`EntryChanged` under the replace key.
pub enum Handler {
    /// A named record field changed: `(new, previous)`.
    FieldChanged(FieldChangedFn),
    /// The node changed as a whole; fires at most once per batch.
    NodeReplaced(NodeFn),
    /// The node itself is going away; sees its still-valid state.
    NodeRemoved(NodeFn),
    /// A collection slot was populated: `(key, value)`.
    EntryAdded(EntryFn),
    /// A collection slot was cleared: `(key, previous)`.
    EntryRemoved(EntryFn),
    /// A collection slot changed value: `(key, value)`.
    EntryChanged(EntryFn),
}

impl Handler {
    /// The operation key this variant registers under, or `None` for
    /// `FieldChanged`, which needs a field name instead.
    pub(crate) fn operation_key(&self) -> Option<CallbackKey> {
        match self {
            Handler::FieldChanged(_) => None,
            Handler::NodeReplaced(_) | Handler::EntryChanged(_) => {
                Some(CallbackKey::Operation(ChangeOp::Replace))
            }
            Handler::NodeRemoved(_) | Handler::EntryRemoved(_) => {
                Some(CallbackKey::Operation(ChangeOp::Delete))
            }
            Handler::EntryAdded(_) => Some(CallbackKey::Operation(ChangeOp::Add)),
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Handler::FieldChanged(_) => "FieldChanged",
            Handler::NodeReplaced(_) => "NodeReplaced",
            Handler::NodeRemoved(_) => "NodeRemoved",
            Handler::EntryAdded(_) => "EntryAdded",
            Handler::EntryRemoved(_) => "EntryRemoved",
            Handler::EntryChanged(_) => "EntryChanged",
        };
        write!(f, "Handler::{}", name)
    }
}

/// What a handler list is registered under: a record field name, or one of
/// the operation kinds.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum CallbackKey {
    Field(String),
    Operation(ChangeOp),
}

/// The shape of one dispatch call, matched against handler variants.
pub(crate) enum Invocation<'a> {
    FieldChanged { value: &'a Value, previous: &'a Value },
    NodeReplaced { node: &'a Node },
    NodeRemoved { node: &'a Node },
    EntryAdded { key: &'a ChangeKey, value: &'a Value },
    EntryRemoved { key: &'a ChangeKey, value: &'a Value },
    EntryChanged { key: &'a ChangeKey, value: &'a Value },
}

impl Invocation<'_> {
    /// Invoke `handler` if its variant matches this call's shape. A
    /// mismatched variant under a shared key is skipped, not an error.
    pub(crate) fn call(&self, handler: &mut Handler) -> HandlerResult {
        match (self, handler) {
            (Invocation::FieldChanged { value, previous }, Handler::FieldChanged(f)) => {
                f(value, previous)
            }
            (Invocation::NodeReplaced { node }, Handler::NodeReplaced(f)) => f(node),
            (Invocation::NodeRemoved { node }, Handler::NodeRemoved(f)) => f(node),
            (Invocation::EntryAdded { key, value }, Handler::EntryAdded(f)) => f(key, value),
            (Invocation::EntryRemoved { key, value }, Handler::EntryRemoved(f)) => f(key, value),
            (Invocation::EntryChanged { key, value }, Handler::EntryChanged(f)) => f(key, value),
            _ => Ok(()),
        }
    }
}
