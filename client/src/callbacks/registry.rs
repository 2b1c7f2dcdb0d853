use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use log::warn;

use replica_shared::{
    ChangeKey, ChangeOp, EvictionListener, Node, RefId, Value,
};

use super::handler::{
    CallbackKey, EntryFn, FieldChangedFn, Handler, HandlerResult, Invocation, NodeFn,
};
use super::waitlist::{BindingHandle, BindingWaitlist, CancelOutcome};

pub(crate) type HandlerId = u64;

struct HandlerSlot {
    id: HandlerId,
    handler: Rc<RefCell<Handler>>,
}

pub(crate) struct RegistryInner {
    next_id: HandlerId,
    nodes: HashMap<RefId, HashMap<CallbackKey, Vec<HandlerSlot>>>,
    waitlist: BindingWaitlist,
}

impl RegistryInner {
    fn alloc_id(&mut self) -> HandlerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn push_slot(&mut self, ref_id: RefId, key: CallbackKey, id: HandlerId, handler: Handler) {
        self.nodes
            .entry(ref_id)
            .or_default()
            .entry(key)
            .or_default()
            .push(HandlerSlot {
                id,
                handler: Rc::new(RefCell::new(handler)),
            });
    }

    fn remove_slot(&mut self, ref_id: RefId, key: &CallbackKey, id: HandlerId) {
        let Some(keys) = self.nodes.get_mut(&ref_id) else {
            return;
        };
        let Some(slots) = keys.get_mut(key) else {
            return;
        };
        slots.retain(|slot| slot.id != id);
        if slots.is_empty() {
            keys.remove(key);
            if keys.is_empty() {
                self.nodes.remove(&ref_id);
            }
        }
    }

    fn is_live(&self, ref_id: RefId, key: &CallbackKey, id: HandlerId) -> bool {
        self.nodes
            .get(&ref_id)
            .and_then(|keys| keys.get(key))
            .map(|slots| slots.iter().any(|slot| slot.id == id))
            .unwrap_or(false)
    }
}

/// Per-node, per-key ordered handler lists plus the dispatch machinery that
/// walks change batches over them.
///
/// Interior-mutable so subscriptions and cancellations stay legal from
/// inside a running handler; everything is single-threaded.
#[derive(Clone)]
pub struct CallbackRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                next_id: 0,
                nodes: HashMap::new(),
                waitlist: BindingWaitlist::new(),
            })),
        }
    }

    fn subscribe(&self, ref_id: RefId, key: CallbackKey, handler: Handler) -> SubscriptionToken {
        let mut inner = self.inner.borrow_mut();
        let id = inner.alloc_id();
        inner.push_slot(ref_id, key.clone(), id, handler);
        SubscriptionToken {
            inner: Rc::downgrade(&self.inner),
            slot: TokenSlot::Direct { ref_id, key, id },
        }
    }

    /// Subscribe to changes of one named field on a record node.
    /// The handler receives `(new, previous)`.
    pub fn on_field_change(
        &self,
        ref_id: RefId,
        field: &str,
        f: impl FnMut(&Value, &Value) -> HandlerResult + 'static,
    ) -> SubscriptionToken {
        self.subscribe(
            ref_id,
            CallbackKey::Field(field.to_string()),
            Handler::FieldChanged(Box::new(f) as FieldChangedFn),
        )
    }

    /// Subscribe to whole-object changes of a record node. Fires at most
    /// once per batch no matter how many of the node's fields changed.
    pub fn on_replace(
        &self,
        ref_id: RefId,
        f: impl FnMut(&Node) -> HandlerResult + 'static,
    ) -> SubscriptionToken {
        self.subscribe(
            ref_id,
            CallbackKey::Operation(ChangeOp::Replace),
            Handler::NodeReplaced(Box::new(f) as NodeFn),
        )
    }

    /// Subscribe to entries appearing in a collection node.
    pub fn on_add(
        &self,
        ref_id: RefId,
        f: impl FnMut(&ChangeKey, &Value) -> HandlerResult + 'static,
    ) -> SubscriptionToken {
        self.subscribe(
            ref_id,
            CallbackKey::Operation(ChangeOp::Add),
            Handler::EntryAdded(Box::new(f) as EntryFn),
        )
    }

    /// Subscribe to entries leaving a collection node. A slot that was
    /// never populated (still holding the collection's unset sentinel)
    /// produces no event.
    pub fn on_remove(
        &self,
        ref_id: RefId,
        f: impl FnMut(&ChangeKey, &Value) -> HandlerResult + 'static,
    ) -> SubscriptionToken {
        self.subscribe(
            ref_id,
            CallbackKey::Operation(ChangeOp::Delete),
            Handler::EntryRemoved(Box::new(f) as EntryFn),
        )
    }

    /// Subscribe to per-entry value changes in a collection node.
    pub fn on_entry_change(
        &self,
        ref_id: RefId,
        f: impl FnMut(&ChangeKey, &Value) -> HandlerResult + 'static,
    ) -> SubscriptionToken {
        self.subscribe(
            ref_id,
            CallbackKey::Operation(ChangeOp::Replace),
            Handler::EntryChanged(Box::new(f) as EntryFn),
        )
    }

    /// Subscribe to the node's own removal (evicted from the registry, or
    /// cleared out of its parent's slot). The handler sees the node's state
    /// from before the removal.
    pub fn on_node_removed(
        &self,
        ref_id: RefId,
        f: impl FnMut(&Node) -> HandlerResult + 'static,
    ) -> SubscriptionToken {
        self.subscribe(
            ref_id,
            CallbackKey::Operation(ChangeOp::Delete),
            Handler::NodeRemoved(Box::new(f) as NodeFn),
        )
    }

    /// Defer a subscription until `field` on the `parent` record first
    /// holds a node reference; the handler is then bound to that node under
    /// the key its variant implies. Cancelling the returned token before
    /// availability drops the parked handler; cancelling after removes the
    /// bound one. If the parent is evicted first, the binding is abandoned.
    pub fn when_available(
        &self,
        parent: RefId,
        field: &str,
        handler: Handler,
    ) -> SubscriptionToken {
        if handler.operation_key().is_none() {
            warn!(
                "cannot defer a field-change handler on ref {} field {}; use on_field_change once the node exists",
                parent, field
            );
            return SubscriptionToken {
                inner: Weak::new(),
                slot: TokenSlot::Inert,
            };
        }
        let mut inner = self.inner.borrow_mut();
        let handle = inner.waitlist.park(parent, field, handler);
        SubscriptionToken {
            inner: Rc::downgrade(&self.inner),
            slot: TokenSlot::Deferred { handle },
        }
    }

    /// Bind every handler parked under `(parent, field)` to `target`.
    /// Fresh handler ids sit above the running dispatch's watermark, so the
    /// bound handlers first fire on the next batch.
    pub(crate) fn complete_bindings(&self, parent: RefId, field: &str, target: RefId) {
        let pending = self.inner.borrow_mut().waitlist.take_pending(parent, field);
        for (handle, handler) in pending {
            let Some(key) = handler.operation_key() else {
                continue;
            };
            let mut inner = self.inner.borrow_mut();
            let id = inner.alloc_id();
            inner.push_slot(target, key.clone(), id, handler);
            inner.waitlist.record_bound(handle, target, key, id);
        }
    }

    pub(crate) fn watermark(&self) -> HandlerId {
        self.inner.borrow().next_id
    }

    /// Invoke every handler registered under `(ref_id, key)` whose id sits
    /// below `watermark`, in registration order. The slot list is
    /// snapshotted first and each handler is re-checked for liveness right
    /// before its call, so a handler unsubscribing itself (or a sibling)
    /// mid-walk neither corrupts iteration nor skips anyone.
    pub(crate) fn invoke(
        &self,
        ref_id: RefId,
        key: &CallbackKey,
        watermark: HandlerId,
        invocation: Invocation,
    ) {
        let snapshot: Vec<(HandlerId, Rc<RefCell<Handler>>)> = {
            let inner = self.inner.borrow();
            let Some(slots) = inner.nodes.get(&ref_id).and_then(|keys| keys.get(key)) else {
                return;
            };
            slots
                .iter()
                .filter(|slot| slot.id < watermark)
                .map(|slot| (slot.id, slot.handler.clone()))
                .collect()
        };

        for (id, cell) in snapshot {
            if !self.inner.borrow().is_live(ref_id, key, id) {
                continue;
            }
            let result = invocation.call(&mut cell.borrow_mut());
            if let Err(error) = result {
                warn!("callback on ref {} failed: {}", ref_id, error);
            }
        }
    }

    pub(crate) fn forget_node(&self, ref_id: RefId) {
        let mut inner = self.inner.borrow_mut();
        inner.nodes.remove(&ref_id);
        inner.waitlist.abandon(ref_id);
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionListener for CallbackRegistry {
    fn node_evicted(&mut self, ref_id: RefId, node: &Node) {
        let watermark = self.watermark();
        self.invoke(
            ref_id,
            &CallbackKey::Operation(ChangeOp::Delete),
            watermark,
            Invocation::NodeRemoved { node },
        );
        self.forget_node(ref_id);
    }
}

enum TokenSlot {
    Direct {
        ref_id: RefId,
        key: CallbackKey,
        id: HandlerId,
    },
    Deferred {
        handle: BindingHandle,
    },
    Inert,
}

/// Cancels the subscription it was returned for. Idempotent, and safe to
/// call from inside any running handler, including the one it cancels.
pub struct SubscriptionToken {
    inner: Weak<RefCell<RegistryInner>>,
    slot: TokenSlot,
}

impl SubscriptionToken {
    pub fn unsubscribe(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = inner.borrow_mut();
        match &self.slot {
            TokenSlot::Direct { ref_id, key, id } => {
                inner.remove_slot(*ref_id, key, *id);
            }
            TokenSlot::Deferred { handle } => match inner.waitlist.cancel(*handle) {
                CancelOutcome::Pending | CancelOutcome::Gone => {}
                CancelOutcome::Bound { ref_id, key, id } => {
                    inner.remove_slot(ref_id, &key, id);
                }
            },
            TokenSlot::Inert => {}
        }
    }
}
