use std::collections::HashMap;

use replica_shared::RefId;

use super::handler::{CallbackKey, Handler};
use super::registry::HandlerId;

pub(crate) type BindingHandle = u32;

/// What cancelling a deferred subscription found.
pub(crate) enum CancelOutcome {
    /// The binding was still parked; it has been dropped.
    Pending,
    /// The binding already resolved; the caller must remove the live slot.
    Bound {
        ref_id: RefId,
        key: CallbackKey,
        id: HandlerId,
    },
    /// Already cancelled, or abandoned when its parent was evicted.
    Gone,
}

struct PendingBinding {
    parent: RefId,
    field: String,
    handler: Handler,
}

struct BoundRecord {
    ref_id: RefId,
    key: CallbackKey,
    id: HandlerId,
}

/// Parking lot for subscriptions whose target collection does not exist
/// yet. A handler parks under its parent record's field; when that field is
/// first assigned a node reference, the dispatcher drains the parked
/// handlers and binds them to the new node. If the parent is evicted first,
/// the parked handlers are abandoned without notification.
pub(crate) struct BindingWaitlist {
    next_handle: BindingHandle,
    pending: HashMap<BindingHandle, PendingBinding>,
    field_index: HashMap<(RefId, String), Vec<BindingHandle>>,
    bound: HashMap<BindingHandle, BoundRecord>,
}

impl BindingWaitlist {
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            pending: HashMap::new(),
            field_index: HashMap::new(),
            bound: HashMap::new(),
        }
    }

    pub fn park(&mut self, parent: RefId, field: &str, handler: Handler) -> BindingHandle {
        let handle = self.next_handle;
        self.next_handle += 1;

        self.pending.insert(
            handle,
            PendingBinding {
                parent,
                field: field.to_string(),
                handler,
            },
        );
        self.field_index
            .entry((parent, field.to_string()))
            .or_default()
            .push(handle);
        handle
    }

    /// Drain every handler parked under `(parent, field)`, in park order.
    pub fn take_pending(&mut self, parent: RefId, field: &str) -> Vec<(BindingHandle, Handler)> {
        let Some(handles) = self.field_index.remove(&(parent, field.to_string())) else {
            return Vec::new();
        };
        handles
            .into_iter()
            .filter_map(|handle| {
                self.pending
                    .remove(&handle)
                    .map(|binding| (handle, binding.handler))
            })
            .collect()
    }

    /// Record where a drained handler ended up, so its token can still
    /// unsubscribe it.
    pub fn record_bound(&mut self, handle: BindingHandle, ref_id: RefId, key: CallbackKey, id: HandlerId) {
        self.bound.insert(handle, BoundRecord { ref_id, key, id });
    }

    pub fn cancel(&mut self, handle: BindingHandle) -> CancelOutcome {
        if let Some(binding) = self.pending.remove(&handle) {
            if let Some(handles) = self
                .field_index
                .get_mut(&(binding.parent, binding.field.clone()))
            {
                handles.retain(|h| *h != handle);
                if handles.is_empty() {
                    self.field_index.remove(&(binding.parent, binding.field));
                }
            }
            return CancelOutcome::Pending;
        }
        if let Some(record) = self.bound.remove(&handle) {
            return CancelOutcome::Bound {
                ref_id: record.ref_id,
                key: record.key,
                id: record.id,
            };
        }
        CancelOutcome::Gone
    }

    /// Drop everything parked under an evicted parent, and forget bound
    /// records whose target node is gone.
    pub fn abandon(&mut self, evicted: RefId) {
        let parked: Vec<(RefId, String)> = self
            .field_index
            .keys()
            .filter(|(parent, _)| *parent == evicted)
            .cloned()
            .collect();
        for key in parked {
            if let Some(handles) = self.field_index.remove(&key) {
                for handle in handles {
                    self.pending.remove(&handle);
                }
            }
        }
        self.bound.retain(|_, record| record.ref_id != evicted);
    }
}
