use serde_json::Value as Json;

use replica_shared::{ChangeBatch, NodeRegistry, RefId};

use crate::{
    callbacks::CallbackRegistry,
    patch::{self, PatchError, PatchOp},
    protocol::{Envelope, RoomId},
    room::events::{EventToken, RoomEvents},
    transport::{SendError, Transport},
};

/// Where the room sits in its join/leave lifecycle.
///
/// A room is created detached. Assigning a server id joins it. A graceful
/// leave passes through `Leaving` until the server confirms; a forced
/// leave (or leaving before ever joining) goes straight to `Left`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RoomLifecycle {
    Detached,
    Joined,
    Leaving,
    Left,
}

/// The client-side session object for one joined or pending room.
///
/// Combines both synchronization modes: the graph mode, where an external
/// decoder mutates a reference-tracked node graph and hands change batches
/// to [`Room::process_changes`], and the legacy document mode, where full
/// JSON snapshots are held and patched in place.
pub struct Room {
    id: RoomId,
    name: String,
    lifecycle: RoomLifecycle,
    document: Option<Json>,
    root: Option<RefId>,
    events: RoomEvents,
    callbacks: CallbackRegistry,
    transport: Box<dyn Transport>,
}

impl Room {
    pub fn new(name: &str, transport: Box<dyn Transport>) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            lifecycle: RoomLifecycle::Detached,
            document: None,
            root: None,
            events: RoomEvents::new(),
            callbacks: CallbackRegistry::new(),
            transport,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifecycle(&self) -> RoomLifecycle {
        self.lifecycle
    }

    /// Structural-change subscriptions for graph mode. The registry is
    /// cheaply cloneable; the decoder keeps a clone to notify on eviction.
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Assign the server-issued session id. Every assignment counts as a
    /// join and fires the join event; the transport re-issues ids on
    /// reconnection and each one is a (re-)join.
    pub fn set_id(&mut self, id: RoomId) {
        self.id = id;
        if id > 0 {
            self.lifecycle = RoomLifecycle::Joined;
        }
        self.events.emit_join();
    }

    pub fn root(&self) -> Option<RefId> {
        self.root
    }

    /// Point graph mode at the decoder's root node.
    pub fn set_root(&mut self, root: RefId) {
        self.root = Some(root);
    }

    pub fn state(&self) -> Option<&Json> {
        self.document.as_ref()
    }

    /// Replace the whole held snapshot. Fires the state-updated event
    /// unconditionally, with no prior-diff context.
    pub fn set_state(&mut self, document: Json) {
        let document = self.document.insert(document);
        self.events.emit_state_updated(document, None);
    }

    /// Apply patch operations to the held snapshot in place. Two distinct
    /// notifications, in order: the pre-apply patch event with the raw
    /// ops, then state-updated carrying both the new document and the ops.
    pub fn apply_patch(&mut self, ops: Vec<PatchOp>) -> Result<(), PatchError> {
        self.events.emit_patch(&ops);
        let document = self.document.as_mut().ok_or(PatchError::NoDocument)?;
        patch::apply_patch(document, &ops)?;
        self.events.emit_state_updated(document, Some(&ops));
        Ok(())
    }

    /// Reconcile the held snapshot against a newly received one by
    /// computing the structural diff and driving the patch path with it.
    /// With no snapshot held yet this is a plain state assignment.
    pub fn sync_state(&mut self, next: Json) -> Result<(), PatchError> {
        let Some(previous) = self.document.as_ref() else {
            self.set_state(next);
            return Ok(());
        };
        let ops = patch::diff(previous, &next);
        self.apply_patch(ops)
    }

    /// Dispatch one decoder-produced change batch through the callback
    /// registry, then report that the mirrored state moved, once per
    /// batch.
    pub fn process_changes(&mut self, nodes: &NodeRegistry, batch: &ChangeBatch) {
        self.callbacks.process_batch(nodes, batch);
        self.events.emit_state_replaced();
    }

    /// Wrap an application payload in the outbound data envelope and hand
    /// it to the transport. No further business logic.
    pub fn send(&mut self, payload: Json) -> Result<(), SendError> {
        self.transport.send(Envelope::RoomData {
            room_id: self.id,
            payload,
        })
    }

    /// Leave the room. While joined, a graceful leave (`request = true`)
    /// only sends the leave request and waits for server-driven teardown;
    /// the leave event fires later via [`Room::confirm_leave`]. A forced
    /// leave, or leaving a room that never joined, fires the leave event
    /// immediately.
    pub fn leave(&mut self, request: bool) -> Result<(), SendError> {
        if request && self.lifecycle == RoomLifecycle::Joined && self.id > 0 {
            self.transport.send(Envelope::LeaveRoom { room_id: self.id })?;
            self.lifecycle = RoomLifecycle::Leaving;
        } else {
            self.lifecycle = RoomLifecycle::Left;
            self.events.emit_leave();
        }
        Ok(())
    }

    /// Server acknowledged the leave request.
    pub fn confirm_leave(&mut self) {
        self.lifecycle = RoomLifecycle::Left;
        self.events.emit_leave();
    }

    /// An application payload arrived for this room.
    pub fn receive_data(&mut self, payload: Json) {
        self.events.emit_data(&payload);
    }

    /// The server reported a room-level error.
    pub fn receive_error(&mut self, payload: Json) {
        self.events.emit_error(&payload);
    }

    pub fn on_join(&mut self, f: impl FnMut() + 'static) -> EventToken {
        self.events.on_join(f)
    }

    pub fn on_leave(&mut self, f: impl FnMut() + 'static) -> EventToken {
        self.events.on_leave(f)
    }

    pub fn on_error(&mut self, f: impl FnMut(&Json) + 'static) -> EventToken {
        self.events.on_error(f)
    }

    pub fn on_patch(&mut self, f: impl FnMut(&[PatchOp]) + 'static) -> EventToken {
        self.events.on_patch(f)
    }

    pub fn on_state_updated(
        &mut self,
        f: impl FnMut(&Json, Option<&[PatchOp]>) + 'static,
    ) -> EventToken {
        self.events.on_state_updated(f)
    }

    pub fn on_state_replaced(&mut self, f: impl FnMut() + 'static) -> EventToken {
        self.events.on_state_replaced(f)
    }

    pub fn on_data(&mut self, f: impl FnMut(&Json) + 'static) -> EventToken {
        self.events.on_data(f)
    }

    pub fn remove_listener(&mut self, token: &EventToken) {
        self.events.remove(token);
    }
}
