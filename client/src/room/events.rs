use serde_json::Value as Json;

use crate::patch::PatchOp;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum EventKind {
    Join,
    Leave,
    Error,
    Patch,
    StateUpdated,
    StateReplaced,
    Data,
}

/// Removes one room-event listener. Idempotent.
pub struct EventToken {
    kind: EventKind,
    id: u64,
}

/// The public event surface application code subscribes to on a [`Room`].
/// Listeners fire synchronously, in subscription order.
///
/// [`Room`]: crate::Room
pub struct RoomEvents {
    next_id: u64,
    join: Vec<(u64, Box<dyn FnMut()>)>,
    leave: Vec<(u64, Box<dyn FnMut()>)>,
    error: Vec<(u64, Box<dyn FnMut(&Json)>)>,
    patch: Vec<(u64, Box<dyn FnMut(&[PatchOp])>)>,
    state_updated: Vec<(u64, Box<dyn FnMut(&Json, Option<&[PatchOp]>)>)>,
    state_replaced: Vec<(u64, Box<dyn FnMut()>)>,
    data: Vec<(u64, Box<dyn FnMut(&Json)>)>,
}

impl RoomEvents {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            join: Vec::new(),
            leave: Vec::new(),
            error: Vec::new(),
            patch: Vec::new(),
            state_updated: Vec::new(),
            state_replaced: Vec::new(),
            data: Vec::new(),
        }
    }

    fn alloc(&mut self, kind: EventKind) -> EventToken {
        let id = self.next_id;
        self.next_id += 1;
        EventToken { kind, id }
    }

    pub fn on_join(&mut self, f: impl FnMut() + 'static) -> EventToken {
        let token = self.alloc(EventKind::Join);
        self.join.push((token.id, Box::new(f)));
        token
    }

    pub fn on_leave(&mut self, f: impl FnMut() + 'static) -> EventToken {
        let token = self.alloc(EventKind::Leave);
        self.leave.push((token.id, Box::new(f)));
        token
    }

    pub fn on_error(&mut self, f: impl FnMut(&Json) + 'static) -> EventToken {
        let token = self.alloc(EventKind::Error);
        self.error.push((token.id, Box::new(f)));
        token
    }

    pub fn on_patch(&mut self, f: impl FnMut(&[PatchOp]) + 'static) -> EventToken {
        let token = self.alloc(EventKind::Patch);
        self.patch.push((token.id, Box::new(f)));
        token
    }

    pub fn on_state_updated(
        &mut self,
        f: impl FnMut(&Json, Option<&[PatchOp]>) + 'static,
    ) -> EventToken {
        let token = self.alloc(EventKind::StateUpdated);
        self.state_updated.push((token.id, Box::new(f)));
        token
    }

    pub fn on_state_replaced(&mut self, f: impl FnMut() + 'static) -> EventToken {
        let token = self.alloc(EventKind::StateReplaced);
        self.state_replaced.push((token.id, Box::new(f)));
        token
    }

    pub fn on_data(&mut self, f: impl FnMut(&Json) + 'static) -> EventToken {
        let token = self.alloc(EventKind::Data);
        self.data.push((token.id, Box::new(f)));
        token
    }

    pub fn remove(&mut self, token: &EventToken) {
        match token.kind {
            EventKind::Join => self.join.retain(|(id, _)| *id != token.id),
            EventKind::Leave => self.leave.retain(|(id, _)| *id != token.id),
            EventKind::Error => self.error.retain(|(id, _)| *id != token.id),
            EventKind::Patch => self.patch.retain(|(id, _)| *id != token.id),
            EventKind::StateUpdated => self.state_updated.retain(|(id, _)| *id != token.id),
            EventKind::StateReplaced => self.state_replaced.retain(|(id, _)| *id != token.id),
            EventKind::Data => self.data.retain(|(id, _)| *id != token.id),
        }
    }

    pub(crate) fn emit_join(&mut self) {
        for (_, f) in &mut self.join {
            f();
        }
    }

    pub(crate) fn emit_leave(&mut self) {
        for (_, f) in &mut self.leave {
            f();
        }
    }

    pub(crate) fn emit_error(&mut self, payload: &Json) {
        for (_, f) in &mut self.error {
            f(payload);
        }
    }

    pub(crate) fn emit_patch(&mut self, ops: &[PatchOp]) {
        for (_, f) in &mut self.patch {
            f(ops);
        }
    }

    pub(crate) fn emit_state_updated(&mut self, state: &Json, patch: Option<&[PatchOp]>) {
        for (_, f) in &mut self.state_updated {
            f(state, patch);
        }
    }

    pub(crate) fn emit_state_replaced(&mut self) {
        for (_, f) in &mut self.state_replaced {
            f();
        }
    }

    pub(crate) fn emit_data(&mut self, payload: &Json) {
        for (_, f) in &mut self.data {
            f(payload);
        }
    }
}
