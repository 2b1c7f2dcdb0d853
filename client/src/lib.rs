//! # Replica Client
//! Client-side state synchronization for real-time multiplayer rooms:
//! ordered change dispatch over a reference-tracked node graph, plus the
//! legacy full-document diff/patch mode, behind one room session facade.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod callbacks;
mod patch;
mod protocol;
mod room;
mod transport;

pub use callbacks::{
    CallbackKey, CallbackRegistry, FieldMirror, Handler, HandlerError, HandlerResult, MirrorError,
    SubscriptionToken,
};
pub use patch::{apply_patch, diff, PatchError, PatchOp};
pub use protocol::{Envelope, OpCode, RoomId};
pub use room::{EventToken, Room, RoomEvents, RoomLifecycle};
pub use transport::{SendError, Transport};
