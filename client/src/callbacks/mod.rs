mod dispatcher;
mod field_mirror;
mod handler;
mod registry;
mod waitlist;

pub use field_mirror::{FieldMirror, MirrorError};
pub use handler::{CallbackKey, Handler, HandlerError, HandlerResult};
pub use registry::{CallbackRegistry, SubscriptionToken};
