mod events;
mod room;

pub use events::{EventToken, RoomEvents};
pub use room::{Room, RoomLifecycle};
