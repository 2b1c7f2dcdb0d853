//! # Replica Shared
//! Graph data model, reference registry & change records shared between the
//! replica decoder and client crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod change;
mod node;
mod node_registry;
mod types;
mod value;

pub use change::{ChangeBatch, ChangeKey, ChangeOp, ChangeRecord};
pub use node::{CollectionType, ListNode, MapNode, Node, RecordNode, SetNode};
pub use node_registry::{EvictionListener, NodeRegistry, NullListener, RegistryError};
pub use types::RefId;
pub use value::{Value, ValueKind};
