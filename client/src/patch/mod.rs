// Structural diff/patch over full JSON document snapshots, the legacy
// synchronization mode driven by `Room`.

mod apply;
mod diff;

pub use apply::apply_patch;
pub use diff::diff;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;

/// Errors that can occur while applying a patch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatchError {
    /// Path addressed a value that does not exist
    #[error("Patch path '{path}' not found in document")]
    NotFound { path: String },

    /// Array index was not a number or fell outside the array
    #[error("Patch path '{path}' holds an invalid array index")]
    InvalidIndex { path: String },

    /// Path descended through a scalar, or removed the document root
    #[error("Patch path '{path}' addresses an invalid target")]
    InvalidTarget { path: String },

    /// The room holds no document snapshot to patch
    #[error("No document snapshot to patch; assign a full state first")]
    NoDocument,
}

/// One structural patch operation, addressed by an RFC 6901 pointer path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Json },
    Replace { path: String, value: Json },
    Remove { path: String },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } => path,
            PatchOp::Replace { path, .. } => path,
            PatchOp::Remove { path } => path,
        }
    }
}
