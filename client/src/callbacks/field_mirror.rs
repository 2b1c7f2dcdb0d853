use std::cell::RefCell;
use std::rc::Rc;

use log::warn;
use thiserror::Error;

use replica_shared::{Node, RefId, Value, ValueKind};

use super::registry::{CallbackRegistry, SubscriptionToken};

/// Errors that can occur when declaring a field mirror
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorError {
    /// The source node is not a record and has no named fields to mirror
    #[error("Cannot mirror fields of ref {ref_id}: node is not a record")]
    NotARecord { ref_id: RefId },
}

struct FieldBinding<T> {
    name: String,
    kind: ValueKind,
    apply: Box<dyn Fn(&mut T, &Value)>,
}

/// Statically declared field-mapping table: each entry names a source
/// field, the value kind it expects, and how to write it into the target.
///
/// Declarations whose kind does not match the source node are dropped at
/// registration, not per invocation.
pub struct FieldMirror<T> {
    bindings: Vec<FieldBinding<T>>,
}

impl<T> FieldMirror<T> {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    pub fn field(
        mut self,
        name: &str,
        kind: ValueKind,
        apply: impl Fn(&mut T, &Value) + 'static,
    ) -> Self {
        self.bindings.push(FieldBinding {
            name: name.to_string(),
            kind,
            apply: Box::new(apply),
        });
        self
    }

    pub fn int_field(self, name: &str, apply: impl Fn(&mut T, i64) + 'static) -> Self {
        self.field(name, ValueKind::Int, move |target, value| {
            if let Value::Int(int) = value {
                apply(target, *int);
            }
        })
    }

    pub fn float_field(self, name: &str, apply: impl Fn(&mut T, f64) + 'static) -> Self {
        self.field(name, ValueKind::Float, move |target, value| {
            if let Value::Float(float) = value {
                apply(target, *float);
            }
        })
    }

    pub fn bool_field(self, name: &str, apply: impl Fn(&mut T, bool) + 'static) -> Self {
        self.field(name, ValueKind::Bool, move |target, value| {
            if let Value::Bool(flag) = value {
                apply(target, *flag);
            }
        })
    }

    pub fn str_field(self, name: &str, apply: impl Fn(&mut T, &str) + 'static) -> Self {
        self.field(name, ValueKind::Str, move |target, value| {
            if let Value::Str(string) = value {
                apply(target, string);
            }
        })
    }
}

impl<T> Default for FieldMirror<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackRegistry {
    /// Mirror the declared fields of the record at `ref_id` into `target`
    /// on every whole-object change.
    ///
    /// Compatibility is checked once, here: a declared field that is
    /// missing on the source or holds a different kind is dropped with a
    /// diagnostic, never an error. A source field still unset (`Nil`)
    /// passes the check and starts mirroring once populated.
    pub fn bind_fields<T: 'static>(
        &self,
        ref_id: RefId,
        source: &Node,
        target: Rc<RefCell<T>>,
        mirror: FieldMirror<T>,
    ) -> Result<SubscriptionToken, MirrorError> {
        let Some(record) = source.as_record() else {
            return Err(MirrorError::NotARecord { ref_id });
        };

        let mut kept: Vec<FieldBinding<T>> = Vec::new();
        for binding in mirror.bindings {
            match record.field(&binding.name) {
                Some(value) if value.is_nil() || value.kind() == binding.kind => {
                    kept.push(binding);
                }
                Some(value) => {
                    warn!(
                        "not mirroring field {} of ref {}: source holds {:?}, mirror expects {:?}",
                        binding.name,
                        ref_id,
                        value.kind(),
                        binding.kind
                    );
                }
                None => {
                    warn!(
                        "not mirroring field {} of ref {}: no such field on source",
                        binding.name, ref_id
                    );
                }
            }
        }

        let token = self.on_replace(ref_id, move |node| {
            let Some(record) = node.as_record() else {
                return Ok(());
            };
            let mut target = target.borrow_mut();
            for binding in &kept {
                let Some(value) = record.field(&binding.name) else {
                    continue;
                };
                if value.kind() != binding.kind {
                    // schema drifted after registration; skip, don't fail
                    warn!(
                        "skipping mirrored field {}: value kind changed to {:?}",
                        binding.name,
                        value.kind()
                    );
                    continue;
                }
                (binding.apply)(&mut target, value);
            }
            Ok(())
        });
        Ok(token)
    }
}
