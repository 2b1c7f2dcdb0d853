use std::collections::HashSet;

use log::trace;

use replica_shared::{
    ChangeBatch, ChangeKey, ChangeOp, ChangeRecord, CollectionType, Node, NodeRegistry, RefId,
};

use super::handler::{CallbackKey, Invocation};
use super::registry::{CallbackRegistry, HandlerId};

const REPLACE_KEY: CallbackKey = CallbackKey::Operation(ChangeOp::Replace);
const ADD_KEY: CallbackKey = CallbackKey::Operation(ChangeOp::Add);
const DELETE_KEY: CallbackKey = CallbackKey::Operation(ChangeOp::Delete);

impl CallbackRegistry {
    /// Walk one change batch in order and invoke the registered handlers.
    ///
    /// The replace-notified set and the handler-id watermark are locals of
    /// this call: whole-object handlers fire at most once per ref per
    /// batch, and handlers registered while the batch is running first
    /// fire on the next one.
    pub fn process_batch(&self, nodes: &NodeRegistry, batch: &ChangeBatch) {
        let watermark = self.watermark();
        let mut replace_notified: HashSet<RefId> = HashSet::new();

        for record in batch.iter() {
            let Ok(node) = nodes.get(record.ref_id) else {
                // already evicted, expected under concurrent remove/add
                trace!("skipping change for evicted ref {}", record.ref_id);
                continue;
            };

            // a removed child reports its own teardown before the parent's
            // change is reported, so subscribers can release resources tied
            // to the child first
            if record.op.includes_delete() {
                if let Some(child) = record.previous.as_ref_id() {
                    if let Ok(child_node) = nodes.get(child) {
                        self.invoke(
                            child,
                            &DELETE_KEY,
                            watermark,
                            Invocation::NodeRemoved { node: child_node },
                        );
                    }
                }
            }

            match node {
                Node::Record(_) => {
                    self.dispatch_record(record, node, watermark, &mut replace_notified);
                }
                _ => {
                    if let Some(collection) = node.as_collection() {
                        self.dispatch_collection(record, collection, watermark);
                    }
                }
            }
        }
    }

    fn dispatch_record(
        &self,
        record: &ChangeRecord,
        node: &Node,
        watermark: HandlerId,
        replace_notified: &mut HashSet<RefId>,
    ) {
        if replace_notified.insert(record.ref_id) {
            self.invoke(
                record.ref_id,
                &REPLACE_KEY,
                watermark,
                Invocation::NodeReplaced { node },
            );
        }

        let Some(field) = record.key.as_name() else {
            return;
        };
        self.invoke(
            record.ref_id,
            &CallbackKey::Field(field.to_string()),
            watermark,
            Invocation::FieldChanged {
                value: &record.value,
                previous: &record.previous,
            },
        );

        // a field gaining a node reference is what parked bindings wait for
        if let Some(target) = record.value.as_ref_id() {
            self.complete_bindings(record.ref_id, field, target);
        }
    }

    fn dispatch_collection(
        &self,
        record: &ChangeRecord,
        collection: &dyn CollectionType,
        watermark: HandlerId,
    ) {
        let sentinel = collection.unset_value();
        let event_key: ChangeKey = record.event_key();

        match record.op {
            ChangeOp::Delete => {
                if &record.previous != sentinel {
                    self.invoke(
                        record.ref_id,
                        &DELETE_KEY,
                        watermark,
                        Invocation::EntryRemoved {
                            key: &event_key,
                            value: &record.previous,
                        },
                    );
                }
            }
            ChangeOp::DeleteAndAdd => {
                if &record.previous != sentinel {
                    self.invoke(
                        record.ref_id,
                        &DELETE_KEY,
                        watermark,
                        Invocation::EntryRemoved {
                            key: &event_key,
                            value: &record.previous,
                        },
                    );
                }
                self.invoke(
                    record.ref_id,
                    &ADD_KEY,
                    watermark,
                    Invocation::EntryAdded {
                        key: &event_key,
                        value: &record.value,
                    },
                );
            }
            ChangeOp::Add => {
                if record.previous.is_nil() || &record.previous == sentinel {
                    self.invoke(
                        record.ref_id,
                        &ADD_KEY,
                        watermark,
                        Invocation::EntryAdded {
                            key: &event_key,
                            value: &record.value,
                        },
                    );
                }
            }
            ChangeOp::Replace => {}
        }

        if record.value != record.previous && !record.value.is_nil() {
            self.invoke(
                record.ref_id,
                &REPLACE_KEY,
                watermark,
                Invocation::EntryChanged {
                    key: &event_key,
                    value: &record.value,
                },
            );
        }
    }
}
