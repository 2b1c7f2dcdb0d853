use serde_json::Value as Json;

use super::PatchOp;

fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Compute the structural difference between two document snapshots as an
/// ordered list of operations; applying them to `prev` yields `next`.
///
/// Objects diff per key, arrays per index with tail inserts/removals, and
/// any type change replaces the whole subtree.
pub fn diff(prev: &Json, next: &Json) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_values(prev, next, "", &mut ops);
    ops
}

fn diff_values(prev: &Json, next: &Json, path: &str, ops: &mut Vec<PatchOp>) {
    if prev == next {
        return;
    }
    match (prev, next) {
        (Json::Object(prev_map), Json::Object(next_map)) => {
            for (key, prev_child) in prev_map {
                let child_path = format!("{}/{}", path, escape(key));
                match next_map.get(key) {
                    Some(next_child) => diff_values(prev_child, next_child, &child_path, ops),
                    None => ops.push(PatchOp::Remove { path: child_path }),
                }
            }
            for (key, next_child) in next_map {
                if !prev_map.contains_key(key) {
                    ops.push(PatchOp::Add {
                        path: format!("{}/{}", path, escape(key)),
                        value: next_child.clone(),
                    });
                }
            }
        }
        (Json::Array(prev_items), Json::Array(next_items)) => {
            let shared = prev_items.len().min(next_items.len());
            for index in 0..shared {
                let child_path = format!("{}/{}", path, index);
                diff_values(&prev_items[index], &next_items[index], &child_path, ops);
            }
            for index in shared..next_items.len() {
                ops.push(PatchOp::Add {
                    path: format!("{}/{}", path, index),
                    value: next_items[index].clone(),
                });
            }
            // trailing removals walk backwards so earlier indices stay valid
            for index in (next_items.len()..prev_items.len()).rev() {
                ops.push(PatchOp::Remove {
                    path: format!("{}/{}", path, index),
                });
            }
        }
        _ => {
            ops.push(PatchOp::Replace {
                path: path.to_string(),
                value: next.clone(),
            });
        }
    }
}
