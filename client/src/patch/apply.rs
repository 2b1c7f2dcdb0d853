use serde_json::Value as Json;

use super::{PatchError, PatchOp};

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Split a pointer path into its parent pointer and final key.
/// `"/players/p1/score"` becomes `("/players/p1", "score")`.
fn split_parent(path: &str) -> Result<(&str, String), PatchError> {
    let index = path.rfind('/').ok_or_else(|| PatchError::InvalidTarget {
        path: path.to_string(),
    })?;
    Ok((&path[..index], unescape(&path[index + 1..])))
}

fn parent_of<'a>(doc: &'a mut Json, path: &str) -> Result<(&'a mut Json, String), PatchError> {
    let (parent_path, key) = split_parent(path)?;
    let parent = doc
        .pointer_mut(parent_path)
        .ok_or_else(|| PatchError::NotFound {
            path: path.to_string(),
        })?;
    Ok((parent, key))
}

fn parse_index(key: &str, path: &str) -> Result<usize, PatchError> {
    key.parse().map_err(|_| PatchError::InvalidIndex {
        path: path.to_string(),
    })
}

fn apply_add(doc: &mut Json, path: &str, value: Json) -> Result<(), PatchError> {
    if path.is_empty() {
        *doc = value;
        return Ok(());
    }
    let (parent, key) = parent_of(doc, path)?;
    match parent {
        Json::Object(map) => {
            map.insert(key, value);
            Ok(())
        }
        Json::Array(array) => {
            if key == "-" {
                array.push(value);
                return Ok(());
            }
            let index = parse_index(&key, path)?;
            if index > array.len() {
                return Err(PatchError::InvalidIndex {
                    path: path.to_string(),
                });
            }
            array.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::InvalidTarget {
            path: path.to_string(),
        }),
    }
}

fn apply_replace(doc: &mut Json, path: &str, value: Json) -> Result<(), PatchError> {
    if path.is_empty() {
        *doc = value;
        return Ok(());
    }
    let target = doc.pointer_mut(path).ok_or_else(|| PatchError::NotFound {
        path: path.to_string(),
    })?;
    *target = value;
    Ok(())
}

fn apply_remove(doc: &mut Json, path: &str) -> Result<(), PatchError> {
    if path.is_empty() {
        return Err(PatchError::InvalidTarget {
            path: path.to_string(),
        });
    }
    let (parent, key) = parent_of(doc, path)?;
    match parent {
        Json::Object(map) => map
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| PatchError::NotFound {
                path: path.to_string(),
            }),
        Json::Array(array) => {
            let index = parse_index(&key, path)?;
            if index >= array.len() {
                return Err(PatchError::NotFound {
                    path: path.to_string(),
                });
            }
            array.remove(index);
            Ok(())
        }
        _ => Err(PatchError::InvalidTarget {
            path: path.to_string(),
        }),
    }
}

/// Apply `ops` to `doc` destructively, in order. Fails fast on the first
/// bad operation; the document keeps every operation applied before it.
pub fn apply_patch(doc: &mut Json, ops: &[PatchOp]) -> Result<(), PatchError> {
    for op in ops {
        match op {
            PatchOp::Add { path, value } => apply_add(doc, path, value.clone())?,
            PatchOp::Replace { path, value } => apply_replace(doc, path, value.clone())?,
            PatchOp::Remove { path } => apply_remove(doc, path)?,
        }
    }
    Ok(())
}
