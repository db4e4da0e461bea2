use std::collections::HashSet;

use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::document::{parse_or_string, type_name};
use crate::edit::EditOutcome;
use crate::error::{JsonFileError, Result};
use crate::location::{self, Location};

/// Resolve `path` to array locations. Nothing is mutated unless every match
/// is an array.
fn locate_arrays(doc: &Value, path: &str, action: &str) -> Result<Vec<Location>> {
    let locs = location::locate(doc, path)?;
    if locs.is_empty() {
        debug!(path, action, "array not found");
        return Err(JsonFileError::PathNotFound(path.to_string()));
    }
    for loc in &locs {
        if let Some(node) = loc.get(doc)
            && !node.is_array()
        {
            return Err(JsonFileError::InvalidArgument(format!(
                "{action} requires path to point to an array, found {} at {path}",
                type_name(node)
            )));
        }
    }
    Ok(locs)
}

fn require_value(value: &str, action: &str) -> Result<()> {
    if value.is_empty() {
        return Err(JsonFileError::InvalidArgument(format!(
            "{action} requires a value"
        )));
    }
    Ok(())
}

/// Push the payload onto every matched array.
pub fn append(doc: &mut Value, path: &str, value: &str) -> Result<EditOutcome> {
    require_value(value, "appendArray")?;
    let locs = locate_arrays(doc, path, "appendArray")?;
    let item = parse_or_string(value);
    let mut changed = 0;
    for loc in &locs {
        if let Some(Value::Array(arr)) = loc.get_mut(doc) {
            arr.push(item.clone());
            changed += 1;
        }
    }
    Ok(EditOutcome {
        matched: locs.len(),
        changed,
    })
}

/// Position for an insert: negative prepends, past the end appends.
pub fn clamp_index(index: i64, len: usize) -> usize {
    if index <= 0 {
        0
    } else {
        usize::try_from(index).map_or(len, |i| i.min(len))
    }
}

/// Insert the payload at `index` in every matched array.
pub fn insert(doc: &mut Value, path: &str, value: &str, index: i64) -> Result<EditOutcome> {
    require_value(value, "insertArray")?;
    let locs = locate_arrays(doc, path, "insertArray")?;
    let item = parse_or_string(value);
    let mut changed = 0;
    for loc in &locs {
        if let Some(Value::Array(arr)) = loc.get_mut(doc) {
            let at = clamp_index(index, arr.len());
            if i64::try_from(at).ok() != Some(index) {
                debug!(path, index, at, len = arr.len(), "insert index clamped");
            }
            arr.insert(at, item.clone());
            changed += 1;
        }
    }
    Ok(EditOutcome {
        matched: locs.len(),
        changed,
    })
}

/// Remove array elements.
///
/// With a non-empty `value`, every element deep-equal to the payload is
/// removed from the arrays addressed by `path` minus any trailing filter.
/// Without one, each element located by `path` (index, slice or filter) is
/// removed directly. Matches that are not arrays (or not array elements) are
/// skipped. No match at all is not an error.
pub fn remove(doc: &mut Value, path: &str, value: &str) -> Result<EditOutcome> {
    if value.is_empty() {
        return remove_located(doc, path);
    }
    let needle = parse_or_string(value);
    let target = location::strip_filter(path);
    let locs = location::locate(doc, target)?;
    if locs.is_empty() {
        warn!(path = target, "array not found, nothing removed");
    }
    let mut changed = 0;
    for loc in &locs {
        match loc.get_mut(doc) {
            Some(Value::Array(arr)) => {
                let before = arr.len();
                arr.retain(|item| !same_value(item, &needle));
                changed += before - arr.len();
            }
            Some(other) => {
                warn!(path = target, found = type_name(other), "match is not an array, skipping");
            }
            None => {}
        }
    }
    debug!(path = target, removed = changed, "removed matching array elements");
    Ok(EditOutcome {
        matched: locs.len(),
        changed,
    })
}

fn same_number(a: &Number, b: &Number) -> bool {
    if a == b {
        return true;
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
}

/// Deep equality where numbers compare by value, so `1` matches `1.0`.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => same_number(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| same_value(x, y)))
        }
        _ => a == b,
    }
}

fn remove_located(doc: &mut Value, path: &str) -> Result<EditOutcome> {
    let locs = location::locate(doc, path)?;
    if locs.is_empty() {
        warn!(path, "no array elements matched, nothing removed");
    }
    let (elements, others): (Vec<Location>, Vec<Location>) =
        locs.into_iter().partition(Location::is_array_element);
    for loc in &others {
        warn!(path, location = %loc.pointer(), "match is not an array element, skipping");
    }
    let changed = location::remove_all(doc, &elements);
    Ok(EditOutcome {
        matched: elements.len() + others.len(),
        changed,
    })
}

/// Serialization with object keys sorted, so key order does not make two
/// otherwise equal elements distinct.
pub fn canonical_string(v: &Value) -> String {
    fn canonicalize(v: &Value) -> Value {
        match v {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut out = Map::with_capacity(map.len());
                for k in keys {
                    out.insert(k.clone(), canonicalize(&map[k.as_str()]));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
            other => other.clone(),
        }
    }
    canonicalize(v).to_string()
}

/// Keep the first occurrence of each element, preserving order.
pub fn dedup_items(items: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(canonical_string(item)))
        .collect()
}

/// Deduplicate every matched array. Any non-array match fails the whole call
/// before anything is changed.
pub fn distinct(doc: &mut Value, path: &str) -> Result<EditOutcome> {
    let locs = locate_arrays(doc, path, "distinctValues")?;
    let mut changed = 0;
    for loc in &locs {
        if let Some(Value::Array(arr)) = loc.get_mut(doc) {
            let before = arr.len();
            *arr = dedup_items(std::mem::take(arr));
            changed += before - arr.len();
        }
    }
    debug!(path, removed = changed, "removed duplicate array elements");
    Ok(EditOutcome {
        matched: locs.len(),
        changed,
    })
}
