use serde_json::{Map, Value};

use crate::document::type_name;
use crate::error::{JsonFileError, Result};

pub(crate) fn unescape_token(tok: &str) -> String {
    let s = tok.replace("~1", "/");
    s.replace("~0", "~")
}

pub(crate) fn escape_token(tok: &str) -> String {
    let s = tok.replace('~', "~0");
    s.replace('/', "~1")
}

/// Split a pointer into unescaped reference tokens. `""` is the root.
pub fn split_pointer(ptr: &str) -> Result<Vec<String>> {
    if ptr.is_empty() {
        return Ok(Vec::new());
    }
    let rest = ptr.strip_prefix('/').ok_or_else(|| {
        JsonFileError::Failure(format!("json pointer must start with '/': {ptr}"))
    })?;
    Ok(rest.split('/').map(unescape_token).collect())
}

pub fn exists(root: &Value, ptr: &str) -> Result<bool> {
    split_pointer(ptr)?;
    Ok(root.pointer(ptr).is_some())
}

fn array_index(token: &str, len: usize, ptr: &str) -> Result<usize> {
    if token == "-" {
        return Ok(len);
    }
    let well_formed = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));
    let idx = if well_formed { token.parse::<usize>().ok() } else { None };
    match idx {
        Some(i) if i <= len => Ok(i),
        Some(i) => Err(JsonFileError::Failure(format!(
            "array index {i} out of range (len {len}) in json pointer {ptr}"
        ))),
        None => Err(JsonFileError::Failure(format!(
            "invalid array index '{token}' in json pointer {ptr}"
        ))),
    }
}

/// Add `value` at `ptr` unless something already lives there. Missing
/// intermediate members are created as empty objects; `-` or `len` on an
/// array appends. Returns whether the document changed.
pub fn add_if_absent(root: &mut Value, ptr: &str, value: Value) -> Result<bool> {
    let tokens = split_pointer(ptr)?;
    if tokens.is_empty() {
        return Ok(false);
    }
    let mut current = root;
    for (i, token) in tokens.iter().enumerate() {
        let last = i + 1 == tokens.len();
        current = match current {
            Value::Object(map) => {
                if last {
                    if map.contains_key(token.as_str()) {
                        return Ok(false);
                    }
                    map.insert(token.clone(), value);
                    return Ok(true);
                }
                map.entry(token.clone())
                    .or_insert_with(|| Value::Object(Map::new()))
            }
            Value::Array(arr) => {
                let idx = array_index(token, arr.len(), ptr)?;
                if last {
                    if idx < arr.len() {
                        return Ok(false);
                    }
                    arr.push(value);
                    return Ok(true);
                }
                if idx == arr.len() {
                    arr.push(Value::Object(Map::new()));
                }
                &mut arr[idx]
            }
            other => {
                return Err(JsonFileError::Failure(format!(
                    "cannot descend into {} at '{token}' in json pointer {ptr}",
                    type_name(other)
                )));
            }
        };
    }
    Ok(false)
}
