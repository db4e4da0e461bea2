use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{JsonFileError, Result};
use crate::location::{self, Location};
use crate::pointer;

/// What an edit touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditOutcome {
    pub matched: usize,
    pub changed: usize,
}

fn locate_required(doc: &Value, path: &str) -> Result<Vec<Location>> {
    let locs = location::locate(doc, path)?;
    debug!(path, matches = locs.len(), "resolved JSONPath");
    if locs.is_empty() {
        return Err(JsonFileError::PathNotFound(path.to_string()));
    }
    Ok(locs)
}

fn overwrite_all(doc: &mut Value, locs: &[Location], value: &Value) -> usize {
    let mut changed = 0;
    for loc in locs {
        if let Some(slot) = loc.get_mut(doc) {
            *slot = value.clone();
            changed += 1;
        }
    }
    changed
}

/// Set every node matched by `path` to the string `raw`. With
/// `create_if_absent`, `path` is a JSON Pointer and the string is only added
/// when nothing exists there yet.
pub fn set_value(doc: &mut Value, path: &str, raw: &str, create_if_absent: bool) -> Result<EditOutcome> {
    let value = Value::String(raw.to_string());
    if create_if_absent {
        let added = pointer::add_if_absent(doc, path, value)?;
        if !added {
            debug!(pointer = path, "pointer already present, leaving value untouched");
        }
        return Ok(EditOutcome {
            matched: 1,
            changed: usize::from(added),
        });
    }
    let locs = locate_required(doc, path)?;
    let changed = overwrite_all(doc, &locs, &value);
    Ok(EditOutcome {
        matched: locs.len(),
        changed,
    })
}

/// Replace every node matched by `path` with the JSON parsed from `json_text`.
/// Unlike the other payload-taking edits there is no string fallback.
pub fn replace_subtree(doc: &mut Value, path: &str, json_text: &str) -> Result<EditOutcome> {
    if json_text.is_empty() {
        return Err(JsonFileError::InvalidArgument(
            "replacement value must not be empty".into(),
        ));
    }
    let value: Value = serde_json::from_str(json_text).map_err(|e| JsonFileError::parse_value(&e))?;
    let locs = locate_required(doc, path)?;
    let changed = overwrite_all(doc, &locs, &value);
    Ok(EditOutcome {
        matched: locs.len(),
        changed,
    })
}

/// Remove every node matched by `path`. No match is not an error.
pub fn delete_path(doc: &mut Value, path: &str) -> Result<EditOutcome> {
    let locs = location::locate(doc, path)?;
    if locs.is_empty() {
        warn!(path, "nothing matched, no elements deleted");
        return Ok(EditOutcome::default());
    }
    if locs.iter().any(Location::is_root) {
        warn!(path, "path selects the document root, which cannot be deleted");
    }
    let changed = location::remove_all(doc, &locs);
    debug!(path, removed = changed, "deleted matched elements");
    Ok(EditOutcome {
        matched: locs.len(),
        changed,
    })
}

/// First node matched by `path`, rendered for an installer property:
/// strings verbatim, everything else as compact JSON.
pub fn read_value(doc: &Value, path: &str) -> Result<Option<String>> {
    let compiled = location::compile(path)?;
    let nodes = compiled.query(doc);
    Ok(nodes.iter().next().map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_writes_raw_string() {
        let mut doc = json!({"a": 1});
        let out = set_value(&mut doc, "$.a", "2", false).unwrap();
        assert_eq!(doc, json!({"a": "2"}));
        assert_eq!(out, EditOutcome { matched: 1, changed: 1 });
    }

    #[test]
    fn set_updates_every_match() {
        let mut doc = json!({"servers": [{"port": 1}, {"port": 2}]});
        set_value(&mut doc, "$.servers[*].port", "8080", false).unwrap();
        assert_eq!(doc, json!({"servers": [{"port": "8080"}, {"port": "8080"}]}));
    }

    #[test]
    fn set_without_match_is_path_not_found() {
        let mut doc = json!({});
        let err = set_value(&mut doc, "$.missing", "x", false).unwrap_err();
        assert!(matches!(err, JsonFileError::PathNotFound(_)));
        assert_eq!(doc, json!({}));
    }

    #[test]
    fn create_is_idempotent() {
        let mut doc = json!({"a": {"b": 1}});
        let first = set_value(&mut doc, "/a/c", "x", true).unwrap();
        let second = set_value(&mut doc, "/a/c", "other", true).unwrap();
        assert_eq!(first.changed, 1);
        assert_eq!(second.changed, 0);
        assert_eq!(doc, json!({"a": {"b": 1, "c": "x"}}));
    }

    #[test]
    fn create_with_bad_pointer_is_generic_failure() {
        let mut doc = json!({"a": 1});
        let err = set_value(&mut doc, "a/b", "x", true).unwrap_err();
        assert!(matches!(err, JsonFileError::Failure(_)));
    }

    #[test]
    fn replace_swaps_whole_subtree() {
        let mut doc = json!({"logging": {"level": "info", "sinks": ["console"]}});
        replace_subtree(&mut doc, "$.logging", r#"{"level": "debug"}"#).unwrap();
        assert_eq!(doc, json!({"logging": {"level": "debug"}}));
        replace_subtree(&mut doc, "$.logging.level", "[1, 2]").unwrap();
        assert_eq!(doc, json!({"logging": {"level": [1, 2]}}));
    }

    #[test]
    fn replace_rejects_non_json() {
        let mut doc = json!({"a": 1});
        let err = replace_subtree(&mut doc, "$.a", "not json").unwrap_err();
        assert!(matches!(err, JsonFileError::Parse { .. }));
        let err = replace_subtree(&mut doc, "$.a", "").unwrap_err();
        assert!(matches!(err, JsonFileError::InvalidArgument(_)));
        let err = replace_subtree(&mut doc, "$.b", "1").unwrap_err();
        assert!(matches!(err, JsonFileError::PathNotFound(_)));
    }

    #[test]
    fn delete_removes_all_matches() {
        let mut doc = json!({"arr": [1, 2, 3, 4], "keep": true});
        let out = delete_path(&mut doc, "$.arr[?@ > 1]").unwrap();
        assert_eq!(out.changed, 3);
        assert_eq!(doc, json!({"arr": [1], "keep": true}));
    }

    #[test]
    fn delete_without_match_is_noop() {
        let mut doc = json!({"a": 1});
        let out = delete_path(&mut doc, "$.b").unwrap();
        assert_eq!(out, EditOutcome::default());
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn read_renders_strings_bare() {
        let doc = json!({"name": "svc", "port": 80, "tags": ["a"]});
        assert_eq!(read_value(&doc, "$.name").unwrap().as_deref(), Some("svc"));
        assert_eq!(read_value(&doc, "$.port").unwrap().as_deref(), Some("80"));
        assert_eq!(read_value(&doc, "$.tags").unwrap().as_deref(), Some("[\"a\"]"));
        assert_eq!(read_value(&doc, "$.nope").unwrap(), None);
    }
}
