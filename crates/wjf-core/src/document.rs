use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::error::{JsonFileError, Result};
use crate::options::EditOptions;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn load(path: &Path) -> Result<Value> {
    let data = fs::read(path).map_err(|e| JsonFileError::io(path, e))?;
    let body = data.strip_prefix(UTF8_BOM).unwrap_or(&data);
    let value = serde_json::from_slice::<Value>(body).map_err(|e| JsonFileError::Parse {
        path: path.to_path_buf(),
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })?;
    debug!(file = %path.display(), bytes = data.len(), "parsed JSON document");
    Ok(value)
}

/// Pretty-print with the configured indent; object keys keep insertion order.
pub fn to_pretty_bytes(value: &Value, opts: &EditOptions) -> Result<Vec<u8>> {
    let indent = " ".repeat(opts.indent);
    let mut out = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
    value
        .serialize(&mut ser)
        .map_err(|e| JsonFileError::Failure(format!("serializing document: {e}")))?;
    if opts.trailing_newline {
        out.push(b'\n');
    }
    Ok(out)
}

/// Truncate-and-rewrite `path` with the serialized document.
pub fn save(value: &Value, path: &Path, opts: &EditOptions) -> Result<()> {
    let bytes = to_pretty_bytes(value, opts)?;
    if opts.atomic_write {
        write_atomic(path, &bytes)?;
    } else {
        fs::write(path, &bytes).map_err(|e| JsonFileError::io(path, e))?;
    }
    debug!(file = %path.display(), bytes = bytes.len(), atomic = opts.atomic_write, "wrote JSON document");
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| JsonFileError::io(&dir, e))?;
    tmp.write_all(bytes).map_err(|e| JsonFileError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| JsonFileError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| JsonFileError::io(path, e.error))?;
    Ok(())
}

/// Payload interpretation shared by replace/append/insert/remove: JSON when it
/// parses, otherwise `None` so the caller can fall back to a string.
pub fn try_parse_json(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

pub fn parse_or_string(text: &str) -> Value {
    try_parse_json(text).unwrap_or_else(|| Value::String(text.to_string()))
}

/// JSON Schema style type name of a value.
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_falls_back_to_string() {
        assert_eq!(parse_or_string("4"), json!(4));
        assert_eq!(parse_or_string("{\"a\":true}"), json!({"a": true}));
        assert_eq!(parse_or_string("hello"), json!("hello"));
        assert_eq!(parse_or_string("\"quoted\""), json!("quoted"));
        assert_eq!(try_parse_json("[1,"), None);
    }

    #[test]
    fn pretty_output_keeps_key_order() {
        let v: Value = serde_json::from_str(r#"{"z":1,"a":{"y":[1,2],"b":null}}"#).unwrap();
        let opts = EditOptions {
            indent: 2,
            ..EditOptions::default()
        };
        let s = String::from_utf8(to_pretty_bytes(&v, &opts).unwrap()).unwrap();
        assert_eq!(
            s,
            "{\n  \"z\": 1,\n  \"a\": {\n    \"y\": [\n      1,\n      2\n    ],\n    \"b\": null\n  }\n}"
        );
    }

    #[test]
    fn load_reports_line_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("bad.json");
        fs::write(&p, "{\n  \"a\": 1,\n  \"b\": ]\n}").unwrap();
        match load(&p) {
            Err(JsonFileError::Parse { line, column, .. }) => {
                assert_eq!(line, 3);
                assert!(column > 0);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_skips_utf8_bom() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("bom.json");
        fs::write(&p, b"\xEF\xBB\xBF{\"a\":1}").unwrap();
        assert_eq!(load(&p).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn save_truncates_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("out.json");
        fs::write(&p, "{\"long\": \"xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx\"}").unwrap();
        for atomic in [true, false] {
            let opts = EditOptions {
                atomic_write: atomic,
                ..EditOptions::default()
            };
            save(&json!({"a": 1}), &p, &opts).unwrap();
            assert_eq!(fs::read_to_string(&p).unwrap(), "{\n    \"a\": 1\n}");
        }
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, JsonFileError::FileNotFound(_)));
    }
}
