use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{JsonFileError, Result};

/// Tunables for how edits are written back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditOptions {
    /// Spaces per indentation level.
    pub indent: usize,
    pub trailing_newline: bool,
    /// Write to a sibling temp file and rename it over the target.
    pub atomic_write: bool,
    /// Reject flag words selecting more than one primary action.
    pub strict_actions: bool,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            indent: 4,
            trailing_newline: false,
            atomic_write: true,
            strict_actions: false,
        }
    }
}

impl EditOptions {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| JsonFileError::io(path, e))?;
        serde_json::from_slice(&data).map_err(|e| JsonFileError::Parse {
            path: path.to_path_buf(),
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })
    }
}

/// Explicit per-run context handed to every edit.
#[derive(Debug, Clone, Default)]
pub struct EditContext {
    pub options: EditOptions,
}

impl EditContext {
    pub fn new(options: EditOptions) -> Self {
        Self { options }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let opts: EditOptions = serde_json::from_str(r#"{"indent": 2}"#).unwrap();
        assert_eq!(opts.indent, 2);
        assert!(opts.atomic_write);
        assert!(!opts.strict_actions);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<EditOptions>(r#"{"indnet": 2}"#).is_err());
    }
}
