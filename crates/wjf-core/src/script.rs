use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::dispatch::{self, Applied, EditRequest};
use crate::error::{JsonFileError, Result};
use crate::flags::{Action, ActionFlags};
use crate::options::EditContext;
use crate::rollback::FileSnapshot;

fn default_index() -> i64 {
    -1
}

/// One row of the JsonFile table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JsonFileChange {
    pub id: String,
    pub file: PathBuf,
    pub element_path: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub default_value: String,
    pub flags: u32,
    #[serde(default)]
    pub property: String,
    #[serde(default = "default_index")]
    pub index: i64,
    #[serde(default)]
    pub schema_file: Option<PathBuf>,
    #[serde(default)]
    pub sequence: i32,
}

impl JsonFileChange {
    pub fn flags(&self) -> ActionFlags {
        ActionFlags::from_bits(self.flags)
    }

    pub fn to_request(&self) -> EditRequest {
        EditRequest {
            file: self.file.clone(),
            element_path: self.element_path.clone(),
            value: self.value.clone(),
            flags: self.flags(),
            index: self.index,
            schema_file: self.schema_file.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditScript {
    pub changes: Vec<JsonFileChange>,
}

impl EditScript {
    /// Rows ordered by file, then sequence, as the table query returns them.
    pub fn new(mut changes: Vec<JsonFileChange>) -> Self {
        changes.sort_by(|a, b| a.file.cmp(&b.file).then(a.sequence.cmp(&b.sequence)));
        Self { changes }
    }

    /// Read a JSON array of rows. Relative paths resolve against the
    /// script's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| JsonFileError::io(path, e))?;
        let mut changes: Vec<JsonFileChange> =
            serde_json::from_slice(&data).map_err(|e| JsonFileError::Parse {
                path: path.to_path_buf(),
                line: e.line(),
                column: e.column(),
                message: e.to_string(),
            })?;
        let base = path.parent().unwrap_or(Path::new("."));
        for change in &mut changes {
            if change.file.is_relative() {
                change.file = base.join(&change.file);
            }
            if let Some(schema) = change.schema_file.as_mut()
                && !schema.as_os_str().is_empty()
                && schema.is_relative()
            {
                *schema = base.join(&*schema);
            }
        }
        Ok(Self::new(changes))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptReport {
    pub applied: usize,
    pub skipped: usize,
    /// Property name -> value filled in by read rows.
    pub properties: BTreeMap<String, String>,
}

pub struct ScriptRunner<'a> {
    ctx: &'a EditContext,
    snapshots: Vec<FileSnapshot>,
    report: ScriptReport,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(ctx: &'a EditContext) -> Self {
        Self {
            ctx,
            snapshots: Vec::new(),
            report: ScriptReport::default(),
        }
    }

    /// Apply every row in order. On the first failure all files touched so
    /// far are restored, newest first, and that failure is returned.
    pub fn run(mut self, script: &EditScript) -> Result<ScriptReport> {
        for change in &script.changes {
            if let Err(e) = self.run_change(change) {
                error!(id = %change.id, file = %change.file.display(), "row failed: {e}");
                self.rollback();
                return Err(e);
            }
        }
        info!(
            applied = self.report.applied,
            skipped = self.report.skipped,
            "finished JSON file changes"
        );
        Ok(self.report)
    }

    fn run_change(&mut self, change: &JsonFileChange) -> Result<()> {
        if change.flags().primary() == Some(Action::ReadValue) {
            return self.read_property(change);
        }
        self.snapshot(&change.file)?;
        match dispatch::apply(self.ctx, &change.to_request())? {
            Applied::Edited(..) => self.report.applied += 1,
            Applied::Skipped(_) | Applied::NoAction => self.report.skipped += 1,
        }
        Ok(())
    }

    fn read_property(&mut self, change: &JsonFileChange) -> Result<()> {
        if change.property.is_empty() {
            return Err(JsonFileError::InvalidArgument(format!(
                "read row {} has no property",
                change.id
            )));
        }
        let value = match dispatch::read(&change.file, &change.element_path) {
            Ok(found) => found,
            Err(JsonFileError::FileNotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let value = value.unwrap_or_else(|| change.default_value.clone());
        info!(id = %change.id, property = %change.property, "read JSON value into property");
        self.report.properties.insert(change.property.clone(), value);
        Ok(())
    }

    fn snapshot(&mut self, file: &Path) -> Result<()> {
        if self.snapshots.iter().any(|s| s.path() == file) || !file.exists() {
            return Ok(());
        }
        self.snapshots.push(FileSnapshot::capture(file)?);
        Ok(())
    }

    fn rollback(&mut self) {
        for snap in self.snapshots.iter().rev() {
            if let Err(e) = snap.restore() {
                warn!(file = %snap.path().display(), "rollback failed: {e}");
            }
        }
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_sort_by_file_then_sequence() {
        let row = |id: &str, file: &str, sequence: i32| JsonFileChange {
            id: id.into(),
            file: file.into(),
            element_path: "$.a".into(),
            value: String::new(),
            default_value: String::new(),
            flags: 2,
            property: String::new(),
            index: -1,
            schema_file: None,
            sequence,
        };
        let script = EditScript::new(vec![row("c", "b.json", 1), row("b", "a.json", 2), row("a", "a.json", 1)]);
        let ids: Vec<&str> = script.changes.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn row_defaults() {
        let row: JsonFileChange =
            serde_json::from_str(r#"{"id": "r1", "file": "x.json", "elementPath": "$.a", "flags": 2}"#).unwrap();
        assert_eq!(row.index, -1);
        assert_eq!(row.schema_file, None);
        assert_eq!(row.to_request().flags.primary(), Some(Action::SetValue));
    }
}
