use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::{error, info, info_span, warn};

use crate::array;
use crate::document;
use crate::edit::{self, EditOutcome};
use crate::error::{JsonFileError, Result, StatusCode};
use crate::flags::{Action, ActionFlags};
use crate::location;
use crate::options::EditContext;
use crate::pointer;
use crate::schema;

/// One edit as scheduled by the installer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditRequest {
    pub file: PathBuf,
    pub element_path: String,
    pub value: String,
    pub flags: ActionFlags,
    /// Insert position; negative means "not set" and prepends.
    pub index: i64,
    pub schema_file: Option<PathBuf>,
}

impl EditRequest {
    pub fn new(file: impl Into<PathBuf>, element_path: impl Into<String>, flags: impl Into<ActionFlags>) -> Self {
        Self {
            file: file.into(),
            element_path: element_path.into(),
            flags: flags.into(),
            index: -1,
            ..Self::default()
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn index(mut self, index: i64) -> Self {
        self.index = index;
        self
    }

    pub fn schema(mut self, schema_file: impl Into<PathBuf>) -> Self {
        self.schema_file = Some(schema_file.into());
        self
    }

    fn schema_path(&self) -> Option<&Path> {
        self.schema_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// How a dispatched request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The action ran and the document was written back.
    Edited(Action, EditOutcome),
    /// Only-if-exists was set and the path matched nothing.
    Skipped(Action),
    /// No write action selected (no primary bit, or read).
    NoAction,
}

fn select_action(ctx: &EditContext, flags: ActionFlags) -> Result<Option<Action>> {
    if ctx.options.strict_actions {
        return flags.primary_strict();
    }
    let actions = flags.actions();
    if actions.len() > 1 {
        warn!(flags = flags.bits(), chosen = %actions[0], "multiple actions selected, using the first by bit order");
    }
    Ok(actions.first().copied())
}

fn run_action(doc: &mut serde_json::Value, action: Action, req: &EditRequest) -> Result<EditOutcome> {
    let path = req.element_path.as_str();
    let value = req.value.as_str();
    match action {
        Action::DeleteValue => edit::delete_path(doc, path),
        Action::SetValue => edit::set_value(doc, path, value, false),
        Action::ReplaceJsonValue => edit::replace_subtree(doc, path, value),
        Action::CreateValue => edit::set_value(doc, path, value, true),
        Action::AppendArray => array::append(doc, path, value),
        Action::InsertArray => array::insert(doc, path, value, req.index),
        Action::RemoveArrayElement => array::remove(doc, path, value),
        Action::DistinctValues => array::distinct(doc, path),
        Action::ReadValue => Ok(EditOutcome::default()),
    }
}

fn path_exists(doc: &serde_json::Value, action: Action, path: &str) -> Result<bool> {
    if action.uses_pointer() {
        pointer::exists(doc, path)
    } else {
        Ok(location::count_matches(doc, path)? > 0)
    }
}

/// Apply one edit to `req.file`.
///
/// On success the file has been rewritten. When the validate-schema modifier
/// is set with a schema file, the updated document is then checked; a
/// validation failure is returned even though the edit was already written.
pub fn apply(ctx: &EditContext, req: &EditRequest) -> Result<Applied> {
    if req.file.as_os_str().is_empty() {
        return Err(JsonFileError::InvalidArgument("file path must not be empty".into()));
    }
    if req.element_path.is_empty() {
        return Err(JsonFileError::InvalidArgument("element path must not be empty".into()));
    }
    if !req.file.exists() {
        return Err(JsonFileError::FileNotFound(req.file.clone()));
    }

    let Some(action) = select_action(ctx, req.flags)? else {
        info!(flags = req.flags.bits(), file = %req.file.display(), "no action selected");
        return Ok(Applied::NoAction);
    };
    if !action.is_write() {
        return Ok(Applied::NoAction);
    }

    let span = info_span!("json_edit", file = %req.file.display(), path = %req.element_path, %action);
    let _guard = span.enter();

    let mut doc = document::load(&req.file)?;

    if req.flags.only_if_exists() && !path_exists(&doc, action, &req.element_path)? {
        info!("path does not exist, skipping (only-if-exists)");
        return Ok(Applied::Skipped(action));
    }

    let outcome = run_action(&mut doc, action, req)?;
    document::save(&doc, &req.file, &ctx.options)?;
    info!(matched = outcome.matched, changed = outcome.changed, "updated JSON file");

    if req.flags.validate_schema()
        && let Some(schema_file) = req.schema_path()
    {
        let schema_doc = document::load(schema_file)?;
        schema::validate(&doc, &schema_doc)?;
        info!(schema = %schema_file.display(), "JSON schema validation successful");
    }

    Ok(Applied::Edited(action, outcome))
}

/// Load `file` and read the first value matched by `path`.
pub fn read(file: &Path, path: &str) -> Result<Option<String>> {
    if path.is_empty() {
        return Err(JsonFileError::InvalidArgument("element path must not be empty".into()));
    }
    let doc = document::load(file)?;
    edit::read_value(&doc, path)
}

/// Boundary form of [`apply`]: every error, and any panic, becomes a status.
pub fn run_edit(ctx: &EditContext, req: &EditRequest) -> StatusCode {
    match panic::catch_unwind(AssertUnwindSafe(|| apply(ctx, req))) {
        Ok(Ok(_)) => StatusCode::Success,
        Ok(Err(e)) => {
            error!(file = %req.file.display(), path = %req.element_path, "edit failed: {e}");
            e.status()
        }
        Err(_) => {
            error!(file = %req.file.display(), path = %req.element_path, "edit panicked");
            StatusCode::GenericFailure
        }
    }
}
