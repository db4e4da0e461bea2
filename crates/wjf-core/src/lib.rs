//! wjf-core: JSON path-edit engine behind the WixJsonFile custom action
//!
//! One edit = load a JSON file, apply a single action at a JSONPath (or JSON
//! Pointer) location, write the whole file back, optionally validate:
//! - set / create-if-absent / replace / delete (`edit`)
//! - append / insert / remove / distinct on arrays (`array`)
//! - shallow schema type checks (`schema`)
//! - flag decoding and the per-row entry point (`flags`, `dispatch`)
//! - file snapshots and ordered row scripts for rollback (`rollback`, `script`)
//!
//! Paths follow RFC 9535 (`$.a.b`, `$['k']`, `$.arr[0]`, `$.arr[*]`, `$..x`,
//! `$.arr[?@.id == 1]`); create-if-absent takes an RFC 6901 pointer instead.
//! Documents are read fresh for every edit and written back in full, with
//! member order and number spelling kept as found.
//!
//! The schema check covers root `type`, root `required` and the `type` of each
//! top-level property. A property typed `integer` accepts any JSON number.
//!
pub mod array;
pub mod dispatch;
pub mod document;
pub mod edit;
pub mod error;
pub mod flags;
pub mod location;
pub mod options;
pub mod pointer;
pub mod rollback;
pub mod schema;
pub mod script;

pub use dispatch::{Applied, EditRequest, apply, read, run_edit};
pub use edit::{EditOutcome, delete_path, read_value, replace_subtree, set_value};
pub use error::{JsonFileError, Result, SchemaViolation, StatusCode};
pub use flags::{Action, ActionFlags};
pub use options::{EditContext, EditOptions};
pub use rollback::FileSnapshot;
pub use script::{EditScript, JsonFileChange, ScriptReport, ScriptRunner};
