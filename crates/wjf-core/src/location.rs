use serde_json::Value;
use serde_json_path::JsonPath;

use crate::error::{JsonFileError, Result};
use crate::pointer::{escape_token, split_pointer};

pub fn compile(expr: &str) -> Result<JsonPath> {
    JsonPath::parse(expr)
        .map_err(|e| JsonFileError::InvalidArgument(format!("invalid JSONPath '{expr}': {e}")))
}

pub fn count_matches(doc: &Value, expr: &str) -> Result<usize> {
    Ok(compile(expr)?.query(doc).len())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Index(usize),
    Key(String),
}

/// Structural address of one node inside a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    steps: Vec<Step>,
}

impl Location {
    pub fn root() -> Self {
        Location { steps: Vec::new() }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Resolve pointer tokens against `doc` so array positions become indices.
    fn from_pointer(doc: &Value, ptr: &str) -> Option<Self> {
        let mut steps = Vec::new();
        let mut node = doc;
        for token in split_pointer(ptr).ok()? {
            node = match node {
                Value::Array(arr) => {
                    let i = token.parse::<usize>().ok()?;
                    steps.push(Step::Index(i));
                    arr.get(i)?
                }
                Value::Object(map) => {
                    let child = map.get(token.as_str())?;
                    steps.push(Step::Key(token));
                    child
                }
                _ => return None,
            };
        }
        Some(Location { steps })
    }

    pub fn pointer(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push('/');
            match step {
                Step::Index(i) => out.push_str(&i.to_string()),
                Step::Key(k) => out.push_str(&escape_token(k)),
            }
        }
        out
    }

    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut node = doc;
        for step in &self.steps {
            node = match (node, step) {
                (Value::Object(map), Step::Key(k)) => map.get(k.as_str())?,
                (Value::Array(arr), Step::Index(i)) => arr.get(*i)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Whether the node sits directly inside an array.
    pub fn is_array_element(&self) -> bool {
        matches!(self.steps.last(), Some(Step::Index(_)))
    }

    pub fn get_mut<'a>(&self, doc: &'a mut Value) -> Option<&'a mut Value> {
        walk_mut(doc, &self.steps)
    }

    /// Detach the node from its parent container. The root cannot be removed.
    pub fn remove(&self, doc: &mut Value) -> Option<Value> {
        let (last, parent_steps) = self.steps.split_last()?;
        let parent = walk_mut(doc, parent_steps)?;
        match (parent, last) {
            (Value::Object(map), Step::Key(k)) => map.shift_remove(k.as_str()),
            (Value::Array(arr), Step::Index(i)) if *i < arr.len() => Some(arr.remove(*i)),
            _ => None,
        }
    }
}

fn walk_mut<'a>(doc: &'a mut Value, steps: &[Step]) -> Option<&'a mut Value> {
    let mut node = doc;
    for step in steps {
        node = match (node, step) {
            (Value::Object(map), Step::Key(k)) => map.get_mut(k.as_str())?,
            (Value::Array(arr), Step::Index(i)) => arr.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Every location matched by `expr`, deduplicated and in descending document
/// order: later siblings come before earlier ones and descendants before
/// their ancestors, so removing them one by one never shifts a pending match.
pub fn locate(doc: &Value, expr: &str) -> Result<Vec<Location>> {
    let path = compile(expr)?;
    let mut out: Vec<Location> = path
        .query_located(doc)
        .locations()
        .filter_map(|loc| Location::from_pointer(doc, &loc.to_json_pointer()))
        .collect();
    out.sort_unstable_by(|a, b| b.cmp(a));
    out.dedup();
    Ok(out)
}

/// Remove every located node; returns how many were actually detached.
pub fn remove_all(doc: &mut Value, locations: &[Location]) -> usize {
    let mut removed = 0;
    for loc in locations {
        if loc.remove(doc).is_some() {
            removed += 1;
        }
    }
    removed
}

/// Drop a trailing filter selector (`$.arr[?@ == 1]` -> `$.arr`) so the path
/// addresses the array being filtered.
pub fn strip_filter(expr: &str) -> &str {
    match expr.find("[?") {
        Some(pos) => &expr[..pos],
        None => expr,
    }
}
