use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, JsonFileError>;

#[derive(Debug, Error)]
pub enum JsonFileError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("malformed JSON in {}{}: {message}", path.display(), location(*line, *column))]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("no elements matched path: {0}")]
    PathNotFound(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema validation failed: {0}")]
    Validation(SchemaViolation),

    #[error("{0}")]
    Failure(String),
}

fn location(line: usize, column: usize) -> String {
    if line == 0 {
        String::new()
    } else {
        format!(" at line {line}, column {column}")
    }
}

impl JsonFileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            JsonFileError::FileNotFound(path)
        } else {
            JsonFileError::Io { path, source }
        }
    }

    /// Parse error for a payload that did not come from a file.
    pub fn parse_value(err: &serde_json::Error) -> Self {
        JsonFileError::Parse {
            path: PathBuf::from("<value>"),
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            JsonFileError::InvalidArgument(_) => StatusCode::InvalidArgument,
            JsonFileError::FileNotFound(_) => StatusCode::FileNotFound,
            JsonFileError::Parse { .. } => StatusCode::ParseError,
            JsonFileError::PathNotFound(_) => StatusCode::PathNotFound,
            JsonFileError::Io { .. } | JsonFileError::Validation(_) | JsonFileError::Failure(_) => {
                StatusCode::GenericFailure
            }
        }
    }
}

/// Which structural check rejected the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    RootType { expected: String, actual: String },
    MissingRequired(String),
    PropertyType {
        property: String,
        expected: String,
        actual: String,
    },
    MalformedSchema(String),
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::RootType { expected, actual } => {
                write!(f, "type mismatch: expected {expected} but got {actual}")
            }
            SchemaViolation::MissingRequired(name) => write!(f, "required property missing: {name}"),
            SchemaViolation::PropertyType {
                property,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for property '{property}': expected {expected} but got {actual}"
            ),
            SchemaViolation::MalformedSchema(why) => write!(f, "invalid schema: {why}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    InvalidArgument,
    FileNotFound,
    PathNotFound,
    ParseError,
    GenericFailure,
}

impl StatusCode {
    pub fn code(self) -> i32 {
        match self {
            StatusCode::Success => 0,
            StatusCode::InvalidArgument => 1,
            StatusCode::FileNotFound => 2,
            StatusCode::PathNotFound => 3,
            StatusCode::ParseError => 4,
            StatusCode::GenericFailure => 5,
        }
    }

    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusCode::Success => "success",
            StatusCode::InvalidArgument => "invalid-argument",
            StatusCode::FileNotFound => "file-not-found",
            StatusCode::PathNotFound => "path-not-found",
            StatusCode::ParseError => "parse-error",
            StatusCode::GenericFailure => "generic-failure",
        };
        f.write_str(s)
    }
}

impl<T> From<&Result<T>> for StatusCode {
    fn from(res: &Result<T>) -> Self {
        match res {
            Ok(_) => StatusCode::Success,
            Err(e) => e.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_file_not_found() {
        let err = JsonFileError::io(
            "missing.json",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(err.status(), StatusCode::FileNotFound);
        let err = JsonFileError::io(
            "locked.json",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.status(), StatusCode::GenericFailure);
    }

    #[test]
    fn validation_is_generic_failure_at_boundary() {
        let err = JsonFileError::Validation(SchemaViolation::MissingRequired("name".into()));
        assert_eq!(err.status(), StatusCode::GenericFailure);
        assert_eq!(
            err.to_string(),
            "schema validation failed: required property missing: name"
        );
    }

    #[test]
    fn parse_error_mentions_position() {
        let bad = serde_json::from_str::<serde_json::Value>("{\n  \"a\": }").unwrap_err();
        let err = JsonFileError::parse_value(&bad);
        assert_eq!(err.status(), StatusCode::ParseError);
        assert!(err.to_string().contains("line 2"));
    }
}
