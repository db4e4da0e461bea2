use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::{JsonFileError, Result};

#[derive(Debug, Clone)]
pub struct FileSnapshot {
    path: PathBuf,
    bytes: Vec<u8>,
    modified: SystemTime,
    captured_at: DateTime<Local>,
}

impl FileSnapshot {
    pub fn capture(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| JsonFileError::io(path, e))?;
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| JsonFileError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
            modified,
            captured_at: Local::now(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Rewrite the file with the captured bytes and reset its modified time.
    pub fn restore(&self) -> Result<()> {
        fs::write(&self.path, &self.bytes).map_err(|e| JsonFileError::io(&self.path, e))?;
        let file = File::options()
            .write(true)
            .open(&self.path)
            .map_err(|e| JsonFileError::io(&self.path, e))?;
        file.set_modified(self.modified)
            .map_err(|e| JsonFileError::io(&self.path, e))?;
        info!(
            file = %self.path.display(),
            captured_at = %self.captured_at.format("%Y-%m-%d %H:%M:%S"),
            bytes = self.bytes.len(),
            "rolled back JSON file"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn restore_puts_back_bytes_and_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("settings.json");
        fs::write(&p, "{\"a\": 1}").unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        File::options().write(true).open(&p).unwrap().set_modified(old).unwrap();

        let snap = FileSnapshot::capture(&p).unwrap();
        assert_eq!(snap.bytes(), b"{\"a\": 1}");
        assert_eq!(snap.modified(), old);
        fs::write(&p, "{\"a\": 2, \"b\": [1, 2, 3]}").unwrap();
        snap.restore().unwrap();

        let restored = FileSnapshot::capture(&p).unwrap();
        assert_eq!(restored.bytes(), snap.bytes());
        assert_eq!(restored.modified(), snap.modified());
    }

    #[test]
    fn capture_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSnapshot::capture(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, JsonFileError::FileNotFound(_)));
    }
}
