// File system delivery for exported MIDI files
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name used when the caller does not pick one
pub const DEFAULT_MIDI_FILENAME: &str = "melody.mid";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A MIDI file written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMidi {
    pub path: PathBuf,
    /// Lowercase hex SHA256 of the file contents
    pub sha256: String,
}

/// Write MIDI bytes into `dir` (created if missing) and return the path and hash
pub fn store_midi(dir: &Path, filename: &str, data: &[u8]) -> StorageResult<StoredMidi> {
    // Only plain names, so the file always lands inside `dir`
    let is_plain = Path::new(filename)
        .file_name()
        .map(|name| name == filename)
        .unwrap_or(false);
    if !is_plain {
        return Err(StorageError::InvalidFileName(filename.to_string()));
    }

    fs::create_dir_all(dir)?;

    let file_path = dir.join(filename);
    let mut file = fs::File::create(&file_path)?;
    file.write_all(data)?;
    file.flush()?;

    let sha256 = calculate_sha256(data);
    log::info!("Stored {} bytes at {}", data.len(), file_path.display());

    Ok(StoredMidi {
        path: file_path,
        sha256,
    })
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_calculate_sha256() {
        assert_eq!(
            calculate_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_store_midi_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("exports").join("session");
        let data = b"MThd-test".to_vec();

        let stored = store_midi(&out_dir, DEFAULT_MIDI_FILENAME, &data).unwrap();

        assert_eq!(stored.path, out_dir.join("melody.mid"));
        assert_eq!(fs::read(&stored.path).unwrap(), data);
        assert_eq!(stored.sha256, calculate_sha256(&data));
    }

    #[test]
    fn test_store_midi_rejects_nested_names() {
        let temp_dir = TempDir::new().unwrap();

        let result = store_midi(temp_dir.path(), "../escape.mid", b"data");
        assert!(matches!(result, Err(StorageError::InvalidFileName(_))));

        let result = store_midi(temp_dir.path(), "", b"data");
        assert!(matches!(result, Err(StorageError::InvalidFileName(_))));
    }
}
