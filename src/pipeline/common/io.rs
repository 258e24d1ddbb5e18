use std::fs;
use std::io::Write;
use std::path::Path;

use super::error::{PipelineError, Result};

/// Write `bytes` to `path` via a temporary sibling and an atomic rename.
///
/// Readers of the output directory (the display layer polls it) never observe
/// a partially written artifact, and two instances racing on the same target
/// both leave a complete file behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            PipelineError::OutputWriteError(format!("{}: no parent directory", path.display()))
        })?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            PipelineError::OutputWriteError(format!("{}: invalid file name", path.display()))
        })?;

    let staging = dir.join(format!(".{file_name}.part"));
    let result = (|| {
        let mut file = fs::File::create(&staging)?;
        file.write_all(bytes)?;
        drop(file);
        fs::rename(&staging, path)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&staging);
        PipelineError::OutputWriteError(format!("{}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_bytes_at_final_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("frame_0001.jpg");

        write_atomic(&target, b"payload").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"payload");
        // No staging file is left behind.
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("frame_0001.jpg")]);
    }

    #[test]
    fn failed_write_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing_subdir").join("frame.jpg");

        assert!(write_atomic(&target, b"payload").is_err());
        assert!(!dir.path().join("missing_subdir").exists());
    }
}
