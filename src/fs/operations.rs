use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

/// Sibling file the data is staged in before it replaces `path`.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|v| v.to_os_string())
        .unwrap_or_else(|| "export".into());
    name.push(".part");
    path.with_file_name(name)
}

/// Writes `bytes` to `path` through a staging file and a rename, so a failed export never leaves
/// a half-written target behind. An existing target is only replaced once the data is on disk.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), io::Error> {
    let staging = staging_path(path);
    debug!("Staging {} bytes in {staging:?}", bytes.len());

    let result = (|| {
        let mut file = File::create(&staging)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&staging, path)
    })();

    if result.is_err() {
        if let Err(e) = fs::remove_file(&staging) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to clean up {staging:?}: {e}");
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::{staging_path, write_atomically};

    #[test]
    fn test_write_atomically_basic() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("report.pdf");

        write_atomically(&path, b"first")?;
        write_atomically(&path, b"second")?;

        assert_eq!(fs::read(&path)?, b"second");
        assert!(!staging_path(&path).exists());
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_write_atomically_missing_directory() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("missing").join("chart.svg");

        assert!(write_atomically(&path, b"data").is_err());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_failed_rename_keeps_target() -> Result<()> {
        let dir = tempdir()?;
        // A non-empty directory can't be replaced by a file.
        let path = dir.path().join("occupied");
        fs::create_dir(&path)?;
        fs::write(path.join("inside"), b"keep")?;

        assert!(write_atomically(&path, b"data").is_err());
        assert_eq!(fs::read(path.join("inside"))?, b"keep");
        assert!(!staging_path(&path).exists());
        Ok(())
    }
}
