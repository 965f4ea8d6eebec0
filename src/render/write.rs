use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use super::RenderError;

/// Replace the contents of `path` with `contents`.
///
/// The bytes go to a temporary file next to `path` which is then renamed over
/// the destination, so readers see either the old file or the complete new
/// one. The temporary file is removed if anything fails before the rename.
pub fn replace_file(path: &Path, contents: &[u8]) -> Result<PathBuf, RenderError> {
    let write_err = |source: std::io::Error| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    let existed = path.exists();
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    if existed {
        info!("Replaced existing file: {}", path.display());
    }
    info!("Saved new plot: {}", path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_replace_overwrites() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("a.html");
        fs::write(&path, "old contents that are longer").unwrap();

        replace_file(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");

        let leftovers = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_missing_directory_fails() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nope").join("a.html");
        let err = replace_file(&path, b"x").unwrap_err();
        assert!(matches!(err, RenderError::Write { .. }));
        assert!(!path.exists());
    }
}
