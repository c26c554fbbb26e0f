//! Atomic file replacement
//!
//! Output goes to a temporary file in the destination directory, which is
//! flushed and synced before being renamed over the destination. A writer
//! that fails leaves the destination untouched and the temporary file is
//! removed when it drops. A replaced file keeps its permissions.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

use crate::error::Result;

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` is `Some("")` for a bare file name
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Replace `dest` with whatever `write_fn` writes into an open file
///
/// Returns the size of the file that was moved into place.
pub fn atomic_write<F>(dest: &Path, write_fn: F) -> Result<u64>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    debug!("Writing {} via {}", dest.display(), tmp.path().display());
    write_fn(tmp.as_file_mut())?;

    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    let size = tmp.as_file().metadata()?.len();
    keep_permissions(dest, tmp.path())?;

    tmp.into_temp_path().persist(dest).map_err(|e| e.error)?;
    // The file is in place; a directory sync failure is not a write failure
    let _ = sync_parent_dir(dest);

    Ok(size)
}

/// Like [`atomic_write`], for writers that only accept a path
///
/// The temporary file already exists when `write_fn` runs, so it must
/// truncate rather than create-new.
pub fn atomic_write_with_path<F>(dest: &Path, write_fn: F) -> Result<u64>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir)?;

    let tmp_path = NamedTempFile::new_in(dir)?.into_temp_path();
    debug!("Writing {} via {}", dest.display(), tmp_path.display());
    write_fn(&tmp_path)?;

    let file = File::open(&tmp_path)?;
    file.sync_all()?;
    let size = file.metadata()?.len();
    drop(file);
    keep_permissions(dest, &tmp_path)?;

    tmp_path.persist(dest).map_err(|e| e.error)?;
    let _ = sync_parent_dir(dest);

    Ok(size)
}

/// Atomically write a byte slice
pub fn atomic_write_bytes(dest: &Path, bytes: &[u8]) -> Result<u64> {
    atomic_write(dest, |file| Ok(file.write_all(bytes)?))
}

/// Give `tmp` the mode of the file it is about to replace
fn keep_permissions(dest: &Path, tmp: &Path) -> io::Result<()> {
    match fs::metadata(dest) {
        Ok(existing) => fs::set_permissions(tmp, existing.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn sync_parent_dir(path: &Path) -> io::Result<()> {
    // Opening a directory fails on some platforms; callers ignore the result
    File::open(parent_dir_or_dot(path))?.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("book.xlsx");
        fs::write(&dest, b"old").unwrap();

        let size = atomic_write_bytes(&dest, b"new contents").unwrap();

        assert_eq!(size, 12);
        assert_eq!(fs::read(&dest).unwrap(), b"new contents");
        assert_eq!(dir_entries(dir.path()), vec!["book.xlsx"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_replacement_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("book.xlsx");
        fs::write(&dest, b"old").unwrap();
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o644)).unwrap();

        atomic_write_bytes(&dest, b"new").unwrap();
        let mode = fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);

        fs::set_permissions(&dest, fs::Permissions::from_mode(0o640)).unwrap();
        atomic_write_with_path(&dest, |tmp| Ok(fs::write(tmp, b"newer")?)).unwrap();
        let mode = fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_failed_writer_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("book.xlsx");
        fs::write(&dest, b"original bytes").unwrap();

        let err = atomic_write(&dest, |file| {
            file.write_all(b"half a workbook")?;
            Err(Error::Session("writer failed".into()))
        })
        .unwrap_err();

        assert!(matches!(err, Error::Session(_)));
        assert_eq!(fs::read(&dest).unwrap(), b"original bytes");
        // The temporary file is gone too
        assert_eq!(dir_entries(dir.path()), vec!["book.xlsx"]);
    }

    #[test]
    fn test_path_writer_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("book.xlsx");

        let err = atomic_write_with_path(&dest, |tmp| {
            fs::write(tmp, b"partial")?;
            Err(Error::Validation("stop".into()))
        })
        .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(!dest.exists());
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/deeper/out.csv");

        atomic_write_with_path(&dest, |tmp| Ok(fs::write(tmp, "a,b\n")?)).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "a,b\n");
    }
}
