//! Removal of intermediate work directories.

use std::io;
use std::path::Path;

/// Removes a directory tree, deleting files before directories at each level.
///
/// A missing directory is not an error.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let mut subdirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }

    for dir in subdirs {
        remove_tree(&dir)?;
    }

    std::fs::remove_dir(path)
}

/// Runs [`remove_tree`] on the blocking pool.
pub(crate) async fn remove_tree_async(path: &Path) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || remove_tree(&path))
        .await
        .map_err(io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_nested_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("work");
        std::fs::create_dir_all(root.join("frames/1")).unwrap();
        std::fs::create_dir_all(root.join("sounds")).unwrap();
        std::fs::write(root.join("frames/1.png"), b"x").unwrap();
        std::fs::write(root.join("frames/1/inner.png"), b"x").unwrap();
        std::fs::write(root.join("sounds/0.mp3"), b"x").unwrap();
        std::fs::write(root.join("top.png"), b"x").unwrap();

        remove_tree(&root).unwrap();
        assert!(!root.exists());
        assert!(dir.path().exists());
    }

    #[test]
    fn test_missing_directory_is_ok() {
        let dir = TempDir::new().unwrap();
        remove_tree(&dir.path().join("nope")).unwrap();
    }

    #[tokio::test]
    async fn test_async_wrapper() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("work");
        std::fs::create_dir_all(root.join("frames")).unwrap();
        remove_tree_async(&root).await.unwrap();
        assert!(!root.exists());
    }
}
