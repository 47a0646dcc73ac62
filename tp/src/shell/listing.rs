//! Directory listing

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::tools::ToolError;

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One entry of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Outcome of listing an existing directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// Directory exists and has no entries
    Empty { path: PathBuf },
    /// Entries sorted ascending by name, case-sensitive
    Entries { path: PathBuf, entries: Vec<DirectoryEntry> },
}

impl Listing {
    pub fn path(&self) -> &Path {
        match self {
            Listing::Empty { path } | Listing::Entries { path, .. } => path,
        }
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        match self {
            Listing::Empty { .. } => &[],
            Listing::Entries { entries, .. } => entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Listing::Empty { .. })
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listing::Empty { path } => write!(f, "Directory '{}' is empty.", path.display()),
            Listing::Entries { path, entries } => {
                write!(f, "Contents of '{}':", path.display())?;
                for entry in entries {
                    match entry.kind {
                        EntryKind::Directory => write!(f, "\n{}/", entry.name)?,
                        EntryKind::File => write!(f, "\n{}", entry.name)?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Enumerate `path`, which must already be absolute
///
/// Symlinks are classified by their target, so a link to a directory lists
/// as a directory.
pub async fn list(path: &Path) -> Result<Listing, ToolError> {
    debug!(?path, "list: called");

    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) => {
            debug!(%e, "list: metadata failed");
            return Err(ToolError::from_io(path.to_path_buf(), &e));
        }
    };

    if !metadata.is_dir() {
        debug!("list: path is not a directory");
        return Err(ToolError::PathNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut dir = match tokio::fs::read_dir(path).await {
        Ok(d) => {
            debug!("list: directory opened");
            d
        }
        Err(e) => {
            debug!(%e, "list: failed to read directory");
            return Err(ToolError::from_io(path.to_path_buf(), &e));
        }
    };

    // Sorted on the raw names so non-UTF-8 names keep their byte order
    let mut raw = Vec::new();
    loop {
        let entry = match dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                debug!(%e, "list: failed while iterating directory");
                return Err(ToolError::from_io(path.to_path_buf(), &e));
            }
        };

        let name = entry.file_name();
        let kind = match tokio::fs::metadata(entry.path()).await {
            Ok(m) if m.is_dir() => EntryKind::Directory,
            Ok(_) => EntryKind::File,
            Err(_) => {
                // dangling symlink
                debug!(?name, "list: metadata unavailable, listing as file");
                EntryKind::File
            }
        };
        raw.push((name, kind));
    }

    raw.sort_by(|a, b| a.0.cmp(&b.0));
    let entries: Vec<DirectoryEntry> = raw
        .into_iter()
        .map(|(name, kind)| DirectoryEntry {
            name: name.to_string_lossy().into_owned(),
            kind,
        })
        .collect();
    debug!(entries_count = %entries.len(), "list: entries collected");

    if entries.is_empty() {
        Ok(Listing::Empty {
            path: path.to_path_buf(),
        })
    } else {
        Ok(Listing::Entries {
            path: path.to_path_buf(),
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_list_sorted_and_typed() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("b.txt"), "").unwrap();
        fs::write(temp.path().join("B.txt"), "").unwrap();
        fs::write(temp.path().join("a.txt"), "").unwrap();
        fs::create_dir(temp.path().join("subdir")).unwrap();

        let listing = list(temp.path()).await.unwrap();
        let names: Vec<&str> = listing.entries().iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["B.txt", "a.txt", "b.txt", "subdir"]);
        assert_eq!(listing.entries()[3].kind, EntryKind::Directory);
        assert_eq!(listing.entries()[0].kind, EntryKind::File);
    }

    #[tokio::test]
    #[cfg(target_os = "linux")]
    async fn test_non_utf8_names_sort_by_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = tempdir().unwrap();
        fs::write(temp.path().join("\u{e9}t\u{e9}"), "").unwrap();
        fs::write(temp.path().join(OsStr::from_bytes(b"\x80raw")), "").unwrap();

        let listing = list(temp.path()).await.unwrap();
        let names: Vec<&str> = listing.entries().iter().map(|e| e.name.as_str()).collect();

        // 0x80 sorts before 0xC3, although U+FFFD would sort after `é`
        assert_eq!(names, vec!["\u{FFFD}raw", "\u{e9}t\u{e9}"]);
    }

    #[tokio::test]
    async fn test_list_empty_is_distinct() {
        let temp = tempdir().unwrap();

        let listing = list(temp.path()).await.unwrap();

        assert!(listing.is_empty());
        assert!(listing.to_string().contains("is empty"));
    }

    #[tokio::test]
    async fn test_list_not_found() {
        let temp = tempdir().unwrap();

        let err = list(&temp.path().join("nonexistent")).await.unwrap_err();
        assert!(matches!(err, ToolError::PathNotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_file_is_not_found() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let err = list(&file).await.unwrap_err();
        assert!(matches!(err, ToolError::PathNotFound { .. }));
    }

    #[tokio::test]
    async fn test_render_marks_directories() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("file.txt"), "").unwrap();

        let text = list(temp.path()).await.unwrap().to_string();

        assert!(text.starts_with("Contents of '"));
        assert!(text.contains("\nfile.txt"));
        assert!(text.contains("\nnested/"));
    }
}
