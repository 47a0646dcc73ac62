//! Path resolution against a session working directory

use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Resolve `path` into an absolute path relative to `cwd`
///
/// Expands a leading `~` and `$VAR` / `${VAR}` references, joins relative
/// results onto `cwd`, then normalizes `.` and `..` lexically. Never fails and
/// never touches the filesystem.
pub fn resolve(path: &str, cwd: &Path) -> PathBuf {
    debug!(%path, ?cwd, "resolve: called");
    let expanded = expand(path);
    let candidate = PathBuf::from(&expanded);

    let joined = if candidate.is_absolute() {
        debug!("resolve: path is absolute");
        candidate
    } else {
        debug!("resolve: path is relative, joining with cwd");
        cwd.join(candidate)
    };

    normalize(&joined)
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references
///
/// `~user` forms and unknown variables are left verbatim.
pub fn expand(path: &str) -> String {
    shellexpand::full_with_context_no_errors(
        path,
        || dirs::home_dir().map(|p| p.to_string_lossy().into_owned()),
        |name| std::env::var(name).ok(),
    )
    .into_owned()
}

/// Lexically collapse `.` and `..` components
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(Component::RootDir.as_os_str());
    }
    out
}
