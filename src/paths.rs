//! Joining untrusted relative paths onto a root directory.

use std::path::{Component, Path, PathBuf};

/// Join a slash-separated `relative` path onto `root`.
///
/// Leading slashes are ignored and `.` segments are dropped. Returns `None`
/// when a segment would climb out of `root` (`..`) or re-root the path
/// (a drive or UNC prefix on Windows).
pub(crate) fn join_under(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative.trim_start_matches('/'));
    let mut joined = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}
