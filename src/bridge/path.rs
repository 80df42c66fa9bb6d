//! Canonicalization and containment helpers
//!
//! Canonicalization resolves `.`, `..` and symlinks component by component.
//! Components the process cannot observe (missing, or behind a directory it
//! cannot traverse) are kept lexically, so a privileged-only directory still
//! has a well-defined canonical form. A dangling symlink is still followed
//! through its link text, since the privileged reader would follow it. Any
//! other failure is an error.

use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Subdirectories that can never be exposed
///
/// Any future addition to this list is a breaking change.
pub const FORBIDDEN_DATA_DIRS: &[&str] = &["/data/data", "/data/system"];

/// Make `path` absolute against the current directory without touching the
/// filesystem, collapsing `.` and `..`.
pub fn absolute_lexical(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Symlinks followed through link text before giving up, matching `ELOOP`
const MAX_SYMLINK_HOPS: u32 = 40;

/// Canonicalize `path`, keeping unobservable components lexically
pub fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let mut hops = 0;
    resolve_lenient(path, &mut hops)
}

fn resolve_lenient(path: &Path, hops: &mut u32) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                resolved.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                // `resolved` is canonical up to here, so its parent is the
                // real parent and not a symlink's lexical one.
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                match std::fs::canonicalize(&resolved) {
                    Ok(real) => resolved = real,
                    Err(e) if is_unobservable(&e) => {
                        if let Ok(target) = std::fs::read_link(&resolved) {
                            *hops += 1;
                            if *hops > MAX_SYMLINK_HOPS {
                                return Err(io::Error::new(
                                    ErrorKind::InvalidInput,
                                    "too many levels of symbolic links",
                                ));
                            }
                            resolved.pop();
                            // An absolute target replaces the parent entirely
                            let target = resolved.join(target);
                            resolved = resolve_lenient(&target, hops)?;
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok(resolved)
}

fn is_unobservable(error: &io::Error) -> bool {
    matches!(error.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied)
}

/// Canonical directory path as a string ending with a separator
pub fn canonical_dir_path(dir: &Path) -> io::Result<String> {
    let canonical = canonicalize_lenient(dir)?;
    let mut path = path_to_string(&canonical)?;
    if !path.ends_with(MAIN_SEPARATOR) {
        path.push(MAIN_SEPARATOR);
    }
    Ok(path)
}

/// Resolve `child` against `parent_dir` and return it only if it stays inside
///
/// `parent_dir` must already be a canonical directory string from
/// [`canonical_dir_path`]. The check is a string-prefix test on two
/// canonical paths.
pub fn canonical_child_path(parent_dir: &str, child: &str) -> io::Result<Option<PathBuf>> {
    let joined = Path::new(parent_dir).join(child);
    let canonical = canonicalize_lenient(&joined)?;
    let canonical_str = path_to_string(&canonical)?;

    if canonical_str.starts_with(parent_dir) {
        Ok(Some(canonical))
    } else {
        Ok(None)
    }
}

/// First forbidden prefix `path` falls under, if any
pub fn forbidden_prefix(path: &str) -> Option<&'static str> {
    FORBIDDEN_DATA_DIRS
        .iter()
        .copied()
        .find(|forbidden| path.starts_with(forbidden))
}

fn path_to_string(path: &Path) -> io::Result<String> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidData,
            format!("path is not valid UTF-8: {}", path.display()),
        )
    })
}
