//! Per-user path containment.
//!
//! Every storage request names a path relative to the caller's own
//! directory, `storage_root/<user_id>`. [`Sandbox::resolve`] joins the two,
//! canonicalizes the result lexically (no filesystem access, so symlink
//! targets and missing paths are treated alike) and then checks that the
//! canonical path still lies under the user's directory. The prefix check is
//! what enforces containment; canonicalization only makes it meaningful.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::types::DbId;

/// Join a base directory and a user-supplied path with exactly one `/`
/// between them.
pub fn join_path(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Canonicalize an absolute `/`-separated path without touching the disk.
///
/// Empty and `.` segments are dropped, `..` pops the previous segment.
/// Popping at `/` is a no-op, so `"/../.."` becomes `"/"`. The result always
/// starts with `/` and never ends with one (except for `/` itself).
pub fn normalize_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    format!("/{}", stack.join("/"))
}

/// True when `path` is `root` or a descendant of it.
///
/// Compared per component: `/srv/storage/1` does not contain
/// `/srv/storage/10`.
fn is_contained(path: &str, root: &str) -> bool {
    match path.strip_prefix(root) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// The storage root under which every user owns one directory.
#[derive(Debug, Clone)]
pub struct Sandbox {
    /// Absolute, normalized storage root.
    storage_root: String,
}

impl Sandbox {
    /// Build a sandbox rooted at `storage_root`.
    ///
    /// Relative roots are anchored at the current working directory. The
    /// root must be valid UTF-8 because containment is checked on strings.
    pub fn new(storage_root: impl AsRef<Path>) -> Result<Self, CoreError> {
        let root = storage_root.as_ref();
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| CoreError::Internal(format!("Cannot read working directory: {e}")))?
                .join(root)
        };
        let as_str = absolute.to_str().ok_or_else(|| {
            CoreError::Internal("Storage root must be a valid UTF-8 path".into())
        })?;

        Ok(Self {
            storage_root: normalize_path(as_str),
        })
    }

    /// Absolute storage root, as used in containment checks.
    pub fn storage_root(&self) -> &str {
        &self.storage_root
    }

    /// Absolute directory owned by `user_id`.
    pub fn user_root(&self, user_id: DbId) -> String {
        join_path(&self.storage_root, &user_id.to_string())
    }

    /// Resolve `relative` inside the directory of `user_id`.
    ///
    /// Returns [`CoreError::Forbidden`] when the canonical path leaves the
    /// user's directory, and [`CoreError::BadRequest`] for paths containing
    /// NUL bytes.
    pub fn resolve(&self, user_id: DbId, relative: &str) -> Result<SandboxedPath, CoreError> {
        if relative.contains('\0') {
            return Err(CoreError::BadRequest("Path must not contain NUL bytes".into()));
        }

        let user_root = self.user_root(user_id);
        let canonical = normalize_path(&join_path(&user_root, relative));

        if !is_contained(&canonical, &user_root) {
            return Err(CoreError::Forbidden(
                "Access denied: path escapes the user directory".into(),
            ));
        }

        Ok(SandboxedPath {
            path: PathBuf::from(&canonical),
            canonical,
            user_root,
        })
    }
}

/// An absolute path proven to lie inside one user's directory.
///
/// Only [`Sandbox::resolve`] constructs these, so storage operations that
/// accept a `SandboxedPath` cannot be handed an unchecked path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxedPath {
    path: PathBuf,
    canonical: String,
    user_root: String,
}

impl SandboxedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// The owning user's directory.
    pub fn user_root(&self) -> &str {
        &self.user_root
    }

    /// True when this path is the user's directory itself.
    pub fn is_root(&self) -> bool {
        self.canonical == self.user_root
    }

    /// Path relative to the user's directory, always starting with `/`.
    pub fn display_path(&self) -> String {
        match self.canonical.strip_prefix(&self.user_root) {
            Some("") | None => "/".to_string(),
            Some(rest) => rest.to_string(),
        }
    }

    /// Final path component, or an empty string for the user's directory.
    pub fn file_name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        self.canonical.rsplit('/').next().unwrap_or_default()
    }

    /// A child of this path. `name` must be a single component; see
    /// [`crate::storage::sanitize_file_name`].
    pub(crate) fn child(&self, name: &str) -> SandboxedPath {
        let canonical = join_path(&self.canonical, name);
        SandboxedPath {
            path: PathBuf::from(&canonical),
            canonical,
            user_root: self.user_root.clone(),
        }
    }
}
