//! Sandbox path resolution
//!
//! Every file-touching tool resolves the model-supplied path through
//! [`SandboxRoot::resolve`] before doing any I/O.

use sdk::errors::EngineError;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Why a path was refused by the sandbox.
///
/// Both variants carry the path exactly as the caller supplied it, so tools
/// can report it back without leaking the absolute sandbox location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    /// The resolved path is not the root or a descendant of it
    #[error("{path:?} resolves outside the sandbox root")]
    OutsideRoot { path: String },

    /// An existing entry on the path could not be canonicalized
    /// (dangling symlink, symlink loop, permission denied)
    #[error("{path:?} cannot be resolved: {reason}")]
    Unresolvable { path: String, reason: String },
}

impl SandboxError {
    /// The path as originally requested
    pub fn path(&self) -> &str {
        match self {
            SandboxError::OutsideRoot { path } | SandboxError::Unresolvable { path, .. } => path,
        }
    }
}

/// The directory all tool-driven file and process operations are confined to.
///
/// The root is canonicalized once at construction, so later checks compare
/// canonical paths on both sides.
///
/// # Security Model
///
/// Resolution runs in three steps:
/// 1. Join the requested path onto the root (an absolute request replaces
///    the root entirely and is then judged like any other path)
/// 2. Canonicalize the deepest existing ancestor, resolving symlinks and
///    `..`, then append the not-yet-existing remainder with lexical
///    normalization
/// 3. Require the result to be the root or nested under it, compared
///    component-wise (`/work/ws2` is not inside `/work/ws`)
///
/// An existing entry that cannot be canonicalized is refused rather than
/// guessed at, so a dangling symlink can never be used to write outside
/// the root.
///
/// # Examples
///
/// ```no_run
/// use scout_engine::sandbox::SandboxRoot;
///
/// let root = SandboxRoot::new("/home/user/workspace").unwrap();
///
/// assert!(root.resolve("src/main.py").is_ok());
/// assert!(root.resolve("../.ssh/id_rsa").is_err());
/// assert!(root.resolve("/etc/passwd").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SandboxRoot {
    root: PathBuf,
}

impl SandboxRoot {
    /// Creates a sandbox rooted at an existing directory.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PathCanonicalization` if the path cannot be
    /// canonicalized, `EngineError::InvalidSandboxRoot` if it is not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, EngineError> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|e| EngineError::PathCanonicalization(root.to_path_buf(), e.to_string()))?;

        if !canonical.is_dir() {
            return Err(EngineError::InvalidSandboxRoot(
                canonical,
                "not a directory".to_string(),
            ));
        }

        Ok(Self { root: canonical })
    }

    /// The canonical root directory
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolves `relative` against the root.
    ///
    /// The target does not need to exist. The returned path is absolute and
    /// always equal to or nested under [`SandboxRoot::path`].
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, SandboxError> {
        let joined = self.root.join(relative);

        let resolved = resolve_existing_prefix(&joined).map_err(|e| SandboxError::Unresolvable {
            path: relative.to_string(),
            reason: e.to_string(),
        })?;

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(SandboxError::OutsideRoot {
                path: relative.to_string(),
            })
        }
    }
}

/// Canonicalize the deepest ancestor of `path` that exists on disk and
/// append the rest lexically.
///
/// Existence is checked with `symlink_metadata` so that a symlink is seen as
/// existing even when its target is not; canonicalizing it then fails and
/// the error is returned.
fn resolve_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    for ancestor in path.ancestors() {
        if std::fs::symlink_metadata(ancestor).is_err() {
            continue;
        }

        let mut resolved = ancestor.canonicalize()?;
        let remainder = path.strip_prefix(ancestor).unwrap_or_else(|_| Path::new(""));

        for component in remainder.components() {
            match component {
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::Prefix(_) => resolved.push(component.as_os_str()),
            }
        }

        return Ok(resolved);
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "no ancestor of the path exists",
    ))
}
