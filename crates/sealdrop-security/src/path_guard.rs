// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Path guard. Every path the store touches is resolved here.
//
// Validation runs on the canonical absolute path, never on the raw fragment:
// symlinks are followed component by component and `..` is applied to the
// already-resolved prefix, so neither lexical tricks nor links can step
// outside the root. Checks are pure; callers do the I/O afterwards.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use sealdrop_core::error::{PathViolation, Result, SealdropError, ViolationKind};
use tracing::debug;

use crate::filename::{self, ENCRYPTED_EXTENSION};

/// Name of the plaintext operator log kept at the top of the store.
pub const NOTES_FILE: &str = "NOTES";

/// The canonical, absolute directory all artifacts live under.
///
/// Set once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot {
    path: PathBuf,
}

impl StorageRoot {
    /// Canonicalize an existing absolute directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() || !path.is_absolute() {
            return Err(violation(ViolationKind::RootNotAbsolute, path));
        }
        let canonical = fs::canonicalize(path)?;
        if !canonical.is_dir() {
            return Err(SealdropError::Config(
                "storage root is not a directory".into(),
            ));
        }
        Ok(Self { path: canonical })
    }

    /// Create the directory (and parents) if needed, then canonicalize it.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() || !path.is_absolute() {
            return Err(violation(ViolationKind::RootNotAbsolute, path));
        }
        fs::create_dir_all(path)?;
        Self::new(path)
    }

    /// The canonical root directory.
    ///
    /// Joining onto this bypasses every check `resolve` makes; callers that
    /// act on caller-supplied fragments must go through `resolve`.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Resolve a caller-supplied fragment. See [`resolve`].
    pub fn resolve(&self, fragment: impl AsRef<Path>) -> Result<PathBuf> {
        resolve(self, fragment.as_ref())
    }

    /// Path of the fixed plaintext log.
    ///
    /// A `NOTES` entry that is a dangling link, points out of the root,
    /// resolves to some other file, or is not a regular file is refused.
    pub fn notes_path(&self) -> Result<PathBuf> {
        let target = canonicalize_lenient(&self.path.join(NOTES_FILE))?;
        ensure_below(self, &target)?;
        if target.file_name().is_some_and(|name| name == NOTES_FILE) {
            match fs::metadata(&target) {
                Ok(meta) if meta.is_file() => return Ok(target),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(target),
                Ok(_) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Err(violation(ViolationKind::UnsupportedEntry, &target))
    }
}

/// Resolve `fragment` under `root` to a canonical absolute path.
///
/// Fails with a `PathViolation` when the result is not strictly below the
/// root, when a symlink on the way dangles, or when the target already
/// exists and is not a directory or a regular file that matches the
/// submission filename grammar with the `.gpg` extension.
pub fn resolve(root: &StorageRoot, fragment: &Path) -> Result<PathBuf> {
    let target = canonicalize_lenient(&root.path.join(fragment))?;
    ensure_below(root, &target)?;

    match fs::metadata(&target) {
        Ok(meta) if meta.is_dir() => {}
        Ok(meta) if meta.is_file() => check_existing_file(&target)?,
        Ok(_) => return Err(violation(ViolationKind::UnsupportedEntry, &target)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    debug!(path = %target.display(), "path resolved");
    Ok(target)
}

/// Existing regular files must be sealed artifacts with a grammar name.
fn check_existing_file(target: &Path) -> Result<()> {
    if target.extension().and_then(|e| e.to_str()) != Some(ENCRYPTED_EXTENSION) {
        return Err(violation(ViolationKind::Extension, target));
    }
    let valid = target
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(filename::is_valid);
    if !valid {
        return Err(violation(ViolationKind::Filename, target));
    }
    Ok(())
}

/// Component-wise strict prefix check on canonical paths.
pub(crate) fn ensure_below(root: &StorageRoot, target: &Path) -> Result<()> {
    if target != root.path && target.starts_with(&root.path) {
        Ok(())
    } else {
        Err(violation(ViolationKind::OutsideRoot, target))
    }
}

/// Canonicalize a path whose tail may not exist yet.
///
/// Existing components are resolved through the filesystem (following
/// symlinks); once a component is missing, the rest is applied lexically,
/// which is sound because missing entries cannot be links. `..` always pops
/// the already-canonical prefix.
pub(crate) fn canonicalize_lenient(path: &Path) -> Result<PathBuf> {
    let mut resolved = PathBuf::new();
    let mut missing = false;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
                // Popping back into existing territory means later
                // components must be checked against the filesystem again.
                missing = !resolved.exists();
            }
            Component::Normal(name) => {
                let candidate = resolved.join(name);
                if missing {
                    resolved = candidate;
                    continue;
                }
                match fs::symlink_metadata(&candidate) {
                    Ok(_) => match fs::canonicalize(&candidate) {
                        Ok(real) => resolved = real,
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {
                            return Err(violation(ViolationKind::DanglingLink, &candidate));
                        }
                        Err(e) => return Err(e.into()),
                    },
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        missing = true;
                        resolved = candidate;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    Ok(resolved)
}

fn violation(kind: ViolationKind, path: &Path) -> SealdropError {
    PathViolation::new(kind, path.display().to_string()).into()
}
