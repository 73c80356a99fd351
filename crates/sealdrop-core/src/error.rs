// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Sealdrop.

use std::fmt;

use thiserror::Error;

/// Why a path was refused by the path guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// The storage root is not an absolute path.
    RootNotAbsolute,
    /// The canonical target is not strictly below the storage root.
    OutsideRoot,
    /// A symlink on the way to the target points nowhere.
    DanglingLink,
    /// An existing regular file carries an extension other than `.gpg`.
    Extension,
    /// An existing regular file does not follow the submission filename grammar.
    Filename,
    /// The target exists but is neither a directory nor a regular file.
    UnsupportedEntry,
}

impl ViolationKind {
    fn describe(self) -> &'static str {
        match self {
            Self::RootNotAbsolute => "storage root is not absolute",
            Self::OutsideRoot => "path resolves outside the storage root",
            Self::DanglingLink => "path traverses a dangling symlink",
            Self::Extension => "existing file has a forbidden extension",
            Self::Filename => "existing file does not match the submission filename grammar",
            Self::UnsupportedEntry => "existing entry is not a directory or regular file",
        }
    }
}

/// A refused path.
///
/// `Display` only names the kind of violation. The offending path is kept in
/// `detail` for internal diagnostics and must not be echoed to untrusted
/// output channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathViolation {
    pub kind: ViolationKind,
    detail: String,
}

impl PathViolation {
    pub fn new(kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Internal diagnostic detail (usually the offending path).
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for PathViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.describe())
    }
}

impl std::error::Error for PathViolation {}

/// Which kind of operator response an error calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller supplied bad input; fix the caller.
    CallerInput,
    /// The deployment is misconfigured; fix the configuration.
    Misconfiguration,
    /// An external dependency failed; retry or alert.
    Transient,
}

/// Top-level error type for all Sealdrop operations.
#[derive(Debug, Error)]
pub enum SealdropError {
    // -- Path guard --
    #[error("path violation: {0}")]
    PathViolation(#[from] PathViolation),

    #[error("not a submission filename")]
    InvalidFilename,

    #[error("no file with that name in the store")]
    FileNotFound,

    #[error("more than one file with that name in the store")]
    AmbiguousFile,

    // -- Key custody --
    #[error("recipient key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("recipient key invalid: {0}")]
    KeyInvalid(String),

    #[error("recipient key has not been validated")]
    KeyNotValidated,

    // -- Sealing --
    #[error("encryption engine failure: {0}")]
    EngineFailure(String),

    #[error("content is not sealed ciphertext")]
    NotSealed,

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    // -- Identity codec --
    #[error("identity codec misconfigured: {0}")]
    IdentityMisconfigured(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SealdropError {
    /// The operator-response class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PathViolation(v) if v.kind == ViolationKind::RootNotAbsolute => {
                ErrorClass::Misconfiguration
            }
            Self::PathViolation(_)
            | Self::InvalidFilename
            | Self::FileNotFound
            | Self::AmbiguousFile
            | Self::NotSealed
            | Self::IntegrityMismatch { .. } => ErrorClass::CallerInput,
            Self::KeyUnavailable(_)
            | Self::KeyInvalid(_)
            | Self::KeyNotValidated
            | Self::IdentityMisconfigured(_)
            | Self::Config(_)
            | Self::Serialization(_) => ErrorClass::Misconfiguration,
            Self::EngineFailure(_) | Self::Io(_) => ErrorClass::Transient,
        }
    }

    /// Whether this error is about recipient key custody.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::KeyUnavailable(_) | Self::KeyInvalid(_) | Self::KeyNotValidated
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SealdropError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_display_hides_path() {
        let v = PathViolation::new(ViolationKind::OutsideRoot, "/etc/passwd");
        let err = SealdropError::from(v);
        let shown = err.to_string();
        assert!(!shown.contains("passwd"), "display leaked the path: {shown}");
        match err {
            SealdropError::PathViolation(v) => assert_eq!(v.detail(), "/etc/passwd"),
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn classes_are_distinct() {
        let caller = SealdropError::from(PathViolation::new(ViolationKind::OutsideRoot, ""));
        let config = SealdropError::KeyInvalid("truncated".into());
        let transient = SealdropError::EngineFailure("timeout".into());

        assert_eq!(caller.class(), ErrorClass::CallerInput);
        assert_eq!(config.class(), ErrorClass::Misconfiguration);
        assert_eq!(transient.class(), ErrorClass::Transient);
    }

    #[test]
    fn relative_root_is_misconfiguration() {
        let err = SealdropError::from(PathViolation::new(ViolationKind::RootNotAbsolute, "store"));
        assert_eq!(err.class(), ErrorClass::Misconfiguration);
    }

    #[test]
    fn key_errors_flagged() {
        assert!(SealdropError::KeyNotValidated.is_key_error());
        assert!(SealdropError::KeyUnavailable("gone".into()).is_key_error());
        assert!(!SealdropError::NotSealed.is_key_error());
    }
}
