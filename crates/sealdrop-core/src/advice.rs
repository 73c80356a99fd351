// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing advice for store errors.
//
// Every error maps to a plain summary and a concrete next step. The error
// class decides who acts: the calling service, the operator's configuration,
// or nobody yet (retry / alert).

use crate::error::{ErrorClass, SealdropError, ViolationKind};

/// A plain-language description of a failure and what to do about it.
#[derive(Debug, Clone)]
pub struct OperatorAdvice {
    /// One-line summary, safe to show on an admin console.
    pub summary: String,
    /// What the operator should do next.
    pub action: String,
    /// Whether repeating the same call may succeed without intervention.
    pub retriable: bool,
    pub class: ErrorClass,
}

/// Turn an error into operator advice.
///
/// Path details are never included; they belong in debug logs only.
pub fn advise(err: &SealdropError) -> OperatorAdvice {
    let class = err.class();
    let (summary, action, retriable) = match err {
        SealdropError::PathViolation(v) => match v.kind {
            ViolationKind::RootNotAbsolute => (
                "The storage root is not an absolute path.",
                "Set storage_root to an absolute directory and restart.",
                false,
            ),
            ViolationKind::Extension | ViolationKind::Filename => (
                "A file in the store breaks the naming policy.",
                "Inspect the store for foreign files; nothing outside the submission grammar belongs there.",
                false,
            ),
            ViolationKind::DanglingLink | ViolationKind::UnsupportedEntry => (
                "An entry inside the store is damaged or of an unexpected type.",
                "Inspect the store for broken links or foreign entries; keep it offline until they are removed.",
                false,
            ),
            ViolationKind::OutsideRoot => (
                "A request named a location outside the store.",
                "Reject the request; check the calling service for path handling bugs.",
                false,
            ),
        },
        SealdropError::InvalidFilename => (
            "A request used a name that is not a submission filename.",
            "Fix the calling service to build names with the filename convention.",
            false,
        ),
        SealdropError::FileNotFound => (
            "The requested submission is not in the store.",
            "Check whether it was deleted or moved to the shredder.",
            false,
        ),
        SealdropError::AmbiguousFile => (
            "Several submissions share the requested name.",
            "Look up the submission by source directory instead.",
            false,
        ),
        SealdropError::KeyUnavailable(_) => (
            "The journalist public key could not be found.",
            "Install the recipient key at the configured path, then reload and validate it.",
            false,
        ),
        SealdropError::KeyInvalid(_) => (
            "The journalist public key is not usable.",
            "Replace the recipient key file with a valid public key, then reload and validate it.",
            false,
        ),
        SealdropError::KeyNotValidated => (
            "Submissions are blocked until the journalist key is validated.",
            "Run the key validation; do not accept submissions until it passes.",
            false,
        ),
        SealdropError::EngineFailure(_) => (
            "The encryption engine failed.",
            "Retry the submission; alert if the failure persists.",
            true,
        ),
        SealdropError::NotSealed => (
            "A reply was submitted without encryption.",
            "Encrypt the reply to the source key before storing it.",
            false,
        ),
        SealdropError::IntegrityMismatch { .. } => (
            "A stored submission does not match its recorded checksum.",
            "Treat the file as tampered; compare against backups before anyone opens it.",
            false,
        ),
        SealdropError::IdentityMisconfigured(_) => (
            "The designation word lists are unusable.",
            "Provide non-empty adjective and noun lists and restart.",
            false,
        ),
        SealdropError::Config(_) | SealdropError::Serialization(_) => (
            "The store configuration is invalid.",
            "Correct the configuration file and restart.",
            false,
        ),
        SealdropError::Io(_) => (
            "A filesystem operation failed.",
            "Check disk space and permissions on the store, then retry.",
            true,
        ),
    };

    OperatorAdvice {
        summary: summary.into(),
        action: action.into(),
        retriable,
        class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PathViolation;

    #[test]
    fn engine_failure_is_retriable() {
        let advice = advise(&SealdropError::EngineFailure("gpg exited 2".into()));
        assert!(advice.retriable);
        assert_eq!(advice.class, ErrorClass::Transient);
    }

    #[test]
    fn key_errors_need_operator() {
        for err in [
            SealdropError::KeyUnavailable("missing".into()),
            SealdropError::KeyInvalid("truncated".into()),
            SealdropError::KeyNotValidated,
        ] {
            let advice = advise(&err);
            assert!(!advice.retriable, "{err} must not be retriable");
            assert_eq!(advice.class, ErrorClass::Misconfiguration);
        }
    }

    #[test]
    fn advice_never_echoes_path() {
        let err = SealdropError::from(PathViolation::new(
            ViolationKind::OutsideRoot,
            "/var/lib/store/../../etc/shadow",
        ));
        let advice = advise(&err);
        assert!(!advice.summary.contains("shadow"));
        assert!(!advice.action.contains("shadow"));
        assert_eq!(advice.class, ErrorClass::CallerInput);
    }

    #[test]
    fn damaged_entries_are_not_reported_as_escapes() {
        let escape = advise(&SealdropError::from(PathViolation::new(ViolationKind::OutsideRoot, "")));
        for kind in [ViolationKind::DanglingLink, ViolationKind::UnsupportedEntry] {
            let advice = advise(&SealdropError::from(PathViolation::new(kind, "/var/lib/store/1.1.gpg")));
            assert_ne!(advice.summary, escape.summary, "{kind:?}");
            assert!(!advice.summary.contains("outside"), "{kind:?}");
            assert!(advice.action.contains("broken links"), "{kind:?}");
            assert!(!advice.retriable);
        }
    }
}
