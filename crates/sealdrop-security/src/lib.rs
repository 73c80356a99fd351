// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sealdrop-security: the protected path from a source's upload to a sealed
// file on disk.
//
// PathGuard confines every path to the storage root, the filename
// convention fixes what may live there, KeyCustodian refuses to hand out an
// unvalidated recipient key, and SealedStore composes the three so that
// nothing reaches disk unsealed except the operator NOTES log.

pub mod engine;
pub mod filename;
pub mod integrity;
pub mod keys;
pub mod path_guard;
pub mod sealed_store;
pub mod shredder;

pub use engine::{AgeEngine, EngineError, SealingEngine};
pub use filename::{ContentKind, SubmissionName};
pub use integrity::{checksum_bytes, hash_bytes, verify_checksum};
pub use keys::{KeyCustodian, KeySelector, KeyStatus, RecipientKey};
pub use path_guard::{NOTES_FILE, StorageRoot};
pub use sealed_store::{SealedStore, SubmissionGroups};
pub use shredder::{ShredReport, Shredder};
