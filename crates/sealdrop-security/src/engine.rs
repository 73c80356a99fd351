// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sealing engine capability and the age-backed implementation.
//
// The store never does asymmetric crypto itself. It asks a `SealingEngine`
// to validate recipient keys and to seal plaintext to them, so the concrete
// engine can be swapped (or mocked in tests) without touching store logic.
// `AgeEngine` seals to X25519 recipients with the `age` crate.

use std::io::Write;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::keys::RecipientKey;

/// Binary age header.
const AGE_BINARY_HEADER: &[u8] = b"age-encryption.org/v1\n";

/// ASCII-armored age header.
const AGE_ARMOR_HEADER: &[u8] = b"-----BEGIN AGE ENCRYPTED FILE-----";

/// What went wrong inside an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine ran and judged the input unusable (malformed key,
    /// unsupported key type, ...).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The engine itself failed or produced malformed output.
    #[error("failed: {0}")]
    Failed(String),
}

/// Narrow interface to an external public-key encryption engine.
///
/// Implementations must be usable from many threads at once; the store
/// shares one engine across all callers.
pub trait SealingEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Check that `material` is a usable public key.
    fn validate_public_key(&self, material: &str) -> Result<(), EngineError>;

    /// Encrypt `plaintext` so only the holder of `key`'s private half can
    /// read it.
    fn seal(&self, plaintext: &[u8], key: &RecipientKey) -> Result<Vec<u8>, EngineError>;

    /// Whether `bytes` looks like this engine's sealed output.
    fn is_sealed(&self, bytes: &[u8]) -> bool;
}

/// [`SealingEngine`] backed by age X25519 recipients.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgeEngine;

impl AgeEngine {
    pub fn new() -> Self {
        Self
    }

    fn recipient(material: &str) -> Result<age::x25519::Recipient, EngineError> {
        material
            .trim()
            .parse::<age::x25519::Recipient>()
            .map_err(|e| EngineError::Rejected(e.to_string()))
    }
}

impl SealingEngine for AgeEngine {
    fn name(&self) -> &'static str {
        "age-x25519"
    }

    fn validate_public_key(&self, material: &str) -> Result<(), EngineError> {
        Self::recipient(material).map(|_| ())
    }

    #[instrument(skip_all, fields(plaintext_len = plaintext.len(), fingerprint = %key.fingerprint()))]
    fn seal(&self, plaintext: &[u8], key: &RecipientKey) -> Result<Vec<u8>, EngineError> {
        let recipient = Self::recipient(key.material())?;
        let encryptor =
            age::Encryptor::with_recipients(std::iter::once(&recipient as &dyn age::Recipient))
                .map_err(|e| EngineError::Failed(e.to_string()))?;

        let mut ciphertext = Vec::new();
        let mut writer = encryptor
            .wrap_output(&mut ciphertext)
            .map_err(|e| EngineError::Failed(e.to_string()))?;

        writer
            .write_all(plaintext)
            .map_err(|e| EngineError::Failed(e.to_string()))?;

        writer
            .finish()
            .map_err(|e| EngineError::Failed(e.to_string()))?;

        if !self.is_sealed(&ciphertext) {
            return Err(EngineError::Failed("engine output lacks age header".into()));
        }

        debug!(ciphertext_len = ciphertext.len(), "sealing complete");
        Ok(ciphertext)
    }

    fn is_sealed(&self, bytes: &[u8]) -> bool {
        let trimmed = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map_or(&bytes[..0], |start| &bytes[start..]);
        bytes.starts_with(AGE_BINARY_HEADER) || trimmed.starts_with(AGE_ARMOR_HEADER)
    }
}
