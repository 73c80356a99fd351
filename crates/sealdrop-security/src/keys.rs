// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recipient key custody.
//
// State machine:
//
//   Unloaded -> Loaded -> Validated
//                      -> Invalid
//
// Only a Validated key is ever handed to the sealing path. Invalid stays
// Invalid until an operator reloads or re-validates; nothing retries on its
// own. Reads vastly outnumber transitions, so state sits behind an RwLock.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use sealdrop_core::config::StoreConfig;
use sealdrop_core::error::{Result, SealdropError};
use sealdrop_core::types::Fingerprint;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::engine::{EngineError, SealingEngine};

/// Public key material used to seal submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientKey {
    material: String,
    fingerprint: Fingerprint,
}

impl RecipientKey {
    /// Wrap raw key text. The fingerprint is derived from the trimmed text.
    pub fn from_material(material: impl Into<String>) -> Self {
        let material = material.into().trim().to_owned();
        let fingerprint = Fingerprint::of_material(&material);
        Self {
            material,
            fingerprint,
        }
    }

    /// Trimmed key text as handed to the sealing engine.
    ///
    /// Not checked here; only `KeyCustodian::validate` judges whether the
    /// engine accepts it.
    pub fn material(&self) -> &str {
        &self.material
    }

    /// SHA-256 of the material.
    ///
    /// Identifies the key in logs, status reports and the recipients-file
    /// selector, and tells a rotated key apart from the one it replaced.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Where to find the recipient key.
#[derive(Debug, Clone)]
pub struct KeySelector {
    /// Recipients file: one key per line, `#` comments and blank lines ignored.
    pub path: PathBuf,
    /// Pick the entry with this fingerprint. Without it the file must hold
    /// exactly one key.
    pub fingerprint: Option<Fingerprint>,
}

impl KeySelector {
    /// Select the only key in the recipients file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fingerprint: None,
        }
    }

    /// Pick one key out of a file that holds several.
    ///
    /// Without this, a file with more than one key is refused.
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Selector for the configured key path and optional fingerprint.
    ///
    /// A malformed fingerprint is a `Config` error, raised before any key is
    /// read.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let fingerprint = match &config.recipient_fingerprint {
            Some(raw) => Some(Fingerprint::parse(raw).ok_or_else(|| {
                SealdropError::Config("recipient_fingerprint is not a valid fingerprint".into())
            })?),
            None => None,
        };
        Ok(Self {
            path: config.recipient_key_path.clone(),
            fingerprint,
        })
    }

    /// Locate key material. Does not judge whether it is a usable key.
    pub fn locate(&self) -> Result<RecipientKey> {
        let raw = std::fs::read(&self.path)
            .map_err(|e| SealdropError::KeyUnavailable(format!("cannot read key file: {e}")))?;
        let text = String::from_utf8_lossy(&raw);

        let entries: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        match (&self.fingerprint, entries.as_slice()) {
            (_, []) => Err(SealdropError::KeyUnavailable(
                "key file holds no key material".into(),
            )),
            (Some(wanted), entries) => entries
                .iter()
                .map(|entry| RecipientKey::from_material(*entry))
                .find(|key| key.fingerprint() == wanted)
                .ok_or_else(|| {
                    SealdropError::KeyUnavailable(format!("no key with fingerprint {wanted}"))
                }),
            (None, [single]) => Ok(RecipientKey::from_material(*single)),
            (None, _) => Err(SealdropError::KeyUnavailable(
                "key file holds several keys and no fingerprint was configured".into(),
            )),
        }
    }
}

/// Externally visible custody state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum KeyStatus {
    Unloaded,
    Loaded {
        fingerprint: String,
    },
    Validated {
        fingerprint: String,
        validated_at: DateTime<Utc>,
    },
    Invalid {
        fingerprint: Option<String>,
        reason: String,
    },
}

#[derive(Debug)]
enum KeyState {
    Unloaded,
    Loaded(RecipientKey),
    Validated {
        key: Arc<RecipientKey>,
        at: DateTime<Utc>,
    },
    Invalid {
        key: Option<RecipientKey>,
        reason: String,
    },
}

impl KeyState {
    fn key(&self) -> Option<&RecipientKey> {
        match self {
            Self::Unloaded => None,
            Self::Loaded(key) => Some(key),
            Self::Validated { key, .. } => Some(key.as_ref()),
            Self::Invalid { key, .. } => key.as_ref(),
        }
    }
}

/// Holds the recipient key and refuses to release it unless validated.
pub struct KeyCustodian {
    selector: KeySelector,
    engine: Arc<dyn SealingEngine>,
    state: RwLock<KeyState>,
}

impl KeyCustodian {
    /// A custodian in the `Unloaded` state.
    pub fn new(selector: KeySelector, engine: Arc<dyn SealingEngine>) -> Self {
        Self {
            selector,
            engine,
            state: RwLock::new(KeyState::Unloaded),
        }
    }

    /// Load and validate in one go. Any failure is returned and the
    /// custodian is not handed out, so the service cannot start sealing.
    pub fn startup(selector: KeySelector, engine: Arc<dyn SealingEngine>) -> Result<Self> {
        let custodian = Self::new(selector, engine);
        let key = custodian.load()?;
        custodian.validate(&key)?;
        Ok(custodian)
    }

    /// Read key material from the configured location; state becomes
    /// `Loaded`. A validated key is replaced, so sealing stops until the new
    /// key is validated.
    #[instrument(skip_all, fields(path = %self.selector.path.display()))]
    pub fn load(&self) -> Result<RecipientKey> {
        let key = self.selector.locate().inspect_err(|e| {
            error!(error = %e, "recipient key unavailable");
        })?;
        info!(fingerprint = %key.fingerprint(), "recipient key loaded");
        *self.write_state() = KeyState::Loaded(key.clone());
        Ok(key)
    }

    /// Operator-triggered key rotation: re-read the key source.
    pub fn reload(&self) -> Result<RecipientKey> {
        self.load()
    }

    /// Ask the engine whether `key` is usable.
    ///
    /// Success makes `key` the current key. A rejection marks custody
    /// `Invalid`. An engine failure leaves the key `Loaded`. Either way no
    /// key is available for sealing afterwards.
    ///
    /// The outcome only lands if `key` is still the key held when the engine
    /// answers. If a reload swapped it in the meantime, state is left alone
    /// and the call fails with `KeyNotValidated`.
    #[instrument(skip_all, fields(fingerprint = %key.fingerprint(), engine = self.engine.name()))]
    pub fn validate(&self, key: &RecipientKey) -> Result<()> {
        let verdict = self.engine.validate_public_key(key.material());

        let mut state = self.write_state();
        if state.key().map(RecipientKey::fingerprint) != Some(key.fingerprint()) {
            warn!("held key changed during validation; result discarded");
            return Err(SealdropError::KeyNotValidated);
        }

        match verdict {
            Ok(()) => {
                *state = KeyState::Validated {
                    key: Arc::new(key.clone()),
                    at: Utc::now(),
                };
                info!("recipient key validated");
                Ok(())
            }
            Err(EngineError::Rejected(reason)) => {
                error!(%reason, "recipient key rejected; sealed writes disabled");
                *state = KeyState::Invalid {
                    key: Some(key.clone()),
                    reason: reason.clone(),
                };
                Err(SealdropError::KeyInvalid(reason))
            }
            Err(EngineError::Failed(reason)) => {
                warn!(%reason, "engine failed during key validation; sealed writes disabled");
                *state = KeyState::Loaded(key.clone());
                Err(SealdropError::EngineFailure(reason))
            }
        }
    }

    /// Operator-triggered re-validation of the key already held.
    pub fn revalidate(&self) -> Result<()> {
        let key = self
            .read_state()
            .key()
            .cloned()
            .ok_or_else(|| SealdropError::KeyUnavailable("no key has been loaded".into()))?;
        self.validate(&key)
    }

    /// The last successfully validated key.
    pub fn current_key(&self) -> Result<Arc<RecipientKey>> {
        match &*self.read_state() {
            KeyState::Validated { key, .. } => Ok(Arc::clone(key)),
            KeyState::Invalid { reason, .. } => Err(SealdropError::KeyInvalid(reason.clone())),
            KeyState::Unloaded | KeyState::Loaded(_) => Err(SealdropError::KeyNotValidated),
        }
    }

    /// Snapshot of custody state for health checks.
    ///
    /// Carries fingerprints and the validation time, never key material.
    /// The snapshot can be stale by the time it is read; sealing decisions
    /// go through `current_key`.
    pub fn status(&self) -> KeyStatus {
        match &*self.read_state() {
            KeyState::Unloaded => KeyStatus::Unloaded,
            KeyState::Loaded(key) => KeyStatus::Loaded {
                fingerprint: key.fingerprint().to_string(),
            },
            KeyState::Validated { key, at } => KeyStatus::Validated {
                fingerprint: key.fingerprint().to_string(),
                validated_at: *at,
            },
            KeyState::Invalid { key, reason } => KeyStatus::Invalid {
                fingerprint: key.as_ref().map(|k| k.fingerprint().to_string()),
                reason: reason.clone(),
            },
        }
    }

    /// The engine used both to validate keys and to seal.
    ///
    /// The store seals with this same engine, so a key is only ever used by
    /// the engine that accepted it.
    pub fn engine(&self) -> &Arc<dyn SealingEngine> {
        &self.engine
    }

    fn read_state(&self) -> RwLockReadGuard<'_, KeyState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, KeyState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AgeEngine;

    fn engine() -> Arc<dyn SealingEngine> {
        Arc::new(AgeEngine::new())
    }

    fn recipient() -> String {
        age::x25519::Identity::generate().to_public().to_string()
    }

    fn key_file(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journalist.pub");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn starts_unloaded() {
        let custodian = KeyCustodian::new(KeySelector::new("/nonexistent"), engine());
        assert_eq!(custodian.status(), KeyStatus::Unloaded);
        assert!(matches!(custodian.current_key(), Err(SealdropError::KeyNotValidated)));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let custodian = KeyCustodian::new(KeySelector::new(dir.path().join("absent.pub")), engine());
        assert!(matches!(custodian.load(), Err(SealdropError::KeyUnavailable(_))));
        assert_eq!(custodian.status(), KeyStatus::Unloaded);
    }

    #[test]
    fn comment_only_file_is_unavailable() {
        let (_dir, path) = key_file("# journalist key goes here\n\n");
        let custodian = KeyCustodian::new(KeySelector::new(path), engine());
        assert!(matches!(custodian.load(), Err(SealdropError::KeyUnavailable(_))));
    }

    #[test]
    fn valid_key_reaches_validated() {
        let material = recipient();
        let (_dir, path) = key_file(&format!("# newsroom\n{material}\n"));
        let custodian = KeyCustodian::startup(KeySelector::new(path), engine()).unwrap();

        let key = custodian.current_key().unwrap();
        assert_eq!(key.material(), material);
        assert!(matches!(custodian.status(), KeyStatus::Validated { .. }));
    }

    #[test]
    fn corrupt_key_loads_but_fails_validation() {
        let mut material = recipient();
        material.truncate(material.len() - 10);
        let (_dir, path) = key_file(&material);
        let custodian = KeyCustodian::new(KeySelector::new(path), engine());

        let key = custodian.load().expect("file exists, so load succeeds");
        assert!(matches!(custodian.validate(&key), Err(SealdropError::KeyInvalid(_))));
        assert!(matches!(custodian.current_key(), Err(SealdropError::KeyInvalid(_))));
        assert!(matches!(custodian.status(), KeyStatus::Invalid { .. }));
    }

    #[test]
    fn binary_garbage_loads_but_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journalist.pub");
        std::fs::write(&path, [0xffu8, 0xfe, 0x00, 0x41]).unwrap();
        let custodian = KeyCustodian::new(KeySelector::new(path), engine());
        let key = custodian.load().unwrap();
        assert!(custodian.validate(&key).is_err());
        assert!(custodian.current_key().is_err());
    }

    #[test]
    fn startup_fails_closed() {
        let (_dir, path) = key_file("age1garbage\n");
        assert!(KeyCustodian::startup(KeySelector::new(path), engine()).is_err());
    }

    #[test]
    fn several_keys_need_a_fingerprint() {
        let (a, b) = (recipient(), recipient());
        let (_dir, path) = key_file(&format!("{a}\n{b}\n"));

        let err = KeySelector::new(path.clone()).locate().unwrap_err();
        assert!(matches!(err, SealdropError::KeyUnavailable(_)));

        let wanted = Fingerprint::of_material(&b);
        let key = KeySelector::new(path).with_fingerprint(wanted.clone()).locate().unwrap();
        assert_eq!(key.material(), b);
        assert_eq!(key.fingerprint(), &wanted);
    }

    #[test]
    fn unknown_fingerprint_is_unavailable() {
        let (_dir, path) = key_file(&recipient());
        let selector = KeySelector::new(path).with_fingerprint(Fingerprint::of_material("other"));
        assert!(matches!(selector.locate(), Err(SealdropError::KeyUnavailable(_))));
    }

    #[test]
    fn reload_blocks_until_revalidated() {
        let first = recipient();
        let (_dir, path) = key_file(&first);
        let custodian = KeyCustodian::startup(KeySelector::new(path.clone()), engine()).unwrap();

        let second = recipient();
        std::fs::write(&path, &second).unwrap();
        custodian.reload().unwrap();
        assert!(matches!(custodian.current_key(), Err(SealdropError::KeyNotValidated)));

        custodian.revalidate().unwrap();
        assert_eq!(custodian.current_key().unwrap().material(), second);
    }

    #[test]
    fn invalid_until_operator_fixes_key() {
        let (_dir, path) = key_file("age1broken\n");
        let custodian = KeyCustodian::new(KeySelector::new(path.clone()), engine());
        let key = custodian.load().unwrap();
        assert!(custodian.validate(&key).is_err());

        // Re-validating the same broken key cannot succeed.
        assert!(custodian.revalidate().is_err());
        assert!(custodian.current_key().is_err());

        std::fs::write(&path, recipient()).unwrap();
        let fixed = custodian.reload().unwrap();
        custodian.validate(&fixed).unwrap();
        assert!(custodian.current_key().is_ok());
    }

    #[test]
    fn stale_key_validation_is_discarded() {
        let first = recipient();
        let (_dir, path) = key_file(&first);
        let custodian = KeyCustodian::new(KeySelector::new(path.clone()), engine());
        let old = custodian.load().unwrap();

        let second = recipient();
        std::fs::write(&path, &second).unwrap();
        let new = custodian.reload().unwrap();

        assert!(matches!(custodian.validate(&old), Err(SealdropError::KeyNotValidated)));
        assert!(matches!(custodian.current_key(), Err(SealdropError::KeyNotValidated)));
        assert_eq!(
            custodian.status(),
            KeyStatus::Loaded {
                fingerprint: new.fingerprint().to_string()
            }
        );

        custodian.validate(&new).unwrap();
        assert_eq!(custodian.current_key().unwrap().material(), second);
    }

    #[test]
    fn validating_before_load_changes_nothing() {
        let custodian = KeyCustodian::new(KeySelector::new("/nonexistent"), engine());
        let stray = RecipientKey::from_material(recipient());
        assert!(matches!(custodian.validate(&stray), Err(SealdropError::KeyNotValidated)));
        assert_eq!(custodian.status(), KeyStatus::Unloaded);
    }

    #[test]
    fn selector_from_config_rejects_bad_fingerprint() {
        let config = StoreConfig {
            recipient_fingerprint: Some("not-hex".into()),
            ..StoreConfig::default()
        };
        assert!(matches!(KeySelector::from_config(&config), Err(SealdropError::Config(_))));
    }
}
