// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store configuration, loaded once at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SealdropError};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SEALDROP_CONFIG";

/// File name looked up inside the config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Curation thresholds applied to word lists before they are used.
///
/// Defaults reproduce the rules the bundled lists were curated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordPolicy {
    /// Shortest accepted word, in characters.
    pub min_len: usize,
    /// Longest accepted word, in characters.
    pub max_len: usize,
    /// Reject anything but lowercase ASCII letters.
    pub alphabetic_only: bool,
    /// Reject words made of a single repeated character ("aaa").
    pub reject_uniform: bool,
    /// Maximum number of adjacent identical-letter pairs ("bookkeeper" has 3).
    /// `None` disables the check.
    pub max_doubled_letters: Option<usize>,
    /// Letter pairs that make a word easy to misread; any occurrence rejects it.
    pub forbidden_bigrams: Vec<String>,
    /// Fewest words a list may keep after curation; smaller lists are a
    /// deployment error.
    pub min_entries: usize,
}

impl Default for WordPolicy {
    fn default() -> Self {
        Self {
            min_len: 1,
            max_len: 17,
            alphabetic_only: true,
            reject_uniform: true,
            max_doubled_letters: None,
            forbidden_bigrams: Vec::new(),
            min_entries: 1,
        }
    }
}

/// Persistent store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory under which every sealed artifact lives. Must be absolute.
    pub storage_root: PathBuf,
    /// Where entries go to await secure deletion. Defaults to a `shredder`
    /// directory next to the storage root.
    pub shredder_dir: Option<PathBuf>,
    /// Recipients file holding the journalist public key(s).
    pub recipient_key_path: PathBuf,
    /// Selects one key from the recipients file by fingerprint.
    pub recipient_fingerprint: Option<String>,
    /// Adjective list override; the bundled list is used when absent.
    pub adjectives_path: Option<PathBuf>,
    /// Noun list override; the bundled list is used when absent.
    pub nouns_path: Option<PathBuf>,
    pub word_policy: WordPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("/var/lib/sealdrop/store"),
            shredder_dir: None,
            recipient_key_path: PathBuf::from("/var/lib/sealdrop/journalist.pub"),
            recipient_fingerprint: None,
            adjectives_path: None,
            nouns_path: None,
            word_policy: WordPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write this config as pretty JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Locate the config file: `$SEALDROP_CONFIG`, then
    /// `$XDG_CONFIG_HOME/sealdrop`, then `$HOME/.config/sealdrop`.
    pub fn resolve_path() -> PathBuf {
        if let Ok(explicit) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(explicit);
        }
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("sealdrop").join(CONFIG_FILE);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("sealdrop")
                .join(CONFIG_FILE);
        }
        // Last resort
        PathBuf::from("/etc/sealdrop").join(CONFIG_FILE)
    }

    /// Reject settings that can never produce a safe store.
    pub fn validate(&self) -> Result<()> {
        if !self.storage_root.is_absolute() {
            return Err(SealdropError::Config("storage_root must be absolute".into()));
        }
        if !self.recipient_key_path.is_absolute() {
            return Err(SealdropError::Config(
                "recipient_key_path must be absolute".into(),
            ));
        }
        if let Some(shredder) = &self.shredder_dir {
            if !shredder.is_absolute() {
                return Err(SealdropError::Config("shredder_dir must be absolute".into()));
            }
            if shredder.starts_with(&self.storage_root) {
                return Err(SealdropError::Config(
                    "shredder_dir must not live inside storage_root".into(),
                ));
            }
        }
        if self.word_policy.min_len == 0 || self.word_policy.min_len > self.word_policy.max_len {
            return Err(SealdropError::Config(
                "word_policy length bounds are empty".into(),
            ));
        }
        if self.word_policy.min_entries == 0 {
            return Err(SealdropError::Config(
                "word_policy.min_entries must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The shredder directory, explicit or derived from the storage root.
    pub fn shredder_path(&self) -> PathBuf {
        match &self.shredder_dir {
            Some(dir) => dir.clone(),
            None => self
                .storage_root
                .parent()
                .unwrap_or(Path::new("/"))
                .join("shredder"),
        }
    }
}
