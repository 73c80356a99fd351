// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Sealdrop.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters in a key fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Opaque internal identifier a designation is derived from.
///
/// Seeds stand for a source's storage key and are never shown to end users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seed {
    Numeric(u64),
    Text(String),
}

impl Seed {
    /// Tag byte distinguishing numeric from textual seeds in derived streams,
    /// so `Numeric(42)` and `Text("42")` never share a designation stream.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Numeric(_) => 0x01,
            Self::Text(_) => 0x02,
        }
    }

    /// Canonical byte encoding of the seed value.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Numeric(n) => n.to_be_bytes().to_vec(),
            Self::Text(s) => s.as_bytes().to_vec(),
        }
    }

    /// Interpret command-line style input: all digits is numeric, anything
    /// else is text.
    pub fn parse_lenient(input: &str) -> Self {
        match input.parse::<u64>() {
            Ok(n) if input.bytes().all(|b| b.is_ascii_digit()) => Self::Numeric(n),
            _ => Self::Text(input.to_owned()),
        }
    }
}

impl From<u64> for Seed {
    fn from(n: u64) -> Self {
        Self::Numeric(n)
    }
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Seed {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Two-word "adjective noun" pseudonym shown in place of a source's identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Designation(String);

impl Designation {
    pub fn new(adjective: &str, noun: &str) -> Self {
        Self(format!("{adjective} {noun}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into `(adjective, noun)`.
    pub fn parts(&self) -> (&str, &str) {
        self.0.split_once(' ').unwrap_or((self.0.as_str(), ""))
    }
}

impl std::fmt::Display for Designation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-length lowercase hex identifier of a recipient key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of a key's textual material (SHA-256 of the trimmed text).
    pub fn of_material(material: &str) -> Self {
        let digest = Sha256::digest(material.trim().as_bytes());
        Self(hex::encode(digest))
    }

    /// Parse a fingerprint, tolerating the space-grouped and upper-case forms
    /// key tools print.
    pub fn parse(input: &str) -> Option<Self> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if compact.len() == FINGERPRINT_HEX_LEN && compact.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(compact))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a {FINGERPRINT_HEX_LEN}-character hex fingerprint"))
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
