// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identity codec: seed in, two-word designation out.

use sealdrop_core::config::{StoreConfig, WordPolicy};
use sealdrop_core::error::Result;
use sealdrop_core::types::{Designation, Seed};
use tracing::{info, instrument};

use crate::stream::DesignationStream;
use crate::wordlist::WordList;

/// Curated adjective list shipped with the crate.
pub const BUNDLED_ADJECTIVES: &str = include_str!("../wordlists/adjectives.txt");

/// Curated noun list shipped with the crate.
pub const BUNDLED_NOUNS: &str = include_str!("../wordlists/nouns.txt");

/// Derives designations from seeds.
///
/// Construction is the only fallible step; once built, [`designate`] works
/// for every seed.
///
/// [`designate`]: IdentityCodec::designate
#[derive(Debug, Clone)]
pub struct IdentityCodec {
    adjectives: WordList,
    nouns: WordList,
}

impl IdentityCodec {
    /// Codec over already curated lists.
    pub fn new(adjectives: WordList, nouns: WordList) -> Self {
        Self { adjectives, nouns }
    }

    /// Codec over the bundled lists.
    pub fn bundled(policy: &WordPolicy) -> Result<Self> {
        Ok(Self::new(
            WordList::parse("adjectives", BUNDLED_ADJECTIVES, policy)?,
            WordList::parse("nouns", BUNDLED_NOUNS, policy)?,
        ))
    }

    /// Codec for a store config: configured list files where given, bundled
    /// lists otherwise.
    #[instrument(skip_all)]
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let policy = &config.word_policy;
        let adjectives = match &config.adjectives_path {
            Some(path) => WordList::load("adjectives", path, policy)?,
            None => WordList::parse("adjectives", BUNDLED_ADJECTIVES, policy)?,
        };
        let nouns = match &config.nouns_path {
            Some(path) => WordList::load("nouns", path, policy)?,
            None => WordList::parse("nouns", BUNDLED_NOUNS, policy)?,
        };

        let codec = Self::new(adjectives, nouns);
        info!(combinations = codec.combinations(), "identity codec ready");
        Ok(codec)
    }

    /// The designation for `seed`. Same seed, same word lists, same answer.
    pub fn designate(&self, seed: &Seed) -> Designation {
        let mut stream = DesignationStream::new(seed);
        let adjective = self.adjectives.choose(&mut stream);
        let noun = self.nouns.choose(&mut stream);
        Designation::new(adjective, noun)
    }

    /// Number of distinct designations this codec can produce.
    pub fn combinations(&self) -> u64 {
        (self.adjectives.len() as u64).saturating_mul(self.nouns.len() as u64)
    }

    /// List the first word is drawn from.
    pub fn adjectives(&self) -> &WordList {
        &self.adjectives
    }

    /// List the second word is drawn from.
    pub fn nouns(&self) -> &WordList {
        &self.nouns
    }
}
