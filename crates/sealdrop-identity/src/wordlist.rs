// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word lists and the curation policy applied to them.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::Path;

use sealdrop_core::config::WordPolicy;
use sealdrop_core::error::{Result, SealdropError};
use tracing::{debug, warn};

use crate::stream::DesignationStream;

/// A curated, non-empty list of words.
///
/// Order is significant: designations index into it, so reordering a list
/// changes every designation derived from it.
#[derive(Debug, Clone)]
pub struct WordList {
    words: Vec<String>,
    len: NonZeroUsize,
}

impl WordList {
    /// Parse a one-word-per-line list and apply `policy`.
    ///
    /// Blank lines are skipped. Words the policy rejects and repeated words
    /// are dropped with a warning. An empty result, or fewer than
    /// `policy.min_entries` survivors, is an `IdentityMisconfigured` error.
    pub fn parse(label: &str, text: &str, policy: &WordPolicy) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut words = Vec::new();
        let mut rejected = 0usize;

        for line in text.lines() {
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            if !accepts(policy, word) || !seen.insert(word) {
                rejected += 1;
                continue;
            }
            words.push(word.to_owned());
        }

        if rejected > 0 {
            warn!(list = label, rejected, "dropped words failing the curation policy");
        }

        let needed = policy.min_entries.max(1);
        let len = NonZeroUsize::new(words.len())
            .filter(|len| len.get() >= needed)
            .ok_or_else(|| {
                SealdropError::IdentityMisconfigured(format!(
                    "{label} list has {} usable words, need at least {needed}",
                    words.len()
                ))
            })?;

        debug!(list = label, words = len.get(), "word list loaded");
        Ok(Self { words, len })
    }

    /// Read and parse a list from disk.
    pub fn load(label: &str, path: impl AsRef<Path>, policy: &WordPolicy) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SealdropError::IdentityMisconfigured(format!("cannot read {label} list: {e}"))
        })?;
        Self::parse(label, &text, policy)
    }

    /// Number of usable words.
    ///
    /// Never zero: `parse` refuses to build an empty list.
    pub fn len(&self) -> usize {
        self.len.get()
    }

    /// Always false; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Word at `index` in list order, if in range.
    ///
    /// Designations depend on this order, so it must match the source file.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// Draw one word from `stream`.
    ///
    /// `pick` stays below `len`, and `len` equals the number of stored
    /// words, so the index is always in bounds.
    pub fn choose(&self, stream: &mut DesignationStream) -> &str {
        &self.words[stream.pick(self.len)]
    }

    /// Words in list order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

/// Whether `word` passes every check in `policy`.
pub fn accepts(policy: &WordPolicy, word: &str) -> bool {
    let len = word.chars().count();
    if len < policy.min_len || len > policy.max_len {
        return false;
    }
    if policy.alphabetic_only && !word.bytes().all(|b| b.is_ascii_lowercase()) {
        return false;
    }
    let mut chars = word.chars();
    if policy.reject_uniform && len > 1 {
        if let Some(first) = chars.next() {
            if chars.all(|c| c == first) {
                return false;
            }
        }
    }
    if let Some(limit) = policy.max_doubled_letters {
        if doubled_letters(word) > limit {
            return false;
        }
    }
    !policy
        .forbidden_bigrams
        .iter()
        .any(|bigram| !bigram.is_empty() && word.contains(bigram.as_str()))
}

/// Count adjacent identical-character pairs.
fn doubled_letters(word: &str) -> usize {
    let chars: Vec<char> = word.chars().collect();
    chars.windows(2).filter(|pair| pair[0] == pair[1]).count()
}

/// Offline curation: turn a raw corpus (one candidate per line) into a word
/// list that satisfies `policy`, lowercased and de-duplicated in corpus order.
pub fn curate(corpus: &str, policy: &WordPolicy) -> Vec<String> {
    let mut seen = HashSet::new();
    corpus
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|word| !word.is_empty() && accepts(policy, word))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}
