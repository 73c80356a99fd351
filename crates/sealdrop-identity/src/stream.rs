// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Seed-keyed deterministic stream.
//
// Each draw is SHA-256(domain || seed tag || seed length || seed bytes ||
// counter). Nothing but the seed feeds the stream, so output is identical
// across processes, platforms, and restarts. The stream is not secret and
// must never be used for key material.

use std::num::NonZeroUsize;

use sealdrop_core::types::Seed;
use sha2::{Digest, Sha256};

/// Domain label; changing it changes every designation ever issued.
const DOMAIN: &[u8] = b"sealdrop/designation/v1";

/// Reproducible pseudorandom draws keyed by a [`Seed`].
pub struct DesignationStream {
    tag: u8,
    seed: Vec<u8>,
    counter: u64,
}

impl DesignationStream {
    /// Fresh stream for `seed`, starting at counter zero.
    pub fn new(seed: &Seed) -> Self {
        Self {
            tag: seed.tag(),
            seed: seed.to_bytes(),
            counter: 0,
        }
    }

    /// Next 64-bit draw.
    pub fn next_u64(&mut self) -> u64 {
        let digest = Sha256::new()
            .chain_update(DOMAIN)
            .chain_update([self.tag])
            .chain_update((self.seed.len() as u64).to_be_bytes())
            .chain_update(&self.seed)
            .chain_update(self.counter.to_be_bytes())
            .finalize();
        self.counter = self.counter.wrapping_add(1);

        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(word)
    }

    /// Uniform index in `0..len` by rejection sampling (no modulo bias).
    pub fn pick(&mut self, len: NonZeroUsize) -> usize {
        let n = len.get() as u64;
        let zone = u64::MAX - (u64::MAX % n);
        loop {
            let draw = self.next_u64();
            if draw < zone {
                return (draw % n) as usize;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_draws() {
        let mut a = DesignationStream::new(&Seed::from(42u64));
        let mut b = DesignationStream::new(&Seed::from(42u64));
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn draws_advance() {
        let mut s = DesignationStream::new(&Seed::from("source"));
        let first = s.next_u64();
        let second = s.next_u64();
        assert_ne!(first, second);
    }

    #[test]
    fn numeric_and_text_streams_differ() {
        let mut n = DesignationStream::new(&Seed::from(7u64));
        let mut t = DesignationStream::new(&Seed::from("7"));
        assert_ne!(n.next_u64(), t.next_u64());
    }

    #[test]
    fn pick_stays_in_range() {
        let mut s = DesignationStream::new(&Seed::from(1u64));
        for len in [1usize, 2, 3, 7, 112, 119, 1000] {
            let bound = NonZeroUsize::new(len).unwrap();
            for _ in 0..32 {
                assert!(s.pick(bound) < len);
            }
        }
    }
}
