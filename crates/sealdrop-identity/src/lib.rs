// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sealdrop-identity: human-memorable pseudonyms for sources.
//
// A designation is derived from a seed alone, so the same source sees the
// same "adjective noun" pair across sessions and server restarts. Word lists
// are curated once at startup; an unusable list stops the process there
// rather than failing individual requests.

pub mod codec;
pub mod stream;
pub mod wordlist;

pub use codec::IdentityCodec;
pub use wordlist::{WordList, curate};
