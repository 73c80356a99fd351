// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Submission integrity: SHA-256 checksums over sealed artifacts.

use std::io::{self, Read};

use sealdrop_core::error::{Result, SealdropError};
use sha2::{Digest, Sha256};

/// Prefix of every checksum string this crate produces.
pub const CHECKSUM_PREFIX: &str = "sha256:";

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash everything `reader` yields without buffering it whole.
pub fn hash_reader(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Checksum string for `data`, in `sha256:<hex>` form.
pub fn checksum_bytes(data: &[u8]) -> String {
    format!("{CHECKSUM_PREFIX}{}", hash_bytes(data))
}

/// Verify `data` against a checksum. Accepts both `sha256:<hex>` and bare
/// hex; hex case is ignored.
pub fn verify_checksum(data: &[u8], expected: &str) -> Result<()> {
    let wanted = expected.strip_prefix(CHECKSUM_PREFIX).unwrap_or(expected);
    let actual = hash_bytes(data);
    if actual.eq_ignore_ascii_case(wanted) {
        Ok(())
    } else {
        Err(SealdropError::IntegrityMismatch {
            expected: expected.to_owned(),
            actual: format!("{CHECKSUM_PREFIX}{actual}"),
        })
    }
}
