// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sealdrop: Core types and error definitions shared across all crates.

pub mod advice;
pub mod config;
pub mod error;
pub mod types;

pub use config::{StoreConfig, WordPolicy};
pub use error::{ErrorClass, PathViolation, Result, SealdropError, ViolationKind};
pub use types::*;
