// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Startup context: one immutable bundle of config, codec, and store, built
// once and passed to every command.
//
// `init` is the fail-closed path. It refuses to return unless the storage
// root exists, the word lists are usable, and the recipient key has been
// loaded and validated. `maintenance` skips key validation for commands
// that never seal anything; its custodian stays unvalidated, so a stray
// write from that context is refused anyway.

use std::path::Path;
use std::sync::Arc;

use sealdrop_core::config::StoreConfig;
use sealdrop_core::error::Result;
use sealdrop_identity::IdentityCodec;
use sealdrop_security::{AgeEngine, KeyCustodian, KeySelector, SealedStore, SealingEngine};
use tracing::info;

pub struct ServiceContext {
    pub config: StoreConfig,
    pub codec: IdentityCodec,
    pub store: Arc<SealedStore>,
}

impl ServiceContext {
    /// Everything a submission-accepting service needs, or the first reason
    /// it must not start.
    pub fn init(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let codec = IdentityCodec::from_config(&config)?;

        let custodian = KeyCustodian::startup(KeySelector::from_config(&config)?, engine())?;
        let store = SealedStore::from_config(&config, Arc::new(custodian))?;

        info!(
            root = %store.root().as_path().display(),
            "store ready to accept submissions"
        );
        Ok(Self {
            config,
            codec,
            store: Arc::new(store),
        })
    }

    /// Context for read-only and housekeeping commands.
    pub fn maintenance(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let codec = IdentityCodec::from_config(&config)?;
        let custodian = KeyCustodian::new(KeySelector::from_config(&config)?, engine());
        let store = SealedStore::from_config(&config, Arc::new(custodian))?;
        Ok(Self {
            config,
            codec,
            store: Arc::new(store),
        })
    }
}

/// Config from an explicit path, or from the standard search chain.
pub fn load_config(explicit: Option<&Path>) -> Result<StoreConfig> {
    match explicit {
        Some(path) => StoreConfig::load(path),
        None => StoreConfig::load(StoreConfig::resolve_path()),
    }
}

fn engine() -> Arc<dyn SealingEngine> {
    Arc::new(AgeEngine::new())
}
