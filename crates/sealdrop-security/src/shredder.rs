// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shredder: holding area for deleted submissions.
//
// Deletion is two-phase. Entries are first moved out of the store into a
// fresh per-deletion directory here, which is a cheap rename, and a later
// `clear` destroys everything that has accumulated. The shredder directory
// must live on the same filesystem as the store and outside it.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sealdrop_core::error::{Result, SealdropError};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Zero-fill chunk size.
const WIPE_CHUNK: usize = 64 * 1024;

/// What one `clear` pass destroyed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShredReport {
    pub files: usize,
    pub links: usize,
    pub directories: usize,
    pub bytes_wiped: u64,
}

#[derive(Debug, Clone)]
pub struct Shredder {
    dir: PathBuf,
}

impl Shredder {
    /// Open (creating if needed) the shredder directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_absolute() {
            return Err(SealdropError::Config(
                "shredder directory must be absolute".into(),
            ));
        }
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: fs::canonicalize(dir)?,
        })
    }

    /// Canonical shredder directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Move `entry` (file or directory) into a new unique directory and
    /// return its new location. Never overwrites anything already here.
    pub fn admit(&self, entry: &Path) -> Result<PathBuf> {
        let name = entry
            .file_name()
            .ok_or_else(|| SealdropError::Config("cannot shred a path without a name".into()))?;

        let slot = self.dir.join(Uuid::new_v4().to_string());
        fs::create_dir(&slot)?;
        let destination = slot.join(name);
        if let Err(e) = fs::rename(entry, &destination) {
            let _ = fs::remove_dir(&slot);
            return Err(e.into());
        }
        debug!(slot = %slot.display(), "entry moved to shredder");
        Ok(destination)
    }

    /// Destroy everything in the shredder.
    ///
    /// Regular files are overwritten with zeros and synced before unlinking.
    /// Symlinks are unlinked without following them. Directories are removed
    /// once their contents are gone, so the deepest go first. The shredder
    /// directory itself is kept.
    #[instrument(skip_all, fields(dir = %self.dir.display()))]
    pub fn clear(&self) -> Result<ShredReport> {
        let mut report = ShredReport::default();
        for entry in fs::read_dir(&self.dir)? {
            destroy(&entry?.path(), &mut report)?;
        }
        info!(
            files = report.files,
            links = report.links,
            directories = report.directories,
            "shredder cleared"
        );
        Ok(report)
    }
}

fn destroy(path: &Path, report: &mut ShredReport) -> Result<()> {
    let meta = fs::symlink_metadata(path)?;
    let file_type = meta.file_type();

    if file_type.is_symlink() {
        fs::remove_file(path)?;
        report.links += 1;
    } else if file_type.is_dir() {
        for entry in fs::read_dir(path)? {
            destroy(&entry?.path(), report)?;
        }
        fs::remove_dir(path)?;
        report.directories += 1;
    } else if file_type.is_file() {
        report.bytes_wiped += wipe(path, meta.len())?;
        fs::remove_file(path)?;
        report.files += 1;
    } else {
        warn!(path = %path.display(), "unlinking special file without wiping");
        fs::remove_file(path)?;
    }
    Ok(())
}

fn wipe(path: &Path, len: u64) -> io::Result<u64> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    let zeros = [0u8; WIPE_CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(WIPE_CHUNK as u64) as usize;
        file.write_all(&zeros[..n])?;
        remaining -= n as u64;
    }
    file.sync_all()?;
    Ok(len)
}
