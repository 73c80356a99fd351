// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sealed submission store.
//
// Every path goes through the path guard, every payload written on behalf of
// a source is sealed to the validated recipient key, and every file lands
// via temp-file-then-rename. The only plaintext write is the fixed NOTES log.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sealdrop_core::config::StoreConfig;
use sealdrop_core::error::{PathViolation, Result, SealdropError, ViolationKind};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::engine::{EngineError, SealingEngine};
use crate::filename::{self, ContentKind, SubmissionName};
use crate::integrity::{self, CHECKSUM_PREFIX};
use crate::keys::KeyCustodian;
use crate::path_guard::StorageRoot;
use crate::shredder::Shredder;

/// Prefix of in-flight temp files. Never matches the submission grammar.
const TEMP_PREFIX: &str = ".sealdrop-";

/// Parts of one logical submission, keyed by its normalized identifier.
pub type SubmissionGroups = BTreeMap<String, Vec<SubmissionName>>;

/// Reads and writes sealed artifacts under one storage root.
///
/// Cheap to share: wrap in an `Arc` and call from any number of threads.
pub struct SealedStore {
    root: StorageRoot,
    custodian: Arc<KeyCustodian>,
    shredder: Shredder,
}

impl SealedStore {
    /// Assemble a store from its parts.
    ///
    /// The shredder must live outside the storage root, otherwise entries
    /// awaiting destruction would still be reachable through the store.
    pub fn new(root: StorageRoot, custodian: Arc<KeyCustodian>, shredder: Shredder) -> Result<Self> {
        if shredder.path().starts_with(root.as_path()) {
            return Err(SealdropError::Config(
                "shredder directory must not be inside the storage root".into(),
            ));
        }
        Ok(Self {
            root,
            custodian,
            shredder,
        })
    }

    /// Open the store described by `config`, creating directories as needed.
    pub fn from_config(config: &StoreConfig, custodian: Arc<KeyCustodian>) -> Result<Self> {
        let root = StorageRoot::create(&config.storage_root)?;
        let shredder = Shredder::open(config.shredder_path())?;
        Self::new(root, custodian, shredder)
    }

    /// The storage root every operation resolves against.
    ///
    /// Reads through it still need `StorageRoot::resolve`; the store's own
    /// methods already do that.
    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    /// Key custody shared with the operator surface.
    ///
    /// Reloads and re-validations go through this handle; `write` asks it for
    /// the current key on every call.
    pub fn custodian(&self) -> &Arc<KeyCustodian> {
        &self.custodian
    }

    /// Holding area for entries removed by `move_to_shredder`.
    pub fn shredder(&self) -> &Shredder {
        &self.shredder
    }

    fn engine(&self) -> &Arc<dyn SealingEngine> {
        self.custodian.engine()
    }

    /// Seal `plaintext` to the current recipient key and store it at
    /// `fragment`. Returns the final absolute path.
    ///
    /// Fails before touching the filesystem when the key is not validated.
    #[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
    pub fn write(&self, fragment: impl AsRef<Path>, plaintext: &[u8]) -> Result<PathBuf> {
        let fragment = fragment.as_ref();
        let target = self.root.resolve(fragment)?;
        require_submission_name(&target)?;

        let key = self.custodian.current_key().inspect_err(|e| {
            warn!(error = %e, "sealed write refused");
        })?;
        let sealed = self
            .engine()
            .seal(plaintext, &key)
            .map_err(engine_error)?;
        if !self.engine().is_sealed(&sealed) {
            return Err(SealdropError::EngineFailure(
                "engine returned output that is not sealed".into(),
            ));
        }

        let path = self.write_atomic(fragment, &sealed)?;
        info!(sealed_len = sealed.len(), "sealed artifact stored");
        Ok(path)
    }

    /// Raw sealed bytes of an existing artifact.
    pub fn read(&self, fragment: impl AsRef<Path>) -> Result<Vec<u8>> {
        let target = self.existing_file(fragment.as_ref())?;
        Ok(fs::read(target)?)
    }

    /// Append one line to the fixed plaintext log. Line breaks in `message`
    /// are flattened so each call stays a single line.
    pub fn append_log(&self, message: &str) -> Result<()> {
        let path = self.root.notes_path()?;
        let mut line: String = message
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Resolved location of `name` inside a source's directory.
    pub fn submission_path(&self, source_dir: &str, name: &SubmissionName) -> Result<PathBuf> {
        self.root.resolve(submission_fragment(source_dir, name))
    }

    /// Seal a source's text message as `<index>.<sub_index>_msg.gpg`.
    pub fn store_message(
        &self,
        source_dir: &str,
        index: &str,
        sub_index: &str,
        plaintext: &[u8],
    ) -> Result<PathBuf> {
        let name = SubmissionName::new(index, sub_index, ContentKind::Message, false)
            .ok_or(SealdropError::InvalidFilename)?;
        self.write(submission_fragment(source_dir, &name), plaintext)
    }

    /// Seal a source's zipped upload as `<index>.<sub_index>_doc.zip.gpg`.
    pub fn store_document(
        &self,
        source_dir: &str,
        index: &str,
        sub_index: &str,
        bundle: &[u8],
    ) -> Result<PathBuf> {
        let name = SubmissionName::new(index, sub_index, ContentKind::DocumentBundle, false)
            .ok_or(SealdropError::InvalidFilename)?;
        self.write(submission_fragment(source_dir, &name), bundle)
    }

    /// Store a journalist reply that was sealed elsewhere (to the source's
    /// key). The bytes are checked, never re-sealed.
    #[instrument(skip_all, fields(ciphertext_len = ciphertext.len()))]
    pub fn store_sealed_reply(
        &self,
        source_dir: &str,
        index: &str,
        sub_index: &str,
        ciphertext: &[u8],
    ) -> Result<PathBuf> {
        let name = SubmissionName::new(index, sub_index, ContentKind::Unspecified, true)
            .ok_or(SealdropError::InvalidFilename)?;
        if !self.engine().is_sealed(ciphertext) {
            warn!("reply refused: not sealed");
            return Err(SealdropError::NotSealed);
        }
        let fragment = submission_fragment(source_dir, &name);
        self.root.resolve(&fragment)?;
        let path = self.write_atomic(&fragment, ciphertext)?;
        info!("sealed reply stored");
        Ok(path)
    }

    /// Find a submission by bare filename anywhere in the store.
    pub fn locate(&self, name: &str) -> Result<PathBuf> {
        if !filename::is_valid(name) {
            return Err(SealdropError::InvalidFilename);
        }
        let mut matches = Vec::new();
        collect_named(self.root.as_path(), name, &mut matches)?;

        match matches.as_slice() {
            [] => Err(SealdropError::FileNotFound),
            [found] => {
                let relative = found
                    .strip_prefix(self.root.as_path())
                    .map_err(|_| outside(found))?;
                self.root.resolve(relative)
            }
            _ => Err(SealdropError::AmbiguousFile),
        }
    }

    /// A source's submissions grouped by logical identifier, each group in
    /// filename order.
    pub fn list_source(&self, source_dir: &str) -> Result<SubmissionGroups> {
        let dir = self.root.resolve(source_dir)?;
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(violation(ViolationKind::UnsupportedEntry, &dir)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SealdropError::FileNotFound);
            }
            Err(e) => return Err(e.into()),
        }

        let mut groups = SubmissionGroups::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                return Err(violation(ViolationKind::Filename, &entry.path()));
            };
            if name.starts_with(TEMP_PREFIX) {
                debug!("skipping in-flight temp file");
                continue;
            }
            if !entry.file_type()?.is_file() {
                return Err(violation(ViolationKind::UnsupportedEntry, &entry.path()));
            }
            let parsed = filename::parse(name)
                .ok_or_else(|| violation(ViolationKind::Filename, &entry.path()))?;
            groups.entry(filename::normalize(name)).or_default().push(parsed);
        }

        for parts in groups.values_mut() {
            parts.sort_by_key(|part| part.to_string());
        }
        Ok(groups)
    }

    /// `sha256:<hex>` of a stored artifact.
    pub fn checksum(&self, fragment: impl AsRef<Path>) -> Result<String> {
        let target = self.existing_file(fragment.as_ref())?;
        let digest = integrity::hash_reader(File::open(target)?)?;
        Ok(format!("{CHECKSUM_PREFIX}{digest}"))
    }

    /// Compare a stored artifact with a previously recorded checksum.
    pub fn verify(&self, fragment: impl AsRef<Path>, expected: &str) -> Result<()> {
        let bytes = self.read(fragment)?;
        integrity::verify_checksum(&bytes, expected)
    }

    /// Move a submission or a whole source directory to the shredder.
    #[instrument(skip_all)]
    pub fn move_to_shredder(&self, fragment: impl AsRef<Path>) -> Result<PathBuf> {
        let target = self.root.resolve(fragment)?;
        match fs::symlink_metadata(&target) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SealdropError::FileNotFound);
            }
            Err(e) => return Err(e.into()),
        }
        let moved = self.shredder.admit(&target)?;
        info!("entry moved to shredder");
        Ok(moved)
    }

    /// Resolve an artifact that must already exist as a regular file.
    fn existing_file(&self, fragment: &Path) -> Result<PathBuf> {
        let target = self.root.resolve(fragment)?;
        match fs::metadata(&target) {
            Ok(meta) if meta.is_file() => Ok(target),
            Ok(_) => Err(violation(ViolationKind::UnsupportedEntry, &target)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(SealdropError::FileNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Create parents, write to a temp file beside the target, then rename.
    fn write_atomic(&self, fragment: &Path, bytes: &[u8]) -> Result<PathBuf> {
        let target = self.root.resolve(fragment)?;
        let parent = target
            .parent()
            .ok_or_else(|| outside(&target))?
            .to_path_buf();
        fs::create_dir_all(&parent)?;

        // Directories were just created; confirm nothing swapped in a link.
        let target = self.root.resolve(fragment)?;
        let temp = parent.join(format!("{TEMP_PREFIX}{}.tmp", Uuid::new_v4()));

        let written = write_synced(&temp, bytes).and_then(|()| fs::rename(&temp, &target));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        debug!(path = %target.display(), "atomic write complete");
        Ok(target)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn submission_fragment(source_dir: &str, name: &SubmissionName) -> PathBuf {
    Path::new(source_dir).join(name.to_string())
}

fn require_submission_name(target: &Path) -> Result<()> {
    let ok = target
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(filename::is_valid);
    if ok {
        Ok(())
    } else {
        Err(SealdropError::InvalidFilename)
    }
}

/// Depth-first search for regular files called `name`. Symlinks are not
/// followed.
fn collect_named(dir: &Path, name: &str, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_named(&entry.path(), name, found)?;
        } else if file_type.is_file() && entry.file_name() == name {
            found.push(entry.path());
        }
    }
    Ok(())
}

fn engine_error(e: EngineError) -> SealdropError {
    match e {
        EngineError::Rejected(reason) => SealdropError::KeyInvalid(reason),
        EngineError::Failed(reason) => SealdropError::EngineFailure(reason),
    }
}

fn violation(kind: ViolationKind, path: &Path) -> SealdropError {
    PathViolation::new(kind, path.display().to_string()).into()
}

fn outside(path: &Path) -> SealdropError {
    violation(ViolationKind::OutsideRoot, path)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::engine::AgeEngine;
    use crate::keys::KeySelector;

    struct Fixture {
        _dir: tempfile::TempDir,
        identity: age::x25519::Identity,
        key_path: PathBuf,
        store: SealedStore,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let identity = age::x25519::Identity::generate();
        let key_path = dir.path().join("journalist.pub");
        fs::write(&key_path, identity.to_public().to_string()).unwrap();

        let custodian =
            KeyCustodian::startup(KeySelector::new(&key_path), Arc::new(AgeEngine::new())).unwrap();
        let root = StorageRoot::create(dir.path().join("store")).unwrap();
        let shredder = Shredder::open(dir.path().join("shredder")).unwrap();
        let store = SealedStore::new(root, Arc::new(custodian), shredder).unwrap();
        Fixture {
            _dir: dir,
            identity,
            key_path,
            store,
        }
    }

    fn open(identity: &age::x25519::Identity, ciphertext: &[u8]) -> Vec<u8> {
        let decryptor = age::Decryptor::new(ciphertext).unwrap();
        let mut reader = decryptor
            .decrypt(std::iter::once(identity as &dyn age::Identity))
            .unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn write_then_read_is_sealed() {
        let f = fixture();
        let path = f.store.write("12.1_msg.gpg", b"meet at noon").unwrap();
        assert_eq!(path, f.store.root().as_path().join("12.1_msg.gpg"));

        let stored = f.store.read("12.1_msg.gpg").unwrap();
        assert!(!stored.windows(4).any(|w| w == b"noon"));
        assert_eq!(open(&f.identity, &stored), b"meet at noon");
    }

    #[test]
    fn write_rejects_non_grammar_name() {
        let f = fixture();
        let err = f.store.write("notes.txt", b"x").unwrap_err();
        assert!(matches!(err, SealdropError::InvalidFilename));
        assert!(!f.store.root().as_path().join("notes.txt").exists());
    }

    #[test]
    fn write_rejects_escape() {
        let f = fixture();
        let err = f.store.write("../1.1_msg.gpg", b"x").unwrap_err();
        assert!(matches!(err, SealdropError::PathViolation(_)));
    }

    #[test]
    fn write_overwrites_last_writer_wins() {
        let f = fixture();
        f.store.write("1.1_msg.gpg", b"first").unwrap();
        f.store.write("1.1_msg.gpg", b"second").unwrap();
        let stored = f.store.read("1.1_msg.gpg").unwrap();
        assert_eq!(open(&f.identity, &stored), b"second");
    }

    #[test]
    fn no_temp_files_left_behind() {
        let f = fixture();
        f.store.store_message("SRC", "1", "1", b"hello").unwrap();
        let names: Vec<_> = fs::read_dir(f.store.root().as_path().join("SRC"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("1.1_msg.gpg")]);
    }

    #[test]
    fn reload_to_broken_key_blocks_writes() {
        let f = fixture();
        f.store.write("1.1_msg.gpg", b"ok").unwrap();

        fs::write(&f.key_path, "age1truncated").unwrap();
        let custodian = f.store.custodian();
        let key = custodian.reload().unwrap();
        assert!(custodian.validate(&key).is_err());

        let err = f.store.write("2.1_msg.gpg", b"secret").unwrap_err();
        assert!(err.is_key_error(), "unexpected error: {err}");
        assert!(!f.store.root().as_path().join("2.1_msg.gpg").exists());
    }

    #[test]
    fn read_missing_is_not_found() {
        let f = fixture();
        assert!(matches!(f.store.read("9.9.gpg"), Err(SealdropError::FileNotFound)));
    }

    #[test]
    fn read_directory_is_refused() {
        let f = fixture();
        fs::create_dir(f.store.root().as_path().join("SRC")).unwrap();
        assert!(matches!(f.store.read("SRC"), Err(SealdropError::PathViolation(_))));
    }

    #[test]
    fn append_log_one_line_per_call() {
        let f = fixture();
        f.store.append_log("first").unwrap();
        f.store.append_log("second\nwith break").unwrap();
        let notes = fs::read_to_string(f.store.root().as_path().join("NOTES")).unwrap();
        assert_eq!(notes, "first\nsecond with break\n");
    }

    #[cfg(unix)]
    #[test]
    fn append_log_refuses_redirected_notes() {
        let f = fixture();
        let outside = f._dir.path().join("captured.log");
        fs::write(&outside, b"").unwrap();
        std::os::unix::fs::symlink(&outside, f.store.root().as_path().join("NOTES")).unwrap();

        let err = f.store.append_log("source said hello").unwrap_err();
        assert!(matches!(err, SealdropError::PathViolation(_)));
        assert!(fs::read(&outside).unwrap().is_empty());
    }

    #[test]
    fn typed_writers_build_grammar_names() {
        let f = fixture();
        let msg = f.store.store_message("SRC", "3", "1", b"m").unwrap();
        let doc = f.store.store_document("SRC", "3", "2", b"zip").unwrap();
        assert!(msg.ends_with("SRC/3.1_msg.gpg"));
        assert!(doc.ends_with("SRC/3.2_doc.zip.gpg"));
        assert!(matches!(
            f.store.store_message("SRC", "x", "1", b"m"),
            Err(SealdropError::InvalidFilename)
        ));
    }

    #[test]
    fn sealed_reply_must_be_sealed() {
        let f = fixture();
        let err = f.store.store_sealed_reply("SRC", "4", "0", b"plain reply").unwrap_err();
        assert!(matches!(err, SealdropError::NotSealed));

        let key = f.store.custodian().current_key().unwrap();
        let sealed = AgeEngine::new().seal(b"reply", &key).unwrap();
        let path = f.store.store_sealed_reply("SRC", "4", "0", &sealed).unwrap();
        assert!(path.ends_with("SRC/reply-4.0.gpg"));
        assert_eq!(fs::read(path).unwrap(), sealed);
    }

    #[test]
    fn locate_finds_unique_file() {
        let f = fixture();
        let written = f.store.store_message("SRC", "5", "1", b"x").unwrap();
        assert_eq!(f.store.locate("5.1_msg.gpg").unwrap(), written);
        assert!(matches!(f.store.locate("6.1_msg.gpg"), Err(SealdropError::FileNotFound)));
        assert!(matches!(f.store.locate("NOTES"), Err(SealdropError::InvalidFilename)));
    }

    #[test]
    fn locate_reports_ambiguity() {
        let f = fixture();
        f.store.store_message("A", "1", "1", b"x").unwrap();
        f.store.store_message("B", "1", "1", b"y").unwrap();
        assert!(matches!(f.store.locate("1.1_msg.gpg"), Err(SealdropError::AmbiguousFile)));
    }

    #[test]
    fn list_source_groups_parts() {
        let f = fixture();
        f.store.store_message("SRC", "1", "1", b"a").unwrap();
        f.store.store_document("SRC", "1", "1", b"b").unwrap();
        f.store.store_message("SRC", "2", "1", b"c").unwrap();

        let groups = f.store.list_source("SRC").unwrap();
        assert_eq!(groups.keys().cloned().collect::<Vec<_>>(), vec!["1.1", "2.1"]);
        let names: Vec<String> = groups["1.1"].iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["1.1_doc.zip.gpg", "1.1_msg.gpg"]);
    }

    #[test]
    fn list_source_rejects_foreign_file() {
        let f = fixture();
        f.store.store_message("SRC", "1", "1", b"a").unwrap();
        fs::write(f.store.root().as_path().join("SRC").join("dropped.exe"), b"x").unwrap();
        assert!(matches!(f.store.list_source("SRC"), Err(SealdropError::PathViolation(_))));
    }

    #[test]
    fn checksum_and_verify() {
        let f = fixture();
        let path = f.store.write("1.1.gpg", b"payload").unwrap();
        let sum = f.store.checksum("1.1.gpg").unwrap();
        assert_eq!(sum, integrity::checksum_bytes(&fs::read(path).unwrap()));
        f.store.verify("1.1.gpg", &sum).unwrap();
        assert!(matches!(
            f.store.verify("1.1.gpg", "sha256:00"),
            Err(SealdropError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn move_source_to_shredder_and_clear() {
        let f = fixture();
        f.store.store_message("SRC", "1", "1", b"a").unwrap();
        let moved = f.store.move_to_shredder("SRC").unwrap();
        assert!(moved.starts_with(f.store.shredder().path()));
        assert!(!f.store.root().as_path().join("SRC").exists());

        let report = f.store.shredder().clear().unwrap();
        assert_eq!(report.files, 1);
        assert!(matches!(f.store.move_to_shredder("SRC"), Err(SealdropError::FileNotFound)));
    }

    #[test]
    fn shredder_inside_root_is_misconfiguration() {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::create(dir.path().join("store")).unwrap();
        let shredder = Shredder::open(dir.path().join("store").join("shredder")).unwrap();
        let custodian = KeyCustodian::new(
            KeySelector::new(dir.path().join("k.pub")),
            Arc::new(AgeEngine::new()),
        );
        let result = SealedStore::new(root, Arc::new(custodian), shredder);
        assert!(matches!(result, Err(SealdropError::Config(_))));
    }
}
