// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Submission filename convention.
//
// Grammar:
//
//   [reply-]<digits>.<digits>[_msg | _doc.zip].gpg
//
// Every file accepted into the store matches this exactly. Parsing yields a
// `SubmissionName`; anything else is `None` rather than an error so callers
// decide what a non-match means for them.

use std::fmt;

/// Extension every stored artifact carries.
pub const ENCRYPTED_EXTENSION: &str = "gpg";

const DOT_EXTENSION: &str = ".gpg";
const REPLY_PREFIX: &str = "reply-";
const MESSAGE_SUFFIX: &str = "_msg";
const BUNDLE_SUFFIX: &str = "_doc.zip";
const BARE_DOC_SUFFIX: &str = "_doc";

/// What a submission file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// A text message (`_msg`).
    Message,
    /// A zipped document upload (`_doc.zip`).
    DocumentBundle,
    /// No content-kind suffix.
    Unspecified,
}

impl ContentKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Message => MESSAGE_SUFFIX,
            Self::DocumentBundle => BUNDLE_SUFFIX,
            Self::Unspecified => "",
        }
    }
}

/// A parsed submission or reply filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionName {
    pub is_reply: bool,
    pub index: String,
    pub sub_index: String,
    pub kind: ContentKind,
}

impl SubmissionName {
    /// Build a name from its parts; `None` unless both indices are
    /// non-empty ASCII digit strings.
    pub fn new(
        index: impl Into<String>,
        sub_index: impl Into<String>,
        kind: ContentKind,
        is_reply: bool,
    ) -> Option<Self> {
        let index = index.into();
        let sub_index = sub_index.into();
        if !is_digits(&index) || !is_digits(&sub_index) {
            return None;
        }
        Some(Self {
            is_reply,
            index,
            sub_index,
            kind,
        })
    }

    /// The bare logical identifier, `<index>.<sub_index>`.
    pub fn logical_id(&self) -> String {
        format!("{}.{}", self.index, self.sub_index)
    }
}

impl fmt::Display for SubmissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_reply {
            f.write_str(REPLY_PREFIX)?;
        }
        write!(
            f,
            "{}.{}{}{}",
            self.index,
            self.sub_index,
            self.kind.suffix(),
            DOT_EXTENSION
        )
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parse `name` against the grammar.
pub fn parse(name: &str) -> Option<SubmissionName> {
    let (is_reply, rest) = match name.strip_prefix(REPLY_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, name),
    };
    let rest = rest.strip_suffix(DOT_EXTENSION)?;

    let (core, kind) = if let Some(core) = rest.strip_suffix(MESSAGE_SUFFIX) {
        (core, ContentKind::Message)
    } else if let Some(core) = rest.strip_suffix(BUNDLE_SUFFIX) {
        (core, ContentKind::DocumentBundle)
    } else {
        (rest, ContentKind::Unspecified)
    };

    let (index, sub_index) = core.split_once('.')?;
    SubmissionName::new(index, sub_index, kind, is_reply)
}

/// Whether `name` matches the grammar.
pub fn is_valid(name: &str) -> bool {
    parse(name).is_some()
}

/// Build a filename from parts; `None` for malformed indices.
///
/// For well-formed parts, `parse(&build(..)?)` returns the same parts.
pub fn build(index: &str, sub_index: &str, kind: ContentKind, is_reply: bool) -> Option<String> {
    SubmissionName::new(index, sub_index, kind, is_reply).map(|n| n.to_string())
}

/// Strip decoration to recover the logical identifier used to group a
/// submission's parts.
///
/// One pass removes a trailing `.gpg`, then a leading `reply-`, then a
/// trailing `_doc.zip`, `_doc` or `_msg`. Passes repeat until nothing
/// changes, so `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(name: &str) -> String {
    let mut current = name;
    loop {
        let next = strip_once(current);
        if next.len() == current.len() {
            return current.to_owned();
        }
        current = next;
    }
}

fn strip_once(name: &str) -> &str {
    let name = name.strip_suffix(DOT_EXTENSION).unwrap_or(name);
    let name = name.strip_prefix(REPLY_PREFIX).unwrap_or(name);
    [BUNDLE_SUFFIX, BARE_DOC_SUFFIX, MESSAGE_SUFFIX]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}
