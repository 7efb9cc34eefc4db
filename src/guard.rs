//! Guarded file retrieval.
//!
//! [`DownloadGuard`] takes an untrusted, caller-supplied filename and
//! decides whether it may be served out of a trusted base directory. The
//! checks run in a fixed order and stop at the first failure:
//!
//! 1. the sanitized name must carry an allowed extension,
//! 2. the sanitized name must not be on the denied-name list,
//! 3. the joined path must name a readable regular file.
//!
//! A successful validation yields a [`Resolved`], which is the only type
//! the staging code in [`crate::serve`] accepts. There is no way to
//! stage a download for a name that has not passed the checks.

use std::path::{Path, PathBuf};

use crate::err::{Denial, GuardError};
use crate::probe::Probe;
use crate::scrub::scrub;

/// Extensions accepted when the caller does not supply a set.
const DEFAULT_EXTENSIONS: [&str; 6] = ["pdf", "jpg", "jpeg", "png", "gif", "zip"];

/// One guarded download request.
///
/// The filename is untrusted and gets sanitized before every decision.
/// The root is trusted, is never sanitized, and must not be built from
/// request data.
pub struct DownloadGuard {
    file: String,
    root: PathBuf,
    extensions: Vec<String>,
    deny_list: Vec<String>,
    errors: Vec<Denial>,
}

impl DownloadGuard {
    /// Creates a guard for `file` under the trusted directory `root`,
    /// with the default extension set and no denied names.
    pub fn new(file: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            deny_list: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Replaces the allowed extension set. Comparison is
    /// case-insensitive; entries are stored lowercased.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    /// Configures exact sanitized names that are refused with
    /// [`Denial::IllegalName`] even when their extension is allowed.
    pub fn deny_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny_list = names.into_iter().map(Into::into).collect();
        self
    }

    /// Runs the ordered checks against `probe`.
    ///
    /// Each failed call appends exactly one entry to [`errors`]; later
    /// checks do not run once one fails. A probe fault propagates as
    /// [`GuardError::Probe`] without touching the error list.
    ///
    /// [`errors`]: Self::errors
    pub fn validate(
        &mut self,
        log: &slog::Logger,
        probe: &impl Probe,
    ) -> Result<Resolved, GuardError> {
        let name = scrub(&self.file);
        slog::debug!(log, "validate"; "name" => %name);

        if !self.extension_allowed(&name) {
            return Err(self.deny(log, Denial::IllegalExtension));
        }

        if !self.deny_list.is_empty() && self.deny_list.iter().any(|d| d == &name) {
            return Err(self.deny(log, Denial::IllegalName));
        }

        let path = self.root.join(&name);
        if !probe.exists_and_readable(&path)? {
            return Err(self.deny(log, Denial::NotFound));
        }

        Ok(Resolved { path, name })
    }

    /// Denials recorded by failed [`validate`] calls, oldest first.
    ///
    /// [`validate`]: Self::validate
    pub fn errors(&self) -> &[Denial] {
        &self.errors
    }

    /// True when at least one validation has failed.
    pub fn denied(&self) -> bool {
        !self.errors.is_empty()
    }

    fn deny(&mut self, log: &slog::Logger, denial: Denial) -> GuardError {
        slog::info!(log, "denied"; "reason" => %denial);
        self.errors.push(denial);
        GuardError::Denied(denial)
    }

    /// The extension is everything after the final `.`; a name without
    /// one never matches.
    fn extension_allowed(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            }
            None => false,
        }
    }
}

/// Proof that a request passed validation.
///
/// Carries the resolved path together with the sanitized name that
/// produced it; the sanitized name is what ends up in user-visible
/// headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub(crate) path: PathBuf,
    pub(crate) name: String,
}

impl Resolved {
    /// The full path that will be served.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sanitized, single-segment filename.
    pub fn name(&self) -> &str {
        &self.name
    }
}
