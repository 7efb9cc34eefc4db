//! Filesystem probing.
//!
//! Validation needs exactly one fact from the filesystem: whether the
//! resolved path names a regular file we are allowed to read. The check
//! sits behind a trait so the guard can be validated against a double in
//! tests; [`FsProbe`] is the real thing.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Existence/readability oracle consumed by guard validation.
pub trait Probe {
    /// Reports whether `path` names a regular file that may be served.
    ///
    /// Absent and present-but-unreadable both come back `Ok(false)`; the
    /// caller cannot tell the two apart. `Err` means the probe itself
    /// failed, which callers must surface rather than treat as absence.
    fn exists_and_readable(&self, path: &Path) -> io::Result<bool>;
}

/// Probe backed by the real filesystem.
///
/// Only user/group/world-readable regular files are acknowledged to
/// exist, matching the rule the staging code applies to the opened
/// handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl Probe for FsProbe {
    fn exists_and_readable(&self, path: &Path) -> io::Result<bool> {
        match std::fs::metadata(path) {
            Ok(meta) => {
                let mode = meta.permissions().mode();
                Ok(meta.is_file() && mode & 0o444 == 0o444)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
