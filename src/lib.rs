//! Security primitives for serving user-requested files and for binding
//! form submissions to the session that rendered them.
//!
//! Two independent pieces:
//!
//! - [`DownloadGuard`] resolves an untrusted filename inside a trusted
//!   directory without path traversal, NUL truncation, or header
//!   injection, and stages the file as ordered response metadata plus a
//!   byte stream.
//! - [`TokenManager`] issues, checks, and destroys per-session
//!   anti-forgery tokens against an injected session store, comparing
//!   submissions in constant time.
//!
//! Neither piece touches the network. Transports hand in collaborators
//! ([`Probe`], [`TokenStore`], [`FormSource`]) and emit what comes back.

pub mod err;
pub mod guard;
pub mod probe;
pub mod scrub;
pub mod serve;
pub mod store;
pub mod token;

pub use err::{Denial, GuardError, ServeError};
pub use guard::{DownloadGuard, Resolved};
pub use probe::{FsProbe, Probe};
pub use scrub::scrub;
pub use serve::{ByteStream, Download};
pub use store::{FormFields, FormSource, MemoryStore, TokenStore};
pub use token::{Token, TokenManager, TokenScope};
