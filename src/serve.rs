//! Download staging.
//!
//! Turns a [`Resolved`] request into the pieces a transport needs: the
//! response header values, in the order they must be emitted, and a
//! stream of the file's raw bytes. Nothing here writes to a socket; the
//! transport collaborator owns emission.
//!
//! The header plan is fixed, in this order:
//!
//! 1. `Content-Disposition: attachment; size=<len>`
//! 2. `Content-Type: application/force-download`
//! 3. `Content-Transfer-Encoding: binary`
//! 4. `Content-Disposition: attachment; filename="<name>"`
//!
//! The filename placed in the final header is the sanitized one, so the
//! values are already free of CR, LF, and NUL.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use hyper::header::{HeaderName, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use tokio::fs;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::err::ServeError;
use crate::guard::Resolved;

/// Content type declared for every download.
const FORCE_DOWNLOAD: &str = "application/force-download";

impl Resolved {
    /// Opens the validated file and stages it for emission.
    ///
    /// The file is opened first and its metadata checked second, so the
    /// readability decision applies to the handle actually served. A
    /// path that stopped being a readable regular file since validation
    /// comes back as [`ServeError::Unservable`].
    pub async fn serve(self, log: &slog::Logger) -> Result<Download, ServeError> {
        slog::debug!(log, "stage"; "name" => %self.name);

        let file = fs::File::open(&self.path).await?;
        let meta = file.metadata().await?;
        let mode = meta.permissions().mode();
        if !meta.is_file() || mode & 0o444 != 0o444 {
            slog::debug!(log, "unservable mode {:#o}", mode);
            return Err(ServeError::Unservable);
        }

        let len = meta.len();
        let headers = vec![
            (
                CONTENT_DISPOSITION,
                HeaderValue::from_str(&format!("attachment; size={}", len))?,
            ),
            (CONTENT_TYPE, HeaderValue::from_static(FORCE_DOWNLOAD)),
            (
                HeaderName::from_static("content-transfer-encoding"),
                HeaderValue::from_static("binary"),
            ),
            (
                CONTENT_DISPOSITION,
                HeaderValue::from_str(&format!("attachment; filename=\"{}\"", self.name))?,
            ),
        ];

        slog::info!(log, "staged"; "len" => len);
        Ok(Download {
            headers,
            len,
            body: ByteStream {
                inner: FramedRead::new(file, BytesCodec::new()),
            },
        })
    }
}

/// A staged download: ordered response metadata plus the byte stream.
///
/// Transports must write the headers in slice order before the body.
/// Whether a duplicate header name replaces or repeats is the
/// transport's call; both dispositions are handed over.
#[derive(Debug)]
pub struct Download {
    headers: Vec<(HeaderName, HeaderValue)>,
    len: u64,
    body: ByteStream,
}

impl Download {
    /// Header values in emission order.
    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    /// Size of the file in bytes, as declared in the first header.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True for a zero-length file.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consumes the staging, yielding headers and body separately.
    pub fn into_parts(self) -> (Vec<(HeaderName, HeaderValue)>, ByteStream) {
        (self.headers, self.body)
    }

    /// Consumes the staging, keeping only the body.
    pub fn into_body(self) -> ByteStream {
        self.body
    }
}

/// The file's raw bytes as a stream of [`Bytes`] chunks.
#[derive(Debug)]
pub struct ByteStream {
    inner: FramedRead<fs::File, BytesCodec>,
}

impl Stream for ByteStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|chunk| chunk.map(|b| b.map(BytesMut::freeze)))
    }
}
