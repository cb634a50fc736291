//! rclone subprocess transport
//!
//! Drives the `rclone` CLI: `lsf` for listings, `cat` for streaming. The
//! path handed in is always appended as a single argv element after a `--`
//! terminator; nothing here goes through a shell.

use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::io::ReaderStream;

use crate::entry::{parse_listing, DirectoryEntry};
use crate::error::{StoreError, StoreResult};
use crate::store::{ByteStream, ObjectStore, STREAM_CHUNK_SIZE};

/// Object store backed by the `rclone` command-line client
#[derive(Debug, Clone)]
pub struct RcloneStore {
    /// Remote prefix, e.g. `alldebrid:` or `alldebrid:links`
    remote: String,
}

impl RcloneStore {
    /// Create a store for the given rclone remote
    ///
    /// A bare remote name without a colon gets one appended, so `alldebrid`
    /// and `alldebrid:` configure the same store.
    pub fn new(remote: impl Into<String>) -> Self {
        let mut remote = remote.into();
        if !remote.contains(':') {
            remote.push(':');
        }
        Self { remote }
    }

    /// The remote prefix this store talks to
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// List the remotes configured in the local rclone install
    pub async fn list_remotes() -> StoreResult<Vec<String>> {
        let output = Command::new("rclone")
            .arg("listremotes")
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(StoreError::Backend(stderr_excerpt(&output.stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// Whether this store's remote is known to rclone
    ///
    /// Used by the server binary to fail fast at startup instead of failing
    /// every request later.
    pub async fn check_remote(&self) -> StoreResult<bool> {
        let remotes = Self::list_remotes().await?;
        Ok(remotes.iter().any(|known| self.remote.starts_with(known.as_str())))
    }

    /// Full rclone target for a validated relative path
    fn target(&self, path: &str) -> String {
        format!("{}{}", self.remote, path)
    }
}

#[async_trait]
impl ObjectStore for RcloneStore {
    async fn list(&self, path: &str) -> StoreResult<Vec<DirectoryEntry>> {
        // The trailing slash forces directory semantics: `lsf` on a plain
        // file target would list the file itself instead of failing.
        let path = path.trim_end_matches('/');
        let target = if path.is_empty() {
            self.remote.clone()
        } else {
            format!("{}/", self.target(path))
        };

        tracing::debug!("listing remote directory {}", target);
        let output = Command::new("rclone")
            .arg("lsf")
            .arg("--")
            .arg(&target)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(classify_failure(&output.stderr));
        }

        Ok(parse_listing(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn open_stream(&self, path: &str) -> StoreResult<ByteStream> {
        let target = self.target(path);

        tracing::debug!("opening remote stream {}", target);
        let mut child = Command::new("rclone")
            .arg("cat")
            .arg("--")
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StoreError::Backend("rclone stdout not captured".to_string()))?;
        let mut reader = ReaderStream::with_capacity(stdout, STREAM_CHUNK_SIZE);

        // Read the first chunk before handing the stream out: a missing
        // object fails here, while the caller can still pick a status code.
        match reader.next().await {
            Some(Ok(first)) => Ok(Box::pin(RemoteStream {
                _child: child,
                first: Some(first),
                reader,
            })),
            Some(Err(e)) => Err(StoreError::Io(e)),
            None => {
                let stderr = read_stderr(&mut child).await;
                let status = child.wait().await?;
                if status.success() {
                    // Zero-length object: a valid, already-finished stream.
                    let empty: ByteStream = Box::pin(futures_util::stream::empty());
                    Ok(empty)
                } else {
                    Err(classify_failure(stderr.as_bytes()))
                }
            }
        }
    }
}

/// Live byte stream bound to one `rclone cat` child process
///
/// The child is spawned with `kill_on_drop`, so dropping the stream kills
/// and reaps the subprocess whether the transfer completed or the client
/// went away mid-stream.
struct RemoteStream {
    _child: Child,
    first: Option<Bytes>,
    reader: ReaderStream<ChildStdout>,
}

impl Stream for RemoteStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(first) = this.first.take() {
            return Poll::Ready(Some(Ok(first)));
        }
        match Pin::new(&mut this.reader).poll_next(cx) {
            Poll::Ready(Some(Err(e))) => {
                // Headers are long gone; all we can do is log and truncate.
                tracing::warn!("remote stream interrupted: {}", e);
                Poll::Ready(Some(Err(e)))
            }
            other => other,
        }
    }
}

/// Map a failed rclone invocation's stderr to a store error
fn classify_failure(stderr: &[u8]) -> StoreError {
    let text = String::from_utf8_lossy(stderr);
    if text.to_ascii_lowercase().contains("not found") {
        StoreError::NotFound
    } else {
        StoreError::Backend(stderr_excerpt(stderr))
    }
}

/// First non-blank stderr line, for logs and error messages
fn stderr_excerpt(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no diagnostic output")
        .to_string()
}

async fn read_stderr(child: &mut Child) -> String {
    let mut buf = Vec::new();
    if let Some(stderr) = child.stderr.as_mut() {
        let _ = stderr.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).to_string()
}
