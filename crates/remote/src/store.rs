//! Object store abstraction

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::entry::DirectoryEntry;
use crate::error::StoreResult;

/// Chunk size used when forwarding remote byte streams
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// A finite, forward-only sequence of byte chunks from the remote
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Remote content source exposed as listable directories and streamable
/// objects
///
/// Implementations wrap a concrete transport (subprocess invocation, native
/// library, network client) so callers can swap it out and tests can use a
/// fake.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List the entries directly under `path`
    ///
    /// `path` is a validated relative path; the empty string denotes the
    /// remote root. Fails with [`crate::StoreError::NotFound`] when `path`
    /// cannot be enumerated as a directory.
    async fn list(&self, path: &str) -> StoreResult<Vec<DirectoryEntry>>;

    /// Open a byte stream for the object at `path`
    ///
    /// The stream is not restartable; callers must re-open to re-read.
    async fn open_stream(&self, path: &str) -> StoreResult<ByteStream>;
}
