//! rclone-backed object store client
//!
//! This crate wraps the `rclone` command-line client behind a small
//! listing/streaming interface so the HTTP gateway never builds command
//! lines itself and can be tested against a fake store.

pub mod entry;
pub mod error;
pub mod rclone;
pub mod store;

pub use entry::{parse_listing, DirectoryEntry};
pub use error::{StoreError, StoreResult};
pub use rclone::RcloneStore;
pub use store::{ByteStream, ObjectStore, STREAM_CHUNK_SIZE};
