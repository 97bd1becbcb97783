//! The `upload` module connects file uploads to the chat.
//!
//! An HTTP layer (not part of this crate) parses the multipart request and
//! hands the file to `UploadBridge::store_and_announce`, or stores it itself
//! and calls `UploadBridge::announce`. Either way every connected client
//! receives a `link` envelope pointing at the stored file.
//!
//! Files live in one shared temp directory managed by `UploadStore`, which is
//! removed when the server shuts down.

pub mod bridge;
pub mod store;

pub use bridge::{UploadBridge, UploadResponse};
pub use store::{StoredUpload, UploadStore};
