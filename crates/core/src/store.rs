//! Object store abstraction used by the uploader

use crate::error::Result;
use async_trait::async_trait;

/// Progress of a single transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes handed to the store so far
    pub transferred: u64,
    /// Total bytes of the body
    pub total: u64,
}

impl UploadProgress {
    pub fn new(transferred: u64, total: u64) -> Self {
        Self { transferred, total }
    }
}

/// Progress observer passed into a transfer
pub type ProgressFn<'a> = &'a (dyn Fn(UploadProgress) + Send + Sync);

/// Anything that can store an object under a key
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, reporting progress as bytes are accepted
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        progress: ProgressFn<'_>,
    ) -> Result<()>;

    /// Name of the target bucket
    fn bucket(&self) -> &str;
}
