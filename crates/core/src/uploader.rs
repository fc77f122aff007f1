//! Upload a local file and hand back its key and public URL

use crate::content_type::content_type_for;
use crate::error::{Error, Result};
use crate::key::{KeyBuilder, StorageKey};
use crate::store::{ObjectStore, ProgressFn};
use crate::url::build_download_url;
use rand::rngs::StdRng;
use rand::RngCore;
use std::path::{Path, PathBuf};

/// Prefix used when the caller doesn't pick one
pub const DEFAULT_PREFIX: &str = "temp";

/// What to upload and how to name it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub source_path: PathBuf,
    pub destination_prefix: String,
    pub custom_name: Option<String>,
    pub strict: bool,
}

impl UploadRequest {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_prefix: DEFAULT_PREFIX.to_string(),
            custom_name: None,
            strict: false,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.destination_prefix = prefix.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub key: StorageKey,
    pub download_url: String,
}

/// Uploads files to an [`ObjectStore`]
pub struct Uploader<S, R = StdRng> {
    store: S,
    keys: KeyBuilder<R>,
    public_url: Option<String>,
}

impl<S: ObjectStore> Uploader<S, StdRng> {
    /// Uploader with an entropy-seeded key builder
    pub fn new(store: S, public_url: Option<String>) -> Self {
        Self::with_key_builder(store, KeyBuilder::default(), public_url)
    }
}

impl<S: ObjectStore, R: RngCore> Uploader<S, R> {
    pub fn with_key_builder(store: S, keys: KeyBuilder<R>, public_url: Option<String>) -> Self {
        Self {
            store,
            keys,
            public_url,
        }
    }

    #[cfg(test)]
    fn store(&self) -> &S {
        &self.store
    }

    /// Upload `request.source_path` and return the key it was stored under.
    ///
    /// Relative paths are resolved against the current working directory.
    /// Nothing is sent when the file doesn't exist.
    pub async fn upload(
        &mut self,
        request: &UploadRequest,
        progress: ProgressFn<'_>,
    ) -> Result<StorageKey> {
        let path = resolve_source(&request.source_path)?;

        let body = tokio::fs::read(&path).await?;
        let content_type = content_type_for(&path);
        let key = self.keys.build_key(
            &path,
            &request.destination_prefix,
            request.custom_name.as_deref(),
            request.strict,
        );

        tracing::debug!(key = %key, content_type = %content_type, "built key");
        tracing::info!(
            path = %path.display(),
            bucket = self.store.bucket(),
            size = body.len(),
            "uploading"
        );

        self.store
            .put_object(key.as_str(), body, &content_type, progress)
            .await?;

        tracing::info!(key = %key, "upload complete");
        Ok(key)
    }

    /// Upload and build the public download URL for the new object
    pub async fn upload_and_link(
        &mut self,
        request: &UploadRequest,
        progress: ProgressFn<'_>,
    ) -> Result<UploadResult> {
        let key = self.upload(request, progress).await?;
        let download_url = build_download_url(key.as_str(), self.public_url.as_deref())?;
        Ok(UploadResult { key, download_url })
    }
}

/// Absolute path of an existing regular file
fn resolve_source(source: &Path) -> Result<PathBuf> {
    resolve_against(source, std::env::current_dir)
}

/// Relative paths are joined onto `cwd`; absolute paths never look at it.
fn resolve_against<F>(source: &Path, cwd: F) -> Result<PathBuf>
where
    F: FnOnce() -> std::io::Result<PathBuf>,
{
    let path = if source.is_absolute() {
        source.to_path_buf()
    } else {
        cwd()?.join(source)
    };

    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::FileNotFound(path))
    }
}
