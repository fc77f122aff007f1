//! cfdrive-core - Core library for the cfdrive uploader
//!
//! This library turns a local file into an object in a Cloudflare R2 bucket:
//! it builds the storage key, resolves the content type, performs the
//! transfer and maps the key to a public download URL.

pub mod client;
pub mod config;
pub mod content_type;
pub mod error;
pub mod key;
pub mod store;
pub mod uploader;
pub mod url;

// Re-export commonly used types
pub use client::{requires_multipart_upload, MultipartUploadConfig, R2Client};
pub use config::{get_config_path, load_config_file, validate_config, Config, ConfigFile};
pub use content_type::content_type_for;
pub use error::{Error, Result};
pub use key::{KeyBuilder, StorageKey, TOKEN_LEN};
pub use store::{ObjectStore, ProgressFn, UploadProgress};
pub use uploader::{UploadRequest, UploadResult, Uploader, DEFAULT_PREFIX};
pub use url::build_download_url;
