//! Public download URL construction

use crate::error::{Error, Result};

/// Name of the configuration value holding the public bucket URL
pub const PUBLIC_URL_VAR: &str = "CUSTOM_BUCKET_URL";

/// Join `key` onto the public bucket URL.
///
/// Exactly one trailing slash is removed from `base_url` before joining.
pub fn build_download_url(key: &str, base_url: Option<&str>) -> Result<String> {
    let base_url = base_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| Error::MissingConfiguration(PUBLIC_URL_VAR.to_string()))?;

    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    Ok(format!("{}/{}", base, key))
}
