//! Storage key construction
//!
//! A key is `[prefix/][token-]basename`. The token is a short random hex
//! string that keeps two uploads of the same file name apart; strict mode
//! leaves it out and accepts that equal keys overwrite each other.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt;
use std::path::Path;

/// Number of hex characters in the disambiguation token
pub const TOKEN_LEN: usize = 5;

/// Key of an object in the bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds storage keys from a random source
pub struct KeyBuilder<R = StdRng> {
    rng: R,
}

impl Default for KeyBuilder<StdRng> {
    fn default() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: RngCore> KeyBuilder<R> {
    /// Create a key builder drawing tokens from `rng`
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Build the key for `source_path`.
    ///
    /// `custom_name` replaces the file stem; the source extension is always
    /// kept. An empty (or all-slash) `destination_prefix` puts the object at
    /// the bucket root.
    pub fn build_key(
        &mut self,
        source_path: &Path,
        destination_prefix: &str,
        custom_name: Option<&str>,
        strict: bool,
    ) -> StorageKey {
        let base_name = base_name(source_path, custom_name);

        let file_part = if strict {
            base_name
        } else {
            format!("{}-{}", self.token(), base_name)
        };

        let prefix = destination_prefix.trim_matches('/');
        if prefix.is_empty() {
            StorageKey(file_part)
        } else {
            StorageKey(format!("{}/{}", prefix, file_part))
        }
    }

    fn token(&mut self) -> String {
        let value = self.rng.gen_range(0..1u32 << (4 * TOKEN_LEN));
        format!("{:0width$x}", value, width = TOKEN_LEN)
    }
}

fn base_name(source_path: &Path, custom_name: Option<&str>) -> String {
    let file_name = source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Some(custom) = custom_name.map(str::trim).filter(|c| !c.is_empty()) else {
        return file_name;
    };

    // A mistakenly included extension on the custom name is dropped.
    let stem = Path::new(custom)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| custom.to_string());

    match source_path.extension() {
        Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
        None => stem,
    }
}
