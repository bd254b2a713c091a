//! Storage key derivation
//!
//! Objects are addressed by a single key of the form `{path}/{filename}`,
//! where `path` is the configured base path with its leading slash removed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Composite identifier of an object inside a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Build a key from a normalized storage path and a filename
    ///
    /// An empty path yields the bare filename so keys never start with `/`.
    pub fn new(path: &str, filename: &str) -> Self {
        if path.is_empty() {
            Self(filename.to_string())
        } else {
            Self(format!("{path}/{filename}"))
        }
    }

    /// Wrap a key that was assigned earlier (e.g. loaded from a stored record)
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The last path component of the key
    pub fn filename(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }

    /// Everything before the last `/`, or empty for a top-level key
    pub fn path(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) => &self.0[..pos],
            None => "",
        }
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

/// Turn a configured base path into the storage path used in keys
///
/// Exactly one leading `/` is stripped; nothing else is touched.
pub fn normalize_base_path(base: Option<&str>) -> &str {
    match base {
        Some(path) => path.strip_prefix('/').unwrap_or(path),
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_with_path() {
        let key = StorageKey::new("uploads/images", "abc.png");
        assert_eq!(key.as_str(), "uploads/images/abc.png");
        assert_eq!(key.filename(), "abc.png");
        assert_eq!(key.path(), "uploads/images");
    }

    #[test]
    fn test_key_without_path() {
        let key = StorageKey::new("", "abc.png");
        assert_eq!(key.as_str(), "abc.png");
        assert_eq!(key.filename(), "abc.png");
        assert_eq!(key.path(), "");
    }

    #[test]
    fn test_normalize_strips_single_slash() {
        assert_eq!(normalize_base_path(Some("/uploads")), "uploads");
        assert_eq!(normalize_base_path(Some("//uploads")), "/uploads");
        assert_eq!(normalize_base_path(Some("/")), "");
        assert_eq!(normalize_base_path(None), "");
    }

    #[test]
    fn test_key_display_and_serde() {
        let key = StorageKey::new("files", "report.pdf");
        assert_eq!(key.to_string(), "files/report.pdf");

        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"files/report.pdf\"");
        let back: StorageKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
