//! Newtype keys for images and skeleton classes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Stable key for an image within a dataset session.
///
/// This is the image path relative to the dataset folder, with `/`
/// separators on every platform, so the same dataset yields the same keys
/// regardless of where it is mounted.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageKey(String);

impl ImageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Builds the key for `path` relative to `root`.
    ///
    /// Falls back to the full path if `path` is not under `root`.
    pub fn from_relative_path(root: &Path, path: &Path) -> Self {
        let rel = path.strip_prefix(root).unwrap_or(path);
        Self(rel.to_string_lossy().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The label file name for this image: the key with its extension
    /// replaced by `.txt`, keeping any sub-directories.
    pub fn label_file_name(&self) -> String {
        Path::new(&self.0)
            .with_extension("txt")
            .to_string_lossy()
            .into_owned()
    }
}

impl fmt::Debug for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageKey({:?})", self.0)
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ImageKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// The YOLO class index identifying a skeleton type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassIndex(pub u32);

impl ClassIndex {
    #[inline]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ClassIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassIndex({})", self.0)
    }
}

impl fmt::Display for ClassIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ClassIndex {
    fn from(index: u32) -> Self {
        Self(index)
    }
}
