//! Image discovery for a dataset folder.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::annotation::io_yolo_pose::read_image_dimensions;
use crate::annotation::ImageKey;
use crate::error::PoseError;

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// One image of the dataset. Dimensions are read from the file header on
/// first use and remembered.
#[derive(Clone, Debug)]
pub struct ImageEntry {
    key: ImageKey,
    path: PathBuf,
    dimensions: Option<(u32, u32)>,
}

impl ImageEntry {
    pub fn new(key: ImageKey, path: PathBuf) -> Self {
        Self {
            key,
            path,
            dimensions: None,
        }
    }

    pub fn key(&self) -> &ImageKey {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Width and height in pixels.
    pub fn dimensions(&mut self) -> Result<(u32, u32), PoseError> {
        if let Some(dims) = self.dimensions {
            return Ok(dims);
        }
        let dims = read_image_dimensions(&self.path)?;
        self.dimensions = Some(dims);
        Ok(dims)
    }
}

/// Lists the images under `root`, sorted by key.
pub fn scan_images(root: &Path) -> Result<Vec<ImageEntry>, PoseError> {
    if !root.is_dir() {
        return Err(PoseError::DatasetLayoutInvalid {
            path: root.to_path_buf(),
            message: "image folder must be a directory".to_string(),
        });
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| PoseError::DatasetLayoutInvalid {
            path: root.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), &IMAGE_EXTENSIONS) {
            let key = ImageKey::from_relative_path(root, entry.path());
            images.push(ImageEntry::new(key, entry.path().to_path_buf()));
        }
    }

    images.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(images)
}

/// Lists `.txt` files under `root`, sorted by relative path.
pub fn scan_label_files(root: &Path) -> Result<Vec<PathBuf>, PoseError> {
    if !root.is_dir() {
        return Err(PoseError::DatasetLayoutInvalid {
            path: root.to_path_buf(),
            message: "label folder must be a directory".to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| PoseError::DatasetLayoutInvalid {
            path: root.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;
        if entry.file_type().is_file() && has_extension(entry.path(), &["txt"]) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}
