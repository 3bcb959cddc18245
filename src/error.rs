use std::path::PathBuf;
use thiserror::Error;

use crate::annotation::ClassIndex;
use crate::validation::ValidationReport;

/// The main error type for posemark operations.
#[derive(Debug, Error)]
pub enum PoseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keypoint index {index} is out of range for a skeleton with {count} keypoint(s)")]
    OutOfRange { index: usize, count: usize },

    #[error("Keypoint coordinate ({x}, {y}) is not finite")]
    NonFiniteCoordinate { x: f64, y: f64 },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Annotation for '{image}' has labeled keypoints but no bounding box")]
    IncompleteAnnotation { image: String },

    #[error("Annotation for '{image}' has nothing to encode")]
    EmptyAnnotation { image: String },

    #[error("Malformed record: {message}")]
    MalformedRecord { message: String },

    #[error("Unknown class index {0}")]
    UnknownClassIndex(ClassIndex),

    #[error("Instance {index} is out of range for an image with {count} instance(s)")]
    InstanceOutOfRange { index: usize, count: usize },

    #[error("Invalid image dimensions {width}x{height} (must be positive)")]
    InvalidImageDimensions { width: u32, height: u32 },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Failed to parse label file {path}:{line}: {source}")]
    LabelParse {
        path: PathBuf,
        line: usize,
        #[source]
        source: Box<PoseError>,
    },

    #[error("Failed to parse skeleton registry {path}: {source}")]
    RegistryParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid skeleton registry: {message}")]
    RegistryInvalid { message: String },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No image selected")]
    NoImageSelected,

    #[error("Image index {index} is out of range for a dataset with {count} image(s)")]
    ImageIndexOutOfRange { index: usize, count: usize },

    #[error("Image '{0}' is not part of the dataset")]
    UnknownImage(String),

    #[error("Label file for '{image}' could not be loaded; revert or discard it before editing")]
    UnreadableLabel { image: String },

    #[error("No save folder selected")]
    NoSaveFolder,

    #[error("Invalid dataset layout at {path}: {message}")]
    DatasetLayoutInvalid { path: PathBuf, message: String },

    #[error("Check failed with {error_count} error(s) and {warning_count} warning(s)")]
    CheckFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Reformat failed for {failed} of {total} label file(s)")]
    ReformatFailed { failed: usize, total: usize },

    #[error("Failed to write JSON report: {source}")]
    ReportWrite {
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
