//! Annotation checks for a dataset session.
//!
//! This module checks the label files of a dataset for:
//! - Readability (every label file decodes against the skeleton registry)
//! - Correspondence (every label file belongs to an image)
//! - Geometry (keypoints and boxes inside the image, box enclosing the
//!   labeled keypoints)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::HashSet;

use crate::annotation::{AnnotationState, Keypoint, SkeletonInstance};
use crate::error::PoseError;
use crate::session::{scan_label_files, DatasetSession};

/// Options for validation behavior.
#[derive(Clone, Debug)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,

    /// Slack in pixels for containment checks. Label files store six
    /// decimals, so decoded positions drift by a fraction of a pixel.
    pub tolerance: f64,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            strict: false,
            tolerance: 1.0,
        }
    }
}

/// Loads every label file of `session` and checks it.
///
/// Label files that fail to decode become `LabelUnreadable` errors; the
/// rest of the dataset is still checked.
pub fn validate_session(
    session: &mut DatasetSession,
    opts: &ValidateOptions,
) -> Result<ValidationReport, PoseError> {
    let mut report = ValidationReport::new();
    session.preload_all();

    for (key, err) in session.load_errors() {
        let path = session
            .label_path(key)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| key.label_file_name());
        let code = match err {
            PoseError::ImageDimensionRead { .. } => IssueCode::ImageUnreadable,
            _ => IssueCode::LabelUnreadable,
        };
        report.add(ValidationIssue::error(
            code,
            err.to_string(),
            IssueContext::LabelFile { path },
        ));
    }

    let keys: Vec<_> = session.cache().keys().cloned().collect();
    for key in keys {
        let (width, height) = match session.dimensions_of(&key) {
            Ok(dims) => dims,
            Err(err) => {
                report.add(ValidationIssue::error(
                    IssueCode::ImageUnreadable,
                    err.to_string(),
                    IssueContext::Image {
                        image: key.to_string(),
                    },
                ));
                continue;
            }
        };
        if let Some(state) = session.cache().get(&key) {
            report.checked_images += 1;
            validate_state(state, width, height, opts, &mut report);
        }
    }

    if let Some(save_dir) = session.save_dir().map(|p| p.to_path_buf()) {
        let expected: HashSet<String> = session
            .images()
            .iter()
            .map(|image| image.key().label_file_name())
            .collect();
        for path in scan_label_files(&save_dir)? {
            let rel = path
                .strip_prefix(&save_dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            if !expected.contains(&rel) {
                report.add(ValidationIssue::warning(
                    IssueCode::LabelWithoutImage,
                    "No image with a matching name in the image folder",
                    IssueContext::LabelFile {
                        path: path.display().to_string(),
                    },
                ));
            }
        }
    }

    Ok(report)
}

/// Checks every instance of one annotation state against its image size.
pub fn validate_state(
    state: &AnnotationState,
    image_width: u32,
    image_height: u32,
    opts: &ValidateOptions,
    report: &mut ValidationReport,
) {
    let image = state.image().to_string();
    for (instance_index, instance) in state.instances().iter().enumerate() {
        validate_instance(
            &image,
            instance_index,
            instance,
            (image_width, image_height),
            opts,
            report,
        );
    }
}

fn validate_instance(
    image: &str,
    instance_index: usize,
    instance: &SkeletonInstance,
    (image_width, image_height): (u32, u32),
    opts: &ValidateOptions,
    report: &mut ValidationReport,
) {
    let (w, h) = (f64::from(image_width), f64::from(image_height));
    let tol = opts.tolerance;
    let instance_context = || IssueContext::Instance {
        image: image.to_string(),
        instance: instance_index,
    };
    let keypoint_context = |index: usize| IssueContext::Keypoint {
        image: image.to_string(),
        instance: instance_index,
        index,
        name: instance
            .skeleton()
            .and_then(|s| s.keypoints().get(index).cloned())
            .unwrap_or_default(),
    };

    for (index, keypoint) in instance.keypoints().iter().enumerate() {
        let Some(position) = keypoint.position() else {
            continue;
        };
        let inside = position.x >= -tol
            && position.x <= w + tol
            && position.y >= -tol
            && position.y <= h + tol;
        if !inside {
            report.add(ValidationIssue::warning(
                IssueCode::KeypointOutOfBounds,
                format!(
                    "Keypoint at ({:.1}, {:.1}) is outside the {}x{} image",
                    position.x, position.y, image_width, image_height
                ),
                keypoint_context(index),
            ));
        }
    }

    let Some(bbox) = instance.bbox() else {
        if instance.has_labeled() {
            report.add(ValidationIssue::error(
                IssueCode::MissingBBox,
                "Keypoints are labeled but the annotation has no bounding box",
                instance_context(),
            ));
        }
        return;
    };

    if !bbox.is_finite() {
        report.add(ValidationIssue::error(
            IssueCode::BBoxNotFinite,
            format!("Bounding box has non-finite coordinates: {:?}", bbox),
            instance_context(),
        ));
        return;
    }

    if !bbox.is_ordered() {
        report.add(ValidationIssue::error(
            IssueCode::InvalidBBoxOrdering,
            format!(
                "Bounding box has min > max: ({:.1}, {:.1}) to ({:.1}, {:.1})",
                bbox.xmin(),
                bbox.ymin(),
                bbox.xmax(),
                bbox.ymax()
            ),
            instance_context(),
        ));
    }

    if bbox.xmin() < -tol
        || bbox.ymin() < -tol
        || bbox.xmax() > w + tol
        || bbox.ymax() > h + tol
    {
        report.add(ValidationIssue::warning(
            IssueCode::BBoxOutOfBounds,
            format!(
                "Bounding box ({:.1}, {:.1}) to ({:.1}, {:.1}) extends outside the {}x{} image",
                bbox.xmin(),
                bbox.ymin(),
                bbox.xmax(),
                bbox.ymax(),
                image_width,
                image_height
            ),
            instance_context(),
        ));
    }

    if !instance.has_labeled() {
        report.add(ValidationIssue::warning(
            IssueCode::NoLabeledKeypoints,
            "Bounding box without any labeled keypoint",
            instance_context(),
        ));
    }

    for (index, keypoint) in instance.keypoints().iter().enumerate() {
        if let Keypoint::Labeled(position) = keypoint {
            if !bbox.contains(position, tol) {
                report.add(ValidationIssue::warning(
                    IssueCode::BBoxMissesKeypoint,
                    format!(
                        "Labeled keypoint at ({:.1}, {:.1}) lies outside the bounding box",
                        position.x, position.y
                    ),
                    keypoint_context(index),
                ));
            }
        }
    }
}

/// Returns true if `report` should fail a check run.
pub fn is_failure(report: &ValidationReport, opts: &ValidateOptions) -> bool {
    report.error_count() > 0 || (opts.strict && report.warning_count() > 0)
}
