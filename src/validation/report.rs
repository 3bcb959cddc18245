//! Validation report types for structured error reporting.
//!
//! Reports are printed as text for people and serialized as JSON for
//! scripts, so every type here derives `Serialize`.

use std::fmt;

use serde::Serialize;

/// The result of checking a dataset's annotations.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    /// Number of images whose annotation was checked.
    pub checked_images: usize,

    /// All issues found, in discovery order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues of one kind, for callers that act on specific codes.
    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(
                f,
                "Check passed: {} annotated image(s), no issues found",
                self.checked_images
            );
        }

        writeln!(
            f,
            "Check completed with {} error(s) and {} warning(s) across {} annotated image(s):",
            self.error_count(),
            self.warning_count(),
            self.checked_images
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single issue (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description.
    pub message: String,

    /// Where the issue occurred.
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but still usable for training.
    Warning,
    /// The label file cannot be used as is.
    Error,
}

/// A stable code identifying the type of issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    // Label file issues
    /// The label file could not be read or decoded.
    LabelUnreadable,
    /// A label file has no image with a matching name.
    LabelWithoutImage,
    /// The image header could not be read, so labels cannot be normalized.
    ImageUnreadable,

    // Keypoint issues
    /// A keypoint lies outside the image.
    KeypointOutOfBounds,
    /// A box is present but no keypoint is labeled.
    NoLabeledKeypoints,

    // Bounding box issues
    /// A bounding box has non-finite coordinates.
    BBoxNotFinite,
    /// A bounding box has min > max.
    InvalidBBoxOrdering,
    /// A bounding box extends outside the image.
    BBoxOutOfBounds,
    /// A labeled keypoint lies outside the bounding box.
    BBoxMissesKeypoint,
    /// Keypoints are labeled but there is no bounding box.
    MissingBBox,
}

/// Where an issue occurred.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    /// The dataset as a whole.
    Dataset,
    /// The annotation of one image.
    Image { image: String },
    /// One skeleton instance of an image's annotation.
    Instance { image: String, instance: usize },
    /// One keypoint of a skeleton instance.
    Keypoint {
        image: String,
        instance: usize,
        index: usize,
        name: String,
    },
    /// A label file on disk.
    LabelFile { path: String },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Dataset => write!(f, "dataset"),
            IssueContext::Image { image } => write!(f, "image {}", image),
            IssueContext::Instance { image, instance } => {
                write!(f, "image {} instance {}", image, instance)
            }
            IssueContext::Keypoint {
                image,
                instance,
                index,
                name,
            } => write!(
                f,
                "image {} instance {} keypoint {} ({})",
                image, instance, index, name
            ),
            IssueContext::LabelFile { path } => write!(f, "label file {}", path),
        }
    }
}
