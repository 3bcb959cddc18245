//! Session configuration.
//!
//! Defaults match what the annotation tool writes out of the box. A YAML
//! file can override any subset of fields:
//!
//! ```yaml
//! bbox_margin: 4.0
//! auto_save: true
//! keypoint_format: xyv
//! history_limit: 200
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annotation::{KeypointFormat, YoloPoseCodec};
use crate::error::PoseError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Pixels added on every side of the labeled keypoints' extent.
    pub bbox_margin: f64,

    /// Save the current image after every edit when a save folder is set.
    pub auto_save: bool,

    /// Keypoint layout of written label files.
    pub keypoint_format: KeypointFormat,

    /// Maximum undo snapshots kept per image; unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bbox_margin: 0.0,
            auto_save: false,
            keypoint_format: KeypointFormat::Xy,
            history_limit: None,
        }
    }
}

impl SessionConfig {
    pub fn codec(&self) -> YoloPoseCodec {
        YoloPoseCodec::new(self.keypoint_format)
    }
}

/// Reads a session config from a YAML file.
pub fn read_config_yaml(path: &Path) -> Result<SessionConfig, PoseError> {
    let data = fs::read_to_string(path).map_err(PoseError::Io)?;
    serde_yaml::from_str(&data).map_err(|source| PoseError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
