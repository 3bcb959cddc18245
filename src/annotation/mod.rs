//! Annotation model for keypoint labeling.
//!
//! This module holds the per-image annotation state and the types it is
//! built from, plus the YOLO-pose codec that moves states in and out of
//! label files.
//!
//! # Design Principles
//!
//! 1. **Typed spaces**: positions are `Coord<Pixel>` while editing and
//!    `Coord<Normalized>` only inside the codec, so the two cannot mix.
//!
//! 2. **Fixed arity**: an instance always has exactly as many keypoints as
//!    its skeleton; absence is a keypoint variant, never a missing entry.
//!
//! 3. **Permissive decoding**: boxes read from foreign files are kept as
//!    read, so validation can report problems instead of the loader
//!    rewriting them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use posemark::annotation::{AnnotationState, YoloPoseCodec};
//! use posemark::skeleton::SkeletonRegistry;
//!
//! let registry = SkeletonRegistry::builtin();
//! let rifle = Arc::clone(registry.by_name("Rifle").unwrap());
//!
//! let mut state = AnnotationState::with_skeleton("frame_0001.jpg", rifle);
//! state.set_keypoint(0, 100.0, 100.0).unwrap();
//! state.set_keypoint(1, 200.0, 150.0).unwrap();
//!
//! let line = YoloPoseCodec::default().encode(&state, 640, 480).unwrap();
//! assert!(line.starts_with("1 0.234375 0.260417 0.15625 0.104167"));
//! ```

mod bbox;
mod coord;
mod ids;
pub mod io_yolo_pose;
mod keypoint;
mod space;
mod state;

pub use bbox::BBoxXYXY;
pub use coord::Coord;
pub use ids::{ClassIndex, ImageKey};
pub use io_yolo_pose::{KeypointFormat, YoloPoseCodec};
pub use keypoint::{Keypoint, Visibility};
pub use space::{Normalized, Pixel};
pub use state::{AnnotationState, SkeletonInstance};
