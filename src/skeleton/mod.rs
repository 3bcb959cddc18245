//! Skeleton types and the registry that resolves them by class index.
//!
//! A skeleton type fixes the keypoint order written to label files, so the
//! registry is the single source of truth for both encoding and decoding.
//! Switching skeletons at runtime is a registry lookup, never a type change.

mod definition;
mod registry;

pub use definition::SkeletonDefinition;
pub use registry::{read_registry_yaml, registry_from_yaml_str, SkeletonRegistry};
