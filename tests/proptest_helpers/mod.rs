#![allow(dead_code)]

use std::sync::Arc;

use posemark::annotation::{AnnotationState, Keypoint};
use posemark::skeleton::{SkeletonDefinition, SkeletonRegistry};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Largest position error allowed after a normalize/denormalize round trip.
pub const EPS_PIXEL: f64 = 1.0;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// One of the built-in skeletons.
pub fn arb_skeleton() -> BoxedStrategy<Arc<SkeletonDefinition>> {
    let registry = SkeletonRegistry::builtin();
    let definitions: Vec<Arc<SkeletonDefinition>> = registry.iter().cloned().collect();
    proptest::sample::select(definitions).boxed()
}

pub fn arb_image_size() -> BoxedStrategy<(u32, u32)> {
    (16u32..4096, 16u32..4096).boxed()
}

/// A keypoint slot: absent, or labeled in or just beyond a `width` x
/// `height` image. Image edges and corners come up often.
pub fn arb_keypoint(width: u32, height: u32) -> BoxedStrategy<Keypoint> {
    let (w, h) = (f64::from(width), f64::from(height));
    let x = prop_oneof![Just(0.0), Just(w - 1.0), -w * 0.1..w * 1.1];
    let y = prop_oneof![Just(0.0), Just(h - 1.0), -h * 0.1..h * 1.1];
    prop_oneof![
        1 => Just(Keypoint::Absent),
        3 => (x, y).prop_map(|(x, y)| Keypoint::labeled(x, y)),
    ]
    .boxed()
}

/// A state built through the public mutators, with its image size.
/// Generated positions off the image are clamped by `set_keypoint`.
pub fn arb_state() -> BoxedStrategy<(AnnotationState, u32, u32)> {
    (arb_skeleton(), arb_image_size())
        .prop_flat_map(|(skeleton, (width, height))| {
            let count = skeleton.keypoint_count();
            (
                Just(skeleton),
                proptest::collection::vec(arb_keypoint(width, height), count),
                Just(width),
                Just(height),
            )
        })
        .prop_map(|(skeleton, keypoints, width, height)| {
            let mut state = AnnotationState::with_skeleton("prop.jpg", skeleton)
                .with_image_size(width, height);
            for (index, keypoint) in keypoints.iter().enumerate() {
                if let Keypoint::Labeled(p) = keypoint {
                    state
                        .set_keypoint(index, p.x, p.y)
                        .expect("generated index in range");
                }
            }
            (state, width, height)
        })
        .boxed()
}

/// An edit applied to a skeleton with `count` keypoints.
#[derive(Clone, Debug)]
pub enum Edit {
    Set { index: usize, x: f64, y: f64 },
    Clear { index: usize },
}

pub fn arb_edit(count: usize) -> BoxedStrategy<Edit> {
    prop_oneof![
        3 => (0..count, 0.0..640.0f64, 0.0..480.0f64)
            .prop_map(|(index, x, y)| Edit::Set { index, x, y }),
        1 => (0..count).prop_map(|index| Edit::Clear { index }),
    ]
    .boxed()
}

pub fn apply_edit(state: &mut AnnotationState, edit: &Edit) {
    let result = match *edit {
        Edit::Set { index, x, y } => state.set_keypoint(index, x, y),
        Edit::Clear { index } => state.clear_keypoint(index),
    };
    result.expect("generated edit in range");
}
