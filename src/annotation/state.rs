//! Per-image annotation state.

use std::sync::Arc;

use super::{BBoxXYXY, ClassIndex, Coord, ImageKey, Keypoint, Pixel};
use crate::error::PoseError;
use crate::skeleton::SkeletonDefinition;

/// One skeleton placed on an image: its keypoints and the box around them.
///
/// Instances are edited through the [`AnnotationState`] that owns them,
/// which keeps the box fitted to the labeled keypoints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkeletonInstance {
    skeleton: Option<Arc<SkeletonDefinition>>,
    bbox: Option<BBoxXYXY<Pixel>>,
    keypoints: Vec<Keypoint>,
}

impl SkeletonInstance {
    /// An instance of `skeleton` with every keypoint absent.
    pub fn new(skeleton: Arc<SkeletonDefinition>) -> Self {
        Self {
            keypoints: vec![Keypoint::Absent; skeleton.keypoint_count()],
            skeleton: Some(skeleton),
            bbox: None,
        }
    }

    /// Builds an instance from decoded parts without recomputing the box.
    ///
    /// The box is kept exactly as given so that a foreign label file can be
    /// inspected and validated as read.
    pub fn from_parts(
        skeleton: Arc<SkeletonDefinition>,
        keypoints: Vec<Keypoint>,
        bbox: Option<BBoxXYXY<Pixel>>,
    ) -> Result<Self, PoseError> {
        if keypoints.len() != skeleton.keypoint_count() {
            return Err(PoseError::MalformedRecord {
                message: format!(
                    "skeleton '{}' expects {} keypoint(s), got {}",
                    skeleton.name(),
                    skeleton.keypoint_count(),
                    keypoints.len()
                ),
            });
        }
        Ok(Self {
            skeleton: Some(skeleton),
            bbox,
            keypoints,
        })
    }

    pub fn skeleton(&self) -> Option<&Arc<SkeletonDefinition>> {
        self.skeleton.as_ref()
    }

    pub fn class_index(&self) -> Option<ClassIndex> {
        self.skeleton.as_ref().map(|s| s.class_index())
    }

    pub fn bbox(&self) -> Option<&BBoxXYXY<Pixel>> {
        self.bbox.as_ref()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn keypoint(&self, index: usize) -> Option<&Keypoint> {
        self.keypoints.get(index)
    }

    pub fn keypoint_count(&self) -> usize {
        self.keypoints.len()
    }

    pub fn labeled_count(&self) -> usize {
        self.keypoints.iter().filter(|k| k.is_labeled()).count()
    }

    pub fn has_labeled(&self) -> bool {
        self.keypoints.iter().any(Keypoint::is_labeled)
    }

    fn check_index(&self, index: usize) -> Result<(), PoseError> {
        if index >= self.keypoints.len() {
            return Err(PoseError::OutOfRange {
                index,
                count: self.keypoints.len(),
            });
        }
        Ok(())
    }

    fn refit_bbox(&mut self, margin: f64, image_size: Option<(u32, u32)>) {
        let labeled: Vec<Coord<Pixel>> = self
            .keypoints
            .iter()
            .filter_map(|k| match k {
                Keypoint::Labeled(p) => Some(*p),
                _ => None,
            })
            .collect();
        self.bbox = BBoxXYXY::enclosing(&labeled, margin).map(|bbox| match image_size {
            Some((w, h)) => bbox.clamp_within(f64::from(w), f64::from(h)),
            None => bbox,
        });
    }

    fn clear(&mut self) {
        self.keypoints.fill(Keypoint::Absent);
        self.bbox = None;
    }
}

/// The editable annotation of one image.
///
/// An image holds one or more [`SkeletonInstance`]s, one per object. One
/// of them is active: the keypoint accessors and mutators below work on
/// it. A fresh state has a single empty instance.
///
/// This is a plain state holder. Every mutator is one discrete edit; the
/// caller decides whether to record it in an
/// [`EditHistory`](crate::history::EditHistory).
///
/// Invariants kept by the mutators:
/// - there is always at least one instance, and the active index is valid;
/// - an instance has exactly as many keypoints as its skeleton (0 without
///   a skeleton);
/// - the box of an instance, when set, encloses every labeled keypoint
///   grown by the configured margin, and is `None` when nothing is labeled;
/// - once the image size is known, labeled keypoints stay inside
///   `[0, w-1] x [0, h-1]` and boxes inside `[0, w] x [0, h]`.
///
/// Equality compares annotation content. It ignores the dirty flag, the
/// active instance and the image size, so a saved and an unsaved copy of
/// the same edit compare equal.
#[derive(Clone, Debug)]
pub struct AnnotationState {
    image: ImageKey,
    instances: Vec<SkeletonInstance>,
    active: usize,
    bbox_margin: f64,
    image_size: Option<(u32, u32)>,
    dirty: bool,
}

impl AnnotationState {
    /// An empty, clean state with no skeleton assigned.
    pub fn new(image: impl Into<ImageKey>) -> Self {
        Self {
            image: image.into(),
            instances: vec![SkeletonInstance::default()],
            active: 0,
            bbox_margin: 0.0,
            image_size: None,
            dirty: false,
        }
    }

    /// An empty, clean state for `skeleton` with every keypoint absent.
    pub fn with_skeleton(image: impl Into<ImageKey>, skeleton: Arc<SkeletonDefinition>) -> Self {
        Self {
            instances: vec![SkeletonInstance::new(skeleton)],
            ..Self::new(image)
        }
    }

    /// Builds a clean single-instance state from decoded parts without
    /// recomputing the box.
    pub fn from_parts(
        image: impl Into<ImageKey>,
        skeleton: Arc<SkeletonDefinition>,
        keypoints: Vec<Keypoint>,
        bbox: Option<BBoxXYXY<Pixel>>,
    ) -> Result<Self, PoseError> {
        let instance = SkeletonInstance::from_parts(skeleton, keypoints, bbox)?;
        Ok(Self::from_instances(image, vec![instance]))
    }

    /// Builds a clean state holding `instances`, the first one active.
    pub fn from_instances(image: impl Into<ImageKey>, instances: Vec<SkeletonInstance>) -> Self {
        if instances.is_empty() {
            return Self::new(image);
        }
        Self {
            instances,
            ..Self::new(image)
        }
    }

    /// Sets the padding added around labeled keypoints when the box is
    /// recomputed. Takes effect on the next edit.
    pub fn with_bbox_margin(mut self, margin: f64) -> Self {
        self.bbox_margin = margin.max(0.0);
        self
    }

    /// Sets the pixel size of the image. Later edits clamp keypoints and
    /// boxes to it.
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_size = (width > 0 && height > 0).then_some((width, height));
        self
    }

    pub fn image(&self) -> &ImageKey {
        &self.image
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    pub fn instances(&self) -> &[SkeletonInstance] {
        &self.instances
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_instance(&self) -> &SkeletonInstance {
        &self.instances[self.active]
    }

    pub fn skeleton(&self) -> Option<&Arc<SkeletonDefinition>> {
        self.active_instance().skeleton()
    }

    pub fn class_index(&self) -> Option<ClassIndex> {
        self.active_instance().class_index()
    }

    pub fn bbox(&self) -> Option<&BBoxXYXY<Pixel>> {
        self.active_instance().bbox()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        self.active_instance().keypoints()
    }

    pub fn keypoint(&self, index: usize) -> Option<&Keypoint> {
        self.active_instance().keypoint(index)
    }

    pub fn keypoint_count(&self) -> usize {
        self.active_instance().keypoint_count()
    }

    pub fn labeled_count(&self) -> usize {
        self.active_instance().labeled_count()
    }

    pub fn has_labeled(&self) -> bool {
        self.active_instance().has_labeled()
    }

    /// True if any instance has a labeled keypoint, i.e. there is
    /// something worth writing to a label file.
    pub fn is_annotated(&self) -> bool {
        self.instances.iter().any(SkeletonInstance::has_labeled)
    }

    pub fn bbox_margin(&self) -> f64 {
        self.bbox_margin
    }

    /// True if the state changed since it was loaded or last saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clears the dirty flag after a successful save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Labels keypoint `index` at pixel `(x, y)` and refits the box.
    ///
    /// With a known image size the position is clamped onto the image.
    pub fn set_keypoint(&mut self, index: usize, x: f64, y: f64) -> Result<(), PoseError> {
        self.active_instance().check_index(index)?;
        let position: Coord<Pixel> = Coord::new(x, y);
        if !position.is_finite() {
            return Err(PoseError::NonFiniteCoordinate { x, y });
        }

        let position = self.clamp_to_image(position);
        self.instances[self.active].keypoints[index] = Keypoint::Labeled(position);
        self.refit_bbox();
        self.dirty = true;
        Ok(())
    }

    /// Marks keypoint `index` absent and refits the box from what remains.
    pub fn clear_keypoint(&mut self, index: usize) -> Result<(), PoseError> {
        self.active_instance().check_index(index)?;
        self.instances[self.active].keypoints[index] = Keypoint::Absent;
        self.refit_bbox();
        self.dirty = true;
        Ok(())
    }

    /// Clears every keypoint and the box of the active instance, keeping
    /// its skeleton. Every other instance is dropped.
    pub fn reset(&mut self) {
        let mut kept = self.instances.swap_remove(self.active);
        kept.clear();
        self.instances = vec![kept];
        self.active = 0;
        self.dirty = true;
    }

    /// Switches the active instance to `definition`, carrying over
    /// keypoints by name.
    ///
    /// Keypoints whose name exists in both the old and the new skeleton keep
    /// their position and visibility, wherever they sit in the new order.
    /// All others start absent.
    pub fn apply_skeleton(&mut self, definition: Arc<SkeletonDefinition>) {
        let current = &self.instances[self.active];
        let keypoints: Vec<Keypoint> = definition
            .keypoints()
            .iter()
            .map(|name| {
                current
                    .skeleton
                    .as_ref()
                    .and_then(|old| old.keypoint_index(name))
                    .and_then(|old_idx| current.keypoints.get(old_idx).copied())
                    .unwrap_or_default()
            })
            .collect();

        let instance = &mut self.instances[self.active];
        instance.keypoints = keypoints;
        instance.skeleton = Some(definition);
        self.refit_bbox();
        self.dirty = true;
    }

    /// Adds an empty instance of `definition` and makes it active. Returns
    /// its index.
    ///
    /// An active instance that has no skeleton yet is replaced instead of
    /// kept next to the new one.
    pub fn add_instance(&mut self, definition: Arc<SkeletonDefinition>) -> usize {
        let instance = SkeletonInstance::new(definition);
        if self.active_instance().skeleton().is_none() {
            self.instances[self.active] = instance;
        } else {
            self.instances.push(instance);
            self.active = self.instances.len() - 1;
        }
        self.dirty = true;
        self.active
    }

    /// Makes instance `index` the one keypoint edits apply to.
    pub fn select_instance(&mut self, index: usize) -> Result<(), PoseError> {
        if index >= self.instances.len() {
            return Err(PoseError::InstanceOutOfRange {
                index,
                count: self.instances.len(),
            });
        }
        self.active = index;
        Ok(())
    }

    /// Removes instance `index`. Removing the last one leaves a single
    /// empty instance behind.
    pub fn remove_instance(&mut self, index: usize) -> Result<(), PoseError> {
        if index >= self.instances.len() {
            return Err(PoseError::InstanceOutOfRange {
                index,
                count: self.instances.len(),
            });
        }
        self.instances.remove(index);
        if self.instances.is_empty() {
            self.instances.push(SkeletonInstance::default());
        }
        if self.active > index || self.active >= self.instances.len() {
            self.active -= 1;
        }
        self.dirty = true;
        Ok(())
    }

    /// Places every absent keypoint of the active instance at its template
    /// position around the image centre. Returns how many keypoints were
    /// placed.
    ///
    /// Placed keypoints are suggestions: they do not move the box until the
    /// user labels them. Positions that fall off the image are clamped
    /// onto it.
    pub fn place_template(&mut self, image_width: u32, image_height: u32) -> usize {
        let instance = &mut self.instances[self.active];
        let Some(template) = instance.skeleton.as_ref().and_then(|s| s.template()) else {
            return 0;
        };

        let cx = f64::from(image_width / 2);
        let cy = f64::from(image_height / 2);
        let max_x = f64::from(image_width.saturating_sub(1));
        let max_y = f64::from(image_height.saturating_sub(1));
        let mut placed = 0;
        for (keypoint, offset) in instance.keypoints.iter_mut().zip(template) {
            if !keypoint.is_present() {
                let position: Coord<Pixel> = Coord::new(cx + offset.x, cy + offset.y);
                *keypoint = Keypoint::Placed(position.clamp_within(max_x, max_y));
                placed += 1;
            }
        }

        if placed > 0 {
            self.dirty = true;
        }
        placed
    }

    fn clamp_to_image(&self, position: Coord<Pixel>) -> Coord<Pixel> {
        match self.image_size {
            Some((w, h)) => position.clamp_within(f64::from(w - 1), f64::from(h - 1)),
            None => position,
        }
    }

    fn refit_bbox(&mut self) {
        let (margin, image_size) = (self.bbox_margin, self.image_size);
        self.instances[self.active].refit_bbox(margin, image_size);
    }
}

impl PartialEq for AnnotationState {
    fn eq(&self, other: &Self) -> bool {
        self.image == other.image
            && self.instances == other.instances
            && self.bbox_margin == other.bbox_margin
    }
}
