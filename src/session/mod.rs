//! The dataset session: one image folder being annotated.
//!
//! A [`DatasetSession`] owns everything that lives for as long as a folder
//! is open: the image list, the save folder, the annotation cache and the
//! undo history of the image on screen. Opening another folder means
//! building a new session; dropping it is the teardown.
//!
//! Every edit goes through the session so it can be recorded for undo and,
//! when auto-save is on, written out straight away. Undo history is scoped
//! to the current image and is reset whenever the current image changes.
//!
//! An image whose label file failed to load cannot be edited or saved, so
//! the file on disk is never replaced by an empty annotation. Retry the load
//! with [`DatasetSession::revert_current`], or give up on the file with
//! [`DatasetSession::discard_unreadable_label`].

mod dataset;

pub use dataset::{scan_images, scan_label_files, ImageEntry, IMAGE_EXTENSIONS};

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::annotation::io_yolo_pose::{read_label_file, write_label_file, LabelWrite};
use crate::annotation::{AnnotationState, ClassIndex, ImageKey, YoloPoseCodec};
use crate::cache::AnnotationCache;
use crate::config::SessionConfig;
use crate::error::PoseError;
use crate::history::EditHistory;
use crate::skeleton::SkeletonRegistry;

/// Outcome of [`DatasetSession::save_all`].
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Images whose label file was written or removed.
    pub saved: Vec<ImageKey>,
    /// Images that failed to save; their state stays dirty.
    pub failed: Vec<(ImageKey, PoseError)>,
    /// True if the cancel flag stopped the run before every image was saved.
    pub cancelled: bool,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

pub struct DatasetSession {
    image_dir: PathBuf,
    images: Vec<ImageEntry>,
    index_by_key: HashMap<ImageKey, usize>,
    save_dir: Option<PathBuf>,
    registry: Arc<SkeletonRegistry>,
    config: SessionConfig,
    codec: YoloPoseCodec,
    cache: AnnotationCache,
    history: Option<EditHistory<AnnotationState>>,
    current: Option<usize>,
    load_errors: BTreeMap<ImageKey, PoseError>,
}

impl DatasetSession {
    /// Opens the images under `image_dir` and selects the first one.
    pub fn open(
        image_dir: &Path,
        registry: Arc<SkeletonRegistry>,
        config: SessionConfig,
    ) -> Result<Self, PoseError> {
        let images = scan_images(image_dir)?;
        let index_by_key = images
            .iter()
            .enumerate()
            .map(|(idx, image)| (image.key().clone(), idx))
            .collect();
        info!(
            "opened {} image(s) under {}",
            images.len(),
            image_dir.display()
        );

        let codec = config.codec();
        let mut session = Self {
            image_dir: image_dir.to_path_buf(),
            images,
            index_by_key,
            save_dir: None,
            registry,
            config,
            codec,
            cache: AnnotationCache::new(),
            history: None,
            current: None,
            load_errors: BTreeMap::new(),
        };
        if !session.images.is_empty() {
            session.go_to(0)?;
        }
        Ok(session)
    }

    /// Sets the folder label files are read from and written to.
    ///
    /// Clean cached states are dropped, since they were read from the
    /// previous folder; unsaved edits are kept and will be saved into the
    /// new one. The current image is reloaded.
    pub fn set_save_dir(&mut self, save_dir: impl Into<PathBuf>) {
        let save_dir = save_dir.into();
        info!("save folder set to {}", save_dir.display());
        self.save_dir = Some(save_dir);

        let clean: Vec<ImageKey> = self
            .cache
            .keys()
            .filter(|key| self.cache.get(key).is_some_and(|s| !s.is_dirty()))
            .cloned()
            .collect();
        for key in clean {
            self.cache.evict(&key);
        }
        self.load_errors.clear();

        if let Some(index) = self.current {
            self.ensure_loaded(index);
            self.reset_history(index);
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn save_dir(&self) -> Option<&Path> {
        self.save_dir.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_auto_save(&mut self, enabled: bool) {
        self.config.auto_save = enabled;
    }

    pub fn registry(&self) -> &SkeletonRegistry {
        &self.registry
    }

    pub fn images(&self) -> &[ImageEntry] {
        &self.images
    }

    pub fn cache(&self) -> &AnnotationCache {
        &self.cache
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_key(&self) -> Option<&ImageKey> {
        self.current.map(|idx| self.images[idx].key())
    }

    /// The state of the current image, if it has one yet.
    pub fn current_state(&self) -> Option<&AnnotationState> {
        self.current_key().and_then(|key| self.cache.get(key))
    }

    pub fn can_undo(&self) -> bool {
        self.history.as_ref().is_some_and(EditHistory::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.history.as_ref().is_some_and(EditHistory::can_redo)
    }

    /// Label files that could not be loaded, by image.
    pub fn load_errors(&self) -> impl Iterator<Item = (&ImageKey, &PoseError)> {
        self.load_errors.iter()
    }

    /// The load error of `image`, if its label file could not be read.
    pub fn load_error(&self, image: &ImageKey) -> Option<&PoseError> {
        self.load_errors.get(image)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.cache.all_dirty().next().is_some()
    }

    /// Where the label file for `image` lives, if a save folder is set.
    pub fn label_path(&self, image: &ImageKey) -> Option<PathBuf> {
        self.save_dir
            .as_ref()
            .map(|dir| dir.join(image.label_file_name()))
    }

    /// Makes image `index` current and starts a fresh undo history for it.
    pub fn go_to(&mut self, index: usize) -> Result<(), PoseError> {
        if index >= self.images.len() {
            return Err(PoseError::ImageIndexOutOfRange {
                index,
                count: self.images.len(),
            });
        }
        self.ensure_loaded(index);
        self.reset_history(index);
        self.current = Some(index);
        debug!("current image is {}", self.images[index].key());
        Ok(())
    }

    /// Moves to the next image, wrapping to the first.
    pub fn next(&mut self) -> Result<(), PoseError> {
        let count = self.images.len();
        if count == 0 {
            return Err(PoseError::NoImageSelected);
        }
        let index = self.current.map_or(0, |idx| (idx + 1) % count);
        self.go_to(index)
    }

    /// Moves to the previous image, wrapping to the last.
    pub fn previous(&mut self) -> Result<(), PoseError> {
        let count = self.images.len();
        if count == 0 {
            return Err(PoseError::NoImageSelected);
        }
        let index = self.current.map_or(count - 1, |idx| (idx + count - 1) % count);
        self.go_to(index)
    }

    /// Loads every label file not yet in the cache.
    ///
    /// Files that fail to decode are skipped and reported through
    /// [`load_errors`](Self::load_errors). Returns how many failed.
    pub fn preload_all(&mut self) -> usize {
        for index in 0..self.images.len() {
            self.ensure_loaded(index);
        }
        self.load_errors.len()
    }

    pub fn set_keypoint(&mut self, index: usize, x: f64, y: f64) -> Result<bool, PoseError> {
        self.edit(|state| state.set_keypoint(index, x, y))
    }

    pub fn clear_keypoint(&mut self, index: usize) -> Result<bool, PoseError> {
        self.edit(|state| state.clear_keypoint(index))
    }

    /// Clears every keypoint of the current image. With auto-save on, this
    /// removes its label file.
    pub fn reset(&mut self) -> Result<bool, PoseError> {
        self.edit(|state| {
            state.reset();
            Ok(())
        })
    }

    /// Switches the current image to skeleton `class_index`, keeping
    /// keypoints that share a name.
    pub fn apply_skeleton(&mut self, class_index: ClassIndex) -> Result<bool, PoseError> {
        let definition = Arc::clone(self.registry.resolve(class_index)?);
        self.edit(|state| {
            state.apply_skeleton(definition);
            Ok(())
        })
    }

    /// Switches skeleton and places the missing keypoints at the
    /// skeleton's template positions, as one undo step.
    pub fn select_skeleton(&mut self, class_index: ClassIndex) -> Result<bool, PoseError> {
        let definition = Arc::clone(self.registry.resolve(class_index)?);
        let (width, height) = self.current_dimensions()?;
        self.edit(|state| {
            state.apply_skeleton(definition);
            state.place_template(width, height);
            Ok(())
        })
    }

    /// Adds another object of skeleton `class_index` to the current image,
    /// placed at its template positions, and makes it the active instance.
    /// One undo step. Returns the new instance's index.
    pub fn add_instance(&mut self, class_index: ClassIndex) -> Result<usize, PoseError> {
        let definition = Arc::clone(self.registry.resolve(class_index)?);
        let (width, height) = self.current_dimensions()?;
        let mut added = 0;
        self.edit(|state| {
            added = state.add_instance(definition);
            state.place_template(width, height);
            Ok(())
        })?;
        Ok(added)
    }

    /// Makes instance `index` of the current image the target of keypoint
    /// edits. Selection is not an edit: it is neither recorded for undo nor
    /// marks the image dirty.
    pub fn select_instance(&mut self, index: usize) -> Result<(), PoseError> {
        let (image, key) = self.editable_current()?;
        let blank = self.blank_state(image);
        self.cache
            .get_or_create(&key, || blank)
            .select_instance(index)
    }

    /// Removes instance `index` from the current image.
    pub fn remove_instance(&mut self, index: usize) -> Result<bool, PoseError> {
        self.edit(|state| state.remove_instance(index))
    }

    pub fn undo(&mut self) -> Result<(), PoseError> {
        let history = self.history.as_mut().ok_or(PoseError::NoImageSelected)?;
        let snapshot = history.undo()?.clone();
        self.restore(snapshot)
    }

    pub fn redo(&mut self) -> Result<(), PoseError> {
        let history = self.history.as_mut().ok_or(PoseError::NoImageSelected)?;
        let snapshot = history.redo()?.clone();
        self.restore(snapshot)
    }

    /// Drops unsaved edits of the current image and reloads it from disk.
    ///
    /// A label file that failed to load before is read again; if it still
    /// fails, the image stays locked.
    pub fn revert_current(&mut self) -> Result<(), PoseError> {
        let index = self.current.ok_or(PoseError::NoImageSelected)?;
        let key = self.images[index].key().clone();
        self.cache.evict(&key);
        self.load_errors.remove(&key);
        self.ensure_loaded(index);
        self.reset_history(index);
        Ok(())
    }

    /// Gives up on the unreadable label file of the current image so it can
    /// be annotated from scratch. The file stays on disk until the next save
    /// replaces or removes it.
    ///
    /// Returns false if the current image had no load error.
    pub fn discard_unreadable_label(&mut self) -> Result<bool, PoseError> {
        let index = self.current.ok_or(PoseError::NoImageSelected)?;
        let key = self.images[index].key().clone();
        let Some(err) = self.load_errors.remove(&key) else {
            return Ok(false);
        };
        warn!("discarding unreadable label file for {key}: {err}");
        self.reset_history(index);
        Ok(true)
    }

    /// Saves the current image.
    ///
    /// Returns `None` if the image has no state to save, which leaves any
    /// existing label file untouched.
    pub fn save_current(&mut self) -> Result<Option<LabelWrite>, PoseError> {
        let index = self.current.ok_or(PoseError::NoImageSelected)?;
        let key = self.images[index].key().clone();
        self.save_image(&key)
    }

    /// Saves one image from a snapshot of its state.
    ///
    /// The dirty flag is cleared only if the live state still matches the
    /// snapshot that was written. On failure nothing changes. An image whose
    /// label file failed to load is refused with `UnreadableLabel`.
    pub fn save_image(&mut self, image: &ImageKey) -> Result<Option<LabelWrite>, PoseError> {
        let label_path = self.label_path(image).ok_or(PoseError::NoSaveFolder)?;
        if self.load_errors.contains_key(image) {
            return Err(PoseError::UnreadableLabel {
                image: image.to_string(),
            });
        }
        let index = *self
            .index_by_key
            .get(image)
            .ok_or_else(|| PoseError::UnknownImage(image.to_string()))?;
        let Some(snapshot) = self.cache.get(image).cloned() else {
            return Ok(None);
        };

        let (width, height) = self.images[index].dimensions()?;
        let outcome = write_label_file(&label_path, &snapshot, width, height, &self.codec)?;

        if let Some(live) = self.cache.get_mut(image) {
            if *live == snapshot {
                live.mark_clean();
            }
        }
        match outcome {
            LabelWrite::Written => info!("saved {}", label_path.display()),
            LabelWrite::Removed => info!("no labeled keypoints for {image}; removed label file"),
        }
        Ok(Some(outcome))
    }

    /// Saves every dirty image in key order.
    ///
    /// `cancel` is checked before each image. Images saved before a cancel
    /// stay saved; the rest keep their dirty flag. A failing image is
    /// reported and the run continues.
    pub fn save_all(&mut self, cancel: &AtomicBool) -> Result<SaveReport, PoseError> {
        if self.save_dir.is_none() {
            return Err(PoseError::NoSaveFolder);
        }

        let mut report = SaveReport::default();
        for key in self.cache.dirty_keys() {
            if cancel.load(Ordering::Relaxed) {
                info!("save-all cancelled after {} image(s)", report.saved.len());
                report.cancelled = true;
                break;
            }
            match self.save_image(&key) {
                Ok(_) => report.saved.push(key),
                Err(err) => {
                    warn!("failed to save {key}: {err}");
                    report.failed.push((key, err));
                }
            }
        }
        Ok(report)
    }

    /// Runs one edit on the current image's state and records it for undo.
    ///
    /// Returns whether the state changed. A failed edit leaves both the
    /// state and the history untouched.
    fn edit<F>(&mut self, mutate: F) -> Result<bool, PoseError>
    where
        F: FnOnce(&mut AnnotationState) -> Result<(), PoseError>,
    {
        let (index, key) = self.editable_current()?;
        let blank = self.blank_state(index);

        let state = self.cache.get_or_create(&key, || blank);
        mutate(state)?;
        let snapshot = state.clone();

        let history = self.history.as_mut().ok_or(PoseError::NoImageSelected)?;
        let changed = history.record(snapshot);
        if changed {
            self.auto_save(&key);
        }
        Ok(changed)
    }

    fn restore(&mut self, mut snapshot: AnnotationState) -> Result<(), PoseError> {
        let index = self.current.ok_or(PoseError::NoImageSelected)?;
        let key = self.images[index].key().clone();
        snapshot.mark_dirty();
        self.cache.put(key.clone(), snapshot);
        self.auto_save(&key);
        Ok(())
    }

    fn auto_save(&mut self, key: &ImageKey) {
        if !self.config.auto_save || self.save_dir.is_none() {
            return;
        }
        if let Err(err) = self.save_image(key) {
            warn!("auto-save of {key} failed: {err}");
        }
    }

    /// Width and height of `image` in pixels, read from its file header.
    pub fn dimensions_of(&mut self, image: &ImageKey) -> Result<(u32, u32), PoseError> {
        let index = *self
            .index_by_key
            .get(image)
            .ok_or_else(|| PoseError::UnknownImage(image.to_string()))?;
        self.images[index].dimensions()
    }

    fn current_dimensions(&mut self) -> Result<(u32, u32), PoseError> {
        let index = self.current.ok_or(PoseError::NoImageSelected)?;
        self.images[index].dimensions()
    }

    /// The current image, unless its label file failed to load.
    fn editable_current(&self) -> Result<(usize, ImageKey), PoseError> {
        let index = self.current.ok_or(PoseError::NoImageSelected)?;
        let key = self.images[index].key().clone();
        if self.load_errors.contains_key(&key) {
            return Err(PoseError::UnreadableLabel {
                image: key.to_string(),
            });
        }
        Ok((index, key))
    }

    /// An empty state for image `index`. Its size is attached when the
    /// image header can be read, so edits are clamped to the image.
    fn blank_state(&mut self, index: usize) -> AnnotationState {
        let state = AnnotationState::new(self.images[index].key().clone())
            .with_bbox_margin(self.config.bbox_margin);
        match self.images[index].dimensions() {
            Ok((width, height)) => state.with_image_size(width, height),
            Err(_) => state,
        }
    }

    /// Reads the label file of image `index` into the cache unless it is
    /// already cached. Failures are recorded, never propagated.
    fn ensure_loaded(&mut self, index: usize) {
        let key = self.images[index].key().clone();
        if self.cache.contains(&key) || self.load_errors.contains_key(&key) {
            return;
        }
        let Some(label_path) = self.label_path(&key) else {
            return;
        };
        if !label_path.is_file() {
            return;
        }

        let loaded = self.images[index].dimensions().and_then(|(width, height)| {
            let state = read_label_file(
                &label_path,
                &key,
                &self.registry,
                width,
                height,
                &self.codec,
            )?;
            Ok(state.map(|s| s.with_image_size(width, height)))
        });
        match loaded {
            Ok(Some(state)) => {
                debug!(
                    "loaded {} ({} instance(s))",
                    label_path.display(),
                    state.instance_count()
                );
                let state = state.with_bbox_margin(self.config.bbox_margin);
                self.cache.put(key, state);
            }
            Ok(None) => {}
            Err(err) => {
                warn!("skipping {}: {err}", label_path.display());
                self.load_errors.insert(key, err);
            }
        }
    }

    fn reset_history(&mut self, index: usize) {
        let key = self.images[index].key().clone();
        let initial = match self.cache.get(&key) {
            Some(state) => state.clone(),
            None => self.blank_state(index),
        };
        self.history = Some(EditHistory::new(initial).with_limit(self.config.history_limit));
    }
}
