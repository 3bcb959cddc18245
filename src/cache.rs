//! In-memory store of annotation states for a dataset session.

use std::collections::btree_map::{self, BTreeMap};

use crate::annotation::{AnnotationState, ImageKey};

/// Annotation states keyed by image.
///
/// Entries live until they are evicted or the cache is dropped, so moving
/// between images keeps unsaved edits without touching disk. Iteration is
/// in key order, which keeps save-all and reports deterministic.
#[derive(Clone, Debug, Default)]
pub struct AnnotationCache {
    entries: BTreeMap<ImageKey, AnnotationState>,
}

impl AnnotationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for `image`, creating it with `factory` if absent.
    pub fn get_or_create<F>(&mut self, image: &ImageKey, factory: F) -> &mut AnnotationState
    where
        F: FnOnce() -> AnnotationState,
    {
        self.entries.entry(image.clone()).or_insert_with(factory)
    }

    /// Stores `state` for `image`, returning the state it replaced.
    pub fn put(&mut self, image: ImageKey, state: AnnotationState) -> Option<AnnotationState> {
        self.entries.insert(image, state)
    }

    /// Removes and returns the state for `image`.
    pub fn evict(&mut self, image: &ImageKey) -> Option<AnnotationState> {
        self.entries.remove(image)
    }

    pub fn get(&self, image: &ImageKey) -> Option<&AnnotationState> {
        self.entries.get(image)
    }

    pub fn get_mut(&mut self, image: &ImageKey) -> Option<&mut AnnotationState> {
        self.entries.get_mut(image)
    }

    pub fn contains(&self, image: &ImageKey) -> bool {
        self.entries.contains_key(image)
    }

    /// Entries changed since they were loaded or last saved.
    ///
    /// The iterator is lazy and `Clone`; calling this again, or cloning the
    /// iterator, walks the current dirty set from the start.
    pub fn all_dirty(&self) -> DirtyEntries<'_> {
        DirtyEntries {
            inner: self.entries.iter(),
        }
    }

    /// Keys of the dirty entries, collected so the cache can be mutated
    /// while walking them.
    pub fn dirty_keys(&self) -> Vec<ImageKey> {
        self.all_dirty().map(|(key, _)| key.clone()).collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ImageKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Iterator returned by [`AnnotationCache::all_dirty`].
#[derive(Clone, Debug)]
pub struct DirtyEntries<'a> {
    inner: btree_map::Iter<'a, ImageKey, AnnotationState>,
}

impl<'a> Iterator for DirtyEntries<'a> {
    type Item = (&'a ImageKey, &'a AnnotationState);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.by_ref().find(|(_, state)| state.is_dirty())
    }
}
