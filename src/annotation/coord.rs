//! Typed 2D points.

use std::marker::PhantomData;

use super::{Normalized, Pixel};

/// A 2D point tagged with its coordinate space.
///
/// `TSpace` is [`Pixel`] or [`Normalized`], so a keypoint read from a label
/// file cannot be stored in an annotation without being denormalized first.
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Returns true if both components are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to `other`, in the units of `TSpace`.
    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Coord<Pixel> {
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> Coord<Normalized> {
        Coord::new(self.x / image_width, self.y / image_height)
    }

    /// Returns true if the point lies inside `[0, max_x] x [0, max_y]`.
    pub fn is_within(&self, max_x: f64, max_y: f64) -> bool {
        (0.0..=max_x).contains(&self.x) && (0.0..=max_y).contains(&self.y)
    }

    /// The nearest point inside `[0, max_x] x [0, max_y]`.
    pub fn clamp_within(&self, max_x: f64, max_y: f64) -> Self {
        if self.is_within(max_x, max_y) {
            return *self;
        }
        Coord::new(self.x.clamp(0.0, max_x), self.y.clamp(0.0, max_y))
    }
}

impl Coord<Normalized> {
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> Coord<Pixel> {
        Coord::new(self.x * image_width, self.y * image_height)
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
