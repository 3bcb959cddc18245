//! Keypoint presence and position.

use super::{Coord, Pixel};

/// One keypoint of a skeleton instance.
///
/// A keypoint is either missing, placed at a suggested position the user
/// has not confirmed (for example from a skeleton template), or labeled.
/// Only labeled keypoints count towards the bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Keypoint {
    #[default]
    Absent,
    Placed(Coord<Pixel>),
    Labeled(Coord<Pixel>),
}

impl Keypoint {
    pub fn labeled(x: f64, y: f64) -> Self {
        Keypoint::Labeled(Coord::new(x, y))
    }

    pub fn placed(x: f64, y: f64) -> Self {
        Keypoint::Placed(Coord::new(x, y))
    }

    /// The position, if the keypoint is present.
    pub fn position(&self) -> Option<Coord<Pixel>> {
        match self {
            Keypoint::Absent => None,
            Keypoint::Placed(p) | Keypoint::Labeled(p) => Some(*p),
        }
    }

    pub fn is_labeled(&self) -> bool {
        matches!(self, Keypoint::Labeled(_))
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Keypoint::Absent)
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            Keypoint::Absent => Visibility::Absent,
            Keypoint::Placed(_) => Visibility::Unlabeled,
            Keypoint::Labeled(_) => Visibility::Labeled,
        }
    }
}

/// YOLO-pose visibility flag values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Absent = 0,
    Unlabeled = 1,
    Labeled = 2,
}

impl Visibility {
    pub fn as_flag(self) -> u8 {
        self as u8
    }

    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Visibility::Absent),
            1 => Some(Visibility::Unlabeled),
            2 => Some(Visibility::Labeled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_has_no_position() {
        assert_eq!(Keypoint::Absent.position(), None);
        assert!(!Keypoint::Absent.is_present());
        assert_eq!(Keypoint::default(), Keypoint::Absent);
    }

    #[test]
    fn visibility_flags_follow_yolo_pose() {
        assert_eq!(Keypoint::Absent.visibility().as_flag(), 0);
        assert_eq!(Keypoint::placed(1.0, 2.0).visibility().as_flag(), 1);
        assert_eq!(Keypoint::labeled(1.0, 2.0).visibility().as_flag(), 2);
        assert_eq!(Visibility::from_flag(2), Some(Visibility::Labeled));
        assert_eq!(Visibility::from_flag(3), None);
    }

    #[test]
    fn only_labeled_counts_as_labeled() {
        assert!(Keypoint::labeled(0.0, 0.0).is_labeled());
        assert!(!Keypoint::placed(5.0, 5.0).is_labeled());
        assert!(Keypoint::placed(5.0, 5.0).is_present());
    }
}
