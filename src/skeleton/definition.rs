//! Static description of one skeleton type.

use crate::annotation::{ClassIndex, Coord, Pixel};
use crate::error::PoseError;

/// A skeleton type: its class index, named keypoints and bone layout.
///
/// Definitions are immutable once built and shared through the
/// [`SkeletonRegistry`](super::SkeletonRegistry) as `Arc`s, so annotation
/// states can reference them without copying the name tables.
#[derive(Clone, Debug, PartialEq)]
pub struct SkeletonDefinition {
    class_index: ClassIndex,
    name: String,
    keypoints: Vec<String>,
    bones: Vec<(usize, usize)>,
    template: Option<Vec<Coord<Pixel>>>,
}

impl SkeletonDefinition {
    /// Creates a definition, checking that keypoint names are unique and
    /// non-empty and that every bone references existing keypoints.
    pub fn new(
        class_index: impl Into<ClassIndex>,
        name: impl Into<String>,
        keypoints: Vec<String>,
        bones: Vec<(usize, usize)>,
    ) -> Result<Self, PoseError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(invalid("skeleton name must not be empty"));
        }
        if keypoints.is_empty() {
            return Err(invalid(format!("skeleton '{name}' has no keypoints")));
        }

        for (idx, keypoint) in keypoints.iter().enumerate() {
            if keypoint.trim().is_empty() {
                return Err(invalid(format!(
                    "skeleton '{name}' has an empty keypoint name at index {idx}"
                )));
            }
            if keypoints[..idx].contains(keypoint) {
                return Err(invalid(format!(
                    "skeleton '{name}' repeats keypoint '{keypoint}'"
                )));
            }
        }

        for &(a, b) in &bones {
            if a >= keypoints.len() || b >= keypoints.len() {
                return Err(invalid(format!(
                    "skeleton '{name}' has bone ({a}, {b}) outside {} keypoint(s)",
                    keypoints.len()
                )));
            }
        }

        Ok(Self {
            class_index: class_index.into(),
            name,
            keypoints,
            bones,
            template: None,
        })
    }

    /// Creates a definition with bones given as pairs of keypoint names.
    pub fn with_named_bones(
        class_index: impl Into<ClassIndex>,
        name: impl Into<String>,
        keypoints: &[&str],
        bones: &[(&str, &str)],
    ) -> Result<Self, PoseError> {
        let name = name.into();
        let keypoints: Vec<String> = keypoints.iter().map(|k| k.to_string()).collect();
        let bones = resolve_bones(&name, &keypoints, bones.iter().copied())?;
        Self::new(class_index, name, keypoints, bones)
    }

    /// Attaches a default pose: one pixel offset per keypoint, relative to
    /// the image centre.
    pub fn with_template(mut self, offsets: Vec<(f64, f64)>) -> Result<Self, PoseError> {
        if offsets.len() != self.keypoints.len() {
            return Err(invalid(format!(
                "skeleton '{}' template has {} offset(s) for {} keypoint(s)",
                self.name,
                offsets.len(),
                self.keypoints.len()
            )));
        }
        self.template = Some(offsets.into_iter().map(|(x, y)| Coord::new(x, y)).collect());
        Ok(self)
    }

    pub fn class_index(&self) -> ClassIndex {
        self.class_index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keypoints(&self) -> &[String] {
        &self.keypoints
    }

    pub fn keypoint_count(&self) -> usize {
        self.keypoints.len()
    }

    pub fn keypoint_index(&self, name: &str) -> Option<usize> {
        self.keypoints.iter().position(|k| k == name)
    }

    pub fn bones(&self) -> &[(usize, usize)] {
        &self.bones
    }

    /// Offsets from the image centre for each keypoint, if a template is set.
    pub fn template(&self) -> Option<&[Coord<Pixel>]> {
        self.template.as_deref()
    }
}

/// Maps name pairs to index pairs, failing on names the skeleton lacks.
pub(crate) fn resolve_bones<'a>(
    skeleton: &str,
    keypoints: &[String],
    bones: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Vec<(usize, usize)>, PoseError> {
    let index_of = |name: &str| {
        keypoints.iter().position(|k| k == name).ok_or_else(|| {
            invalid(format!(
                "skeleton '{skeleton}' bone references unknown keypoint '{name}'"
            ))
        })
    };

    bones
        .into_iter()
        .map(|(a, b)| Ok((index_of(a)?, index_of(b)?)))
        .collect()
}

fn invalid(message: impl Into<String>) -> PoseError {
    PoseError::RegistryInvalid {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keypoint_lookup_by_name() {
        let def = SkeletonDefinition::new(2u32, "Pistol", names(&["grip", "muzzle"]), vec![(0, 1)])
            .expect("valid definition");
        assert_eq!(def.keypoint_count(), 2);
        assert_eq!(def.keypoint_index("muzzle"), Some(1));
        assert_eq!(def.keypoint_index("stock"), None);
    }

    #[test]
    fn rejects_duplicate_keypoints() {
        let err = SkeletonDefinition::new(0u32, "Bad", names(&["a", "b", "a"]), vec![]).unwrap_err();
        assert!(matches!(err, PoseError::RegistryInvalid { .. }));
    }

    #[test]
    fn rejects_bones_out_of_range() {
        let err = SkeletonDefinition::new(0u32, "Bad", names(&["a", "b"]), vec![(0, 2)]).unwrap_err();
        assert!(matches!(err, PoseError::RegistryInvalid { .. }));
    }

    #[test]
    fn named_bones_resolve_to_indices() {
        let def = SkeletonDefinition::with_named_bones(
            0u32,
            "Line",
            &["start", "middle", "end"],
            &[("start", "middle"), ("middle", "end")],
        )
        .expect("valid definition");
        assert_eq!(def.bones(), &[(0, 1), (1, 2)]);

        let err = SkeletonDefinition::with_named_bones(0u32, "Line", &["a"], &[("a", "zzz")])
            .unwrap_err();
        assert!(err.to_string().contains("zzz"));
    }

    #[test]
    fn template_must_match_keypoint_count() {
        let def = SkeletonDefinition::new(0u32, "Pair", names(&["a", "b"]), vec![]).expect("valid");
        assert!(def.clone().with_template(vec![(0.0, 0.0)]).is_err());

        let def = def
            .with_template(vec![(-10.0, 0.0), (10.0, 5.0)])
            .expect("matching template");
        let template = def.template().expect("template set");
        assert_eq!(template[1].x, 10.0);
        assert_eq!(template[1].y, 5.0);
    }
}
