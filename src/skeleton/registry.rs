//! The table of skeleton types known to a session.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::definition::{resolve_bones, SkeletonDefinition};
use crate::annotation::ClassIndex;
use crate::error::PoseError;

const LMG_KEYPOINTS: [&str; 8] = [
    "butt",
    "pistol grip",
    "trigger",
    "cover",
    "rear sight",
    "barrel jacket",
    "left bipod",
    "right bipod",
];

const LMG_BONES: [(&str, &str); 7] = [
    ("butt", "cover"),
    ("cover", "pistol grip"),
    ("cover", "trigger"),
    ("cover", "rear sight"),
    ("rear sight", "barrel jacket"),
    ("barrel jacket", "left bipod"),
    ("barrel jacket", "right bipod"),
];

const LMG_TEMPLATE: [(f64, f64); 8] = [
    (-100.0, 0.0),
    (-50.0, 50.0),
    (0.0, 20.0),
    (0.0, 0.0),
    (50.0, -30.0),
    (100.0, 0.0),
    (150.0, 50.0),
    (150.0, -50.0),
];

const RIFLE_KEYPOINTS: [&str; 6] = [
    "butt",
    "rear sight",
    "pistol grip",
    "trigger",
    "front handguard",
    "barrel",
];

const RIFLE_BONES: [(&str, &str); 5] = [
    ("butt", "rear sight"),
    ("rear sight", "pistol grip"),
    ("rear sight", "trigger"),
    ("rear sight", "front handguard"),
    ("front handguard", "barrel"),
];

const RIFLE_TEMPLATE: [(f64, f64); 6] = [
    (-100.0, 0.0),
    (-50.0, -30.0),
    (-10.0, 50.0),
    (0.0, 20.0),
    (50.0, 0.0),
    (100.0, 0.0),
];

/// Skeleton definitions keyed by class index.
///
/// Lookups by class index drive decoding; lookups by name drive the
/// skeleton picker. Both keys are unique within a registry.
#[derive(Clone, Debug, Default)]
pub struct SkeletonRegistry {
    by_class: BTreeMap<ClassIndex, Arc<SkeletonDefinition>>,
}

impl SkeletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in registry: `LMG` (class 0) and `Rifle` (class 1).
    ///
    /// # Panics
    ///
    /// If the built-in tables are inconsistent.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for def in builtin_definitions() {
            let def = def.expect("built-in skeleton tables are well formed");
            registry
                .register(def)
                .expect("built-in skeletons use distinct classes and names");
        }
        registry
    }

    /// Adds a definition, rejecting duplicate class indices or names.
    pub fn register(
        &mut self,
        definition: SkeletonDefinition,
    ) -> Result<Arc<SkeletonDefinition>, PoseError> {
        if let Some(existing) = self.by_class.get(&definition.class_index()) {
            return Err(PoseError::RegistryInvalid {
                message: format!(
                    "class index {} is used by both '{}' and '{}'",
                    definition.class_index(),
                    existing.name(),
                    definition.name()
                ),
            });
        }
        if self.by_name(definition.name()).is_some() {
            return Err(PoseError::RegistryInvalid {
                message: format!("skeleton name '{}' is registered twice", definition.name()),
            });
        }

        let definition = Arc::new(definition);
        self.by_class
            .insert(definition.class_index(), Arc::clone(&definition));
        Ok(definition)
    }

    pub fn get(&self, class_index: ClassIndex) -> Option<&Arc<SkeletonDefinition>> {
        self.by_class.get(&class_index)
    }

    /// Resolves a class index, failing with `UnknownClassIndex`.
    pub fn resolve(&self, class_index: ClassIndex) -> Result<&Arc<SkeletonDefinition>, PoseError> {
        self.get(class_index)
            .ok_or(PoseError::UnknownClassIndex(class_index))
    }

    /// Case-insensitive lookup by skeleton name.
    pub fn by_name(&self, name: &str) -> Option<&Arc<SkeletonDefinition>> {
        self.by_class
            .values()
            .find(|def| def.name().eq_ignore_ascii_case(name))
    }

    /// Definitions in class-index order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SkeletonDefinition>> {
        self.by_class.values()
    }

    pub fn len(&self) -> usize {
        self.by_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }
}

fn builtin_definitions() -> [Result<SkeletonDefinition, PoseError>; 2] {
    [
        SkeletonDefinition::with_named_bones(0u32, "LMG", &LMG_KEYPOINTS, &LMG_BONES)
            .and_then(|def| def.with_template(LMG_TEMPLATE.to_vec())),
        SkeletonDefinition::with_named_bones(1u32, "Rifle", &RIFLE_KEYPOINTS, &RIFLE_BONES)
            .and_then(|def| def.with_template(RIFLE_TEMPLATE.to_vec())),
    ]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryYaml {
    skeletons: Vec<SkeletonYaml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SkeletonYaml {
    name: String,
    class_index: u32,
    keypoints: Vec<String>,
    #[serde(default)]
    bones: Vec<(String, String)>,
    #[serde(default)]
    template: Option<Vec<(f64, f64)>>,
}

/// Reads a skeleton registry from a YAML file.
///
/// ```yaml
/// skeletons:
///   - name: Rifle
///     class_index: 1
///     keypoints: [butt, rear sight, pistol grip, trigger, front handguard, barrel]
///     bones: [[butt, rear sight], [rear sight, trigger]]
///     template: [[-100, 0], [-50, -30], [-10, 50], [0, 20], [50, 0], [100, 0]]
/// ```
pub fn read_registry_yaml(path: &Path) -> Result<SkeletonRegistry, PoseError> {
    let data = fs::read_to_string(path).map_err(PoseError::Io)?;
    let parsed: RegistryYaml =
        serde_yaml::from_str(&data).map_err(|source| PoseError::RegistryParse {
            path: path.to_path_buf(),
            source,
        })?;
    registry_from_yaml(parsed)
}

/// Parses a skeleton registry from YAML text. Useful for testing without
/// file I/O.
pub fn registry_from_yaml_str(yaml: &str) -> Result<SkeletonRegistry, PoseError> {
    let parsed: RegistryYaml =
        serde_yaml::from_str(yaml).map_err(|source| PoseError::RegistryParse {
            path: "<string>".into(),
            source,
        })?;
    registry_from_yaml(parsed)
}

fn registry_from_yaml(parsed: RegistryYaml) -> Result<SkeletonRegistry, PoseError> {
    if parsed.skeletons.is_empty() {
        return Err(PoseError::RegistryInvalid {
            message: "registry defines no skeletons".to_string(),
        });
    }

    let mut registry = SkeletonRegistry::new();
    for entry in parsed.skeletons {
        let bones = resolve_bones(
            &entry.name,
            &entry.keypoints,
            entry.bones.iter().map(|(a, b)| (a.as_str(), b.as_str())),
        )?;
        let mut def = SkeletonDefinition::new(entry.class_index, entry.name, entry.keypoints, bones)?;
        if let Some(template) = entry.template {
            def = def.with_template(template)?;
        }
        registry.register(def)?;
    }
    Ok(registry)
}
