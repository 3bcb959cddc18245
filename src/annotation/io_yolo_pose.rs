//! YOLO-pose label lines and label files.
//!
//! A label file holds one record per skeleton instance on the image:
//!
//! ```text
//! <class> <cx> <cy> <w> <h> <px1> <py1> ... <pxn> <pyn>          (xy)
//! <class> <cx> <cy> <w> <h> <px1> <py1> <v1> ... <pxn> <pyn> <vn> (xyv)
//! ```
//!
//! All geometry is normalized by the image size. Arity is fixed by the
//! skeleton: absent keypoints are written as zeros rather than omitted.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    AnnotationState, BBoxXYXY, ClassIndex, Coord, ImageKey, Keypoint, Normalized,
    SkeletonInstance, Visibility,
};
use crate::error::PoseError;
use crate::skeleton::SkeletonRegistry;

/// Number of fractional digits written.
pub const PRECISION: usize = 6;

/// Written for the x of a labeled keypoint that would otherwise print as
/// `0 0`, which reads back as absent in the `xy` format.
const ORIGIN_X: &str = "0.000001";

const HEADER_TOKENS: usize = 5;

/// How keypoints are laid out after the box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeypointFormat {
    /// `px py` per keypoint; `0 0` marks an absent keypoint.
    #[default]
    Xy,
    /// `px py v` per keypoint with YOLO-pose visibility flags.
    Xyv,
}

impl KeypointFormat {
    /// Tokens written per keypoint.
    pub fn stride(self) -> usize {
        match self {
            KeypointFormat::Xy => 2,
            KeypointFormat::Xyv => 3,
        }
    }

    /// Total tokens in a record for a skeleton with `keypoints` keypoints.
    pub fn record_len(self, keypoints: usize) -> usize {
        HEADER_TOKENS + self.stride() * keypoints
    }
}

impl FromStr for KeypointFormat {
    type Err = PoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xy" => Ok(KeypointFormat::Xy),
            "xyv" => Ok(KeypointFormat::Xyv),
            other => Err(PoseError::UnsupportedFormat(format!(
                "'{}' (supported: xy, xyv)",
                other
            ))),
        }
    }
}

/// Encoder/decoder for YOLO-pose records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct YoloPoseCodec {
    format: KeypointFormat,
}

impl Default for YoloPoseCodec {
    fn default() -> Self {
        Self::new(KeypointFormat::default())
    }
}

impl YoloPoseCodec {
    pub fn new(format: KeypointFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> KeypointFormat {
        self.format
    }

    /// Encodes `state` as one record per instance, joined by newlines and
    /// without a trailing newline. A single-instance state gives one line.
    ///
    /// Instances without a skeleton, or with neither a box nor a labeled
    /// keypoint, are skipped.
    ///
    /// # Errors
    /// - `IncompleteAnnotation` if keypoints are labeled but the box is unset;
    /// - `EmptyAnnotation` if no instance is left to write;
    /// - `InvalidImageDimensions` for a zero-sized image.
    pub fn encode(
        &self,
        state: &AnnotationState,
        image_width: u32,
        image_height: u32,
    ) -> Result<String, PoseError> {
        let (w, h) = checked_dimensions(image_width, image_height)?;

        let mut lines = Vec::with_capacity(state.instance_count());
        for instance in state.instances() {
            if let Some(line) = self.encode_instance(state.image(), instance, w, h)? {
                lines.push(line);
            }
        }
        if lines.is_empty() {
            return Err(PoseError::EmptyAnnotation {
                image: state.image().to_string(),
            });
        }
        Ok(lines.join("\n"))
    }

    fn encode_instance(
        &self,
        image: &ImageKey,
        instance: &SkeletonInstance,
        w: f64,
        h: f64,
    ) -> Result<Option<String>, PoseError> {
        let Some(class_index) = instance.class_index() else {
            return Ok(None);
        };
        let bbox = match instance.bbox() {
            Some(bbox) => bbox.to_normalized(w, h),
            None if instance.has_labeled() => {
                return Err(PoseError::IncompleteAnnotation {
                    image: image.to_string(),
                })
            }
            None => return Ok(None),
        };

        let (cx, cy, bw, bh) = bbox.to_cxcywh();
        let mut tokens = Vec::with_capacity(self.format.record_len(instance.keypoint_count()));
        tokens.push(class_index.to_string());
        for value in [cx, cy, bw, bh] {
            tokens.push(number(value));
        }

        for keypoint in instance.keypoints() {
            let written = match (self.format, keypoint) {
                (KeypointFormat::Xy, Keypoint::Labeled(p)) => Some(p),
                (KeypointFormat::Xy, _) => None,
                (KeypointFormat::Xyv, Keypoint::Placed(p) | Keypoint::Labeled(p)) => Some(p),
                (KeypointFormat::Xyv, Keypoint::Absent) => None,
            };
            match written {
                Some(p) => {
                    let norm = p.to_normalized(w, h);
                    let (x, y) = (number(norm.x), number(norm.y));
                    if self.format == KeypointFormat::Xy && x == "0" && y == "0" {
                        tokens.push(ORIGIN_X.to_string());
                    } else {
                        tokens.push(x);
                    }
                    tokens.push(y);
                }
                None => {
                    tokens.push("0".to_string());
                    tokens.push("0".to_string());
                }
            }
            if self.format == KeypointFormat::Xyv {
                tokens.push(keypoint.visibility().as_flag().to_string());
            }
        }

        Ok(Some(tokens.join(" ")))
    }

    /// Decodes one record into a clean single-instance state for `image`.
    pub fn decode(
        &self,
        image: impl Into<ImageKey>,
        text: &str,
        registry: &SkeletonRegistry,
        image_width: u32,
        image_height: u32,
    ) -> Result<AnnotationState, PoseError> {
        let instance = self.decode_instance(text, registry, image_width, image_height)?;
        Ok(AnnotationState::from_instances(image, vec![instance]))
    }

    /// Decodes one record into a skeleton instance.
    ///
    /// The skeleton is resolved from the class index, then the token count
    /// is checked against that skeleton.
    pub fn decode_instance(
        &self,
        text: &str,
        registry: &SkeletonRegistry,
        image_width: u32,
        image_height: u32,
    ) -> Result<SkeletonInstance, PoseError> {
        let (w, h) = checked_dimensions(image_width, image_height)?;

        let mut tokens = text.split_whitespace();
        let class_token = tokens.next().ok_or_else(|| malformed("empty record"))?;
        let class_index = class_token.parse::<u32>().map(ClassIndex).map_err(|_| {
            malformed(format!(
                "invalid class index '{class_token}'; expected non-negative integer"
            ))
        })?;
        let skeleton = registry.resolve(class_index)?;

        // Take one past the expected length so oversized records are detected
        // without collecting pathological inputs.
        let expected = self.format.record_len(skeleton.keypoint_count());
        let rest: Vec<&str> = tokens.take(expected).collect();
        if rest.len() + 1 != expected {
            let found = if rest.len() + 1 > expected {
                "more".to_string()
            } else {
                (rest.len() + 1).to_string()
            };
            return Err(malformed(format!(
                "class {} ({}) needs {} tokens, found {}",
                class_index,
                skeleton.name(),
                expected,
                found
            )));
        }

        let values = rest
            .iter()
            .enumerate()
            .map(|(idx, raw)| parse_value(raw, idx + 1))
            .collect::<Result<Vec<f64>, PoseError>>()?;

        let bbox = BBoxXYXY::<Normalized>::from_cxcywh(values[0], values[1], values[2], values[3])
            .to_pixel(w, h);
        let keypoints = values[HEADER_TOKENS - 1..]
            .chunks_exact(self.format.stride())
            .map(|chunk| self.decode_keypoint(chunk, w, h))
            .collect::<Result<Vec<Keypoint>, PoseError>>()?;

        SkeletonInstance::from_parts(Arc::clone(skeleton), keypoints, Some(bbox))
    }

    /// Decodes the contents of a whole label file, one instance per record.
    ///
    /// Blank lines are ignored. Returns `Ok(None)` when the file holds no
    /// record. The first failing record fails the whole document.
    pub fn decode_document(
        &self,
        image: impl Into<ImageKey>,
        text: &str,
        registry: &SkeletonRegistry,
        image_width: u32,
        image_height: u32,
    ) -> Result<Option<AnnotationState>, PoseError> {
        let instances = records(text)
            .map(|(_, line)| self.decode_instance(line, registry, image_width, image_height))
            .collect::<Result<Vec<_>, PoseError>>()?;
        if instances.is_empty() {
            return Ok(None);
        }
        Ok(Some(AnnotationState::from_instances(image, instances)))
    }

    fn decode_keypoint(&self, chunk: &[f64], w: f64, h: f64) -> Result<Keypoint, PoseError> {
        let norm: Coord<Normalized> = Coord::new(chunk[0], chunk[1]);
        let pixel = norm.to_pixel(w, h);

        match self.format {
            KeypointFormat::Xy => {
                // Older label files mark missing keypoints with -1 -1.
                if norm.x < 0.0 || norm.y < 0.0 || (norm.x == 0.0 && norm.y == 0.0) {
                    Ok(Keypoint::Absent)
                } else {
                    Ok(Keypoint::Labeled(pixel))
                }
            }
            KeypointFormat::Xyv => {
                let flag = chunk[2];
                let visibility = (flag.fract() == 0.0 && (0.0..=2.0).contains(&flag))
                    .then(|| Visibility::from_flag(flag as u8))
                    .flatten()
                    .ok_or_else(|| malformed(format!("invalid visibility flag {flag}")))?;
                Ok(match visibility {
                    Visibility::Absent => Keypoint::Absent,
                    Visibility::Unlabeled => Keypoint::Placed(pixel),
                    Visibility::Labeled => Keypoint::Labeled(pixel),
                })
            }
        }
    }

}

fn number(value: f64) -> String {
    format_number(value, PRECISION)
}

/// Formats `value` with at most `precision` fractional digits, trimming
/// trailing zeros (`0.156250` becomes `0.15625`, `0.000000` becomes `0`).
pub fn format_number(value: f64, precision: usize) -> String {
    let mut out = format!("{:.*}", precision, value);
    if out.contains('.') {
        let trimmed = out.trim_end_matches('0').trim_end_matches('.').len();
        out.truncate(trimmed);
    }
    if out == "-0" {
        out = "0".to_string();
    }
    out
}

/// Outcome of [`write_label_file`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelWrite {
    /// The records were written.
    Written,
    /// The state has no labeled keypoint; any existing file was removed.
    Removed,
}

/// Reads the label file for `image`, if it exists.
///
/// Decode errors carry the file path and line number.
pub fn read_label_file(
    path: &Path,
    image: &ImageKey,
    registry: &SkeletonRegistry,
    image_width: u32,
    image_height: u32,
    codec: &YoloPoseCodec,
) -> Result<Option<AnnotationState>, PoseError> {
    if !path.is_file() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(PoseError::Io)?;
    let mut instances = Vec::new();
    for (line_num, line) in records(&content) {
        let instance = codec
            .decode_instance(line, registry, image_width, image_height)
            .map_err(|source| PoseError::LabelParse {
                path: path.to_path_buf(),
                line: line_num,
                source: Box::new(source),
            })?;
        instances.push(instance);
    }

    if instances.is_empty() {
        return Ok(None);
    }
    Ok(Some(AnnotationState::from_instances(image.clone(), instances)))
}

/// Writes `state` to `path`, or removes `path` when nothing is labeled.
///
/// Encoding happens before the file is touched, so a failed encode leaves
/// any existing file as it was.
pub fn write_label_file(
    path: &Path,
    state: &AnnotationState,
    image_width: u32,
    image_height: u32,
    codec: &YoloPoseCodec,
) -> Result<LabelWrite, PoseError> {
    if !state.is_annotated() {
        if path.is_file() {
            fs::remove_file(path).map_err(PoseError::Io)?;
        }
        return Ok(LabelWrite::Removed);
    }

    let line = codec.encode(state, image_width, image_height)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(PoseError::Io)?;
    }
    fs::write(path, format!("{line}\n")).map_err(PoseError::Io)?;
    Ok(LabelWrite::Written)
}

/// Reads the pixel size of an image from its header.
pub fn read_image_dimensions(path: &Path) -> Result<(u32, u32), PoseError> {
    let size = imagesize::size(path).map_err(|source| PoseError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| PoseError::DatasetLayoutInvalid {
            path: path.to_path_buf(),
            message: format!("image width {} does not fit in u32", size.width),
        })?;
    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| PoseError::DatasetLayoutInvalid {
            path: path.to_path_buf(),
            message: format!("image height {} does not fit in u32", size.height),
        })?;

    Ok((width, height))
}

/// Fuzz-only entrypoint for single-record decoding.
#[cfg(feature = "fuzzing")]
pub fn fuzz_decode_record(input: &str) -> Result<(), PoseError> {
    let registry = SkeletonRegistry::builtin();
    for format in [KeypointFormat::Xy, KeypointFormat::Xyv] {
        let _ = YoloPoseCodec::new(format).decode("<fuzz>", input, &registry, 640, 480);
    }
    Ok(())
}

/// Non-blank lines with their 1-based line numbers.
fn records(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx + 1, line))
}

fn parse_value(raw: &str, position: usize) -> Result<f64, PoseError> {
    let value = raw.parse::<f64>().map_err(|_| {
        malformed(format!(
            "invalid number '{raw}' at token {}; expected floating-point number",
            position + 1
        ))
    })?;
    if !value.is_finite() {
        return Err(malformed(format!(
            "non-finite number '{raw}' at token {}",
            position + 1
        )));
    }
    Ok(value)
}

fn checked_dimensions(width: u32, height: u32) -> Result<(f64, f64), PoseError> {
    if width == 0 || height == 0 {
        return Err(PoseError::InvalidImageDimensions { width, height });
    }
    Ok((f64::from(width), f64::from(height)))
}

fn malformed(message: impl Into<String>) -> PoseError {
    PoseError::MalformedRecord {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rifle_state() -> AnnotationState {
        let registry = SkeletonRegistry::builtin();
        let rifle = registry.by_name("Rifle").expect("rifle");
        let mut state = AnnotationState::with_skeleton("frame.jpg", Arc::clone(rifle));
        state.set_keypoint(0, 100.0, 100.0).unwrap();
        state.set_keypoint(1, 200.0, 150.0).unwrap();
        state
    }

    #[test]
    fn encode_matches_reference_line() {
        let line = YoloPoseCodec::default()
            .encode(&rifle_state(), 640, 480)
            .expect("encode");
        assert_eq!(
            line,
            "1 0.234375 0.260417 0.15625 0.104167 0.15625 0.208333 0.3125 0.3125 0 0 0 0 0 0 0 0"
        );
    }

    #[test]
    fn encode_xyv_writes_visibility_flags() {
        let mut state = rifle_state();
        state.place_template(640, 480);
        let line = YoloPoseCodec::new(KeypointFormat::Xyv)
            .encode(&state, 640, 480)
            .expect("encode");
        let tokens: Vec<&str> = line.split(' ').collect();
        assert_eq!(tokens.len(), 5 + 3 * 6);
        assert_eq!(&tokens[5..8], &["0.15625", "0.208333", "2"]);
        // pistol grip placed from the template at (310, 290)
        assert_eq!(&tokens[11..14], &["0.484375", "0.604167", "1"]);
    }

    #[test]
    fn encode_without_box_fails() {
        let registry = SkeletonRegistry::builtin();
        let rifle = registry.by_name("Rifle").expect("rifle");
        let mut keypoints = vec![Keypoint::Absent; 6];
        keypoints[0] = Keypoint::labeled(10.0, 10.0);
        let state =
            AnnotationState::from_parts("a.jpg", Arc::clone(rifle), keypoints, None).unwrap();

        let err = YoloPoseCodec::default().encode(&state, 640, 480).unwrap_err();
        assert!(matches!(err, PoseError::IncompleteAnnotation { .. }));
    }

    #[test]
    fn encode_empty_state_fails() {
        let err = YoloPoseCodec::default()
            .encode(&AnnotationState::new("a.jpg"), 640, 480)
            .unwrap_err();
        assert!(matches!(err, PoseError::EmptyAnnotation { .. }));
    }

    #[test]
    fn encode_rejects_zero_dimensions() {
        let err = YoloPoseCodec::default()
            .encode(&rifle_state(), 0, 480)
            .unwrap_err();
        assert!(matches!(err, PoseError::InvalidImageDimensions { .. }));
    }

    #[test]
    fn decode_reference_line() {
        let registry = SkeletonRegistry::builtin();
        let state = YoloPoseCodec::default()
            .decode(
                "frame.jpg",
                "1 0.234375 0.260417 0.15625 0.104167 0.15625 0.208333 0.3125 0.3125 0 0 0 0 0 0 0 0",
                &registry,
                640,
                480,
            )
            .expect("decode");

        assert_eq!(state.class_index(), Some(ClassIndex(1)));
        assert!(!state.is_dirty());
        assert_eq!(state.labeled_count(), 2);
        let p0 = state.keypoint(0).and_then(Keypoint::position).expect("labeled");
        assert!((p0.x - 100.0).abs() < 1.0 && (p0.y - 100.0).abs() < 1.0);
        assert_eq!(state.keypoint(5), Some(&Keypoint::Absent));
        let (cx, cy, w, h) = state.bbox().expect("box").to_cxcywh();
        assert!((cx - 150.0).abs() < 1e-3 && (cy - 125.0).abs() < 1e-3);
        assert!((w - 100.0).abs() < 1e-3 && (h - 50.0).abs() < 1e-3);
    }

    #[test]
    fn decode_treats_negative_pairs_as_absent() {
        let registry = SkeletonRegistry::builtin();
        let state = YoloPoseCodec::default()
            .decode(
                "a.jpg",
                "1 0.5 0.5 0.1 0.1 0.5 0.5 -1 -1 -1 -1 -1 -1 -1 -1 -1 -1",
                &registry,
                100,
                100,
            )
            .expect("decode");
        assert_eq!(state.labeled_count(), 1);
        assert!(!state.keypoint(1).expect("in range").is_present());
    }

    #[test]
    fn decode_rejects_wrong_arity() {
        let registry = SkeletonRegistry::builtin();
        let codec = YoloPoseCodec::default();
        let short = codec.decode("a.jpg", "1 0.5 0.5 0.1 0.1 0.2 0.2", &registry, 10, 10);
        assert!(matches!(short, Err(PoseError::MalformedRecord { .. })));

        let long = format!("1 0.5 0.5 0.1 0.1{}", " 0.1".repeat(13));
        let long = codec.decode("a.jpg", &long, &registry, 10, 10);
        assert!(matches!(long, Err(PoseError::MalformedRecord { .. })));
    }

    #[test]
    fn decode_rejects_unknown_class() {
        let registry = SkeletonRegistry::builtin();
        let err = YoloPoseCodec::default()
            .decode("a.jpg", "9 0.5 0.5 0.1 0.1", &registry, 10, 10)
            .unwrap_err();
        assert!(matches!(err, PoseError::UnknownClassIndex(ClassIndex(9))));
    }

    #[test]
    fn decode_rejects_garbage_tokens() {
        let registry = SkeletonRegistry::builtin();
        let codec = YoloPoseCodec::default();
        for bad in ["", "x 0.5", "-1 0.5", "1 0.5 nan 0.1 0.1 0 0 0 0 0 0 0 0 0 0 0 0"] {
            let err = codec.decode("a.jpg", bad, &registry, 10, 10).unwrap_err();
            assert!(
                matches!(err, PoseError::MalformedRecord { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn decode_xyv_rejects_bad_visibility() {
        let registry = SkeletonRegistry::builtin();
        let line = format!("1 0.5 0.5 0.1 0.1 0.5 0.5 3{}", " 0 0 0".repeat(5));
        let err = YoloPoseCodec::new(KeypointFormat::Xyv)
            .decode("a.jpg", &line, &registry, 10, 10)
            .unwrap_err();
        assert!(matches!(err, PoseError::MalformedRecord { .. }));
    }

    #[test]
    fn decode_document_handles_blank_and_multiple_records() {
        let registry = SkeletonRegistry::builtin();
        let codec = YoloPoseCodec::default();
        assert!(codec
            .decode_document("a.jpg", "\n  \n", &registry, 10, 10)
            .expect("blank file")
            .is_none());

        let rifle = "1 0.5 0.5 0.1 0.1 0.5 0.5 0 0 0 0 0 0 0 0 0 0";
        let lmg = "0 0.3 0.3 0.1 0.1 0 0 0 0 0 0 0.3 0.3 0 0 0 0 0 0 0 0";
        let state = codec
            .decode_document("a.jpg", &format!("{rifle}\n\n{lmg}\n"), &registry, 10, 10)
            .expect("two records")
            .expect("state");
        assert_eq!(state.instance_count(), 2);
        assert_eq!(state.class_index(), Some(ClassIndex(1)));
        assert_eq!(state.instances()[1].class_index(), Some(ClassIndex(0)));
        assert_eq!(state.instances()[1].labeled_count(), 1);
    }

    #[test]
    fn encode_writes_one_line_per_instance() {
        let registry = SkeletonRegistry::builtin();
        let mut state = rifle_state();
        state.add_instance(Arc::clone(registry.by_name("LMG").expect("lmg")));
        state.set_keypoint(3, 320.0, 240.0).unwrap();
        // an instance with nothing labeled is not written
        state.add_instance(Arc::clone(registry.by_name("Rifle").expect("rifle")));

        let text = YoloPoseCodec::default().encode(&state, 640, 480).expect("encode");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "1 0.234375 0.260417 0.15625 0.104167 0.15625 0.208333 0.3125 0.3125 0 0 0 0 0 0 0 0"
        );
        assert!(lines[1].starts_with("0 0.5 0.5 0 0 0 0 0 0 0 0 0.5 0.5 "));

        let restored = YoloPoseCodec::default()
            .decode_document("frame.jpg", &text, &registry, 640, 480)
            .expect("decode")
            .expect("state");
        assert_eq!(restored.instance_count(), 2);
    }

    #[test]
    fn labeled_origin_is_not_written_as_absent() {
        let registry = SkeletonRegistry::builtin();
        let mut state = rifle_state().with_image_size(640, 480);
        state.set_keypoint(2, -3.0, -8.0).unwrap();

        let codec = YoloPoseCodec::default();
        let line = codec.encode(&state, 640, 480).expect("encode");
        let tokens: Vec<&str> = line.split(' ').collect();
        assert_eq!(&tokens[9..11], &["0.000001", "0"]);

        let restored = codec
            .decode("frame.jpg", &line, &registry, 640, 480)
            .expect("decode");
        let grip = restored.keypoint(2).expect("in range");
        assert!(grip.is_labeled());
        let p = grip.position().expect("position");
        assert!(p.x < 1.0 && p.y == 0.0);
    }

    #[test]
    fn edge_keypoints_stay_in_unit_range() {
        let mut state = rifle_state().with_bbox_margin(20.0).with_image_size(640, 480);
        state.set_keypoint(0, -5.0, 100.0).unwrap();
        state.set_keypoint(1, 700.0, 150.0).unwrap();
        state.set_keypoint(5, 639.0, 479.0).unwrap();

        let line = YoloPoseCodec::default().encode(&state, 640, 480).expect("encode");
        for token in line.split(' ').skip(1) {
            let value: f64 = token.parse().expect("number");
            assert!((0.0..=1.0).contains(&value), "{token} in {line}");
        }

        let restored = YoloPoseCodec::default()
            .decode("frame.jpg", &line, &SkeletonRegistry::builtin(), 640, 480)
            .expect("decode");
        for index in [0, 1, 5] {
            assert!(restored.keypoint(index).expect("in range").is_labeled());
        }
    }

    #[test]
    fn format_number_trims_zeros() {
        assert_eq!(format_number(0.15625, 6), "0.15625");
        assert_eq!(format_number(0.2604166666, 6), "0.260417");
        assert_eq!(format_number(0.0, 6), "0");
        assert_eq!(format_number(-0.0000001, 6), "0");
        assert_eq!(format_number(1.0, 6), "1");
    }

    #[test]
    fn keypoint_format_parses_case_insensitively() {
        assert_eq!("XYV".parse::<KeypointFormat>().unwrap(), KeypointFormat::Xyv);
        assert!("xyz".parse::<KeypointFormat>().is_err());
    }

    #[test]
    fn label_file_write_then_read() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("labels/frame.txt");
        let registry = SkeletonRegistry::builtin();
        let codec = YoloPoseCodec::default();
        let state = rifle_state();

        let outcome = write_label_file(&path, &state, 640, 480, &codec).expect("write");
        assert_eq!(outcome, LabelWrite::Written);
        assert!(fs::read_to_string(&path).expect("read").ends_with('\n'));

        let key = ImageKey::new("frame.jpg");
        let restored = read_label_file(&path, &key, &registry, 640, 480, &codec)
            .expect("read")
            .expect("record present");
        assert_eq!(restored.labeled_count(), 2);

        let mut cleared = state.clone();
        cleared.add_instance(Arc::clone(registry.by_name("LMG").expect("lmg")));
        cleared.reset();
        let outcome = write_label_file(&path, &cleared, 640, 480, &codec).expect("remove");
        assert_eq!(outcome, LabelWrite::Removed);
        assert!(!path.exists());
        assert!(read_label_file(&path, &key, &registry, 640, 480, &codec)
            .expect("missing file is not an error")
            .is_none());
    }

    #[test]
    fn read_label_file_reports_line_numbers() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("bad.txt");
        fs::write(&path, "\n\n1 0.5 0.5\n").expect("write label");

        let err = read_label_file(
            &path,
            &ImageKey::new("bad.jpg"),
            &SkeletonRegistry::builtin(),
            10,
            10,
            &YoloPoseCodec::default(),
        )
        .unwrap_err();
        match err {
            PoseError::LabelParse { line, source, .. } => {
                assert_eq!(line, 3);
                assert!(matches!(*source, PoseError::MalformedRecord { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
