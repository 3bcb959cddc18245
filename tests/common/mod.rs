#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use posemark::config::SessionConfig;
use posemark::session::DatasetSession;
use posemark::skeleton::SkeletonRegistry;

/// The Rifle reference record for keypoints (100,100) and (200,150) at 640x480.
pub const RIFLE_REFERENCE_LINE: &str =
    "1 0.234375 0.260417 0.15625 0.104167 0.15625 0.208333 0.3125 0.3125 0 0 0 0 0 0 0 0";

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// A throwaway dataset: `images/` with the given 640x480 BMPs and an empty
/// `labels/` folder.
pub struct Fixture {
    pub temp: tempfile::TempDir,
}

impl Fixture {
    pub fn new(image_names: &[&str]) -> Self {
        let temp = tempfile::tempdir().expect("create temp dir");
        for name in image_names {
            write_bmp(&temp.path().join("images").join(name), 640, 480);
        }
        fs::create_dir_all(temp.path().join("labels")).expect("create labels dir");
        Self { temp }
    }

    pub fn images(&self) -> PathBuf {
        self.temp.path().join("images")
    }

    pub fn labels(&self) -> PathBuf {
        self.temp.path().join("labels")
    }

    pub fn label(&self, name: &str) -> PathBuf {
        self.labels().join(name)
    }

    pub fn write_label(&self, name: &str, content: &str) {
        let path = self.label(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(path, content).expect("write label file");
    }

    pub fn read_label(&self, name: &str) -> String {
        fs::read_to_string(self.label(name)).expect("read label file")
    }

    /// Opens the fixture with the built-in skeletons and `labels/` as the
    /// save folder.
    pub fn open(&self, config: SessionConfig) -> DatasetSession {
        let mut session = DatasetSession::open(
            &self.images(),
            Arc::new(SkeletonRegistry::builtin()),
            config,
        )
        .expect("open session");
        session.set_save_dir(self.labels());
        session
    }
}
