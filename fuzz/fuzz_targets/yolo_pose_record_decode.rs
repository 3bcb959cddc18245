//! Fuzz target for YOLO-pose record decoding.
//!
//! Feeds arbitrary UTF-8 records to the decoder in both keypoint formats,
//! against the built-in skeletons.

#![no_main]

use libfuzzer_sys::fuzz_target;
use posemark::annotation::io_yolo_pose::fuzz_decode_record;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(record) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_decode_record(record);
});
