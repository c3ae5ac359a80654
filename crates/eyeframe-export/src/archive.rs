use std::io::{Cursor, Write};

use eyeframe_types::{
    frame::{EyeSide, Frame, ManifestEntry},
    Result,
};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::export_error;

/// Manifest body: one entry per frame, in export-set order.
pub fn manifest_json(frames: &[Frame]) -> Result<Vec<u8>> {
    let entries: Vec<ManifestEntry> = frames.iter().map(Frame::manifest_entry).collect();
    serde_json::to_vec_pretty(&entries)
        .map_err(|err| export_error(format!("manifest serialization failed: {err}")))
}

/// Package frames into a zip with one folder per eye side and a root manifest.
///
/// Folders are only created for sides that have frames.
pub fn build_archive(frames: &[Frame], manifest_name: &str) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    // PNG payloads are already compressed.
    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for side in [EyeSide::Od, EyeSide::Oe] {
        let members: Vec<&Frame> = frames.iter().filter(|f| f.eye_side() == side).collect();
        if members.is_empty() {
            continue;
        }
        writer
            .add_directory(format!("{}/", side.code()), stored)
            .map_err(zip_error)?;
        for frame in members {
            writer
                .start_file(format!("{}/{}", side.code(), frame.file_name), stored)
                .map_err(zip_error)?;
            writer
                .write_all(&frame.image)
                .map_err(|err| export_error(format!("archive write failed: {err}")))?;
        }
    }

    writer
        .start_file(manifest_name, deflated)
        .map_err(zip_error)?;
    writer
        .write_all(&manifest_json(frames)?)
        .map_err(|err| export_error(format!("archive write failed: {err}")))?;

    let cursor = writer.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

fn zip_error(err: zip::result::ZipError) -> eyeframe_types::EyeframeError {
    export_error(format!("archive packaging failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Read;
    use zip::ZipArchive;

    fn frame(id: u64, side: EyeSide, second: u32) -> Frame {
        let at = Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, second).unwrap();
        Frame::new(id, side, vec![id as u8; 16], at)
    }

    fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
        let mut file = archive.by_name(name).expect("entry present");
        let mut out = Vec::new();
        file.read_to_end(&mut out).expect("read entry");
        out
    }

    #[test]
    fn archive_partitions_by_eye_side_with_manifest() {
        let frames = vec![frame(4, EyeSide::Oe, 2), frame(1, EyeSide::Od, 1)];
        let bytes = build_archive(&frames, "frames_info.json").expect("build archive");
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open archive");

        assert_eq!(read_entry(&mut archive, "OD/frame_1_OD.png"), vec![1u8; 16]);
        assert_eq!(read_entry(&mut archive, "OE/frame_4_OE.png"), vec![4u8; 16]);

        let manifest: serde_json::Value =
            serde_json::from_slice(&read_entry(&mut archive, "frames_info.json"))
                .expect("manifest json");
        let entries = manifest.as_array().expect("manifest array");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["id"], 4);
        assert_eq!(entries[0]["fileName"], "frame_4_OE.png");
        assert_eq!(entries[0]["eyeSide"], "OE");
        assert_eq!(entries[0]["takenAt"], "2024-02-02T10:00:02.000Z");
        assert_eq!(entries[1]["id"], 1);
        assert_eq!(entries[1]["eyeSide"], "OD");
    }

    #[test]
    fn single_side_produces_single_folder() {
        let frames = vec![
            frame(0, EyeSide::Od, 0),
            frame(1, EyeSide::Od, 1),
            frame(2, EyeSide::Od, 2),
        ];
        let bytes = build_archive(&frames, "frames_info.json").expect("build archive");
        let archive = ZipArchive::new(Cursor::new(bytes)).expect("open archive");
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "OD/",
                "OD/frame_0_OD.png",
                "OD/frame_1_OD.png",
                "OD/frame_2_OD.png",
                "frames_info.json",
            ]
        );
    }
}
