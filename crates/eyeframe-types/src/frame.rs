use std::{fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Which eye a frame was captured for.
///
/// `Od` (oculus dexter) is the primary side and the default tag; `Oe` is the
/// secondary side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EyeSide {
    #[default]
    #[serde(rename = "OD")]
    Od,
    #[serde(rename = "OE")]
    Oe,
}

impl EyeSide {
    pub const fn code(self) -> &'static str {
        match self {
            EyeSide::Od => "OD",
            EyeSide::Oe => "OE",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            EyeSide::Od => EyeSide::Oe,
            EyeSide::Oe => EyeSide::Od,
        }
    }
}

impl fmt::Display for EyeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for EyeSide {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OD" => Ok(EyeSide::Od),
            "OE" => Ok(EyeSide::Oe),
            other => Err(format!("unknown eye side '{other}' (expected OD or OE)")),
        }
    }
}

/// Identifier assigned to a frame at capture time.
pub type FrameId = u64;

/// A still image sampled from the playing video.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: FrameId,
    /// Lossless PNG payload at the video's native resolution.
    pub image: Arc<[u8]>,
    pub file_name: String,
    pub captured_at: DateTime<Utc>,
    pub selected: bool,
    eye_side: EyeSide,
}

impl Frame {
    pub fn new(id: FrameId, eye_side: EyeSide, image: Vec<u8>, captured_at: DateTime<Utc>) -> Self {
        Self {
            id,
            image: image.into(),
            file_name: frame_file_name(id, eye_side),
            captured_at,
            selected: false,
            eye_side,
        }
    }

    /// Tag recorded at capture time. There is no setter.
    pub fn eye_side(&self) -> EyeSide {
        self.eye_side
    }

    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            id: self.id,
            file_name: self.file_name.clone(),
            eye_side: self.eye_side,
            taken_at: self.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

pub fn frame_file_name(id: FrameId, eye_side: EyeSide) -> String {
    format!("frame_{}_{}.png", id, eye_side.code())
}

/// One record of the archive manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: FrameId,
    pub file_name: String,
    pub eye_side: EyeSide,
    pub taken_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_uses_id_and_side_code() {
        assert_eq!(frame_file_name(0, EyeSide::Od), "frame_0_OD.png");
        assert_eq!(frame_file_name(17, EyeSide::Oe), "frame_17_OE.png");
    }

    #[test]
    fn parse_eye_side_case_insensitive() {
        assert_eq!("od".parse::<EyeSide>().unwrap(), EyeSide::Od);
        assert_eq!(" OE ".parse::<EyeSide>().unwrap(), EyeSide::Oe);
        assert!("left".parse::<EyeSide>().is_err());
        assert_eq!(EyeSide::Od.toggled(), EyeSide::Oe);
        assert_eq!(EyeSide::Oe.toggled(), EyeSide::Od);
    }

    #[test]
    fn manifest_entry_serializes_with_wire_names() {
        let taken = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let frame = Frame::new(3, EyeSide::Oe, vec![1, 2, 3], taken);
        let value = serde_json::to_value(frame.manifest_entry()).expect("serialize entry");
        assert_eq!(value["id"], 3);
        assert_eq!(value["fileName"], "frame_3_OE.png");
        assert_eq!(value["eyeSide"], "OE");
        assert_eq!(value["takenAt"], "2024-03-01T12:30:05.000Z");
        assert!(!frame.selected);
    }
}
