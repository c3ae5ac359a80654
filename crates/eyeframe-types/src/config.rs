use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{frame::EyeSide, EyeframeError, Result};

pub const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 500;
pub const DEFAULT_ARCHIVE_NAME: &str = "frames_selecionados.zip";
pub const DEFAULT_MANIFEST_NAME: &str = "frames_info.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub interval_ms: u64,
    pub mute: bool,
    pub default_eye: EyeSide,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_CAPTURE_INTERVAL_MS,
            mute: true,
            default_eye: EyeSide::Od,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: String,
    pub archive_name: String,
    pub manifest_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: "exports".into(),
            archive_name: DEFAULT_ARCHIVE_NAME.into(),
            manifest_name: DEFAULT_MANIFEST_NAME.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EyeframeConfig {
    pub capture: CaptureConfig,
    pub media: MediaConfig,
    pub export: ExportConfig,
    pub ops: OpsConfig,
}

impl EyeframeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            EyeframeError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            EyeframeError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.interval_ms == 0 {
            return Err(EyeframeError::Configuration(
                "capture.interval_ms must be greater than zero".into(),
            ));
        }
        if self.export.archive_name.trim().is_empty() {
            return Err(EyeframeError::Configuration(
                "export.archive_name must not be empty".into(),
            ));
        }
        if !self.export.archive_name.ends_with(".zip") {
            return Err(EyeframeError::Configuration(
                "export.archive_name must end with .zip".into(),
            ));
        }
        if self.export.manifest_name.trim().is_empty() {
            return Err(EyeframeError::Configuration(
                "export.manifest_name must not be empty".into(),
            ));
        }
        if !self.export.manifest_name.ends_with(".json") {
            return Err(EyeframeError::Configuration(
                "export.manifest_name must end with .json".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_eyeframe_config_from_file() {
        let temp_path = std::env::temp_dir().join("eyeframe-config-test.toml");
        let mut config = EyeframeConfig::default();
        config.capture.interval_ms = 250;
        config.capture.default_eye = EyeSide::Oe;
        config.media.ffmpeg_path = Some("/usr/local/bin/ffmpeg".into());
        config.export.output_dir = "out".into();
        config.ops.log_level = "debug".into();

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = EyeframeConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.capture.interval_ms, 250);
        assert_eq!(loaded.capture.default_eye, EyeSide::Oe);
        assert_eq!(loaded.media.ffmpeg_path.as_deref(), Some("/usr/local/bin/ffmpeg"));
        assert_eq!(loaded.export.archive_name, DEFAULT_ARCHIVE_NAME);
        assert_eq!(loaded.ops.log_level, "debug");
        fs::remove_file(&temp_path).expect("cleanup temp config");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let loaded: EyeframeConfig = toml::from_str(
            r#"
            [capture]
            default_eye = "OE"
            "#,
        )
        .expect("parse partial config");
        assert_eq!(loaded.capture.interval_ms, DEFAULT_CAPTURE_INTERVAL_MS);
        assert_eq!(loaded.capture.default_eye, EyeSide::Oe);
        assert!(loaded.capture.mute);
        assert_eq!(loaded.export.manifest_name, DEFAULT_MANIFEST_NAME);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn bundled_sample_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/eyeframe.toml");
        let loaded = EyeframeConfig::from_file(path).expect("load sample config");
        assert!(loaded.validate().is_ok());
        assert_eq!(loaded.capture.interval_ms, DEFAULT_CAPTURE_INTERVAL_MS);
        assert!(loaded.media.ffmpeg_path.is_none());
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = EyeframeConfig::from_file("/nonexistent/eyeframe.toml").unwrap_err();
        assert!(matches!(err, EyeframeError::Configuration(_)));
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = EyeframeConfig::default();
        assert!(config.validate().is_ok());

        config.capture.interval_ms = 0;
        assert!(config.validate().is_err());
        config.capture.interval_ms = 500;

        config.export.archive_name = "  ".into();
        assert!(config.validate().is_err());
        config.export.archive_name = "frames.tar".into();
        assert!(config.validate().is_err());
        config.export.archive_name = DEFAULT_ARCHIVE_NAME.into();

        config.export.manifest_name = String::new();
        assert!(config.validate().is_err());
        config.export.manifest_name = "frames.txt".into();
        assert!(config.validate().is_err());
        config.export.manifest_name = DEFAULT_MANIFEST_NAME.into();
        assert!(config.validate().is_ok());
    }
}
