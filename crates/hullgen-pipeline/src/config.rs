//! 生成器配置
//!
//! JSON 文件，所有字段都有默认值，缺省的字段取默认。

use crate::error::GenerationError;
use hullgen_core::curves::DEFAULT_SAMPLE_COUNT;
use hullgen_core::hull::{GeometrySettings, DEFAULT_RAKE_LENGTH_DIVISOR};
use hullgen_core::layout::DEFAULT_ENGINE_ROOM_FRACTION;
use hullgen_file::drawing::DEFAULT_TEXT_HEIGHT;
use hullgen_file::{EmitterOptions, PreviewOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 图纸输出目录
    pub output_dir: PathBuf,
    /// 型线站位区间数
    pub sample_count: usize,
    pub engine_room_fraction: f64,
    pub rake_length_divisor: f64,
    /// 是否输出 PNG 预览
    pub raster_preview: bool,
    pub preview_width: u32,
    pub preview_height: u32,
    pub text_height: f64,
    pub overwrite: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let preview = PreviewOptions::default();
        Self {
            output_dir: PathBuf::from("output"),
            sample_count: DEFAULT_SAMPLE_COUNT,
            engine_room_fraction: DEFAULT_ENGINE_ROOM_FRACTION,
            rake_length_divisor: DEFAULT_RAKE_LENGTH_DIVISOR,
            raster_preview: false,
            preview_width: preview.width,
            preview_height: preview.height,
            text_height: DEFAULT_TEXT_HEIGHT,
            overwrite: false,
        }
    }
}

impl GeneratorConfig {
    /// 从 JSON 文件加载并校验
    pub fn load(path: &Path) -> Result<Self, GenerationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GenerationError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            GenerationError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;

        tracing::info!("Loaded generator config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if !(0.0..=1.0).contains(&self.engine_room_fraction) {
            return Err(GenerationError::Config(format!(
                "engine_room_fraction must be within [0, 1], got {}",
                self.engine_room_fraction
            )));
        }
        if !self.rake_length_divisor.is_finite() || self.rake_length_divisor <= 0.0 {
            return Err(GenerationError::Config(format!(
                "rake_length_divisor must be positive, got {}",
                self.rake_length_divisor
            )));
        }
        if !self.text_height.is_finite() || self.text_height <= 0.0 {
            return Err(GenerationError::Config(format!(
                "text_height must be positive, got {}",
                self.text_height
            )));
        }
        if self.preview_width == 0 || self.preview_height == 0 {
            return Err(GenerationError::Config(format!(
                "preview size must be non-zero, got {}x{}",
                self.preview_width, self.preview_height
            )));
        }
        Ok(())
    }

    pub fn geometry_settings(&self) -> GeometrySettings {
        GeometrySettings {
            rake_length_divisor: self.rake_length_divisor,
        }
    }

    pub fn emitter_options(&self) -> EmitterOptions {
        EmitterOptions {
            overwrite: self.overwrite,
            raster_preview: self.raster_preview,
            text_height: self.text_height,
            preview: PreviewOptions {
                width: self.preview_width,
                height: self.preview_height,
                ..PreviewOptions::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hullgen.json");
        std::fs::write(&path, r#"{ "sample_count": 80, "raster_preview": true }"#).unwrap();

        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.sample_count, 80);
        assert!(config.raster_preview);
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.engine_room_fraction, 0.15);
        assert_eq!(config.rake_length_divisor, 100.0);
        assert_eq!(config.text_height, 0.5);
        assert!(!config.overwrite);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = GeneratorConfig {
            engine_room_fraction: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GenerationError::Config(_))));

        let config = GeneratorConfig {
            rake_length_divisor: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(GeneratorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GeneratorConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_emitter_options_follow_config() {
        let config = GeneratorConfig {
            preview_width: 640,
            preview_height: 320,
            overwrite: true,
            ..Default::default()
        };
        let options = config.emitter_options();
        assert!(options.overwrite);
        assert_eq!((options.preview.width, options.preview.height), (640, 320));
    }
}
