//! 图纸输出器
//!
//! 把一次生成的几何、型线和分区写成一个 DXF 文件（可选同名 PNG 预览）。
//! 先写入 `.partial` 临时文件再重命名，失败时不会留下半成品。

use crate::drawing::{HullDrawing, DEFAULT_TEXT_HEIGHT};
use crate::dxf_io;
use crate::error::DrawingError;
use crate::preview::{self, PreviewOptions};
use hullgen_core::curves::CurveSet;
use hullgen_core::hull::DerivedGeometry;
use hullgen_core::layout::LayoutZones;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 图纸文件扩展名
pub const DRAWING_EXTENSION: &str = "dxf";

/// 预览图扩展名
pub const PREVIEW_EXTENSION: &str = "png";

const PARTIAL_SUFFIX: &str = "partial";

/// 输出选项
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterOptions {
    /// 同名文件已存在时是否覆盖
    pub overwrite: bool,
    /// 是否同时输出 PNG 预览
    pub raster_preview: bool,
    pub text_height: f64,
    pub preview: PreviewOptions,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            raster_preview: false,
            text_height: DEFAULT_TEXT_HEIGHT,
            preview: PreviewOptions::default(),
        }
    }
}

/// 一次成功输出的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedDrawing {
    pub drawing_path: PathBuf,
    pub preview_path: Option<PathBuf>,
    /// 按创建顺序排列的图层名
    pub layers: Vec<String>,
    pub entity_count: usize,
}

/// 图纸输出器
#[derive(Debug, Clone)]
pub struct DrawingEmitter {
    output_dir: PathBuf,
    options: EmitterOptions,
}

impl DrawingEmitter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_options(output_dir, EmitterOptions::default())
    }

    pub fn with_options(output_dir: impl Into<PathBuf>, options: EmitterOptions) -> Self {
        Self {
            output_dir: output_dir.into(),
            options,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn options(&self) -> &EmitterOptions {
        &self.options
    }

    /// 图纸 `name` 对应的 DXF 路径
    pub fn drawing_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", name, DRAWING_EXTENSION))
    }

    /// 构建图纸并写入 `<output_dir>/<name>.dxf`
    pub fn emit(
        &self,
        geom: &DerivedGeometry,
        curves: &CurveSet,
        zones: &LayoutZones,
        name: &str,
    ) -> Result<EmittedDrawing, DrawingError> {
        let drawing = HullDrawing::from_hull(geom, curves, zones, self.options.text_height);
        self.write(&drawing, name)
    }

    /// 写出已构建好的图纸
    pub fn write(&self, drawing: &HullDrawing, name: &str) -> Result<EmittedDrawing, DrawingError> {
        validate_name(name)?;
        fs::create_dir_all(&self.output_dir)?;

        let drawing_path = self.drawing_path(name);
        let preview_path = self
            .options
            .raster_preview
            .then(|| self.output_dir.join(format!("{}.{}", name, PREVIEW_EXTENSION)));

        if !self.options.overwrite {
            for path in std::iter::once(&drawing_path).chain(preview_path.as_ref()) {
                if path.exists() {
                    return Err(DrawingError::AlreadyExists(path.clone()));
                }
            }
        }

        write_atomic(&drawing_path, |tmp| dxf_io::export(drawing, tmp))?;

        if let Some(png) = &preview_path {
            let options = self.options.preview;
            if let Err(e) = write_atomic(png, |tmp| preview::save_png(drawing, tmp, &options)) {
                // 预览失败时图纸也不保留
                fs::remove_file(&drawing_path).ok();
                return Err(e);
            }
        }

        tracing::info!(
            "Emitted drawing {} ({} entities on {} layers)",
            drawing_path.display(),
            drawing.entity_count(),
            drawing.layers.len()
        );

        Ok(EmittedDrawing {
            drawing_path,
            preview_path,
            layers: drawing.layers.names(),
            entity_count: drawing.entity_count(),
        })
    }
}

/// 名称只能是单个文件名片段
fn validate_name(name: &str) -> Result<(), DrawingError> {
    let invalid = name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name.contains("..")
        || name.chars().any(char::is_control);
    if invalid {
        return Err(DrawingError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// 先写临时文件再重命名到目标路径
fn write_atomic<F>(target: &Path, write: F) -> Result<(), DrawingError>
where
    F: FnOnce(&Path) -> Result<(), DrawingError>,
{
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".");
    tmp.push(PARTIAL_SUFFIX);
    let tmp = PathBuf::from(tmp);

    let result = write(&tmp).and_then(|_| fs::rename(&tmp, target).map_err(DrawingError::from));
    if result.is_err() {
        fs::remove_file(&tmp).ok();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use hullgen_core::hull::HullGeometry;

    fn sample() -> (DerivedGeometry, CurveSet, LayoutZones) {
        let hull = HullGeometry::new(120.0, 112.0, 20.0, 11.0, 7.5)
            .with_rake_angles(15.0, 10.0)
            .with_bilge_radius(1.5);
        let geom = DerivedGeometry::build(&hull).unwrap();
        let curves = CurveSet::generate(&geom, 20);
        let zones = LayoutZones::from_loa(geom.loa).unwrap();
        (geom, curves, zones)
    }

    #[test]
    fn test_emit_writes_single_drawing() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = DrawingEmitter::new(dir.path().join("out"));
        let (geom, curves, zones) = sample();

        let emitted = emitter.emit(&geom, &curves, &zones, "hull_a").unwrap();
        assert_eq!(emitted.drawing_path, dir.path().join("out").join("hull_a.dxf"));
        assert!(emitted.drawing_path.exists());
        assert!(emitted.preview_path.is_none());
        assert!(emitted.layers.contains(&"side-profile".to_string()));

        let files: Vec<_> = fs::read_dir(dir.path().join("out")).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_emit_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = DrawingEmitter::new(dir.path());
        let (geom, curves, zones) = sample();

        emitter.emit(&geom, &curves, &zones, "hull").unwrap();
        let err = emitter.emit(&geom, &curves, &zones, "hull").unwrap_err();
        assert!(matches!(err, DrawingError::AlreadyExists(_)));

        let overwriting = DrawingEmitter::with_options(
            dir.path(),
            EmitterOptions {
                overwrite: true,
                ..Default::default()
            },
        );
        assert!(overwriting.emit(&geom, &curves, &zones, "hull").is_ok());
    }

    #[test]
    fn test_emit_with_preview() {
        let dir = tempfile::tempdir().unwrap();
        let options = EmitterOptions {
            raster_preview: true,
            preview: PreviewOptions {
                width: 320,
                height: 160,
                ..Default::default()
            },
            ..Default::default()
        };
        let emitter = DrawingEmitter::with_options(dir.path(), options);
        let (geom, curves, zones) = sample();

        let emitted = emitter.emit(&geom, &curves, &zones, "preview").unwrap();
        let png = emitted.preview_path.unwrap();
        assert!(png.exists());
        let image = image::open(&png).unwrap();
        assert_eq!((image.width(), image.height()), (320, 160));
        assert!(!dir.path().join("preview.png.partial").exists());
    }

    #[test]
    fn test_failed_preview_removes_drawing() {
        let dir = tempfile::tempdir().unwrap();
        // 临时预览路径被目录占用，PNG 无法写出
        fs::create_dir(dir.path().join("ship.png.partial")).unwrap();

        let options = EmitterOptions {
            raster_preview: true,
            ..Default::default()
        };
        let emitter = DrawingEmitter::with_options(dir.path(), options);
        let (geom, curves, zones) = sample();

        assert!(emitter.emit(&geom, &curves, &zones, "ship").is_err());
        assert!(!dir.path().join("ship.dxf").exists());
        assert!(!dir.path().join("ship.dxf.partial").exists());
        assert!(!dir.path().join("ship.png").exists());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = DrawingEmitter::new(dir.path());
        let (geom, curves, zones) = sample();

        for name in ["", "  ", "../escape", "a/b", "a\\b"] {
            let err = emitter.emit(&geom, &curves, &zones, name).unwrap_err();
            assert!(matches!(err, DrawingError::InvalidName(_)), "{:?}", name);
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_write_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("broken.dxf");
        let result = write_atomic(&target, |tmp| {
            fs::write(tmp, b"half")?;
            Err(DrawingError::Dxf("boom".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
