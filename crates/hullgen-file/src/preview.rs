//! PNG 预览图
//!
//! 将图纸中的线段、多段线按图层颜色栅格化，按包围盒等比缩放到画布。
//! 文字不渲染，只用于DXF。

use crate::drawing::{Color, HullDrawing, Shape};
use crate::error::DrawingError;
use hullgen_core::math::{BoundingBox2, Point2};
use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 预览图参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewOptions {
    pub width: u32,
    pub height: u32,
    /// 四周留白（像素）
    pub margin: u32,
    pub background: Color,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 800,
            margin: 40,
            background: Color::BLACK,
        }
    }
}

/// 世界坐标到像素坐标的映射（y 轴向上）
#[derive(Debug, Clone, Copy)]
struct Viewport {
    min: Point2,
    scale: f64,
    margin: f64,
    height: f64,
}

impl Viewport {
    fn fit(bbox: &BoundingBox2, options: &PreviewOptions) -> Self {
        let margin = options.margin as f64;
        let usable_w = (options.width as f64 - 2.0 * margin).max(1.0);
        let usable_h = (options.height as f64 - 2.0 * margin).max(1.0);
        let scale = (usable_w / bbox.width().max(1e-9)).min(usable_h / bbox.height().max(1e-9));
        Self {
            min: bbox.min,
            scale,
            margin,
            height: options.height as f64,
        }
    }

    fn project(&self, p: &Point2) -> (i64, i64) {
        let x = self.margin + (p.x - self.min.x) * self.scale;
        let y = self.height - self.margin - (p.y - self.min.y) * self.scale;
        (x.round() as i64, y.round() as i64)
    }
}

/// 渲染图纸
pub fn render(drawing: &HullDrawing, options: &PreviewOptions) -> RgbImage {
    let bg = options.background;
    let mut image = RgbImage::from_pixel(options.width, options.height, Rgb([bg.r, bg.g, bg.b]));

    let bbox = drawing
        .entities()
        .iter()
        .filter(|e| !matches!(e.shape, Shape::Text { .. }))
        .fold(BoundingBox2::empty(), |acc, e| acc.union(&e.shape.bounding_box()));
    if bbox.is_empty() {
        return image;
    }
    let viewport = Viewport::fit(&bbox, options);

    for entity in drawing.entities() {
        let color = Rgb([entity.color.r, entity.color.g, entity.color.b]);
        match &entity.shape {
            Shape::Line { start, end } => {
                draw_line(&mut image, viewport.project(start), viewport.project(end), color);
            }
            Shape::Polyline { points, closed } => {
                for pair in points.windows(2) {
                    draw_line(&mut image, viewport.project(&pair[0]), viewport.project(&pair[1]), color);
                }
                if let (true, Some(first), Some(last)) = (*closed, points.first(), points.last()) {
                    draw_line(&mut image, viewport.project(last), viewport.project(first), color);
                }
            }
            Shape::Text { .. } => {}
        }
    }

    image
}

/// 渲染并保存为 PNG
pub fn save_png(drawing: &HullDrawing, path: &Path, options: &PreviewOptions) -> Result<(), DrawingError> {
    render(drawing, options).save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Bresenham 直线，画布外的像素丢弃
fn draw_line(image: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x0 >= 0 && y0 >= 0 && (x0 as u32) < image.width() && (y0 as u32) < image.height() {
            image.put_pixel(x0 as u32, y0 as u32, color);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
