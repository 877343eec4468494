//! DXF导出
//!
//! 将 [`HullDrawing`] 写为 AutoCAD R2010 格式的 DXF 文件。
//! 型线与分区矩形导出为轻量多段线，标注导出为单行文字，颜色使用ACI索引。

use crate::drawing::{Color, DrawingEntity, HullDrawing, Shape};
use crate::error::DrawingError;
use std::path::Path;

/// 导出到DXF文件
pub fn export(drawing: &HullDrawing, path: &Path) -> Result<(), DrawingError> {
    let dxf_drawing = to_dxf(drawing);
    dxf_drawing
        .save_file(path)
        .map_err(|e| DrawingError::Dxf(e.to_string()))?;

    tracing::debug!(
        "Wrote {} entities, {} layers to {}",
        drawing.entity_count(),
        drawing.layers.len(),
        path.display()
    );
    Ok(())
}

/// 转换为 dxf 文档
pub fn to_dxf(drawing: &HullDrawing) -> dxf::Drawing {
    let mut dxf_drawing = dxf::Drawing::new();
    dxf_drawing.header.version = dxf::enums::AcadVersion::R2010;

    // 导出图层
    for layer in drawing.layers.iter() {
        let mut dxf_layer = dxf::tables::Layer::default();
        dxf_layer.name = layer.name.clone();
        dxf_layer.color = dxf::Color::from_index(layer.color.to_aci());
        dxf_drawing.add_layer(dxf_layer);
    }

    // 导出实体
    for entity in drawing.entities() {
        dxf_drawing.add_entity(convert_to_dxf_entity(entity));
    }

    dxf_drawing
}

/// 将图纸实体转换为DXF实体
fn convert_to_dxf_entity(entity: &DrawingEntity) -> dxf::entities::Entity {
    let specific = match &entity.shape {
        Shape::Line { start, end } => {
            let mut dxf_line = dxf::entities::Line::default();
            dxf_line.p1 = dxf::Point::new(start.x, start.y, 0.0);
            dxf_line.p2 = dxf::Point::new(end.x, end.y, 0.0);
            dxf::entities::EntityType::Line(dxf_line)
        }

        Shape::Polyline { points, closed } => {
            let mut lwpoly = dxf::entities::LwPolyline::default();
            lwpoly.set_is_closed(*closed);
            lwpoly.vertices = points
                .iter()
                .map(|p| {
                    let mut vertex = dxf::LwPolylineVertex::default();
                    vertex.x = p.x;
                    vertex.y = p.y;
                    vertex
                })
                .collect();
            dxf::entities::EntityType::LwPolyline(lwpoly)
        }

        Shape::Text {
            position,
            content,
            height,
        } => {
            let mut dxf_text = dxf::entities::Text::default();
            dxf_text.location = dxf::Point::new(position.x, position.y, 0.0);
            dxf_text.text_height = *height;
            dxf_text.value = content.clone();
            dxf::entities::EntityType::Text(dxf_text)
        }
    };

    let mut dxf_entity = dxf::entities::Entity::new(specific);
    dxf_entity.common.layer = entity.layer.clone();
    dxf_entity.common.color = dxf::Color::from_index(entity.color.to_aci());
    dxf_entity
}

/// 已写出 DXF 文件的概要，用于核对输出
#[derive(Debug, Clone, PartialEq)]
pub struct DxfSummary {
    /// 图层名及颜色
    pub layers: Vec<(String, Color)>,
    /// 每个实体所在图层与类型
    pub entities: Vec<(String, &'static str)>,
}

impl DxfSummary {
    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|(n, _)| n == name)
    }

    pub fn count_on(&self, layer: &str) -> usize {
        self.entities.iter().filter(|(l, _)| l == layer).count()
    }
}

/// 读取DXF文件概要
pub fn summarize(path: &Path) -> Result<DxfSummary, DrawingError> {
    let drawing = dxf::Drawing::load_file(path).map_err(|e| DrawingError::Dxf(e.to_string()))?;

    let layers = drawing
        .layers()
        .map(|layer| {
            let color = Color::from_aci(layer.color.index().unwrap_or(7) as u8);
            (layer.name.clone(), color)
        })
        .collect();

    let entities = drawing
        .entities()
        .map(|entity| {
            let kind = match &entity.specific {
                dxf::entities::EntityType::Line(_) => "Line",
                dxf::entities::EntityType::LwPolyline(_) => "LwPolyline",
                dxf::entities::EntityType::Text(_) => "Text",
                _ => "Other",
            };
            (entity.common.layer.clone(), kind)
        })
        .collect();

    Ok(DxfSummary { layers, entities })
}
