//! 船体图纸模型
//!
//! 图纸由图层表和实体列表组成。每个实体属于一个命名、着色的图层：
//! 型线、甲板/龙骨/舯剖线、舭部、球鼻艏以及货舱区和机舱区矩形。
//! 图层在首次使用时创建，重复创建同名图层不产生任何变化。

use hullgen_core::curves::{Curve, CurveSet};
use hullgen_core::hull::DerivedGeometry;
use hullgen_core::layout::{LayoutZones, Zone};
use hullgen_core::math::{BoundingBox2, Point2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 默认标注文字高度
pub const DEFAULT_TEXT_HEIGHT: f64 = 0.5;

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const ORANGE: Color = Color::rgb(255, 127, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// AutoCAD颜色索引(ACI)
    pub fn to_aci(&self) -> u8 {
        match (self.r, self.g, self.b) {
            (255, 0, 0) => 1,
            (255, 255, 0) => 2,
            (0, 255, 0) => 3,
            (0, 255, 255) => 4,
            (0, 0, 255) => 5,
            (255, 0, 255) => 6,
            (255, 255, 255) => 7,
            (128, 128, 128) => 8,
            (255, 127, 0) => 30,
            _ => 7, // 默认白色
        }
    }

    pub fn from_aci(aci: u8) -> Color {
        match aci {
            1 => Color::RED,
            2 => Color::YELLOW,
            3 => Color::GREEN,
            4 => Color::CYAN,
            5 => Color::BLUE,
            6 => Color::MAGENTA,
            8 => Color::GRAY,
            30 => Color::ORANGE,
            _ => Color::WHITE,
        }
    }
}

/// 船体图纸的标准图层
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HullLayer {
    SideProfile,
    HalfBreadth,
    Deck,
    Keel,
    Midship,
    Bilge,
    BulbousBow,
    CargoZone,
    EngineRoom,
}

impl HullLayer {
    pub const ALL: [HullLayer; 9] = [
        HullLayer::SideProfile,
        HullLayer::HalfBreadth,
        HullLayer::Deck,
        HullLayer::Keel,
        HullLayer::Midship,
        HullLayer::Bilge,
        HullLayer::BulbousBow,
        HullLayer::CargoZone,
        HullLayer::EngineRoom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HullLayer::SideProfile => "side-profile",
            HullLayer::HalfBreadth => "half-breadth",
            HullLayer::Deck => "deck",
            HullLayer::Keel => "keel",
            HullLayer::Midship => "midship",
            HullLayer::Bilge => "bilge",
            HullLayer::BulbousBow => "bulbous-bow",
            HullLayer::CargoZone => "cargo-zone",
            HullLayer::EngineRoom => "engine-room",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            HullLayer::SideProfile => Color::RED,
            HullLayer::HalfBreadth => Color::MAGENTA,
            HullLayer::Deck => Color::YELLOW,
            HullLayer::Keel => Color::GREEN,
            HullLayer::Midship => Color::CYAN,
            HullLayer::Bilge => Color::WHITE,
            HullLayer::BulbousBow => Color::BLUE,
            HullLayer::CargoZone => Color::GRAY,
            HullLayer::EngineRoom => Color::ORANGE,
        }
    }
}

/// 图层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub color: Color,
}

/// 图层表，按名称去重，保持创建顺序
#[derive(Debug, Clone, Default)]
pub struct LayerTable {
    layers: Vec<Layer>,
    index: HashMap<String, usize>,
}

impl LayerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 确保图层存在；已存在时返回原图层，不修改颜色
    pub fn ensure_layer(&mut self, name: &str, color: Color) -> &Layer {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.layers.push(Layer {
                    name: name.to_string(),
                    color,
                });
                let idx = self.layers.len() - 1;
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &self.layers[idx]
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.index.get(name).map(|&idx| &self.layers[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// 实体几何
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Line {
        start: Point2,
        end: Point2,
    },
    Polyline {
        points: Vec<Point2>,
        closed: bool,
    },
    Text {
        position: Point2,
        content: String,
        height: f64,
    },
}

impl Shape {
    pub fn rectangle(min: Point2, max: Point2) -> Self {
        Shape::Polyline {
            points: vec![
                min,
                Point2::new(max.x, min.y),
                max,
                Point2::new(min.x, max.y),
            ],
            closed: true,
        }
    }

    /// 包围盒；文字只计插入点
    pub fn bounding_box(&self) -> BoundingBox2 {
        match self {
            Shape::Line { start, end } => BoundingBox2::from_points([*start, *end]),
            Shape::Polyline { points, .. } => BoundingBox2::from_points(points.iter().copied()),
            Shape::Text { position, .. } => BoundingBox2::new(*position, *position),
        }
    }
}

/// 图纸实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingEntity {
    pub layer: String,
    pub color: Color,
    pub shape: Shape,
}

/// 一张船体图纸
#[derive(Debug, Clone)]
pub struct HullDrawing {
    pub layers: LayerTable,
    entities: Vec<DrawingEntity>,
    text_height: f64,
}

impl Default for HullDrawing {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_HEIGHT)
    }
}

impl HullDrawing {
    pub fn new(text_height: f64) -> Self {
        Self {
            layers: LayerTable::new(),
            entities: Vec::new(),
            text_height,
        }
    }

    /// 根据几何、型线和分区构建完整图纸
    ///
    /// 缺省的球鼻艏 / 舭部型线不产生任何实体，也不创建对应图层。
    pub fn from_hull(
        geom: &DerivedGeometry,
        curves: &CurveSet,
        zones: &LayoutZones,
        text_height: f64,
    ) -> Self {
        let mut drawing = Self::new(text_height);
        let th = text_height;
        let keel = geom.keel_z;
        let deck = geom.deck_z;
        let mid = geom.midship_x;

        drawing.add_curve(HullLayer::SideProfile, &curves.side_profile);

        // 甲板、龙骨、舯剖线
        drawing.add(
            HullLayer::Deck,
            Shape::Line {
                start: Point2::new(0.0, deck),
                end: Point2::new(geom.lbp, deck),
            },
        );
        drawing.add(
            HullLayer::Keel,
            Shape::Line {
                start: Point2::new(0.0, keel),
                end: Point2::new(geom.lbp, keel),
            },
        );
        drawing.add(
            HullLayer::Midship,
            Shape::Line {
                start: Point2::new(mid, keel),
                end: Point2::new(mid, deck),
            },
        );
        drawing.add_label(HullLayer::Deck, "Deck", Point2::new(mid, deck + th));
        drawing.add_label(HullLayer::Keel, "Keel", Point2::new(mid, keel - th));
        drawing.add_label(
            HullLayer::Midship,
            "Midship",
            Point2::new(mid + 2.0 * th, geom.draft / 2.0),
        );

        if let (Some(curve), Some(bulb)) = (&curves.bulbous_bow, geom.bulb) {
            drawing.add_curve(HullLayer::BulbousBow, curve);
            drawing.add_label(
                HullLayer::BulbousBow,
                "Bulbous Bow",
                Point2::new(-bulb.length / 2.0, keel - bulb.height / 2.0),
            );
        }

        drawing.add_curve(HullLayer::HalfBreadth, &curves.half_breadth);

        if let Some(curve) = &curves.bilge {
            let r = geom.bilge_radius;
            drawing.add_curve(HullLayer::Bilge, curve);
            drawing.add_label(HullLayer::Bilge, "Bilge", Point2::new(r / 2.0, keel + r / 2.0));
        }

        drawing.add_zone(HullLayer::CargoZone, "Cargo Zone", zones.cargo_zone, keel, deck);
        drawing.add_zone(HullLayer::EngineRoom, "Engine Room", zones.engine_room, keel, deck);

        drawing
    }

    /// 在标准图层上添加实体
    pub fn add(&mut self, layer: HullLayer, shape: Shape) {
        self.add_to_layer(layer.name(), layer.color(), shape);
    }

    /// 在任意图层上添加实体，图层不存在时创建
    pub fn add_to_layer(&mut self, layer: &str, color: Color, shape: Shape) {
        let color = self.layers.ensure_layer(layer, color).color;
        self.entities.push(DrawingEntity {
            layer: layer.to_string(),
            color,
            shape,
        });
    }

    fn add_curve(&mut self, layer: HullLayer, curve: &Curve) {
        if curve.points.len() < 2 {
            return;
        }
        self.add(
            layer,
            Shape::Polyline {
                points: curve.points.clone(),
                closed: false,
            },
        );
    }

    fn add_label(&mut self, layer: HullLayer, content: &str, position: Point2) {
        let height = self.text_height;
        self.add(
            layer,
            Shape::Text {
                position,
                content: content.to_string(),
                height,
            },
        );
    }

    fn add_zone(&mut self, layer: HullLayer, label: &str, zone: Zone, bottom: f64, top: f64) {
        if zone.length() <= 0.0 {
            return;
        }
        self.add(
            layer,
            Shape::rectangle(Point2::new(zone.start, bottom), Point2::new(zone.end, top)),
        );
        let th = self.text_height;
        self.add_label(layer, label, Point2::new(zone.start + th, top - 2.0 * th));
    }

    pub fn entities(&self) -> &[DrawingEntity] {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities_on<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a DrawingEntity> + 'a {
        self.entities.iter().filter(move |e| e.layer == layer)
    }

    pub fn text_height(&self) -> f64 {
        self.text_height
    }

    /// 全部实体的包围盒
    pub fn bounding_box(&self) -> BoundingBox2 {
        self.entities
            .iter()
            .fold(BoundingBox2::empty(), |acc, e| acc.union(&e.shape.bounding_box()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hullgen_core::hull::HullGeometry;

    fn build(hull: HullGeometry) -> HullDrawing {
        let geom = DerivedGeometry::build(&hull).unwrap();
        let curves = CurveSet::generate(&geom, 50);
        let zones = LayoutZones::from_loa(geom.loa).unwrap();
        HullDrawing::from_hull(&geom, &curves, &zones, DEFAULT_TEXT_HEIGHT)
    }

    #[test]
    fn test_layer_creation_is_idempotent() {
        let mut table = LayerTable::new();
        table.ensure_layer("deck", Color::YELLOW);
        let layer = table.ensure_layer("deck", Color::RED);
        assert_eq!(layer.color, Color::YELLOW);
        assert_eq!(table.len(), 1);
        assert!(table.contains("deck"));
        assert!(table.get("keel").is_none());
    }

    #[test]
    fn test_full_drawing_layers() {
        let drawing = build(
            HullGeometry::new(120.0, 112.0, 20.0, 11.0, 7.5)
                .with_rake_angles(15.0, 10.0)
                .with_bilge_radius(1.5)
                .with_bulbous_bow(6.0, 4.0),
        );
        for layer in HullLayer::ALL {
            assert!(drawing.layers.contains(layer.name()), "missing {}", layer.name());
        }
        assert_eq!(drawing.layers.len(), HullLayer::ALL.len());

        let labels: Vec<_> = drawing
            .entities()
            .iter()
            .filter_map(|e| match &e.shape {
                Shape::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        for expected in ["Deck", "Keel", "Midship", "Bulbous Bow", "Bilge", "Cargo Zone", "Engine Room"] {
            assert!(labels.contains(&expected), "missing label {}", expected);
        }
    }

    #[test]
    fn test_absent_curves_leave_no_layers() {
        let drawing = build(HullGeometry::new(100.0, 95.0, 16.0, 9.0, 6.0));
        assert!(!drawing.layers.contains("bilge"));
        assert!(!drawing.layers.contains("bulbous-bow"));
        assert_eq!(drawing.entities_on("bilge").count(), 0);
        assert!(drawing.layers.contains("side-profile"));
    }

    #[test]
    fn test_entities_inherit_layer_color() {
        let drawing = build(HullGeometry::new(100.0, 95.0, 16.0, 9.0, 6.0));
        for entity in drawing.entities() {
            let layer = drawing.layers.get(&entity.layer).unwrap();
            assert_eq!(entity.color, layer.color);
        }
    }

    #[test]
    fn test_zone_rectangles() {
        let drawing = build(HullGeometry::new(100.0, 95.0, 16.0, 9.0, 6.0));
        let rect = drawing
            .entities_on("engine-room")
            .find_map(|e| match &e.shape {
                Shape::Polyline { points, closed: true } => Some(points.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(rect[0], Point2::new(85.0, 0.0));
        assert_eq!(rect[2], Point2::new(100.0, 9.0));
    }

    #[test]
    fn test_bounding_box_covers_bulb() {
        let drawing = build(
            HullGeometry::new(120.0, 112.0, 20.0, 11.0, 7.5).with_bulbous_bow(6.0, 4.0),
        );
        let bbox = drawing.bounding_box();
        assert!(bbox.min.x <= -6.0);
        assert!(bbox.max.x >= 120.0);
        assert!(bbox.max.y >= 11.0);
    }

    #[test]
    fn test_aci_roundtrip() {
        for layer in HullLayer::ALL {
            let color = layer.color();
            assert_eq!(Color::from_aci(color.to_aci()), color);
        }
    }
}
