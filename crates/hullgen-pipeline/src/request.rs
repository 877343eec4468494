//! 生成请求与结果

use hullgen_core::curves::CurveSet;
use hullgen_core::expr::{Context, Value};
use hullgen_core::hull::{DerivedGeometry, HullGeometry};
use hullgen_core::layout::LayoutZones;
use hullgen_core::rules::Violation;
use hullgen_file::{GenerationRecord, GenerationStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 保存的布置参数，覆盖配置中的默认值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutParameters {
    pub engine_room_fraction: f64,
}

/// 一次生成请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// 来源设计编号，用于图纸命名
    #[serde(default)]
    pub design_id: Option<String>,
    pub hull: HullGeometry,
    /// 额外的规则参数（如航速、载重量），与主尺度一起进入规则上下文
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub layout: Option<LayoutParameters>,
}

impl GenerationRequest {
    pub fn new(hull: HullGeometry) -> Self {
        Self {
            design_id: None,
            hull,
            parameters: serde_json::Map::new(),
            layout: None,
        }
    }

    pub fn with_design_id(mut self, id: impl Into<String>) -> Self {
        self.design_id = Some(id.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_layout(mut self, layout: LayoutParameters) -> Self {
        self.layout = Some(layout);
        self
    }

    /// 规则求值用的原始输入
    ///
    /// 额外参数先写入，主尺度字段同名时覆盖它们。无法表示为标量的参数被忽略。
    pub fn raw_context(&self) -> Context {
        let mut context: Context = self
            .parameters
            .iter()
            .filter_map(|(name, value)| Value::from_json(value).map(|v| (name.clone(), v)))
            .collect();
        context.extend(self.hull.to_context());
        context
    }
}

/// 推导几何及已生成型线名称
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySummary {
    #[serde(flatten)]
    pub derived: DerivedGeometry,
    pub curves: Vec<String>,
}

/// 生成结果
///
/// 型线坐标随进程内结果返回，不参与序列化。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub status: GenerationStatus,
    pub violations: Vec<Violation>,
    pub layout: LayoutZones,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometrySummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_path: Option<PathBuf>,
    #[serde(skip)]
    pub curves: Option<CurveSet>,
}

impl GenerationResult {
    pub(crate) fn failed(layout: LayoutZones, violations: Vec<Violation>) -> Self {
        Self {
            status: GenerationStatus::Failed,
            violations,
            layout,
            geometry: None,
            drawing_path: None,
            preview_path: None,
            curves: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GenerationStatus::Success
    }

    pub fn critical_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_critical()).count()
    }

    /// 转为可持久化的生成记录
    pub fn to_record(&self) -> GenerationRecord {
        let mut record = GenerationRecord::new(self.status, self.layout, self.violations.clone());
        if let Some(summary) = &self.geometry {
            record.geometry = Some(summary.derived.clone());
            record.curve_names = summary.curves.clone();
        }
        record.drawing_path = self.drawing_path.clone();
        record.preview_path = self.preview_path.clone();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_json() {
        let request: GenerationRequest = serde_json::from_str(
            r#"{
                "design_id": "PSV-01",
                "hull": { "loa": 80, "lbp": 74, "breadth": 18, "depth": 8, "draft": 6.2 },
                "parameters": { "speed": 14.5, "crew": 24, "class": "DNV", "tanks": [1, 2] },
                "layout": { "engine_room_fraction": 0.2 }
            }"#,
        )
        .unwrap();

        assert_eq!(request.design_id.as_deref(), Some("PSV-01"));
        assert_eq!(request.layout.unwrap().engine_room_fraction, 0.2);

        let context = request.raw_context();
        assert_eq!(context.get("speed"), Some(&Value::Float(14.5)));
        assert_eq!(context.get("crew"), Some(&Value::Int(24)));
        assert_eq!(context.get("class"), Some(&Value::Text("DNV".to_string())));
        assert!(!context.contains_key("tanks"));
        assert_eq!(context.get("loa"), Some(&Value::Int(80)));
        assert_eq!(context.get("draft"), Some(&Value::Float(6.2)));
    }

    #[test]
    fn test_hull_fields_override_parameters() {
        let request = GenerationRequest::new(HullGeometry::new(100.0, 95.0, 16.0, 9.0, 6.0))
            .with_parameter("loa", 1.0);
        assert_eq!(request.raw_context().get("loa"), Some(&Value::Float(100.0)));
    }

    #[test]
    fn test_failed_result_json_has_no_drawing() {
        let result = GenerationResult::failed(LayoutZones::from_loa(100.0).unwrap(), Vec::new());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json.get("drawing_path").is_none());
        assert!(json.get("geometry").is_none());
        assert_eq!(json["layout"]["engine_room"]["start"], 85.0);
    }
}
