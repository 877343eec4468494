//! 船体几何模型
//!
//! 将主尺度输入 [`HullGeometry`] 转换为型线生成所需的规范化几何量
//! [`DerivedGeometry`]。转换是纯函数：相同输入得到逐位相同的结果。

use crate::error::HullError;
use crate::expr::{Context, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 默认的首尾过渡段换算除数（过渡段长度 = 倾角 × LBP / 除数）
pub const DEFAULT_RAKE_LENGTH_DIVISOR: f64 = 100.0;

/// 船体主尺度输入
///
/// 反序列化时记住哪些字段在输入中写成整数，规则的文本比较据此还原原始写法。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HullInput", into = "HullInput")]
pub struct HullGeometry {
    /// 总长 LOA
    pub loa: f64,
    /// 垂线间长 LBP
    pub lbp: f64,
    /// 型宽
    pub breadth: f64,
    /// 型深
    pub depth: f64,
    /// 设计吃水
    pub draft: f64,

    pub parallel_midbody_length: Option<f64>,
    /// 首部倾角（度）
    pub bow_rake_angle: Option<f64>,
    /// 尾部倾角（度）
    pub stern_rake_angle: Option<f64>,
    pub bilge_radius: Option<f64>,

    pub bulbous_bow: bool,
    pub bulb_length: Option<f64>,
    pub bulb_height: Option<f64>,

    pub block_coefficient: Option<f64>,
    pub prismatic_coefficient: Option<f64>,
    pub frame_spacing: Option<f64>,

    /// 输入中写成整数的字段名
    integer_fields: BTreeSet<&'static str>,
}

/// 输入中的数值，区分整数与小数写法
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum InputNumber {
    Int(i64),
    Float(f64),
}

impl InputNumber {
    fn value(self) -> f64 {
        match self {
            InputNumber::Int(i) => i as f64,
            InputNumber::Float(f) => f,
        }
    }
}

/// 序列化形式
#[derive(Serialize, Deserialize)]
struct HullInput {
    #[serde(alias = "length_overall")]
    loa: InputNumber,
    #[serde(alias = "length_between_perpendiculars")]
    lbp: InputNumber,
    #[serde(alias = "breadth_moulded")]
    breadth: InputNumber,
    #[serde(alias = "depth_moulded")]
    depth: InputNumber,
    #[serde(alias = "design_draft")]
    draft: InputNumber,
    parallel_midbody_length: Option<InputNumber>,
    bow_rake_angle: Option<InputNumber>,
    stern_rake_angle: Option<InputNumber>,
    bilge_radius: Option<InputNumber>,
    #[serde(default)]
    bulbous_bow: bool,
    bulb_length: Option<InputNumber>,
    bulb_height: Option<InputNumber>,
    block_coefficient: Option<InputNumber>,
    prismatic_coefficient: Option<InputNumber>,
    frame_spacing: Option<InputNumber>,
}

impl From<HullInput> for HullGeometry {
    fn from(input: HullInput) -> Self {
        let mut integer_fields = BTreeSet::new();
        let mut take = |name: &'static str, number: InputNumber| {
            if let InputNumber::Int(_) = number {
                integer_fields.insert(name);
            }
            number.value()
        };

        let mut hull = HullGeometry {
            loa: take("loa", input.loa),
            lbp: take("lbp", input.lbp),
            breadth: take("breadth", input.breadth),
            depth: take("depth", input.depth),
            draft: take("draft", input.draft),
            parallel_midbody_length: input
                .parallel_midbody_length
                .map(|n| take("parallel_midbody_length", n)),
            bow_rake_angle: input.bow_rake_angle.map(|n| take("bow_rake_angle", n)),
            stern_rake_angle: input.stern_rake_angle.map(|n| take("stern_rake_angle", n)),
            bilge_radius: input.bilge_radius.map(|n| take("bilge_radius", n)),
            bulbous_bow: input.bulbous_bow,
            bulb_length: input.bulb_length.map(|n| take("bulb_length", n)),
            bulb_height: input.bulb_height.map(|n| take("bulb_height", n)),
            block_coefficient: input.block_coefficient.map(|n| take("block_coefficient", n)),
            prismatic_coefficient: input
                .prismatic_coefficient
                .map(|n| take("prismatic_coefficient", n)),
            frame_spacing: input.frame_spacing.map(|n| take("frame_spacing", n)),
            integer_fields: BTreeSet::new(),
        };
        hull.integer_fields = integer_fields;
        hull
    }
}

impl From<HullGeometry> for HullInput {
    fn from(hull: HullGeometry) -> Self {
        let number = |name: &'static str, value: f64| hull.input_number(name, value);
        let optional = |name: &'static str, value: Option<f64>| value.map(|v| number(name, v));

        HullInput {
            loa: number("loa", hull.loa),
            lbp: number("lbp", hull.lbp),
            breadth: number("breadth", hull.breadth),
            depth: number("depth", hull.depth),
            draft: number("draft", hull.draft),
            parallel_midbody_length: optional("parallel_midbody_length", hull.parallel_midbody_length),
            bow_rake_angle: optional("bow_rake_angle", hull.bow_rake_angle),
            stern_rake_angle: optional("stern_rake_angle", hull.stern_rake_angle),
            bilge_radius: optional("bilge_radius", hull.bilge_radius),
            bulbous_bow: hull.bulbous_bow,
            bulb_length: optional("bulb_length", hull.bulb_length),
            bulb_height: optional("bulb_height", hull.bulb_height),
            block_coefficient: optional("block_coefficient", hull.block_coefficient),
            prismatic_coefficient: optional("prismatic_coefficient", hull.prismatic_coefficient),
            frame_spacing: optional("frame_spacing", hull.frame_spacing),
        }
    }
}

impl HullGeometry {
    /// 以主尺度创建，其余参数为空
    pub fn new(loa: f64, lbp: f64, breadth: f64, depth: f64, draft: f64) -> Self {
        Self {
            loa,
            lbp,
            breadth,
            depth,
            draft,
            parallel_midbody_length: None,
            bow_rake_angle: None,
            stern_rake_angle: None,
            bilge_radius: None,
            bulbous_bow: false,
            bulb_length: None,
            bulb_height: None,
            block_coefficient: None,
            prismatic_coefficient: None,
            frame_spacing: None,
            integer_fields: BTreeSet::new(),
        }
    }

    pub fn with_rake_angles(mut self, bow: f64, stern: f64) -> Self {
        self.bow_rake_angle = Some(bow);
        self.stern_rake_angle = Some(stern);
        self
    }

    pub fn with_parallel_midbody(mut self, length: f64) -> Self {
        self.parallel_midbody_length = Some(length);
        self
    }

    pub fn with_bilge_radius(mut self, radius: f64) -> Self {
        self.bilge_radius = Some(radius);
        self
    }

    pub fn with_bulbous_bow(mut self, length: f64, height: f64) -> Self {
        self.bulbous_bow = true;
        self.bulb_length = Some(length);
        self.bulb_height = Some(height);
        self
    }

    pub fn with_coefficients(mut self, block: f64, prismatic: f64) -> Self {
        self.block_coefficient = Some(block);
        self.prismatic_coefficient = Some(prismatic);
        self
    }

    /// 校验输入，返回第一个不合法的字段
    pub fn validate(&self) -> Result<(), HullError> {
        let principal = [
            ("loa", self.loa),
            ("lbp", self.lbp),
            ("breadth", self.breadth),
            ("depth", self.depth),
            ("draft", self.draft),
        ];
        for (field, value) in principal {
            if !value.is_finite() {
                return Err(HullError::invalid(field, "must be a finite number"));
            }
            if value <= 0.0 {
                return Err(HullError::invalid(
                    field,
                    format!("must be positive, got {}", value),
                ));
            }
        }

        if self.loa < self.lbp {
            return Err(HullError::invalid(
                "loa",
                format!("must not be less than lbp ({} < {})", self.loa, self.lbp),
            ));
        }

        let secondary = [
            ("parallel_midbody_length", self.parallel_midbody_length),
            ("bow_rake_angle", self.bow_rake_angle),
            ("stern_rake_angle", self.stern_rake_angle),
            ("bilge_radius", self.bilge_radius),
        ];
        for (field, value) in secondary {
            check_non_negative(field, value)?;
        }

        if let Some(midbody) = self.parallel_midbody_length {
            if midbody > self.lbp {
                return Err(HullError::invalid(
                    "parallel_midbody_length",
                    format!("must not exceed lbp ({} > {})", midbody, self.lbp),
                ));
            }
        }

        if self.bulbous_bow {
            check_non_negative("bulb_length", self.bulb_length)?;
            check_non_negative("bulb_height", self.bulb_height)?;
        }

        for (field, value) in [
            ("block_coefficient", self.block_coefficient),
            ("prismatic_coefficient", self.prismatic_coefficient),
        ] {
            if let Some(c) = value {
                if !c.is_finite() || c <= 0.0 || c > 1.0 {
                    return Err(HullError::invalid(
                        field,
                        format!("must lie in (0, 1], got {}", c),
                    ));
                }
            }
        }

        if let Some(spacing) = self.frame_spacing {
            if !spacing.is_finite() || spacing <= 0.0 {
                return Err(HullError::invalid(
                    "frame_spacing",
                    format!("must be positive, got {}", spacing),
                ));
            }
        }

        Ok(())
    }

    /// 字段在输入中写成整数且当前值仍为整数时按整数输出
    fn input_number(&self, name: &'static str, value: f64) -> InputNumber {
        if self.integer_fields.contains(name) && value.fract() == 0.0 && value.abs() < 9.0e15 {
            InputNumber::Int(value as i64)
        } else {
            InputNumber::Float(value)
        }
    }

    fn context_value(&self, name: &'static str, value: f64) -> Value {
        match self.input_number(name, value) {
            InputNumber::Int(i) => Value::Int(i),
            InputNumber::Float(f) => Value::Float(f),
        }
    }

    /// 原始输入作为规则求值上下文
    ///
    /// 数值保留输入中的整数或小数写法。未给出的可选参数不进入上下文，
    /// 引用它们的规则会被跳过。
    pub fn to_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("loa".into(), self.context_value("loa", self.loa));
        context.insert("lbp".into(), self.context_value("lbp", self.lbp));
        context.insert("breadth".into(), self.context_value("breadth", self.breadth));
        context.insert("beam".into(), self.context_value("breadth", self.breadth));
        context.insert("depth".into(), self.context_value("depth", self.depth));
        context.insert("draft".into(), self.context_value("draft", self.draft));
        context.insert("bulbous_bow".into(), Value::Bool(self.bulbous_bow));

        let optional = [
            ("parallel_midbody_length", self.parallel_midbody_length),
            ("bow_rake_angle", self.bow_rake_angle),
            ("stern_rake_angle", self.stern_rake_angle),
            ("bilge_radius", self.bilge_radius),
            ("bulb_length", self.bulb_length),
            ("bulb_height", self.bulb_height),
            ("block_coefficient", self.block_coefficient),
            ("prismatic_coefficient", self.prismatic_coefficient),
            ("frame_spacing", self.frame_spacing),
        ];
        for (name, value) in optional {
            if let Some(v) = value {
                context.insert(name.into(), self.context_value(name, v));
            }
        }
        context
    }
}

fn check_non_negative(field: &'static str, value: Option<f64>) -> Result<(), HullError> {
    match value {
        Some(v) if !v.is_finite() => Err(HullError::invalid(field, "must be a finite number")),
        Some(v) if v < 0.0 => Err(HullError::invalid(
            field,
            format!("must not be negative, got {}", v),
        )),
        _ => Ok(()),
    }
}

/// 几何推导设置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometrySettings {
    /// 倾角到过渡段长度的换算除数。
    ///
    /// 这是一个经验近似，不是放样计算结果。
    pub rake_length_divisor: f64,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            rake_length_divisor: DEFAULT_RAKE_LENGTH_DIVISOR,
        }
    }
}

/// 球鼻艏尺寸
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulbousBow {
    pub length: f64,
    pub height: f64,
}

/// 推导后的船体几何
///
/// 每次生成请求构建一次，构建后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedGeometry {
    pub loa: f64,
    pub lbp: f64,
    pub breadth: f64,
    pub depth: f64,
    pub draft: f64,

    /// 舯剖面纵向位置（LBP/2）
    pub midship_x: f64,
    /// 龙骨基准高度
    pub keel_z: f64,
    /// 甲板高度（型深）
    pub deck_z: f64,
    pub half_beam: f64,

    pub parallel_midbody_length: f64,
    pub bow_rake_angle: f64,
    pub stern_rake_angle: f64,
    pub bow_transition_length: f64,
    pub stern_transition_length: f64,
    pub bilge_radius: f64,

    /// 仅当球鼻艏启用且长、高均为正时存在
    pub bulb: Option<BulbousBow>,

    pub block_coefficient: Option<f64>,
    pub prismatic_coefficient: Option<f64>,
}

impl DerivedGeometry {
    /// 使用默认设置推导
    pub fn build(hull: &HullGeometry) -> Result<Self, HullError> {
        Self::build_with(hull, &GeometrySettings::default())
    }

    pub fn build_with(hull: &HullGeometry, settings: &GeometrySettings) -> Result<Self, HullError> {
        hull.validate()?;

        let divisor = settings.rake_length_divisor;
        if !divisor.is_finite() || divisor <= 0.0 {
            return Err(HullError::invalid(
                "rake_length_divisor",
                format!("must be positive, got {}", divisor),
            ));
        }

        let bow_rake_angle = hull.bow_rake_angle.unwrap_or(0.0);
        let stern_rake_angle = hull.stern_rake_angle.unwrap_or(0.0);

        let bulb = if hull.bulbous_bow {
            let length = hull.bulb_length.unwrap_or(0.0);
            let height = hull.bulb_height.unwrap_or(0.0);
            (length > 0.0 && height > 0.0).then_some(BulbousBow { length, height })
        } else {
            None
        };

        Ok(Self {
            loa: hull.loa,
            lbp: hull.lbp,
            breadth: hull.breadth,
            depth: hull.depth,
            draft: hull.draft,
            midship_x: hull.lbp / 2.0,
            keel_z: 0.0,
            deck_z: hull.depth,
            half_beam: hull.breadth / 2.0,
            parallel_midbody_length: hull.parallel_midbody_length.unwrap_or(0.0),
            bow_rake_angle,
            stern_rake_angle,
            bow_transition_length: bow_rake_angle * hull.lbp / divisor,
            stern_transition_length: stern_rake_angle * hull.lbp / divisor,
            bilge_radius: hull.bilge_radius.unwrap_or(0.0),
            bulb,
            block_coefficient: hull.block_coefficient,
            prismatic_coefficient: hull.prismatic_coefficient,
        })
    }

    /// 吃水线高度
    pub fn waterline_z(&self) -> f64 {
        self.keel_z + self.draft
    }

    /// 逐字段比较，容差内视为相等
    pub fn approx_eq(&self, other: &DerivedGeometry, tolerance: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= tolerance;
        let close_opt = |a: Option<f64>, b: Option<f64>| match (a, b) {
            (Some(a), Some(b)) => close(a, b),
            (None, None) => true,
            _ => false,
        };
        let bulb_close = match (self.bulb, other.bulb) {
            (Some(a), Some(b)) => close(a.length, b.length) && close(a.height, b.height),
            (None, None) => true,
            _ => false,
        };

        close(self.loa, other.loa)
            && close(self.lbp, other.lbp)
            && close(self.breadth, other.breadth)
            && close(self.depth, other.depth)
            && close(self.draft, other.draft)
            && close(self.midship_x, other.midship_x)
            && close(self.keel_z, other.keel_z)
            && close(self.deck_z, other.deck_z)
            && close(self.half_beam, other.half_beam)
            && close(self.parallel_midbody_length, other.parallel_midbody_length)
            && close(self.bow_rake_angle, other.bow_rake_angle)
            && close(self.stern_rake_angle, other.stern_rake_angle)
            && close(self.bow_transition_length, other.bow_transition_length)
            && close(self.stern_transition_length, other.stern_transition_length)
            && close(self.bilge_radius, other.bilge_radius)
            && bulb_close
            && close_opt(self.block_coefficient, other.block_coefficient)
            && close_opt(self.prismatic_coefficient, other.prismatic_coefficient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_hull() -> HullGeometry {
        HullGeometry::new(120.0, 112.0, 20.0, 11.0, 7.5)
            .with_rake_angles(15.0, 10.0)
            .with_bilge_radius(1.8)
    }

    #[test]
    fn test_derived_points() {
        let geom = DerivedGeometry::build(&sample_hull()).unwrap();
        assert_eq!(geom.midship_x, 56.0);
        assert_eq!(geom.keel_z, 0.0);
        assert_eq!(geom.deck_z, 11.0);
        assert_eq!(geom.half_beam, 10.0);
        assert!((geom.bow_transition_length - 16.8).abs() < 1e-12);
        assert!((geom.stern_transition_length - 11.2).abs() < 1e-12);
        assert_eq!(geom.waterline_z(), 7.5);
    }

    #[test]
    fn test_rejects_non_positive_dimensions() {
        let hull = HullGeometry::new(100.0, 90.0, 0.0, 8.0, 5.0);
        let err = DerivedGeometry::build(&hull).unwrap_err();
        assert_eq!(err.field(), "breadth");

        let hull = HullGeometry::new(100.0, 90.0, 15.0, 8.0, -1.0);
        assert_eq!(DerivedGeometry::build(&hull).unwrap_err().field(), "draft");

        let hull = HullGeometry::new(100.0, f64::NAN, 15.0, 8.0, 5.0);
        assert_eq!(DerivedGeometry::build(&hull).unwrap_err().field(), "lbp");
    }

    #[test]
    fn test_rejects_lbp_longer_than_loa() {
        let hull = HullGeometry::new(90.0, 100.0, 15.0, 8.0, 5.0);
        assert_eq!(DerivedGeometry::build(&hull).unwrap_err().field(), "loa");
    }

    #[test]
    fn test_rejects_negative_secondary_parameters() {
        let hull = HullGeometry::new(100.0, 95.0, 15.0, 8.0, 5.0).with_bilge_radius(-0.5);
        assert_eq!(DerivedGeometry::build(&hull).unwrap_err().field(), "bilge_radius");

        let hull = HullGeometry::new(100.0, 95.0, 15.0, 8.0, 5.0).with_rake_angles(-1.0, 0.0);
        assert_eq!(DerivedGeometry::build(&hull).unwrap_err().field(), "bow_rake_angle");

        let hull = HullGeometry::new(100.0, 95.0, 15.0, 8.0, 5.0).with_coefficients(1.2, 0.7);
        assert_eq!(DerivedGeometry::build(&hull).unwrap_err().field(), "block_coefficient");
    }

    #[test]
    fn test_bulb_ignored_when_flag_off() {
        let mut hull = sample_hull().with_bulbous_bow(6.0, 4.0);
        hull.bulbous_bow = false;
        // 关闭时尺寸被忽略，即使为负也不校验
        hull.bulb_length = Some(-3.0);
        let geom = DerivedGeometry::build(&hull).unwrap();
        assert!(geom.bulb.is_none());
    }

    #[test]
    fn test_bulb_requires_positive_dimensions() {
        let hull = sample_hull().with_bulbous_bow(6.0, 0.0);
        assert!(DerivedGeometry::build(&hull).unwrap().bulb.is_none());

        let hull = sample_hull().with_bulbous_bow(6.0, 4.0);
        let bulb = DerivedGeometry::build(&hull).unwrap().bulb.unwrap();
        assert_eq!(bulb.length, 6.0);
        assert_eq!(bulb.height, 4.0);
    }

    #[test]
    fn test_custom_rake_divisor() {
        let settings = GeometrySettings {
            rake_length_divisor: 50.0,
        };
        let geom = DerivedGeometry::build_with(&sample_hull(), &settings).unwrap();
        assert!((geom.bow_transition_length - 33.6).abs() < 1e-12);

        let settings = GeometrySettings {
            rake_length_divisor: 0.0,
        };
        let err = DerivedGeometry::build_with(&sample_hull(), &settings).unwrap_err();
        assert_eq!(err.field(), "rake_length_divisor");
    }

    #[test]
    fn test_input_aliases() {
        let json = r#"{
            "length_overall": 100.0,
            "length_between_perpendiculars": 95.0,
            "breadth_moulded": 16.0,
            "depth_moulded": 9.0,
            "design_draft": 6.0,
            "bilge_radius": 1.2
        }"#;
        let hull: HullGeometry = serde_json::from_str(json).unwrap();
        assert_eq!(hull.lbp, 95.0);
        assert_eq!(hull.bilge_radius, Some(1.2));
        assert!(!hull.bulbous_bow);
    }

    #[test]
    fn test_context_skips_unset_parameters() {
        let context = HullGeometry::new(100.0, 95.0, 16.0, 9.0, 6.0).to_context();
        assert_eq!(context.get("loa"), Some(&Value::Float(100.0)));
        assert_eq!(context.get("beam"), Some(&Value::Float(16.0)));
        assert!(context.get("bilge_radius").is_none());
    }

    #[test]
    fn test_context_keeps_input_number_types() {
        let json = r#"{ "loa": 100, "lbp": 95.0, "breadth": 16, "depth": 9.5, "draft": 6, "bilge_radius": 2 }"#;
        let hull: HullGeometry = serde_json::from_str(json).unwrap();
        assert_eq!(hull.loa, 100.0);

        let context = hull.to_context();
        assert_eq!(context.get("loa"), Some(&Value::Int(100)));
        assert_eq!(context.get("lbp"), Some(&Value::Float(95.0)));
        assert_eq!(context.get("beam"), Some(&Value::Int(16)));
        assert_eq!(context.get("depth"), Some(&Value::Float(9.5)));
        assert_eq!(context.get("bilge_radius"), Some(&Value::Int(2)));
        assert_eq!(context.get("loa").unwrap().to_string(), "100");
    }

    #[test]
    fn test_edited_integer_field_becomes_float() {
        let mut hull: HullGeometry =
            serde_json::from_str(r#"{ "loa": 100, "lbp": 95, "breadth": 16, "depth": 9, "draft": 6 }"#)
                .unwrap();
        hull.loa = 100.5;
        assert_eq!(hull.to_context().get("loa"), Some(&Value::Float(100.5)));
    }

    #[test]
    fn test_serialization_keeps_integer_input() {
        let json = r#"{ "loa": 100, "lbp": 95.0, "breadth": 16, "depth": 9, "draft": 6 }"#;
        let hull: HullGeometry = serde_json::from_str(json).unwrap();

        let value = serde_json::to_value(&hull).unwrap();
        assert!(value["loa"].is_i64());
        assert!(value["lbp"].is_f64());

        let restored: HullGeometry = serde_json::from_value(value).unwrap();
        assert_eq!(restored, hull);
    }

    proptest! {
        #[test]
        fn prop_derivation_is_deterministic(
            lbp in 1.0f64..400.0,
            extra in 0.0f64..40.0,
            breadth in 0.5f64..80.0,
            depth in 0.5f64..40.0,
            draft in 0.1f64..30.0,
            bow in 0.0f64..45.0,
            stern in 0.0f64..45.0,
        ) {
            let hull = HullGeometry::new(lbp + extra, lbp, breadth, depth, draft)
                .with_rake_angles(bow, stern);
            let a = DerivedGeometry::build(&hull).unwrap();
            let b = DerivedGeometry::build(&hull).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
