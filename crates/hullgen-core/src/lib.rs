//! HullGen 核心引擎
//!
//! 从主尺度参数推导船体几何、生成型线、划分功能区并校验设计规则。
//!
//! # 架构设计
//!
//! 全部为无状态纯函数，按请求构建、用完即弃：
//! - `hull`: 主尺度输入与推导几何
//! - `curves`: 侧视轮廓、半宽线、球鼻艏、舭部型线
//! - `layout`: 货舱区 / 机舱区纵向分区
//! - `rules` + `expr`: 规则引擎与受限表达式语言
//!
//! # 示例
//!
//! ```rust
//! use hullgen_core::prelude::*;
//!
//! let hull = HullGeometry::new(120.0, 112.0, 20.0, 11.0, 7.5).with_rake_angles(15.0, 10.0);
//! let geom = DerivedGeometry::build(&hull).unwrap();
//! let curves = CurveSet::generate(&geom, 50);
//!
//! println!("Side profile stations: {}", curves.side_profile.len());
//! ```

pub mod curves;
pub mod error;
pub mod expr;
pub mod hull;
pub mod layout;
pub mod math;
pub mod rules;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::curves::{Curve, CurveKind, CurveSet, DEFAULT_SAMPLE_COUNT};
    pub use crate::error::{HullError, RuleError};
    pub use crate::expr::{Context, Expression, Value};
    pub use crate::hull::{BulbousBow, DerivedGeometry, GeometrySettings, HullGeometry};
    pub use crate::layout::{LayoutZones, Zone, DEFAULT_ENGINE_ROOM_FRACTION};
    pub use crate::math::{BoundingBox2, Point2};
    pub use crate::rules::{
        ComparisonOperator, ConstraintClass, Rule, RuleEvaluator, RuleOutcome, Severity, Violation,
    };
}
