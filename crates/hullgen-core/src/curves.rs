//! 型线生成
//!
//! 每个生成器都是 [`DerivedGeometry`] 上的纯函数，返回惰性、有限、有序的点序列：
//! - 侧视轮廓（x-z）：首尾过渡段使用 smoothstep 三次混合 `3t² - 2t³`
//! - 半宽线（x-y）：过渡段使用平方根收缩 `half_beam · √t`
//! - 球鼻艏（x-z）：压扁的半椭圆，仅在启用时生成
//! - 舭部（x-z）：三次 Bézier 混合，仅在舭半径为正时生成
//!
//! 纵向采样在 `[0, LBP]` 上均匀分布。点值只依赖 x，加密采样不会改变共享站位上的形状。

use crate::hull::DerivedGeometry;
use crate::math::{BoundingBox2, Point2};
use serde::{Deserialize, Serialize};

/// 默认站位区间数
pub const DEFAULT_SAMPLE_COUNT: usize = 50;

/// 球鼻艏角度步长（度）
pub const BULB_ANGLE_STEP_DEG: usize = 5;

/// 球鼻艏椭圆压扁系数（固定形状常数）
pub const BULB_FLATTENING: f64 = 0.6;

/// 舭部混合步数
pub const BILGE_STEPS: usize = 30;

/// 型线类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurveKind {
    SideProfile,
    HalfBreadth,
    BulbousBow,
    Bilge,
}

impl CurveKind {
    pub fn name(&self) -> &'static str {
        match self {
            CurveKind::SideProfile => "side-profile",
            CurveKind::HalfBreadth => "half-breadth",
            CurveKind::BulbousBow => "bulbous-bow",
            CurveKind::Bilge => "bilge",
        }
    }
}

/// 一条命名型线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub kind: CurveKind,
    pub points: Vec<Point2>,
}

impl Curve {
    pub fn new(kind: CurveKind, points: impl IntoIterator<Item = Point2>) -> Self {
        Self {
            kind,
            points: points.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.points.iter().copied())
    }
}

/// 一次生成得到的全部型线
///
/// 球鼻艏和舭部是可选槽位，不满足条件时为 `None`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSet {
    pub side_profile: Curve,
    pub half_breadth: Curve,
    pub bulbous_bow: Option<Curve>,
    pub bilge: Option<Curve>,
}

impl CurveSet {
    pub fn generate(geom: &DerivedGeometry, sample_count: usize) -> Self {
        Self {
            side_profile: Curve::new(CurveKind::SideProfile, side_profile(geom, sample_count)),
            half_breadth: Curve::new(CurveKind::HalfBreadth, half_breadth(geom, sample_count)),
            bulbous_bow: bulbous_bow(geom).map(|points| Curve::new(CurveKind::BulbousBow, points)),
            bilge: bilge(geom).map(|points| Curve::new(CurveKind::Bilge, points)),
        }
    }

    /// 遍历实际存在的型线
    pub fn iter(&self) -> impl Iterator<Item = &Curve> {
        [Some(&self.side_profile), Some(&self.half_breadth)]
            .into_iter()
            .chain([self.bulbous_bow.as_ref(), self.bilge.as_ref()])
            .flatten()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|c| c.kind.name()).collect()
    }

    pub fn get(&self, kind: CurveKind) -> Option<&Curve> {
        match kind {
            CurveKind::SideProfile => Some(&self.side_profile),
            CurveKind::HalfBreadth => Some(&self.half_breadth),
            CurveKind::BulbousBow => self.bulbous_bow.as_ref(),
            CurveKind::Bilge => self.bilge.as_ref(),
        }
    }
}

/// 纵向站位：`sample_count` 个区间，共 `sample_count + 1` 个点；0 按 1 处理
pub fn stations(lbp: f64, sample_count: usize) -> impl Iterator<Item = f64> {
    let n = sample_count.max(1);
    let spacing = lbp / n as f64;
    (0..=n).map(move |i| spacing * i as f64)
}

/// 站位所在区段
#[derive(Debug, Clone, Copy, PartialEq)]
enum Region {
    /// 首部过渡段，参数为过渡段内的相对位置
    Bow(f64),
    /// 尾部过渡段
    Stern(f64),
    /// 平行中体
    Midbody,
}

fn region(geom: &DerivedGeometry, x: f64) -> Region {
    let x = x.clamp(0.0, geom.lbp);
    let bow = geom.bow_transition_length;
    let stern = geom.stern_transition_length;

    // 首尾过渡段重叠时首部优先
    if x < bow {
        Region::Bow((x / bow).clamp(0.0, 1.0))
    } else if x > geom.lbp - stern {
        Region::Stern(((geom.lbp - x) / stern).clamp(0.0, 1.0))
    } else {
        Region::Midbody
    }
}

/// `3t² - 2t³`，两端导数为零
fn smoothstep(t: f64) -> f64 {
    3.0 * t * t - 2.0 * t * t * t
}

/// 任意纵向位置的侧视轮廓高度
pub fn side_profile_z(geom: &DerivedGeometry, x: f64) -> f64 {
    match region(geom, x) {
        Region::Bow(t) | Region::Stern(t) => geom.keel_z + geom.draft * smoothstep(t),
        Region::Midbody => geom.keel_z + geom.draft,
    }
}

/// 任意纵向位置的半宽
pub fn half_breadth_y(geom: &DerivedGeometry, x: f64) -> f64 {
    match region(geom, x) {
        Region::Bow(t) | Region::Stern(t) => geom.half_beam * t.sqrt(),
        Region::Midbody => geom.half_beam,
    }
}

pub fn side_profile(
    geom: &DerivedGeometry,
    sample_count: usize,
) -> impl Iterator<Item = Point2> + '_ {
    stations(geom.lbp, sample_count).map(move |x| Point2::new(x, side_profile_z(geom, x)))
}

pub fn half_breadth(
    geom: &DerivedGeometry,
    sample_count: usize,
) -> impl Iterator<Item = Point2> + '_ {
    stations(geom.lbp, sample_count).map(move |x| Point2::new(x, half_breadth_y(geom, x)))
}

/// 球鼻艏半椭圆，角度 0°→180°
pub fn bulbous_bow(geom: &DerivedGeometry) -> Option<impl Iterator<Item = Point2>> {
    let keel = geom.keel_z;
    geom.bulb.map(move |bulb| {
        (0..=180).step_by(BULB_ANGLE_STEP_DEG).map(move |deg| {
            let angle = (deg as f64).to_radians();
            Point2::new(
                -bulb.length * angle.cos(),
                keel - bulb.height * angle.sin() * BULB_FLATTENING,
            )
        })
    })
}

/// 舭部三次混合，从龙骨点到 (r, keel + r)
pub fn bilge(geom: &DerivedGeometry) -> Option<impl Iterator<Item = Point2>> {
    let r = geom.bilge_radius;
    let keel = geom.keel_z;
    (r > 0.0).then(move || {
        let xs = [0.0, r * 0.4, r * 0.8, r];
        let zs = [keel, keel + r * 0.25, keel + r * 0.6, keel + r];
        (0..=BILGE_STEPS).map(move |i| {
            let t = i as f64 / BILGE_STEPS as f64;
            let w = bernstein3(t);
            Point2::new(
                w.iter().zip(xs).map(|(w, c)| w * c).sum(),
                w.iter().zip(zs).map(|(w, c)| w * c).sum(),
            )
        })
    })
}

/// 三次 Bernstein 基函数
fn bernstein3(t: f64) -> [f64; 4] {
    let u = 1.0 - t;
    [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t]
}
