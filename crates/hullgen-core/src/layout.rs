//! 纵向功能分区
//!
//! 将 `[0, LOA]` 切分为货舱区和机舱区，机舱位于船尾一侧的 `fraction · LOA`。

use crate::error::HullError;
use crate::expr::{Context, Value};
use serde::{Deserialize, Serialize};

/// 默认机舱长度占比
pub const DEFAULT_ENGINE_ROOM_FRACTION: f64 = 0.15;

/// 半开区间 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub start: f64,
    pub end: f64,
}

impl Zone {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.start && x < self.end
    }
}

/// 功能分区结果
///
/// 不变式：`cargo_zone.start == 0`，`cargo_zone.end == engine_room.start`，
/// `engine_room.end == loa`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutZones {
    pub cargo_zone: Zone,
    pub engine_room: Zone,
}

impl LayoutZones {
    /// 按默认占比分区
    pub fn from_loa(loa: f64) -> Result<Self, HullError> {
        Self::partition(loa, DEFAULT_ENGINE_ROOM_FRACTION)
    }

    pub fn partition(loa: f64, engine_room_fraction: f64) -> Result<Self, HullError> {
        if !loa.is_finite() || loa <= 0.0 {
            return Err(HullError::InvalidGeometry {
                field: "loa",
                reason: format!("must be positive, got {}", loa),
            });
        }
        if !(0.0..=1.0).contains(&engine_room_fraction) {
            return Err(HullError::InvalidGeometry {
                field: "engine_room_fraction",
                reason: format!("must lie in [0, 1], got {}", engine_room_fraction),
            });
        }

        let engine_room_length = engine_room_fraction * loa;
        let cargo_length = loa - engine_room_length;

        Ok(Self {
            cargo_zone: Zone::new(0.0, cargo_length),
            engine_room: Zone::new(cargo_length, loa),
        })
    }

    pub fn loa(&self) -> f64 {
        self.engine_room.end
    }

    /// 分区字段展开为规则上下文
    pub fn context_fields(&self) -> Context {
        let mut context = Context::new();
        for (prefix, zone) in [("cargo_zone", self.cargo_zone), ("engine_room", self.engine_room)] {
            context.insert(format!("{}_start", prefix), Value::Float(zone.start));
            context.insert(format!("{}_end", prefix), Value::Float(zone.end));
            context.insert(format!("{}_length", prefix), Value::Float(zone.length()));
        }
        context
    }
}
