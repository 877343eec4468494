//! HullGen 图纸输出
//!
//! 支持：
//! - 船体图纸模型（图层、线段、多段线、标注）
//! - `.dxf` 导出
//! - `.png` 预览图
//! - `.hgrec` 生成记录（MessagePack + Zstd）

pub mod drawing;
pub mod dxf_io;
pub mod emitter;
pub mod error;
pub mod preview;
pub mod record;

pub use drawing::{Color, DrawingEntity, HullDrawing, HullLayer, Layer, LayerTable, Shape};
pub use emitter::{DrawingEmitter, EmittedDrawing, EmitterOptions};
pub use error::DrawingError;
pub use preview::PreviewOptions;
pub use record::{GenerationRecord, GenerationStatus};
