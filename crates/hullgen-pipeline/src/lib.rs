//! HullGen 生成流程
//!
//! 把核心引擎和图纸输出串成一次完整的生成：
//! - `config`: 生成器配置
//! - `request`: 请求与结果
//! - `store`: 设计库、规则库接口及实现
//! - `generator`: 单次 / 批量生成

pub mod config;
pub mod error;
pub mod generator;
pub mod request;
pub mod store;

pub use config::GeneratorConfig;
pub use error::{ErrorResponse, GenerationError, StoreError};
pub use generator::Generator;
pub use request::{GenerationRequest, GenerationResult, GeometrySummary, LayoutParameters};
pub use store::{DesignRecord, DesignStore, DirectoryDesignStore, JsonRuleStore, MemoryDesignStore, RuleSource};
