//! 生成流程
//!
//! 单次请求的状态流转：
//! 接收 → 分区 → 规则校验 →（存在严重违规则 FAILED）→ 推导几何 → 型线 → 输出图纸 → SUCCESS
//!
//! 每次请求独立执行，没有共享的可变状态，批量请求在 rayon 线程池上并行。

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::request::{GenerationRequest, GenerationResult, GeometrySummary};
use crate::store::{DesignStore, RuleSource};
use hullgen_core::curves::CurveSet;
use hullgen_core::hull::DerivedGeometry;
use hullgen_core::layout::LayoutZones;
use hullgen_core::rules::RuleEvaluator;
use hullgen_file::{DrawingEmitter, GenerationStatus};
use rayon::prelude::*;
use tracing::info;
use uuid::Uuid;

/// 未关联设计时的图纸名前缀
const DEFAULT_NAME_PREFIX: &str = "hull";

/// 船体图纸生成器
pub struct Generator {
    config: GeneratorConfig,
    rules: Box<dyn RuleSource>,
    emitter: DrawingEmitter,
    evaluator: RuleEvaluator,
}

impl Generator {
    pub fn new(config: GeneratorConfig, rules: impl RuleSource + 'static) -> Result<Self, GenerationError> {
        config.validate()?;
        let emitter = DrawingEmitter::with_options(config.output_dir.clone(), config.emitter_options());
        Ok(Self {
            config,
            rules: Box::new(rules),
            emitter,
            evaluator: RuleEvaluator::new(),
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// 生成图纸，名称自动取 `<设计编号>-<uuid>`
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, GenerationError> {
        let name = unique_name(request.design_id.as_deref());
        self.generate_named(request, &name)
    }

    /// 以指定名称生成图纸
    pub fn generate_named(
        &self,
        request: &GenerationRequest,
        name: &str,
    ) -> Result<GenerationResult, GenerationError> {
        info!(
            "Generation received: design={}, drawing={}",
            request.design_id.as_deref().unwrap_or("-"),
            name
        );

        let fraction = request
            .layout
            .map(|l| l.engine_room_fraction)
            .unwrap_or(self.config.engine_room_fraction);
        let layout = LayoutZones::partition(request.hull.loa, fraction)?;
        info!(
            "Layout built: cargo [{}, {}], engine room [{}, {}]",
            layout.cargo_zone.start, layout.cargo_zone.end, layout.engine_room.start, layout.engine_room.end
        );

        let rules = self.rules.active_rules().map_err(GenerationError::RuleStore)?;
        let violations = self.evaluator.evaluate(&layout, &request.raw_context(), &rules);
        let critical = violations.iter().filter(|v| v.is_critical()).count();
        info!(
            "Rules evaluated: {} rules, {} violations, {} critical",
            rules.len(),
            violations.len(),
            critical
        );

        if critical > 0 {
            info!("Generation failed: {} critical violations, no drawing written", critical);
            return Ok(GenerationResult::failed(layout, violations));
        }

        let geom = DerivedGeometry::build_with(&request.hull, &self.config.geometry_settings())?;
        let curves = CurveSet::generate(&geom, self.config.sample_count);
        info!("Geometry built: {} curves", curves.names().len());

        let emitted = self.emitter.emit(&geom, &curves, &layout, name)?;
        info!("Generation succeeded: {}", emitted.drawing_path.display());

        Ok(GenerationResult {
            status: GenerationStatus::Success,
            violations,
            layout,
            geometry: Some(GeometrySummary {
                derived: geom,
                curves: curves.names().into_iter().map(String::from).collect(),
            }),
            drawing_path: Some(emitted.drawing_path),
            preview_path: emitted.preview_path,
            curves: Some(curves),
        })
    }

    /// 从设计库读取设计后生成
    pub fn generate_for_design(
        &self,
        store: &dyn DesignStore,
        design_id: &str,
    ) -> Result<GenerationResult, GenerationError> {
        let record = store
            .load(design_id)
            .map_err(GenerationError::DesignStore)?
            .ok_or_else(|| GenerationError::MissingPrerequisite(format!("design {} not found", design_id)))?;
        self.generate(&record.to_request())
    }

    /// 并行生成多个请求，结果与请求一一对应
    pub fn generate_batch(
        &self,
        requests: &[GenerationRequest],
    ) -> Vec<Result<GenerationResult, GenerationError>> {
        info!("Batch generation: {} requests", requests.len());
        requests.par_iter().map(|request| self.generate(request)).collect()
    }
}

/// 只保留可用于文件名的字符
fn unique_name(design_id: Option<&str>) -> String {
    let prefix: String = design_id
        .map(|id| {
            id.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect()
        })
        .filter(|s: &String| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_NAME_PREFIX.to_string());
    format!("{}-{}", prefix, Uuid::new_v4())
}
