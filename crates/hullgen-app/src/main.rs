//! HullGen 命令行入口
//!
//! 读取生成请求（或设计库中的设计），执行一次生成，把 JSON 结果打印到 stdout。
//! 退出码：0 成功，2 存在严重违规，1 出错。

mod logging;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hullgen_core::rules::Rule;
use hullgen_file::record;
use hullgen_file::record::RECORD_EXTENSION;
use hullgen_pipeline::{
    DirectoryDesignStore, ErrorResponse, GenerationError, GenerationRequest, GenerationResult,
    Generator, GeneratorConfig, JsonRuleStore,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

/// 一次命令的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    /// 存在严重违规
    Failed,
    Error,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::from(2),
            Outcome::Error => ExitCode::FAILURE,
        }
    }
}

#[derive(Parser)]
#[command(name = "hullgen")]
#[command(about = "Parametric hull drawing generator with rule validation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a drawing from a request file
    Generate {
        /// Generation request (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Fixed drawing name instead of a generated unique one
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Generate a drawing for a saved design
    Design {
        /// Directory holding `<id>.json` design files
        #[arg(short, long)]
        store: PathBuf,

        /// Design id
        #[arg(long)]
        id: String,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Rule file (JSON array); without it no rules are checked
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Generator config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory, overrides the config
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write a PNG preview
    #[arg(long)]
    preview: bool,

    /// Save a generation record next to the drawing
    #[arg(long)]
    record: bool,
}

impl CommonArgs {
    fn load_config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };
        apply_overrides(&mut config, self.output_dir.as_deref(), self.preview);
        Ok(config)
    }

    fn generator(&self) -> Result<Generator> {
        let config = self.load_config()?;
        let generator = match &self.rules {
            Some(path) => Generator::new(config, JsonRuleStore::new(path))?,
            None => Generator::new(config, Vec::<Rule>::new())?,
        };
        Ok(generator)
    }
}

/// 命令行参数覆盖配置文件
fn apply_overrides(config: &mut GeneratorConfig, output_dir: Option<&Path>, preview: bool) {
    if let Some(dir) = output_dir {
        config.output_dir = dir.to_path_buf();
    }
    if preview {
        config.raster_preview = true;
    }
}

/// 记录文件路径：有图纸时与图纸同名，否则放在输出目录
fn record_path(result: &GenerationResult, output_dir: &Path, file_name: &str) -> PathBuf {
    match &result.drawing_path {
        Some(drawing) => drawing.with_extension(RECORD_EXTENSION),
        None => output_dir.join(file_name),
    }
}

fn read_request(path: &Path) -> Result<GenerationRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse request {}", path.display()))
}

fn run(cli: Cli) -> Result<Outcome> {
    let (generator, common, outcome) = match &cli.command {
        Commands::Generate { input, name, common } => {
            let request = read_request(input)?;
            let generator = common.generator()?;
            let outcome = match name {
                Some(name) => generator.generate_named(&request, name),
                None => generator.generate(&request),
            };
            (generator, common, outcome)
        }
        Commands::Design { store, id, common } => {
            let generator = common.generator()?;
            let outcome = generator.generate_for_design(&DirectoryDesignStore::new(store), id);
            (generator, common, outcome)
        }
    };

    report(&generator, common, outcome)
}

fn report(
    generator: &Generator,
    common: &CommonArgs,
    outcome: Result<GenerationResult, GenerationError>,
) -> Result<Outcome> {
    match outcome {
        Ok(result) => {
            if common.record {
                let rec = result.to_record();
                std::fs::create_dir_all(&generator.config().output_dir)?;
                let path = record_path(&result, &generator.config().output_dir, &rec.file_name());
                record::save(&rec, &path)?;
            }
            println!("{}", serde_json::to_string_pretty(&result)?);

            if result.is_success() {
                Ok(Outcome::Success)
            } else {
                info!("{} critical violations", result.critical_count());
                Ok(Outcome::Failed)
            }
        }
        Err(e) => {
            error!("Generation error ({}): {}", e.status_code(), e);
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            Ok(Outcome::Error)
        }
    }
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    info!("Starting HullGen...");

    match run(cli) {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
