//! 命令行参数与子命令调度.

use crate::result::{Outcome, RunResult};
use clap::{Args, Parser, Subcommand, ValueEnum};
use glio_berry::dataset::CancelToken;
use glio_berry::prep::{OutputTarget, ResizeFilter};
use glio_berry::workflow;
use glio_berry::{PipelineConfig, PipelineError, PipelineResult};
use std::path::PathBuf;
use std::time::Instant;
use utils::loader;

#[derive(Parser, Debug)]
#[command(name = "pipeline")]
#[command(about = "胶质母细胞瘤 MRI 切片分割流水线: 预处理, 训练, 预测, 三维重建.")]
#[command(version, long_about = None)]
pub struct Cli {
    /// JSON 配置文件. 缺省时由 `$GLIO_DATA_DIR` 等环境变量或 `$HOME/dataset/glio` 推导.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// 日志级别.
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// 子命令.
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 以 Otsu 阈值为目录下每张切片生成二值掩膜.
    Masks(MasksArgs),
    /// 将目录下每张图像缩放到配置的分辨率.
    Resize(ResizeArgs),
    /// 将目录下每张图像转为单通道.
    Grayscale(GrayscaleArgs),
    /// 训练网络, 保存模型并评估测试集.
    Train,
    /// 在测试集上生成预测对比图.
    Predict(PredictArgs),
    /// 预测体数据并输出三维网格页面.
    Volume,
    /// 打印 (或保存) 生效的配置.
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct MasksArgs {
    /// 原始切片目录.
    input: PathBuf,
    /// 掩膜输出目录.
    output: PathBuf,
}

#[derive(Args, Debug)]
struct ResizeArgs {
    /// 图像目录.
    dir: PathBuf,
    /// 输出目录. 缺省时原地覆盖.
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
    /// 插值方式.
    #[arg(long, value_enum, default_value_t = Filter::Nearest)]
    filter: Filter,
}

#[derive(Args, Debug)]
struct GrayscaleArgs {
    /// 图像目录.
    dir: PathBuf,
    /// 输出目录. 缺省时原地覆盖.
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// 对比图张数.
    #[arg(long, short = 'n', default_value_t = 50)]
    count: usize,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// 将配置写到该 JSON 文件.
    #[arg(long, short = 'w')]
    write: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Filter {
    Nearest,
    Triangle,
    CatmullRom,
}

impl From<Filter> for ResizeFilter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::Level {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

#[inline]
fn target(out: &Option<PathBuf>) -> OutputTarget {
    match out {
        Some(p) => OutputTarget::Dir(p.clone()),
        None => OutputTarget::InPlace,
    }
}

impl Cli {
    /// 日志级别.
    #[inline]
    pub fn log_level(&self) -> log::Level {
        self.log_level.into()
    }

    /// 生效的配置: 命令行给出的 JSON 文件, 否则由环境变量推导.
    fn resolve_config(&self) -> PipelineResult<PipelineConfig> {
        let config = match &self.config {
            Some(p) => PipelineConfig::from_json_file(p)?,
            None => loader::config_from_env_or_home()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// 运行子命令.
    ///
    /// 命令行入口不安装信号处理, 这里的取消令牌永远不会被触发.
    /// 需要中途停止时, 由调用方持有令牌并使用 [`Cli::run_with`].
    pub fn run(&self) -> Result<RunResult, PipelineError> {
        self.run_with(&CancelToken::new())
    }

    /// 运行子命令, 在每个批次边界检查 `cancel`.
    pub fn run_with(&self, cancel: &CancelToken) -> Result<RunResult, PipelineError> {
        let config = self.resolve_config()?;
        let start = Instant::now();
        let (name, outcome) = match &self.command {
            Commands::Masks(a) => (
                "masks",
                Outcome::Files(workflow::prepare_masks(&config, &a.input, &a.output)?),
            ),
            Commands::Resize(a) => (
                "resize",
                Outcome::Files(workflow::normalize_dir(
                    &config,
                    &a.dir,
                    &target(&a.out),
                    a.filter.into(),
                )?),
            ),
            Commands::Grayscale(a) => (
                "grayscale",
                Outcome::Files(workflow::grayscale(&config, &a.dir, &target(&a.out))?),
            ),
            Commands::Train => (
                "train",
                Outcome::Training(workflow::train_and_evaluate(&config, cancel)?),
            ),
            Commands::Predict(a) => (
                "predict",
                Outcome::Figures(workflow::predict_figures(&config, a.count, cancel)?),
            ),
            Commands::Volume => (
                "volume",
                Outcome::Volume(workflow::visualize_volume(&config, cancel)?),
            ),
            Commands::Config(a) => {
                if let Some(p) = &a.write {
                    config.save_json(p)?;
                }
                ("config", Outcome::Config(Box::new(config)))
            }
        };
        Ok(RunResult::new(name, outcome, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["pipeline", "resize", "d", "-o", "out", "--filter", "catmull-rom"]);
        match cli.command {
            Commands::Resize(a) => {
                assert_eq!(a.dir, PathBuf::from("d"));
                assert_eq!(a.out, Some(PathBuf::from("out")));
                assert_eq!(a.filter, Filter::CatmullRom);
            }
            other => panic!("unexpected: {other:?}"),
        }
        let cli = Cli::parse_from(["pipeline", "--log-level", "debug", "predict", "-n", "3"]);
        assert_eq!(cli.log_level(), log::Level::Debug);
        assert!(matches!(cli.command, Commands::Predict(PredictArgs { count: 3 })));
    }

    #[test]
    fn test_run_with_cancelled_token() {
        let root = tempfile::tempdir().unwrap();
        for split in ["Training", "Validation", "Testing"] {
            for (side, name) in [("Image", "s0.png"), ("Mask", "s0-Mask.png")] {
                let dir = root.path().join(split).join(side);
                std::fs::create_dir_all(&dir).unwrap();
                std::fs::write(dir.join(name), b"").unwrap();
            }
        }
        let config = root.path().join("config.json");
        PipelineConfig::with_root(root.path())
            .save_json(&config)
            .unwrap();

        let cli = Cli::parse_from(["pipeline", "-c", config.to_str().unwrap(), "train"]);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            cli.run_with(&cancel),
            Err(PipelineError::Cancelled { .. })
        ));
        assert!(!root.path().join("model").exists());
    }
}
