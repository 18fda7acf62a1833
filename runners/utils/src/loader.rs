//! 对 `glio-berry::config` 的更一层封装. 从环境变量或用户主目录得到运行配置.

use glio_berry::dataset::home_dataset_dir_with;
use glio_berry::{PipelineConfig, PipelineError, PipelineResult};
use std::env;
use std::path::PathBuf;

/// 数据根目录的环境变量.
pub const DATA_DIR_VAR: &str = "GLIO_DATA_DIR";

/// 模型文件路径的环境变量.
pub const MODEL_PATH_VAR: &str = "GLIO_MODEL_PATH";

/// 输出目录的环境变量.
pub const OUTPUT_DIR_VAR: &str = "GLIO_OUTPUT_DIR";

/// 非空的环境变量值.
fn var(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// 获取数据根目录.
///
/// 1. 若环境变量 `$GLIO_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/glio`.
pub fn data_dir_from_env_or_home() -> Option<PathBuf> {
    var(DATA_DIR_VAR).or_else(|| home_dataset_dir_with(["glio"]))
}

/// 以数据根目录构建默认配置, 再用 `$GLIO_MODEL_PATH` 与 `$GLIO_OUTPUT_DIR` (若有) 覆盖.
///
/// 无法确定数据根目录 (既没有环境变量, 也找不到用户主目录) 时返回
/// [`PipelineError::InvalidConfig`].
pub fn config_from_env_or_home() -> PipelineResult<PipelineConfig> {
    let root = data_dir_from_env_or_home().ok_or_else(|| PipelineError::InvalidConfig {
        field: "data_root",
        reason: format!("`${DATA_DIR_VAR}` is unset and the home directory is unknown"),
    })?;
    let mut config = PipelineConfig::with_root(root);
    if let Some(p) = var(MODEL_PATH_VAR) {
        config.model_path = p;
    }
    if let Some(p) = var(OUTPUT_DIR_VAR) {
        config.output_dir = p;
    }
    Ok(config)
}
