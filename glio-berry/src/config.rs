//! 流水线配置对象.
//!
//! 所有路径和超参数都集中在 [`PipelineConfig`] 中, 并显式传入每个组件的构造函数.

use crate::consts::{
    BATCH_SIZE, DEFAULT_KERNEL, ISO_LEVEL, MASK_SUFFIX, TARGET_HEIGHT, TARGET_WIDTH,
    VOLUME_SLICES,
};
use crate::error::{PipelineError, PipelineResult};
use crate::Idx2d;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 图像解码失败时的处理策略.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodePolicy {
    /// 任何一个文件无法解码, 整批处理立即失败.
    #[default]
    Abort,

    /// 记录警告并跳过该文件.
    Skip,
}

/// 数据流样本耗尽时的处理策略.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExhaustionPolicy {
    /// 从头开始新一轮 (若开启打乱, 则重新打乱).
    #[default]
    Cycle,

    /// 返回 [`PipelineError::StreamExhausted`].
    Raise,
}

/// 送入网络的通道模式.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMode {
    /// 单通道亮度.
    #[default]
    Grayscale,

    /// 三通道 RGB.
    Rgb,
}

impl ChannelMode {
    /// 通道个数.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Grayscale => 1,
            Self::Rgb => 3,
        }
    }
}

/// 流水线配置.
///
/// `Default` 实现复现了原始流程中使用的全部常量.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 数据根目录, 其下有 `Training`, `Validation`, `Testing` 三个划分.
    pub data_root: PathBuf,

    /// 体数据切片目录.
    pub volume_image_dir: PathBuf,

    /// 体数据掩膜目录.
    pub volume_mask_dir: PathBuf,

    /// 模型文件路径.
    pub model_path: PathBuf,

    /// 输出目录 (预测图, 训练历史, HTML 网格).
    pub output_dir: PathBuf,

    /// 切片高.
    pub height: usize,

    /// 切片宽.
    pub width: usize,

    /// 每批样本数.
    pub batch_size: usize,

    /// 通道模式.
    pub channel_mode: ChannelMode,

    /// 训练轮数.
    pub epochs: usize,

    /// 每轮优化步数.
    pub steps_per_epoch: usize,

    /// 每轮验证批次数.
    pub validation_steps: usize,

    /// 测试批次数.
    pub test_steps: usize,

    /// 最深编码层的 dropout 比例.
    pub dropout: f64,

    /// Adam 学习率.
    pub learning_rate: f64,

    /// 第一层卷积核个数. 之后每层翻倍.
    pub base_filters: usize,

    /// 输出通道数.
    pub num_classes: usize,

    /// 后处理开运算结构元 (高, 宽).
    pub kernel: (usize, usize),

    /// 体数据切片个数.
    pub volume_slices: usize,

    /// 等值面阈值.
    pub iso_level: f32,

    /// 打乱样本使用的随机种子.
    pub seed: u64,

    /// 解码失败策略.
    pub decode_policy: DecodePolicy,

    /// 训练数据流耗尽策略.
    pub exhaustion_policy: ExhaustionPolicy,

    /// 预取队列容量. 为 0 时不启用预取线程.
    pub prefetch: usize,

    /// 生成掩膜时附加的文件名后缀.
    pub mask_suffix: String,

    /// 预测对比图文件名前缀.
    pub figure_label: String,

    /// 三维网格 HTML 文件名.
    pub mesh_file: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_root("dataset")
    }
}

impl PipelineConfig {
    /// 以 `root` 为数据根目录构建默认配置.
    ///
    /// 体数据目录为 `{root}/Volumes/{Image,Mask}`, 模型路径为
    /// `{root}/model/unet.glio`, 输出目录为 `{root}/output`.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            data_root: root.to_owned(),
            volume_image_dir: root.join("Volumes").join("Image"),
            volume_mask_dir: root.join("Volumes").join("Mask"),
            model_path: root.join("model").join("unet.glio"),
            output_dir: root.join("output"),
            height: TARGET_HEIGHT,
            width: TARGET_WIDTH,
            batch_size: BATCH_SIZE,
            channel_mode: ChannelMode::Grayscale,
            epochs: 50,
            steps_per_epoch: 10,
            validation_steps: 5,
            test_steps: 25,
            dropout: 0.5,
            learning_rate: 1e-4,
            base_filters: 64,
            num_classes: 1,
            kernel: DEFAULT_KERNEL,
            volume_slices: VOLUME_SLICES,
            iso_level: ISO_LEVEL,
            seed: 1,
            decode_policy: DecodePolicy::Abort,
            exhaustion_policy: ExhaustionPolicy::Cycle,
            prefetch: 0,
            mask_suffix: MASK_SUFFIX.to_owned(),
            figure_label: String::from("prediction"),
            mesh_file: String::from("volume.html"),
        }
    }

    /// 切片形状 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        (self.height, self.width)
    }

    /// 检查配置是否合法.
    ///
    /// # 注意
    ///
    /// 网络有 4 次 2 倍下采样, 因此高和宽都不能小于 16.
    pub fn validate(&self) -> PipelineResult<()> {
        fn reject(field: &'static str, reason: impl ToString) -> PipelineResult<()> {
            Err(PipelineError::InvalidConfig {
                field,
                reason: reason.to_string(),
            })
        }

        let min_side = 1 << crate::consts::DEPTH;
        if self.height < min_side {
            return reject("height", format!("must be at least {min_side}"));
        }
        if self.width < min_side {
            return reject("width", format!("must be at least {min_side}"));
        }
        if self.batch_size == 0 {
            return reject("batch_size", "must be positive");
        }
        if self.epochs == 0 {
            return reject("epochs", "must be positive");
        }
        if self.steps_per_epoch == 0 {
            return reject("steps_per_epoch", "must be positive");
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return reject("dropout", format!("{} is outside [0, 1)", self.dropout));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return reject("learning_rate", "must be a positive finite number");
        }
        if self.base_filters == 0 {
            return reject("base_filters", "must be positive");
        }
        if self.num_classes == 0 {
            return reject("num_classes", "must be positive");
        }
        if self.kernel.0 == 0 || self.kernel.1 == 0 {
            return reject("kernel", "both sides must be positive");
        }
        if self.volume_slices == 0 {
            return reject("volume_slices", "must be positive");
        }
        if !self.iso_level.is_finite() {
            return reject("iso_level", "must be finite");
        }
        if self.mask_suffix.is_empty() {
            return reject("mask_suffix", "must not be empty");
        }
        Ok(())
    }

    /// 从 JSON 文件读取配置. 缺失的字段取默认值.
    ///
    /// 没有给出的体数据目录, 模型路径与输出目录由 `data_root` 推导, 与 [`Self::with_root`] 一致.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let json_error = |e: serde_json::Error| PipelineError::InvalidConfig {
            field: "<json>",
            reason: format!("{}: {e}", path.display()),
        };
        let value: serde_json::Value = serde_json::from_str(&text).map_err(json_error)?;
        let mut config = Self::deserialize(&value).map_err(json_error)?;
        if let Some(given) = value.as_object() {
            config.derive_paths(given);
        }
        config.validate()?;
        Ok(config)
    }

    fn derive_paths(&mut self, given: &serde_json::Map<String, serde_json::Value>) {
        let derived = Self::with_root(&self.data_root);
        for (key, field, value) in [
            ("volume_image_dir", &mut self.volume_image_dir, derived.volume_image_dir),
            ("volume_mask_dir", &mut self.volume_mask_dir, derived.volume_mask_dir),
            ("model_path", &mut self.model_path, derived.model_path),
            ("output_dir", &mut self.output_dir, derived.output_dir),
        ] {
            if !given.contains_key(key) {
                *field = value;
            }
        }
    }

    /// 以 JSON 格式保存配置.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).map_err(|e| PipelineError::InvalidConfig {
            field: "<json>",
            reason: e.to_string(),
        })?;
        fs::write(path, text).map_err(|e| PipelineError::io(path, e))
    }
}
