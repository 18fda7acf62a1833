#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 基于 MRI 二维切片的胶质母细胞瘤分割流水线.
//!
//! 数据流: 目录 -> 离线预处理 (掩膜生成, 尺寸归一化) -> 成对批次供给 -> U 形网络
//! (训练 / 评估 / 推理) -> 单切片去噪, 或将整组切片预测堆叠为三维标量场并提取等值面.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 所有路径与常量都通过 [`PipelineConfig`] 传入, 没有进程级的可变状态.
//! 2. 致命错误都以 [`PipelineError`] 返回, 并携带出错的文件/目录/阶段.
//!   等值面为空不是错误.
//!
//! # 开发计划
//!
//! ### Otsu 二值化生成掩膜 ✅
//!
//! 在精确的 16 位直方图上计算 Otsu 阈值, 前景严格大于阈值.
//!
//! 实现位于 `glio-berry/src/prep/otsu.rs` 与 `glio-berry/src/prep/binarize.rs`.
//!
//! ### 尺寸归一化与灰度化 ✅
//!
//! 支持原地覆盖与输出到新目录两种方式.
//!
//! 实现位于 `glio-berry/src/prep/normalize.rs`.
//!
//! ### 成对批次供给 ✅
//!
//! 1. 图像/掩膜按文件名配对, 不对应时立即报错. ✅
//! 2. 每轮按种子打乱, 耗尽后循环或报错. ✅
//! 3. 批内并行解码 (`rayon` feature), 后台预取线程. ✅
//! 4. 协作式取消. ✅
//!
//! 实现位于 `glio-berry/src/dataset/*`.
//!
//! ### U 形编解码网络 ✅
//!
//! 四级编码, 四级解码, 跳跃连接. 奇数边长通过按分辨率推导的补零对齐.
//!
//! 实现位于 `glio-berry/src/net/*`.
//!
//! ### 形态学去噪 ✅
//!
//! 实现位于 `glio-berry/src/post_proc/morph.rs`.
//!
//! ### 体数据堆叠与等值面提取 ✅
//!
//! 实现位于 `glio-berry/src/data/volume.rs` 与 `glio-berry/src/surface/*`.
//!
//! ### 可视化输出 ✅
//!
//! 三栏对比 JPEG 与 plotly 三维网格页面.
//!
//! 实现位于 `glio-berry/src/viz/*`.
//!
//! ### 多类别分割 ⌛️
//!
//! 网络与损失已支持 `num_classes > 1`, 但对比图与体数据重建仍只取第一个通道.

/// 二维索引 (高, 宽).
pub type Idx2d = (usize, usize);

/// 三维索引 (高, 宽, 切片).
pub type Idx3d = (usize, usize, usize);

pub mod config;
pub mod consts;
pub mod data;
pub mod dataset;
pub mod error;
pub mod net;
pub mod post_proc;
pub mod prep;
pub mod surface;
pub mod viz;
pub mod workflow;

pub mod prelude;

pub use config::{ChannelMode, DecodePolicy, ExhaustionPolicy, PipelineConfig};
pub use data::{Rescale, Volume};
pub use error::{PipelineError, PipelineResult};
