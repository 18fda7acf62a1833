//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 掩膜背景的像素值.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 掩膜前景 (肿瘤) 的像素值. 经 `1/255` 缩放后恰为 `1.0`.
    pub const MASK_FOREGROUND: u8 = 255;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;
}

/// 网络输入切片的高.
pub const TARGET_HEIGHT: usize = 425;

/// 网络输入切片的宽.
pub const TARGET_WIDTH: usize = 375;

/// 训练/评估时每批样本数.
pub const BATCH_SIZE: usize = 2;

/// 一个体数据包含的切片个数.
pub const VOLUME_SLICES: usize = 192;

/// 等值面提取的阈值.
pub const ISO_LEVEL: f32 = 0.5;

/// 由原始切片生成掩膜时附加的文件名后缀.
pub const MASK_SUFFIX: &str = "-Mask.png";

/// 后处理开运算默认结构元大小 (高, 宽).
pub const DEFAULT_KERNEL: (usize, usize) = (3, 3);

/// 编码器下采样级数.
pub const DEPTH: usize = 4;

/// 二值化预测概率图时使用的阈值.
pub const PROBABILITY_THRESHOLD: f32 = 0.5;
