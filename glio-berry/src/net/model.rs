//! U 形编解码分割网络.

use crate::config::PipelineConfig;
use crate::consts::DEPTH;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::interpolate::{Interpolate2d, Interpolate2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Initializer, PaddingConfig2d};
use burn::tensor::activation::{relu, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 网络结构参数. 与权重一起保存在模型文件中.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegNetConfig {
    /// 输入通道数.
    pub in_channels: usize,

    /// 输出通道数.
    pub num_classes: usize,

    /// 第一层卷积核个数; 编码器各层依次为 1, 2, 4, 8 倍.
    pub base_filters: usize,

    /// 最深编码层的 dropout 比例.
    pub dropout: f64,

    /// 输入高.
    pub height: usize,

    /// 输入宽.
    pub width: usize,
}

impl SegNetConfig {
    /// 从流水线配置中提取网络结构参数.
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            in_channels: config.channel_mode.channels(),
            num_classes: config.num_classes,
            base_filters: config.base_filters,
            dropout: config.dropout,
            height: config.height,
            width: config.width,
        }
    }

    /// 初始化网络. 所有卷积层使用 He normal 初始化.
    pub fn init<B: Backend>(&self, device: &B::Device) -> SegNet<B> {
        let b = self.base_filters;
        let (f1, f2, f3, f4) = (b, 2 * b, 4 * b, 8 * b);
        SegNet {
            enc1: ConvBlock::new(self.in_channels, f1, device),
            enc2: ConvBlock::new(f1, f2, device),
            enc3: ConvBlock::new(f2, f3, device),
            enc4: ConvBlock::new(f3, f4, device),
            pool: MaxPool2dConfig::new([2, 2]).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            up: Interpolate2dConfig::new()
                .with_scale_factor(Some([2.0, 2.0]))
                .init(),
            dec5: ConvBlock::new(f4 + f4, f4, device),
            up6: conv(f4, f3, 2, PaddingConfig2d::Valid, device),
            dec6: ConvBlock::new(f3 + f3, f3, device),
            up7: conv(f3, f2, 2, PaddingConfig2d::Valid, device),
            dec7: ConvBlock::new(f2 + f2, f2, device),
            up8: conv(f2, f1, 2, PaddingConfig2d::Valid, device),
            dec8: ConvBlock::new(f1 + f1, f1, device),
            head: conv(f1, self.num_classes, 1, PaddingConfig2d::Valid, device),
        }
    }
}

/// 计算解码器各级的补齐量.
///
/// 编码器第 `i` 级输出边长为 `floor(n / 2^i)`. 解码器把第 `i + 1` 级特征上采样 2 倍后,
/// 与第 `i` 级特征拼接; 二者相差 `s_i - 2 * floor(s_i / 2)` 行 (或列), 补在底部 (或右侧).
///
/// # 返回值
///
/// 由最深一级到最浅一级的 `(补齐行数, 补齐列数)`.
pub fn decoder_padding(height: usize, width: usize) -> [(usize, usize); DEPTH] {
    let mut sizes = [(height, width); DEPTH];
    for i in 1..DEPTH {
        let (h, w) = sizes[i - 1];
        sizes[i] = (h / 2, w / 2);
    }
    let mut pads = [(0, 0); DEPTH];
    for (k, &(h, w)) in sizes.iter().rev().enumerate() {
        pads[k] = (h - 2 * (h / 2), w - 2 * (w / 2));
    }
    pads
}

fn conv<B: Backend>(
    input: usize,
    output: usize,
    kernel: usize,
    padding: PaddingConfig2d,
    device: &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([input, output], [kernel, kernel])
        .with_padding(padding)
        .with_initializer(Initializer::KaimingNormal {
            gain: std::f64::consts::SQRT_2,
            fan_out_only: false,
        })
        .init(device)
}

/// 两个 3x3 same 卷积, 各接 ReLU.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    first: Conv2d<B>,
    second: Conv2d<B>,
}

impl<B: Backend> ConvBlock<B> {
    fn new(input: usize, output: usize, device: &B::Device) -> Self {
        Self {
            first: conv(input, output, 3, PaddingConfig2d::Same, device),
            second: conv(output, output, 3, PaddingConfig2d::Same, device),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.first.forward(x));
        relu(self.second.forward(x))
    }
}

/// 分割网络.
///
/// 输入 (N, C, H, W), 输出 (N, num_classes, H, W) 的逐像素概率.
#[derive(Module, Debug)]
pub struct SegNet<B: Backend> {
    enc1: ConvBlock<B>,
    enc2: ConvBlock<B>,
    enc3: ConvBlock<B>,
    enc4: ConvBlock<B>,
    pool: MaxPool2d,
    dropout: Dropout,
    up: Interpolate2d,
    dec5: ConvBlock<B>,
    up6: Conv2d<B>,
    dec6: ConvBlock<B>,
    up7: Conv2d<B>,
    dec7: ConvBlock<B>,
    up8: Conv2d<B>,
    dec8: ConvBlock<B>,
    head: Conv2d<B>,
}

/// 在底部/右侧补零, 使 `x` 与 `skip` 空间尺寸一致, 然后按通道拼接 `[skip, x]`.
fn pad_and_merge<B: Backend>(skip: Tensor<B, 4>, x: Tensor<B, 4>) -> Tensor<B, 4> {
    let [_, _, sh, sw] = skip.dims();
    let [_, _, h, w] = x.dims();
    let x = if (h, w) == (sh, sw) {
        x
    } else {
        x.pad((0, sw.saturating_sub(w), 0, sh.saturating_sub(h)), 0.0)
    };
    Tensor::cat(vec![skip, x], 1)
}

impl<B: Backend> SegNet<B> {
    /// 2x2 "same" 卷积: 底部与右侧各补一行/列零, 再做 valid 卷积.
    fn up_conv(&self, conv: &Conv2d<B>, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.up.forward(x).pad((0, 1, 0, 1), 0.0);
        relu(conv.forward(x))
    }

    /// 前向传播, 输出逐像素概率.
    ///
    /// dropout 只在自动微分后端上生效.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let c1 = self.enc1.forward(x);
        let c2 = self.enc2.forward(self.pool.forward(c1.clone()));
        let c3 = self.enc3.forward(self.pool.forward(c2.clone()));
        let c4 = self.enc4.forward(self.pool.forward(c3.clone()));
        let d4 = self.dropout.forward(c4);
        let p4 = self.pool.forward(d4.clone());

        let x = self.dec5.forward(pad_and_merge(d4, self.up.forward(p4)));
        let x = self.dec6.forward(pad_and_merge(c3, self.up_conv(&self.up6, x)));
        let x = self.dec7.forward(pad_and_merge(c2, self.up_conv(&self.up7, x)));
        let x = self.dec8.forward(pad_and_merge(c1, self.up_conv(&self.up8, x)));
        sigmoid(self.head.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    #[test]
    fn test_decoder_padding() {
        assert_eq!(decoder_padding(425, 375), [(1, 0), (0, 1), (0, 1), (1, 1)]);
        assert_eq!(decoder_padding(256, 256), [(0, 0); 4]);
        assert_eq!(decoder_padding(21, 19), [(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn test_forward_shape_odd_resolution() {
        let device = Default::default();
        let config = SegNetConfig {
            in_channels: 1,
            num_classes: 1,
            base_filters: 2,
            dropout: 0.5,
            height: 21,
            width: 19,
        };
        let net = config.init::<NdArray>(&device);
        let x = Tensor::<NdArray, 4>::random([2, 1, 21, 19], Distribution::Default, &device);
        let y = net.forward(x);
        assert_eq!(y.dims(), [2, 1, 21, 19]);

        let v = y.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert!(v.iter().all(|p| (0.0..=1.0).contains(p)));
    }
}
