//! 成对批次供给器.

use super::{CancelToken, Manifest};
use crate::config::{ChannelMode, ExhaustionPolicy, PipelineConfig};
use crate::data::{image_to_planes, open_image, Rescale};
use crate::error::{PipelineError, PipelineResult};
use ndarray::{Array3, Array4, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 一个批次. `images` 与 `masks` 的布局都是 (N, C, H, W).
#[derive(Clone, Debug)]
pub struct Batch {
    /// 图像, 通道数由 [`ChannelMode`] 决定.
    pub images: Array4<f32>,

    /// 掩膜, 单通道.
    pub masks: Array4<f32>,

    /// 每个样本在清单中的索引.
    pub indices: Vec<usize>,
}

impl Batch {
    /// 样本个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// 是否为空批次?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// 能够逐批产出样本的数据流.
pub trait BatchSource {
    /// 产出下一批样本.
    fn next_batch(&mut self) -> PipelineResult<Batch>;

    /// 数据流名称, 用于日志和错误信息.
    fn name(&self) -> &str;
}

/// 供给器选项.
#[derive(Clone, Debug)]
pub struct FeederOptions {
    /// 数据流名称.
    pub name: String,

    /// 每批样本数.
    pub batch_size: usize,

    /// 目标 (高, 宽).
    pub shape: (usize, usize),

    /// 图像通道模式. 掩膜总是单通道.
    pub channel_mode: ChannelMode,

    /// 是否在每一轮开始时打乱.
    pub shuffle: bool,

    /// 打乱使用的随机种子.
    pub seed: u64,

    /// 一轮结束后的策略.
    pub exhaustion: ExhaustionPolicy,

    /// 像素缩放.
    pub rescale: Rescale,
}

impl FeederOptions {
    /// 从流水线配置构建.
    pub fn from_config<S: Into<String>>(config: &PipelineConfig, name: S, shuffle: bool) -> Self {
        Self {
            name: name.into(),
            batch_size: config.batch_size,
            shape: config.shape(),
            channel_mode: config.channel_mode,
            shuffle,
            seed: config.seed,
            exhaustion: config.exhaustion_policy,
            rescale: Rescale::unit(),
        }
    }

    /// 修改每批样本数.
    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// 修改耗尽策略.
    #[inline]
    pub fn with_exhaustion(mut self, exhaustion: ExhaustionPolicy) -> Self {
        self.exhaustion = exhaustion;
        self
    }
}

/// 由配对清单驱动的批次供给器.
///
/// 图像与掩膜来自同一个清单条目, 因此永远同步. 每一轮的顺序要么是清单顺序,
/// 要么是由种子决定的打乱顺序; 一轮的最后一批可能不足 `batch_size`.
#[derive(Debug)]
pub struct PairedFeeder {
    manifest: Manifest,
    options: FeederOptions,
    order: Vec<usize>,
    cursor: usize,
    pass: usize,
    served: usize,
    rng: ChaCha8Rng,
    cancel: Option<CancelToken>,
}

impl PairedFeeder {
    /// 构建供给器.
    ///
    /// `batch_size` 为 0 时返回 [`PipelineError::InvalidConfig`].
    pub fn new(manifest: Manifest, options: FeederOptions) -> PipelineResult<Self> {
        if options.batch_size == 0 {
            return Err(PipelineError::InvalidConfig {
                field: "batch_size",
                reason: String::from("must be positive"),
            });
        }
        let mut feeder = Self {
            order: Vec::with_capacity(manifest.len()),
            rng: ChaCha8Rng::seed_from_u64(options.seed),
            manifest,
            options,
            cursor: 0,
            pass: 0,
            served: 0,
            cancel: None,
        };
        feeder.begin_pass();
        Ok(feeder)
    }

    /// 附加取消信号. 每个批次开始前都会检查它.
    #[inline]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// 重新开始: 回到第一轮, 随机状态复位.
    pub fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.options.seed);
        self.pass = 0;
        self.served = 0;
        self.begin_pass();
    }

    /// 清单.
    #[inline]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// 选项.
    #[inline]
    pub fn options(&self) -> &FeederOptions {
        &self.options
    }

    /// 已产出的样本个数.
    #[inline]
    pub fn served(&self) -> usize {
        self.served
    }

    /// 当前是第几轮 (从 0 开始).
    #[inline]
    pub fn pass(&self) -> usize {
        self.pass
    }

    /// 一轮包含的批次数.
    #[inline]
    pub fn batches_per_pass(&self) -> usize {
        self.manifest.len().div_ceil(self.options.batch_size)
    }

    fn begin_pass(&mut self) {
        self.order.clear();
        self.order.extend(0..self.manifest.len());
        if self.options.shuffle {
            self.order.shuffle(&mut self.rng);
        }
        self.cursor = 0;
    }

    /// 读取清单中第 `index` 对样本.
    fn load(&self, index: usize) -> PipelineResult<(Array3<f32>, Array3<f32>)> {
        // 由 `self.order` 生成的索引不会越界.
        let pair = &self.manifest.pairs()[index];
        let opt = &self.options;
        let image = image_to_planes(
            &open_image(&pair.image)?,
            opt.channel_mode,
            opt.shape,
            &opt.rescale,
        );
        let mask = image_to_planes(
            &open_image(&pair.mask)?,
            ChannelMode::Grayscale,
            opt.shape,
            &opt.rescale,
        );
        Ok((image, mask))
    }

    /// 按顺序读取 `indices` 指向的全部样本.
    fn load_all(&self, indices: &[usize]) -> PipelineResult<Vec<(Array3<f32>, Array3<f32>)>> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                indices.par_iter().map(|&i| self.load(i)).collect()
            } else {
                indices.iter().map(|&i| self.load(i)).collect()
            }
        }
    }
}

impl BatchSource for PairedFeeder {
    /// 产出下一批.
    ///
    /// # 返回值
    ///
    /// 1. 取消信号已触发: [`PipelineError::Cancelled`].
    /// 2. 一轮已结束且策略为 [`ExhaustionPolicy::Raise`]: [`PipelineError::StreamExhausted`].
    /// 3. 样本无法解码: [`PipelineError::Decode`].
    fn next_batch(&mut self) -> PipelineResult<Batch> {
        if let Some(c) = &self.cancel {
            c.check("feeding")?;
        }
        if self.cursor >= self.order.len() {
            match self.options.exhaustion {
                ExhaustionPolicy::Cycle => {
                    self.pass += 1;
                    self.begin_pass();
                    log::debug!("`{}` starts pass {}", self.options.name, self.pass);
                }
                ExhaustionPolicy::Raise => {
                    return Err(PipelineError::StreamExhausted {
                        split: self.options.name.clone(),
                        served: self.served,
                    })
                }
            }
        }

        let end = (self.cursor + self.options.batch_size).min(self.order.len());
        let indices = self.order[self.cursor..end].to_vec();
        let samples = self.load_all(&indices)?;
        self.cursor = end;
        self.served += indices.len();

        let (h, w) = self.options.shape;
        let c = self.options.channel_mode.channels();
        let mut images = Array4::<f32>::zeros((indices.len(), c, h, w));
        let mut masks = Array4::<f32>::zeros((indices.len(), 1, h, w));
        for (k, (img, msk)) in samples.into_iter().enumerate() {
            images.index_axis_mut(Axis(0), k).assign(&img);
            masks.index_axis_mut(Axis(0), k).assign(&msk);
        }
        Ok(Batch {
            images,
            masks,
            indices,
        })
    }

    #[inline]
    fn name(&self) -> &str {
        &self.options.name
    }
}

/// 迭代直到出错; [`PipelineError::StreamExhausted`] 被视为正常结束.
impl Iterator for PairedFeeder {
    type Item = PipelineResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_batch() {
            Err(PipelineError::StreamExhausted { .. }) => None,
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::path::Path;

    /// 在 `root` 下生成 `n` 对 6x5 的样本, 第 `i` 张图像的像素值均为 `i * 10`.
    fn fixture(root: &Path, n: usize) -> Manifest {
        let (img, msk) = (root.join("Image"), root.join("Mask"));
        std::fs::create_dir_all(&img).unwrap();
        std::fs::create_dir_all(&msk).unwrap();
        for i in 0..n {
            GrayImage::from_pixel(5, 6, Luma([(i * 10) as u8]))
                .save(img.join(format!("s{i:02}.png")))
                .unwrap();
            GrayImage::from_pixel(5, 6, Luma([if i % 2 == 0 { 255 } else { 0 }]))
                .save(msk.join(format!("s{i:02}-Mask.png")))
                .unwrap();
        }
        Manifest::build(&img, &msk, "-Mask.png").unwrap()
    }

    fn options(shuffle: bool, exhaustion: ExhaustionPolicy) -> FeederOptions {
        FeederOptions {
            name: String::from("test"),
            batch_size: 2,
            shape: (6, 5),
            channel_mode: ChannelMode::Grayscale,
            shuffle,
            seed: 7,
            exhaustion,
            rescale: Rescale::unit(),
        }
    }

    #[test]
    fn test_lockstep_and_short_batch() {
        let dir = tempfile::tempdir().unwrap();
        let m = fixture(dir.path(), 5);
        let mut f = PairedFeeder::new(m, options(false, ExhaustionPolicy::Raise)).unwrap();
        assert_eq!(f.batches_per_pass(), 3);

        let mut lens = Vec::new();
        for batch in f.by_ref() {
            let b = batch.unwrap();
            assert_eq!(b.images.dim().0, b.masks.dim().0);
            let ((_, _, ih, iw), (_, _, mh, mw)) = (b.images.dim(), b.masks.dim());
            assert_eq!((ih, iw), (mh, mw));
            for (k, &i) in b.indices.iter().enumerate() {
                let pix = b.images[(k, 0, 0, 0)];
                assert!((pix - (i * 10) as f32 / 255.0).abs() < 1e-6);
                let m = b.masks[(k, 0, 0, 0)];
                assert_eq!(m, if i % 2 == 0 { 1.0 } else { 0.0 });
            }
            lens.push(b.len());
        }
        assert_eq!(lens, [2, 2, 1]);
        assert!(matches!(
            f.next_batch(),
            Err(PipelineError::StreamExhausted { served: 5, .. })
        ));
    }

    #[test]
    fn test_cycle_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let m = fixture(dir.path(), 3);
        let mut f = PairedFeeder::new(m, options(true, ExhaustionPolicy::Cycle)).unwrap();
        let first: Vec<usize> = (0..2)
            .flat_map(|_| f.next_batch().unwrap().indices)
            .collect();
        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, [0, 1, 2]);

        // 第二轮仍然产出数据.
        assert!(!f.next_batch().unwrap().is_empty());
        assert_eq!(f.pass(), 1);

        f.reset();
        let again: Vec<usize> = (0..2)
            .flat_map(|_| f.next_batch().unwrap().indices)
            .collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let m = fixture(dir.path(), 2);
        let token = CancelToken::new();
        let mut f = PairedFeeder::new(m, options(false, ExhaustionPolicy::Cycle))
            .unwrap()
            .with_cancel(token.clone());
        assert!(f.next_batch().is_ok());
        token.cancel();
        assert!(matches!(
            f.next_batch(),
            Err(PipelineError::Cancelled { .. })
        ));
    }
}
