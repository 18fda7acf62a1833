//! 加载模型文件并对批次做前向推理.

use super::model::{SegNet, SegNetConfig};
use super::{array_to_tensor, load_artifact, tensor_to_array, InferBackend};
use crate::error::{PipelineError, PipelineResult};
use burn::tensor::backend::Backend;
use ndarray::Array4;
use std::path::Path;

/// 推理器: 持有一个已训练的网络.
#[derive(Debug)]
pub struct Predictor {
    model: SegNet<InferBackend>,
    config: SegNetConfig,
    device: <InferBackend as Backend>::Device,
}

impl Predictor {
    /// 从模型文件加载.
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let device = Default::default();
        let (model, config) = load_artifact::<InferBackend, _>(path.as_ref(), &device)?;
        log::info!(
            "loaded model `{}` ({}x{}, {} input channels)",
            path.as_ref().display(),
            config.height,
            config.width,
            config.in_channels
        );
        Ok(Self {
            model,
            config,
            device,
        })
    }

    /// 包装内存中的网络.
    pub fn from_model(model: SegNet<InferBackend>, config: SegNetConfig) -> Self {
        Self {
            model,
            config,
            device: Default::default(),
        }
    }

    /// 网络结构参数.
    #[inline]
    pub fn config(&self) -> &SegNetConfig {
        &self.config
    }

    /// 将 (N, C, H, W) 批次映射为 (N, num_classes, H, W) 概率图.
    ///
    /// 通道数或分辨率与网络不符时返回 [`PipelineError::InvalidConfig`].
    pub fn predict(&self, images: &Array4<f32>) -> PipelineResult<Array4<f32>> {
        let (_, c, h, w) = images.dim();
        let expected = (self.config.in_channels, self.config.height, self.config.width);
        if (c, h, w) != expected {
            return Err(PipelineError::InvalidConfig {
                field: "input",
                reason: format!("batch has shape {:?}, model expects {expected:?}", (c, h, w)),
            });
        }
        let x = array_to_tensor::<InferBackend>(images, &self.device);
        tensor_to_array(self.model.forward(x))
    }
}
