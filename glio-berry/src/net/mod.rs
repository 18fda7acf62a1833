//! 分割网络: 结构, 训练, 评估, 推理与模型文件.
//!
//! 训练使用 `Autodiff<NdArray>` 后端, 评估与推理使用 `NdArray` 后端.

mod artifact;
mod infer;
mod metric;
mod model;
mod train;

pub use artifact::{load_artifact, save_artifact};
pub use infer::Predictor;
pub use metric::{binary_accuracy, binary_cross_entropy, Evaluation, EPSILON};
pub use model::{decoder_padding, ConvBlock, SegNet, SegNetConfig};
pub use train::{evaluate, train, EpochStats, TrainingReport};

use crate::error::{PipelineError, PipelineResult};
use burn::backend::{Autodiff, NdArray};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::Array4;

/// 推理后端.
pub type InferBackend = NdArray;

/// 训练后端.
pub type TrainBackend = Autodiff<NdArray>;

/// (N, C, H, W) 数组转张量.
pub fn array_to_tensor<B: Backend>(a: &Array4<f32>, device: &B::Device) -> Tensor<B, 4> {
    let (n, c, h, w) = a.dim();
    let data = TensorData::new(a.iter().copied().collect::<Vec<f32>>(), [n, c, h, w]);
    Tensor::from_data(data, device)
}

/// 张量转 (N, C, H, W) 数组.
pub fn tensor_to_array<B: Backend>(t: Tensor<B, 4>) -> PipelineResult<Array4<f32>> {
    let [n, c, h, w] = t.dims();
    let v = t
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| PipelineError::Backend {
            stage: "tensor readback",
            reason: format!("{e:?}"),
        })?;
    Array4::from_shape_vec((n, c, h, w), v).map_err(|e| PipelineError::Backend {
        stage: "tensor readback",
        reason: e.to_string(),
    })
}
