//! 损失与评价指标.

use crate::consts::PROBABILITY_THRESHOLD;
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use serde::{Deserialize, Serialize};

/// 概率截断下限, 避免 `log(0)`.
pub const EPSILON: f32 = 1e-7;

/// 二元交叉熵. 预测概率先被截断到 `[EPSILON, 1 - EPSILON]`.
pub fn binary_cross_entropy<B: Backend>(pred: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
    let p = pred.clamp(EPSILON, 1.0 - EPSILON);
    let positive = target.clone() * p.clone().log();
    let negative = (target.neg() + 1.0) * (p.neg() + 1.0).log();
    (positive + negative).mean().neg()
}

/// 逐像素二值准确率: 预测与真值都以 0.5 为阈值.
pub fn binary_accuracy<B: Backend>(pred: Tensor<B, 4>, target: Tensor<B, 4>) -> f64 {
    let p = pred.greater_elem(PROBABILITY_THRESHOLD);
    let t = target.greater_elem(PROBABILITY_THRESHOLD);
    p.equal(t).float().mean().into_scalar().elem::<f64>()
}

/// 一组批次上的平均损失与准确率.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// 平均二元交叉熵.
    pub loss: f64,

    /// 平均逐像素准确率.
    pub accuracy: f64,
}

/// 按样本个数加权累积批次指标.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Meter {
    loss: f64,
    accuracy: f64,
    samples: usize,
}

impl Meter {
    pub(crate) fn push(&mut self, loss: f64, accuracy: f64, samples: usize) {
        self.loss += loss * samples as f64;
        self.accuracy += accuracy * samples as f64;
        self.samples += samples;
    }

    pub(crate) fn finish(&self) -> Evaluation {
        if self.samples == 0 {
            return Evaluation::default();
        }
        let n = self.samples as f64;
        Evaluation {
            loss: self.loss / n,
            accuracy: self.accuracy / n,
        }
    }
}
