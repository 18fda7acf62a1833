//! 训练与评估.

use super::metric::{binary_accuracy, binary_cross_entropy, Evaluation, Meter};
use super::model::{SegNet, SegNetConfig};
use super::{array_to_tensor, save_artifact, InferBackend, TrainBackend};
use crate::config::PipelineConfig;
use crate::dataset::{BatchSource, CancelToken};
use crate::error::{PipelineError, PipelineResult};
use burn::module::{AutodiffModule, Module};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// 一轮训练的统计.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 轮次, 从 1 开始.
    pub epoch: usize,

    /// 训练批次上的平均指标.
    pub train: Evaluation,

    /// 验证批次上的平均指标. 验证步数为 0 时没有.
    pub validation: Option<Evaluation>,
}

/// 一次完整训练的结果.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// 逐轮历史.
    pub history: Vec<EpochStats>,

    /// 测试集评估.
    pub test: Evaluation,

    /// 模型文件路径.
    pub artifact: PathBuf,
}

impl TrainingReport {
    /// 以 CSV 格式写出训练历史.
    ///
    /// 列为 `epoch,loss,accuracy,val_loss,val_accuracy`; 没有验证数据时后两列留空.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        let path = path.as_ref();
        let io = |e| PipelineError::io(path, e);
        let mut out = BufWriter::new(File::create(path).map_err(io)?);
        writeln!(out, "epoch,loss,accuracy,val_loss,val_accuracy").map_err(io)?;
        for s in &self.history {
            let (vl, va) = match s.validation {
                Some(v) => (v.loss.to_string(), v.accuracy.to_string()),
                None => (String::new(), String::new()),
            };
            writeln!(
                out,
                "{},{},{},{vl},{va}",
                s.epoch, s.train.loss, s.train.accuracy
            )
            .map_err(io)?;
        }
        out.flush().map_err(io)
    }
}

/// 在 `source` 的 `steps` 个批次上评估模型.
pub fn evaluate<B: Backend>(
    model: &SegNet<B>,
    source: &mut dyn BatchSource,
    steps: usize,
    cancel: &CancelToken,
) -> PipelineResult<Evaluation> {
    let device = Default::default();
    let mut meter = Meter::default();
    for _ in 0..steps {
        cancel.check("evaluation")?;
        let batch = source.next_batch()?;
        let x = array_to_tensor::<B>(&batch.images, &device);
        let y = array_to_tensor::<B>(&batch.masks, &device);
        let pred = model.forward(x);
        let loss = binary_cross_entropy(pred.clone(), y.clone())
            .into_scalar()
            .elem::<f64>();
        meter.push(loss, binary_accuracy(pred, y), batch.len());
    }
    Ok(meter.finish())
}

/// 训练网络, 保存模型, 然后在测试数据流上评估.
///
/// 恰好执行 `epochs * steps_per_epoch` 次优化, 没有提前停止. 每轮结束后在验证数据流上评估
/// `validation_steps` 个批次. 训练结束后模型无条件写到 `config.model_path` (覆盖旧文件),
/// 再在测试数据流上评估 `test_steps` 个批次.
///
/// # 注意
///
/// 每个批次开始前都会检查 `cancel`; 取消时不会保存模型.
pub fn train(
    config: &PipelineConfig,
    training: &mut dyn BatchSource,
    validation: &mut dyn BatchSource,
    test: &mut dyn BatchSource,
    cancel: &CancelToken,
) -> PipelineResult<TrainingReport> {
    config.validate()?;
    let device = Default::default();
    let net_config = SegNetConfig::from_pipeline(config);
    let mut model = net_config.init::<TrainBackend>(&device);
    let mut optim = AdamConfig::new().with_epsilon(1e-7).init();
    log::info!(
        "training {} epochs x {} steps on `{}` ({} parameters)",
        config.epochs,
        config.steps_per_epoch,
        training.name(),
        model.num_params()
    );

    let mut history = Vec::with_capacity(config.epochs);
    for epoch in 1..=config.epochs {
        let mut meter = Meter::default();
        for _ in 0..config.steps_per_epoch {
            cancel.check("training")?;
            let batch = training.next_batch()?;
            let x = array_to_tensor::<TrainBackend>(&batch.images, &device);
            let y = array_to_tensor::<TrainBackend>(&batch.masks, &device);
            let pred = model.forward(x);
            let loss = binary_cross_entropy(pred.clone(), y.clone());
            meter.push(
                loss.clone().into_scalar().elem::<f64>(),
                binary_accuracy(pred, y),
                batch.len(),
            );
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(config.learning_rate, model, grads);
        }

        let stats = EpochStats {
            epoch,
            train: meter.finish(),
            validation: match config.validation_steps {
                0 => None,
                n => Some(evaluate::<InferBackend>(
                    &model.valid(),
                    validation,
                    n,
                    cancel,
                )?),
            },
        };
        match stats.validation {
            Some(v) => log::info!(
                "epoch {epoch}/{}: loss {:.4}, accuracy {:.4}, val_loss {:.4}, val_accuracy {:.4}",
                config.epochs,
                stats.train.loss,
                stats.train.accuracy,
                v.loss,
                v.accuracy
            ),
            None => log::info!(
                "epoch {epoch}/{}: loss {:.4}, accuracy {:.4}",
                config.epochs,
                stats.train.loss,
                stats.train.accuracy
            ),
        }
        history.push(stats);
    }

    let model = model.valid();
    save_artifact(&model, &net_config, &config.model_path)?;
    let test = evaluate::<InferBackend>(&model, test, config.test_steps, cancel)?;
    log::info!("test loss: {:.4}", test.loss);
    log::info!("test accuracy: {:.4}", test.accuracy);

    Ok(TrainingReport {
        history,
        test,
        artifact: config.model_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let e = Evaluation {
            loss: 0.5,
            accuracy: 0.75,
        };
        let report = TrainingReport {
            history: vec![
                EpochStats {
                    epoch: 1,
                    train: e,
                    validation: Some(e),
                },
                EpochStats {
                    epoch: 2,
                    train: e,
                    validation: None,
                },
            ],
            test: e,
            artifact: PathBuf::from("m.glio"),
        };
        report.write_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "epoch,loss,accuracy,val_loss,val_accuracy");
        assert_eq!(lines[1], "1,0.5,0.75,0.5,0.75");
        assert_eq!(lines[2], "2,0.5,0.75,,");
    }
}
