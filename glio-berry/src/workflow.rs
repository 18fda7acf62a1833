//! 面向调用方的完整流程: 每个函数对应一次独立的运行.
//!
//! 所有路径与参数都来自传入的 [`PipelineConfig`].

use crate::config::PipelineConfig;
use crate::data::Volume;
use crate::dataset::{
    BatchSource, CancelToken, DataLayout, FeederOptions, PairedFeeder, Prefetcher, Split,
};
use crate::error::{PipelineError, PipelineResult};
use crate::net::{train, Predictor, TrainingReport};
use crate::post_proc::remove_blur;
use crate::prep::{create_masks, grayscale_dir, resize_dir, BatchReport, OutputTarget, ResizeFilter};
use crate::surface::{marching_cubes, IsoMesh};
use crate::viz::{write_mesh_html, ComparisonFigure};
use ndarray::{s, Array2, Axis};
use std::fs;
use std::path::{Path, PathBuf};

/// 训练历史 CSV 的文件名.
pub const HISTORY_FILE: &str = "history.csv";

/// 网格页面标题.
pub const MESH_TITLE: &str = "Glioblastoma Multiforme";

/// 为 `input_dir` 下的每张切片生成二值掩膜, 写到 `output_dir`.
pub fn prepare_masks<P: AsRef<Path>, Q: AsRef<Path>>(
    config: &PipelineConfig,
    input_dir: P,
    output_dir: Q,
) -> PipelineResult<BatchReport> {
    create_masks(input_dir, output_dir, &config.mask_suffix, config.decode_policy)
}

/// 将 `dir` 下每张图像缩放到配置的分辨率.
pub fn normalize_dir<P: AsRef<Path>>(
    config: &PipelineConfig,
    dir: P,
    target: &OutputTarget,
    filter: ResizeFilter,
) -> PipelineResult<BatchReport> {
    config.validate()?;
    resize_dir(
        dir,
        target,
        config.width as u32,
        config.height as u32,
        filter,
        config.decode_policy,
    )
}

/// 将 `dir` 下每张图像转为单通道.
#[inline]
pub fn grayscale<P: AsRef<Path>>(
    config: &PipelineConfig,
    dir: P,
    target: &OutputTarget,
) -> PipelineResult<BatchReport> {
    grayscale_dir(dir, target, config.decode_policy)
}

/// 为划分 `split` 构建供给器.
pub fn open_split(
    config: &PipelineConfig,
    split: Split,
    shuffle: bool,
    cancel: &CancelToken,
) -> PipelineResult<PairedFeeder> {
    let manifest = DataLayout::from_config(config).manifest(split, &config.mask_suffix)?;
    log::info!(
        "{}: {} pairs (fingerprint {:08x})",
        split.dir_name(),
        manifest.len(),
        manifest.fingerprint()
    );
    let options = FeederOptions::from_config(config, split.dir_name(), shuffle);
    Ok(PairedFeeder::new(manifest, options)?.with_cancel(cancel.clone()))
}

/// 按配置决定是否在后台线程中预取.
fn with_prefetch(feeder: PairedFeeder, depth: usize) -> Box<dyn BatchSource> {
    match depth {
        0 => Box::new(feeder),
        n => Box::new(Prefetcher::spawn(feeder, n)),
    }
}

/// 训练, 保存模型, 评估测试集, 并把训练历史写到 `{output_dir}/history.csv`.
pub fn train_and_evaluate(
    config: &PipelineConfig,
    cancel: &CancelToken,
) -> PipelineResult<TrainingReport> {
    config.validate()?;
    let mut training = with_prefetch(
        open_split(config, Split::Training, true, cancel)?,
        config.prefetch,
    );
    let mut validation = with_prefetch(
        open_split(config, Split::Validation, true, cancel)?,
        config.prefetch,
    );
    let mut test = open_split(config, Split::Testing, false, cancel)?;

    let report = train(
        config,
        training.as_mut(),
        validation.as_mut(),
        &mut test,
        cancel,
    )?;

    let out = &config.output_dir;
    fs::create_dir_all(out).map_err(|e| PipelineError::io(out, e))?;
    report.write_csv(out.join(HISTORY_FILE))?;
    Ok(report)
}

/// 在不打乱的测试数据流上生成 `count` 张对比图.
///
/// 第 `i` 张图 (从 1 开始) 取第 `i` 个批次中的第一个样本, 写到
/// `{output_dir}/{figure_label} - {i}.jpg`. 预测结果先经 [`remove_blur`] 去噪.
pub fn predict_figures(
    config: &PipelineConfig,
    count: usize,
    cancel: &CancelToken,
) -> PipelineResult<Vec<PathBuf>> {
    config.validate()?;
    let predictor = Predictor::load(&config.model_path)?;
    let mut test = open_split(config, Split::Testing, false, cancel)?;
    let out = &config.output_dir;
    fs::create_dir_all(out).map_err(|e| PipelineError::io(out, e))?;

    let mut written = Vec::with_capacity(count);
    for i in 0..count {
        let batch = test.next_batch()?;
        let pred = predictor.predict(&batch.images)?;
        let scan: Array2<f32> = batch
            .images
            .slice(s![0, .., .., ..])
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array2::zeros(config.shape()));
        let truth = batch.masks.slice(s![0, 0, .., ..]);
        let cleaned = remove_blur(pred.slice(s![0, 0, .., ..]), Some(config.kernel));

        let path = out.join(format!("{} - {}.jpg", config.figure_label, i + 1));
        ComparisonFigure::new(scan.view(), truth, cleaned.view())?.save(&path)?;
        log::info!("figure {}/{count}: `{}`", i + 1, path.display());
        written.push(path);
    }
    Ok(written)
}

/// [`visualize_volume`] 的结果.
#[derive(Clone, Debug)]
pub struct VolumeReport {
    /// 体数据形状 (高, 宽, 切片数).
    pub shape: (usize, usize, usize),

    /// 提取出的等值面.
    pub mesh: IsoMesh,

    /// 写出的 HTML 页面.
    pub page: PathBuf,
}

/// 逐张预测体数据切片 (批大小 1, 不打乱), 堆叠后提取等值面并写出 HTML 页面.
///
/// # 注意
///
/// 1. 体数据目录中的切片个数必须恰好等于 `volume_slices`, 否则返回
///   [`PipelineError::SliceCount`], 此时不会运行网络.
/// 2. 等值面为空不是错误: 仍会写出占位页面, 调用方可检查 `mesh.is_empty()`.
pub fn visualize_volume(
    config: &PipelineConfig,
    cancel: &CancelToken,
) -> PipelineResult<VolumeReport> {
    config.validate()?;
    let manifest = DataLayout::from_config(config).volume_manifest(&config.mask_suffix)?;
    if manifest.len() != config.volume_slices {
        return Err(PipelineError::SliceCount {
            expected: config.volume_slices,
            found: manifest.len(),
        });
    }
    let predictor = Predictor::load(&config.model_path)?;
    let options = FeederOptions::from_config(config, "Volumes", false).with_batch_size(1);
    let mut feeder = PairedFeeder::new(manifest, options)?.with_cancel(cancel.clone());

    let mut slices = Vec::with_capacity(config.volume_slices);
    for _ in 0..config.volume_slices {
        let batch = feeder.next_batch()?;
        let pred = predictor.predict(&batch.images)?;
        slices.push(pred.slice(s![0, 0, .., ..]).to_owned());
    }
    let volume = Volume::assemble(slices, config.volume_slices)?;
    if let Some((lo, hi)) = volume.value_range() {
        log::info!("volume {:?}, values in [{lo:.4}, {hi:.4}]", volume.shape());
    }

    let mesh = marching_cubes(&volume, config.iso_level);
    if !mesh.is_empty() {
        log::info!(
            "iso-surface: {} vertices, {} faces",
            mesh.vertex_count(),
            mesh.face_count()
        );
    }
    let page = config.output_dir.join(&config.mesh_file);
    write_mesh_html(&mesh, MESH_TITLE, &page)?;
    Ok(VolumeReport {
        shape: volume.shape(),
        mesh,
        page,
    })
}

