//! 由原始切片生成真值掩膜.

use super::{BatchReport, Outcome};
use crate::config::DecodePolicy;
use crate::consts::gray::{MASK_BACKGROUND, MASK_FOREGROUND};
use crate::data::open_image;
use crate::dataset::list_files;
use crate::error::{PipelineError, PipelineResult};
use crate::prep::otsu::otsu_threshold;
use image::{DynamicImage, GrayImage, Luma};
use std::fs;
use std::path::{Path, PathBuf};

/// 以图像自身的 Otsu 阈值二值化.
///
/// 图像先转为 16-bit 亮度 (8-bit 图像按单调方式无损扩展), 严格大于阈值的像素
/// 为前景 (255), 其余为背景 (0).
///
/// # 注意
///
/// 对自身输出再次调用结果不变. 唯一的例外是全前景图像: 常量图像没有像素严格大于阈值,
/// 因此会得到全背景.
pub fn binarize(img: &DynamicImage) -> GrayImage {
    let luma = img.to_luma16();
    let (width, height) = luma.dimensions();
    let mut out = GrayImage::new(width, height);
    let Some(threshold) = otsu_threshold(luma.pixels().map(|p| p.0[0])) else {
        return out;
    };
    for (w, h, p) in luma.enumerate_pixels() {
        let v = if p.0[0] > threshold {
            MASK_FOREGROUND
        } else {
            MASK_BACKGROUND
        };
        out.put_pixel(w, h, Luma([v]));
    }
    out
}

/// 掩膜文件名: 输入文件名主干 + `suffix`.
pub fn mask_name(input: &Path, suffix: &str) -> Option<String> {
    let stem = input.file_stem()?.to_str()?;
    Some(format!("{stem}{suffix}"))
}

/// 为 `input_dir` 下每个文件生成一个二值掩膜, 写入 `output_dir`.
///
/// 输出目录不存在时会被创建. 输入按文件名字典序处理.
///
/// # 注意
///
/// `policy` 为 [`DecodePolicy::Abort`] 时, 任何一个文件无法解码都会使整批失败;
/// 为 [`DecodePolicy::Skip`] 时记录警告并跳过该文件.
pub fn create_masks<P: AsRef<Path>, Q: AsRef<Path>>(
    input_dir: P,
    output_dir: Q,
    suffix: &str,
    policy: DecodePolicy,
) -> PipelineResult<BatchReport> {
    let output_dir = output_dir.as_ref();
    let inputs = list_files(input_dir.as_ref())?;
    fs::create_dir_all(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;

    let mut report = BatchReport::default();
    for path in inputs {
        let img = match Outcome::of(open_image(&path), policy)? {
            Outcome::Done(img) => img,
            Outcome::Skipped => {
                report.skip(path);
                continue;
            }
        };
        let name = mask_name(&path, suffix).ok_or_else(|| PipelineError::InvalidConfig {
            field: "mask_suffix",
            reason: format!("cannot derive a mask name from `{}`", path.display()),
        })?;
        let out: PathBuf = output_dir.join(name);
        binarize(&img)
            .save(&out)
            .map_err(|e| PipelineError::decode(&out, e))?;
        log::debug!("mask `{}` -> `{}`", path.display(), out.display());
        report.write(out);
    }
    log::info!(
        "created {} masks in `{}` ({} skipped)",
        report.written.len(),
        output_dir.display(),
        report.skipped.len()
    );
    Ok(report)
}
