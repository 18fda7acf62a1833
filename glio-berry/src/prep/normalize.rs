//! 尺寸与颜色模式归一化.

use super::{BatchReport, Outcome};
use crate::config::DecodePolicy;
use crate::data::open_image;
use crate::dataset::list_files;
use crate::error::{PipelineError, PipelineResult};
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 缩放插值方法.
///
/// 掩膜应使用 `Nearest`, 否则边缘会出现非二值像素.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// 最近邻.
    #[default]
    Nearest,

    /// 双线性.
    Triangle,

    /// 双三次 (Catmull-Rom).
    CatmullRom,
}

impl From<ResizeFilter> for FilterType {
    fn from(f: ResizeFilter) -> Self {
        match f {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
        }
    }
}

/// 处理结果的写出位置.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    /// 覆盖源文件. 源文件无法恢复.
    InPlace,

    /// 写入另一个目录, 文件名不变.
    Dir(PathBuf),
}

impl OutputTarget {
    /// 源文件 `src` 对应的输出路径.
    fn destination(&self, src: &Path) -> PathBuf {
        match self {
            Self::InPlace => src.to_owned(),
            Self::Dir(dir) => match src.file_name() {
                Some(name) => dir.join(name),
                None => dir.clone(),
            },
        }
    }

    /// 确保输出目录存在.
    fn prepare(&self) -> PipelineResult<()> {
        if let Self::Dir(dir) = self {
            fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
        }
        Ok(())
    }
}

/// 将图像缩放到恰好 `width` × `height`, 不保持宽高比.
#[inline]
pub fn resize_image(img: &DynamicImage, width: u32, height: u32, filter: ResizeFilter) -> DynamicImage {
    img.resize_exact(width, height, filter.into())
}

/// 对 `dir` 下每个文件执行 `op` 并写到 `target`.
fn for_each_image<F>(
    dir: &Path,
    target: &OutputTarget,
    policy: DecodePolicy,
    mut op: F,
) -> PipelineResult<BatchReport>
where
    F: FnMut(&Path, DynamicImage) -> DynamicImage,
{
    let inputs = list_files(dir)?;
    target.prepare()?;

    let mut report = BatchReport::default();
    for path in inputs {
        let img = match Outcome::of(open_image(&path), policy)? {
            Outcome::Done(img) => img,
            Outcome::Skipped => {
                report.skip(path);
                continue;
            }
        };
        let out = target.destination(&path);
        op(&path, img)
            .save(&out)
            .map_err(|e| PipelineError::decode(&out, e))?;
        report.write(out);
    }
    Ok(report)
}

/// 将 `dir` 下每个图像缩放到 `width` × `height`.
///
/// 每个文件缩放后的实际尺寸都会被记录; 若与请求尺寸不一致, 只记录警告, 不视为错误.
pub fn resize_dir<P: AsRef<Path>>(
    dir: P,
    target: &OutputTarget,
    width: u32,
    height: u32,
    filter: ResizeFilter,
    policy: DecodePolicy,
) -> PipelineResult<BatchReport> {
    let report = for_each_image(dir.as_ref(), target, policy, |path, img| {
        let out = resize_image(&img, width, height, filter);
        let (w, h) = (out.width(), out.height());
        log::info!("`{}`: width {w}, height {h}", path.display());
        if (w, h) != (width, height) {
            log::warn!(
                "`{}` resized to {w}x{h}, requested {width}x{height}",
                path.display()
            );
        }
        out
    })?;
    log::info!("resized {} images", report.written.len());
    Ok(report)
}

/// 将 `dir` 下每个图像转为单通道亮度图.
pub fn grayscale_dir<P: AsRef<Path>>(
    dir: P,
    target: &OutputTarget,
    policy: DecodePolicy,
) -> PipelineResult<BatchReport> {
    let report = for_each_image(dir.as_ref(), target, policy, |_, img| {
        DynamicImage::ImageLuma8(img.to_luma8())
    })?;
    log::info!("converted {} images to grayscale", report.written.len());
    Ok(report)
}
