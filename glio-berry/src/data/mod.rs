//! 二维切片与三维体数据的表示, 以及它们与图像文件之间的转换.

mod save;
mod volume;
pub mod window;

pub use save::probability_to_gray;
pub use volume::Volume;
pub use window::Rescale;

use crate::config::ChannelMode;
use crate::error::{PipelineError, PipelineResult};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use ndarray::{Array2, Array3};
use std::path::Path;

/// 打开图像文件, 出错时携带路径信息.
pub fn open_image<P: AsRef<Path>>(path: P) -> PipelineResult<DynamicImage> {
    let path = path.as_ref();
    image::open(path).map_err(|e| PipelineError::decode(path, e))
}

/// 将单通道图像转为 (高, 宽) 的 `f32` 数组, 同时施加 `rescale`.
pub fn gray_to_array(img: &GrayImage, rescale: &Rescale) -> Array2<f32> {
    let (width, height) = img.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(h, w)| {
        rescale.eval_u8(img.get_pixel(w as u32, h as u32).0[0])
    })
}

/// 将任意图像按 `mode` 转为 (通道, 高, 宽) 的 `f32` 数组.
///
/// 若图像尺寸与 (`height`, `width`) 不同, 先以最近邻插值缩放.
pub fn image_to_planes(
    img: &DynamicImage,
    mode: ChannelMode,
    (height, width): (usize, usize),
    rescale: &Rescale,
) -> Array3<f32> {
    let resized;
    let img = if img.width() as usize != width || img.height() as usize != height {
        resized = img.resize_exact(width as u32, height as u32, FilterType::Nearest);
        &resized
    } else {
        img
    };

    match mode {
        ChannelMode::Grayscale => {
            let gray = img.to_luma8();
            Array3::from_shape_fn((1, height, width), |(_, h, w)| {
                rescale.eval_u8(gray.get_pixel(w as u32, h as u32).0[0])
            })
        }
        ChannelMode::Rgb => {
            let rgb = img.to_rgb8();
            Array3::from_shape_fn((3, height, width), |(c, h, w)| {
                rescale.eval_u8(rgb.get_pixel(w as u32, h as u32).0[c])
            })
        }
    }
}
