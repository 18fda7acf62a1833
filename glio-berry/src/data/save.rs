//! 概率图到灰度图像的转换.

use crate::data::window::Rescale;
use image::{GrayImage, Luma};
use ndarray::ArrayView2;

/// 将概率图 `[0, 1]` 线性映射为 `[0, 255]` 灰度图像.
pub fn probability_to_gray(data: ArrayView2<'_, f32>) -> GrayImage {
    let r = Rescale::unit();
    let (height, width) = data.dim();
    let mut buf = GrayImage::new(width as u32, height as u32);
    for ((h, w), &p) in data.indexed_iter() {
        buf.put_pixel(w as u32, h as u32, Luma([r.invert(p)]));
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_probability_to_gray() {
        let prob = array![[0.0_f32, 0.49, 0.51], [1.0, 0.2, 0.0]];
        let raw = probability_to_gray(prob.view());
        assert_eq!(raw.dimensions(), (3, 2));
        assert_eq!(raw.get_pixel(0, 0).0[0], 0);
        assert_eq!(raw.get_pixel(0, 1).0[0], 255);
        assert_eq!(raw.get_pixel(1, 1).0[0], 51);
    }
}
