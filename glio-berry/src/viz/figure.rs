//! 三栏对比图: 原始切片, 真实掩膜, 去噪后的预测.

use crate::consts::gray::WHITE;
use crate::data::probability_to_gray;
use crate::error::{PipelineError, PipelineResult};
use image::{imageops, GrayImage, Luma};
use ndarray::ArrayView2;
use std::path::Path;

/// 相邻两栏之间的白色间隔宽度 (像素).
pub const PANEL_GAP: u32 = 8;

/// 三栏对比图: 原始切片, 真值掩膜, 后处理后的预测.
///
/// 三张输入须形状相同, 取值范围 `[0, 1]`.
#[derive(Debug)]
pub struct ComparisonFigure<'a> {
    scan: ArrayView2<'a, f32>,
    truth: ArrayView2<'a, f32>,
    prediction: ArrayView2<'a, f32>,
}

impl<'a> ComparisonFigure<'a> {
    /// 三张图形状不一致时返回 [`PipelineError::InvalidConfig`].
    pub fn new(
        scan: ArrayView2<'a, f32>,
        truth: ArrayView2<'a, f32>,
        prediction: ArrayView2<'a, f32>,
    ) -> PipelineResult<Self> {
        if truth.dim() != scan.dim() || prediction.dim() != scan.dim() {
            return Err(PipelineError::InvalidConfig {
                field: "figure",
                reason: format!(
                    "panel shapes differ: scan {:?}, mask {:?}, prediction {:?}",
                    scan.dim(),
                    truth.dim(),
                    prediction.dim()
                ),
            });
        }
        Ok(Self {
            scan,
            truth,
            prediction,
        })
    }

    /// 横向拼接三栏.
    pub fn render(&self) -> GrayImage {
        let (h, w) = self.scan.dim();
        let (h, w) = (h as u32, w as u32);
        let mut canvas = GrayImage::from_pixel(3 * w + 2 * PANEL_GAP, h, Luma([WHITE]));
        for (i, panel) in [self.scan, self.truth, self.prediction].into_iter().enumerate() {
            let x = i as u32 * (w + PANEL_GAP);
            imageops::replace(&mut canvas, &probability_to_gray(panel), x as i64, 0);
        }
        canvas
    }

    /// 渲染并保存. 编码格式由扩展名决定 (通常为 `.jpg`).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        let path = path.as_ref();
        self.render()
            .save(path)
            .map_err(|e| PipelineError::decode(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_render_layout() {
        let scan = Array2::from_elem((4, 5), 1.0);
        let truth = Array2::zeros((4, 5));
        let pred = Array2::from_elem((4, 5), 1.0);
        let fig = ComparisonFigure::new(scan.view(), truth.view(), pred.view()).unwrap();
        let img = fig.render();
        assert_eq!(img.dimensions(), (15 + 2 * PANEL_GAP, 4));
        assert_eq!(img.get_pixel(0, 0).0[0], 255);
        assert_eq!(img.get_pixel(5 + PANEL_GAP, 3).0[0], 0);
        assert_eq!(img.get_pixel(5, 0).0[0], WHITE);
        assert_eq!(img.get_pixel(2 * (5 + PANEL_GAP) + 4, 3).0[0], 255);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = Array2::zeros((4, 5));
        let b = Array2::zeros((4, 6));
        assert!(ComparisonFigure::new(a.view(), a.view(), b.view()).is_err());
    }

    #[test]
    fn test_save_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prediction - 1.jpg");
        let a = Array2::from_shape_fn((16, 16), |(h, w)| ((h + w) % 2) as f32);
        ComparisonFigure::new(a.view(), a.view(), a.view())
            .unwrap()
            .save(&path)
            .unwrap();
        let back = image::open(&path).unwrap();
        assert_eq!((back.width(), back.height()), (48 + 2 * PANEL_GAP, 16));
    }
}
