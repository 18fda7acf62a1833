//! 二维灰度形态学.
//!
//! 结构元为 `kh x kw` 的矩形, 锚点在 `(kh / 2, kw / 2)`. 越界的邻居被忽略
//! (等价于腐蚀时以 +inf 填充, 膨胀时以 -inf 填充).

use crate::consts::DEFAULT_KERNEL;
use crate::Idx2d;
use ndarray::{Array2, ArrayView2, Axis};

/// 沿 `axis` 对每个位置 `i` 在 `[i + lo, i + hi]` 内的有效邻居做归约.
fn sweep(x: ArrayView2<'_, f32>, axis: Axis, lo: isize, hi: isize, op: fn(f32, f32) -> f32) -> Array2<f32> {
    let n = x.len_of(axis) as isize;
    Array2::from_shape_fn(x.dim(), |(h, w)| {
        let (center, other) = match axis {
            Axis(0) => (h as isize, w),
            _ => (w as isize, h),
        };
        let from = (center + lo).max(0);
        let to = (center + hi).min(n - 1);
        (from..=to)
            .map(|i| match axis {
                Axis(0) => x[(i as usize, other)],
                _ => x[(other, i as usize)],
            })
            .reduce(op)
            .unwrap_or(x[(h, w)])
    })
}

/// 结构元在某个轴上的偏移范围 `[-anchor, k - 1 - anchor]`.
#[inline]
fn reach(k: usize) -> (isize, isize) {
    let anchor = (k / 2) as isize;
    (-anchor, k as isize - 1 - anchor)
}

/// 灰度腐蚀: 结构元覆盖范围内的最小值.
pub fn erosion(x: ArrayView2<'_, f32>, (kh, kw): Idx2d) -> Array2<f32> {
    let (rl, rh) = reach(kh);
    let (cl, ch) = reach(kw);
    let rows = sweep(x, Axis(0), rl, rh, f32::min);
    sweep(rows.view(), Axis(1), cl, ch, f32::min)
}

/// 灰度膨胀: 反射后的结构元覆盖范围内的最大值.
pub fn dilation(x: ArrayView2<'_, f32>, (kh, kw): Idx2d) -> Array2<f32> {
    let (rl, rh) = reach(kh);
    let (cl, ch) = reach(kw);
    let rows = sweep(x, Axis(0), -rh, -rl, f32::max);
    sweep(rows.view(), Axis(1), -ch, -cl, f32::max)
}

/// 灰度开运算: 先腐蚀后膨胀. 结果与输入形状相同, 且 `opening(opening(x)) == opening(x)`.
///
/// # 注意
///
/// `kernel` 任一边为 0 时原样返回.
pub fn opening(x: ArrayView2<'_, f32>, kernel: Idx2d) -> Array2<f32> {
    if kernel.0 == 0 || kernel.1 == 0 {
        return x.to_owned();
    }
    dilation(erosion(x, kernel).view(), kernel)
}

/// 去除预测概率图中孤立的噪点. 即以 `kernel` (默认 3x3) 为结构元的开运算.
#[inline]
pub fn remove_blur(x: ArrayView2<'_, f32>, kernel: Option<Idx2d>) -> Array2<f32> {
    opening(x, kernel.unwrap_or(DEFAULT_KERNEL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random(h: usize, w: usize, seed: u64) -> Array2<f32> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Array2::from_shape_fn((h, w), |_| rng.gen::<f32>())
    }

    #[test]
    fn test_opening_idempotent() {
        for (seed, kernel) in [(1, (3, 3)), (2, (2, 4)), (3, (5, 1))] {
            let x = random(23, 17, seed);
            let once = opening(x.view(), kernel);
            let twice = opening(once.view(), kernel);
            assert_eq!(once, twice, "kernel {kernel:?}");
            assert_eq!(once.dim(), x.dim());
            // 开运算是反扩展的.
            assert!(once.iter().zip(x.iter()).all(|(a, b)| a <= b));
        }
    }

    #[test]
    fn test_remove_salt() {
        let mut x = Array2::<f32>::zeros((12, 12));
        x[(1, 1)] = 1.0;
        for h in 5..10 {
            for w in 4..9 {
                x[(h, w)] = 0.9;
            }
        }
        let y = remove_blur(x.view(), None);
        assert_eq!(y[(1, 1)], 0.0);
        for ((h, w), &v) in y.indexed_iter() {
            let inside = (5..10).contains(&h) && (4..9).contains(&w);
            assert_eq!(v, if inside { 0.9 } else { 0.0 }, "({h}, {w})");
        }
    }

    #[test]
    fn test_unit_kernel_is_identity() {
        let x = random(5, 7, 9);
        assert_eq!(opening(x.view(), (1, 1)), x);
        assert_eq!(opening(x.view(), (0, 3)), x);
    }

    #[test]
    fn test_border_block_survives() {
        // 贴边的块不会因越界而被腐蚀掉.
        let mut x = Array2::<f32>::zeros((6, 6));
        for h in 0..3 {
            for w in 0..3 {
                x[(h, w)] = 1.0;
            }
        }
        assert_eq!(opening(x.view(), (3, 3)), x);
    }
}
