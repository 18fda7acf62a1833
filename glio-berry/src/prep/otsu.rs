//! Otsu 全局阈值.

/// 基于精确 16-bit 直方图计算 Otsu 阈值.
///
/// 在 `[min, max]` 上逐个候选阈值 `t` 计算类间方差
/// `w0(t) * w1(t) * (m0(t) - m1(t))^2`, 其中 `w0, m0` 是 `<= t` 部分的像素个数与均值,
/// `w1, m1` 是 `> t` 部分的. 返回使类间方差最大的第一个 `t`.
///
/// # 返回值
///
/// 1. 输入为空时返回 `None`.
/// 2. 所有像素相同时返回该像素值 (此时没有像素严格大于阈值).
pub fn otsu_threshold<I: IntoIterator<Item = u16>>(values: I) -> Option<u16> {
    let values = values.into_iter();
    let mut hist = vec![0_u64; u16::MAX as usize + 1];
    let mut lo = u16::MAX;
    let mut hi = u16::MIN;
    let mut total = 0_u64;
    for v in values {
        hist[v as usize] += 1;
        lo = lo.min(v);
        hi = hi.max(v);
        total += 1;
    }
    if total == 0 {
        return None;
    }
    if lo == hi {
        return Some(lo);
    }

    let hist = &hist[lo as usize..=hi as usize];
    let total_sum: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| c as f64 * (lo as usize + i) as f64)
        .sum();

    let mut w0 = 0_u64;
    let mut sum0 = 0_f64;
    let mut best = (f64::NEG_INFINITY, lo);
    // 最后一个 bin 作为阈值时上侧为空, 不参与比较.
    for (i, &c) in hist[..hist.len() - 1].iter().enumerate() {
        let t = lo as usize + i;
        w0 += c;
        sum0 += c as f64 * t as f64;
        let w1 = total - w0;
        if w0 == 0 || w1 == 0 {
            continue;
        }
        let m0 = sum0 / w0 as f64;
        let m1 = (total_sum - sum0) / w1 as f64;
        let between = w0 as f64 * w1 as f64 * (m0 - m1) * (m0 - m1);
        if between > best.0 {
            best = (between, t as u16);
        }
    }
    Some(best.1)
}

#[cfg(test)]
mod tests {
    use super::otsu_threshold;

    #[test]
    fn test_otsu_degenerate() {
        assert_eq!(otsu_threshold(std::iter::empty()), None);
        assert_eq!(otsu_threshold([7_u16; 10]), Some(7));
    }

    #[test]
    fn test_otsu_two_values() {
        // 二值图像的阈值恰为较小值.
        let v = [0_u16, 0, 0, 255, 255];
        assert_eq!(otsu_threshold(v), Some(0));
        let v = [10_u16, 10, 900, 900, 900, 900];
        assert_eq!(otsu_threshold(v), Some(10));
    }

    #[test]
    fn test_otsu_bimodal() {
        let mut v = Vec::new();
        v.extend(std::iter::repeat(20_u16).take(50));
        v.extend(std::iter::repeat(22_u16).take(50));
        v.extend(std::iter::repeat(200_u16).take(30));
        v.extend(std::iter::repeat(204_u16).take(30));
        let t = otsu_threshold(v.iter().copied()).unwrap();
        assert!((22..200).contains(&t));
        // 空 bin 不会改变类间方差, 取第一个.
        assert_eq!(t, 22);
    }
}
