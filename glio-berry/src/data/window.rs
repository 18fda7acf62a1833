//! 线性灰度窗口.

/// 像素强度线性窗口, 包含下限 (lower) 和上限 (upper).
///
/// 8-bit 像素 `p` 被映射为 `(p - lower) / (upper - lower)` 并截断到 `[0, 1]`.
/// 默认窗口 `[0, 255]` 即 `1/255` 线性缩放.
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rescale {
    lower: f32,
    upper: f32,
}

impl Default for Rescale {
    #[inline]
    fn default() -> Self {
        Self::unit()
    }
}

impl Rescale {
    /// 构建窗口.
    ///
    /// `lower` 和 `upper` 必须有限, 且 `lower < upper`, 否则返回 `None`.
    pub fn new(lower: f32, upper: f32) -> Option<Rescale> {
        if lower.is_finite() && upper.is_finite() && lower < upper {
            Some(Self { lower, upper })
        } else {
            None
        }
    }

    /// `[0, 255]` 窗口, 等价于乘以 `1/255`.
    #[inline]
    pub const fn unit() -> Rescale {
        Self {
            lower: 0.0,
            upper: 255.0,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.lower
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.upper
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.upper - self.lower
    }

    /// 将像素值映射到 `[0, 1]`.
    ///
    /// 如果 `value` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, value: f32) -> Option<f32> {
        if !value.is_finite() {
            return None;
        }
        if value <= self.lower {
            Some(0.0)
        } else if value >= self.upper {
            Some(1.0)
        } else {
            Some((value - self.lower) / self.width())
        }
    }

    /// 将 8-bit 像素映射到 `[0, 1]`.
    #[inline]
    pub fn eval_u8(&self, pixel: u8) -> f32 {
        // 输入总是有限值.
        self.eval(pixel as f32).unwrap_or_default()
    }

    /// 将 `[0, 1]` 概率映射回 8-bit 像素 (四舍五入). NaN 映射为 0.
    pub fn invert(&self, prob: f32) -> u8 {
        if prob.is_nan() {
            return u8::MIN;
        }
        let p = prob.clamp(0.0, 1.0);
        let v = self.lower + p * self.width();
        v.round().clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::Rescale;

    fn float_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_rescale_invalid_input() {
        assert!(Rescale::new(10.0, 10.0).is_none());
        assert!(Rescale::new(10.0, 0.0).is_none());
        assert!(Rescale::new(f32::NAN, 1.0).is_none());
    }

    #[test]
    fn test_rescale_unit() {
        let r = Rescale::default();
        assert_eq!(r.eval(f32::NAN), None);
        assert!(float_eq(r.eval_u8(0), 0.0));
        assert!(float_eq(r.eval_u8(255), 1.0));
        assert!(float_eq(r.eval_u8(51), 0.2));
        assert_eq!(r.invert(1.0), 255);
        assert_eq!(r.invert(0.2), 51);
        assert_eq!(r.invert(-3.0), 0);
        assert_eq!(r.invert(f32::NAN), 0);
    }

    #[test]
    fn test_rescale_generic() {
        // [50, 150]
        let r = Rescale::new(50.0, 150.0).unwrap();
        assert!(float_eq(r.eval(0.0).unwrap(), 0.0));
        assert!(float_eq(r.eval(100.0).unwrap(), 0.5));
        assert!(float_eq(r.eval(200.0).unwrap(), 1.0));
        assert_eq!(r.invert(0.5), 100);
    }
}
