use ndarray::{Array2, Axis};

use crate::{AifError, AifResult, VoxelMap};

/// 显示窗口, 包含窗位 (level) 和窗宽 (width). 用于把派生图映射为 8-bit 灰度.
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug)]
pub struct DisplayWindow {
    level: f64,
    width: f64,
}

impl DisplayWindow {
    /// 构建显示窗.
    ///
    /// `level` 必须有限, `width` 必须为正且有限, 否则返回 `None`.
    pub fn new(level: f64, width: f64) -> Option<DisplayWindow> {
        if level.is_finite() && width.is_finite() && width > 0.0 {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 构建一个恰好覆盖 `map` 取值范围的窗口.
    ///
    /// 若 `map` 为常数图, 窗宽取 1. 若 `map` 为空或含非有限值, 返回 `None`.
    pub fn fit(map: &VoxelMap) -> Option<DisplayWindow> {
        use itertools::{Itertools, MinMaxResult};

        let (lo, hi) = match map.iter().copied().minmax_by(f64::total_cmp) {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(v) => (v, v),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        };
        if !(lo.is_finite() && hi.is_finite()) {
            return None;
        }
        if hi > lo {
            Self::new((lo + hi) / 2.0, hi - lo)
        } else {
            Self::new(lo, 1.0)
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f64 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f64 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// 求在当前窗口设置下, `value` 对应的灰度图像素整数值 (0 <= value <= 255).
    ///
    /// 如果 `value` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, value: f64) -> Option<u8> {
        if !value.is_finite() {
            return None;
        }
        let lb = self.lower_bound();
        if value <= lb {
            Some(u8::MIN)
        } else if value >= self.upper_bound() {
            Some(u8::MAX)
        } else {
            // 255, not 256.
            Some((((value - lb) / self.width()) * 255.0) as u8)
        }
    }

    /// 将 `map` 的第 `z` 个切片渲染为 `(ny, nx)` 灰度图. 非有限值渲染为 0.
    pub fn render_slice(&self, map: &VoxelMap, z: usize) -> AifResult<Array2<u8>> {
        if z >= map.len_of(Axis(0)) {
            return Err(AifError::config(format!("slice {z} out of range")));
        }
        Ok(map
            .index_axis(Axis(0), z)
            .mapv(|v| self.eval(v).unwrap_or(u8::MIN)))
    }
}
