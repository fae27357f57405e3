//! 阈值比例的阻尼搜索. 没有严格的上下界夹逼, 可能越过目标区间后再折返.

use crate::VoxelCountBand;

/// 搜索状态.
///
/// `going_up` 为 `true` 时下一步 **降低** 阈值比例 (比例越低, 区域越大).
#[derive(Copy, Clone, Debug, PartialEq)]
pub(super) struct ThresholdSearch {
    fraction: f64,
    step: f64,
    going_up: bool,
    min_step: f64,
}

impl ThresholdSearch {
    pub(super) fn new(fraction: f64, step: f64, min_step: f64) -> Self {
        Self {
            fraction,
            step,
            going_up: true,
            min_step,
        }
    }

    /// 当前阈值比例.
    #[inline]
    pub(super) fn fraction(&self) -> f64 {
        self.fraction
    }

    /// 比例仍在 `(0, 1)` 内且步长大于下限.
    #[inline]
    pub(super) fn is_open(&self) -> bool {
        self.fraction > 0.0 && self.fraction < 1.0 && self.step > self.min_step
    }

    /// 根据未落入 `band` 的体素数 `count` 调整方向和步长, 然后移动比例.
    ///
    /// | 体素数    | 当前方向 | 动作               |
    /// |-----------|----------|--------------------|
    /// | `> max`   | 上       | 步长减半, 转向下   |
    /// | `> max`   | 下       | 保持               |
    /// | `< min`   | 上       | 保持               |
    /// | `< min`   | 下       | 步长减半, 转向上   |
    pub(super) fn update(&mut self, count: usize, band: VoxelCountBand) {
        if count > band.max() && self.going_up {
            self.step /= 2.0;
            self.going_up = false;
        } else if count < band.min() && !self.going_up {
            self.step /= 2.0;
            self.going_up = true;
        }
        if self.going_up {
            self.fraction -= self.step;
        } else {
            self.fraction += self.step;
        }
    }
}
