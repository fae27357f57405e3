//! AIF 提取参数.

use crate::consts::{defaults, KERNEL_WIDEN_STEP};
use crate::{AifError, AifResult};
use std::fmt::Formatter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 种子评分窗口的形状. 深度恒为 1 (不跨切片).
///
/// 宽和高都必须是正奇数, 这样窗口才有唯一的中心体素.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KernelShape {
    width: usize,
    height: usize,
}

impl KernelShape {
    /// 以 x 方向 `width`, y 方向 `height` 构建窗口. 二者必须为正奇数.
    pub fn new(width: usize, height: usize) -> AifResult<Self> {
        if width == 0 || height == 0 || width % 2 == 0 || height % 2 == 0 {
            return Err(AifError::config(format!(
                "kernel must be odd and positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// x 方向体素数.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// y 方向体素数.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// x 方向半宽.
    #[inline]
    pub fn half_width(&self) -> usize {
        self.width / 2
    }

    /// y 方向半高.
    #[inline]
    pub fn half_height(&self) -> usize {
        self.height / 2
    }

    /// 窗口包含的体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.width * self.height
    }

    /// 在每个方向上加宽 [`KERNEL_WIDEN_STEP`] 个体素, 仍然保持奇数.
    #[inline]
    pub fn widened(&self) -> Self {
        Self {
            width: self.width + KERNEL_WIDEN_STEP,
            height: self.height + KERNEL_WIDEN_STEP,
        }
    }
}

impl Default for KernelShape {
    fn default() -> Self {
        Self {
            width: defaults::KERNEL_NX,
            height: defaults::KERNEL_NY,
        }
    }
}

/// `(0, 1]` 内的阈值比例.
#[derive(Copy, Clone, PartialEq, PartialOrd)]
pub struct Fraction(f64);

impl Fraction {
    /// 构建比例. `value` 不在 `(0, 1]` 内时返回 `Err`.
    pub fn new(value: f64) -> AifResult<Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(AifError::config(format!("fraction {value} outside (0, 1]")))
        }
    }

    /// 从界面上的百分比 (`[0, 100]`) 构建.
    #[inline]
    pub fn from_percent(percent: f64) -> AifResult<Self> {
        Self::new(percent / 100.0)
    }

    /// 数值.
    #[inline]
    pub fn get(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Debug for Fraction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("Fraction({:.4})", self.0))
    }
}

/// 主动脉掩膜的目标体素数区间 `[min, max]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VoxelCountBand {
    min: usize,
    max: usize,
}

impl VoxelCountBand {
    /// 构建区间. 要求 `min < max`.
    pub fn new(min: usize, max: usize) -> AifResult<Self> {
        if min >= max {
            return Err(AifError::config(format!(
                "aorta voxel band requires min < max, got [{min}, {max}]"
            )));
        }
        Ok(Self { min, max })
    }

    /// 下限.
    #[inline]
    pub fn min(&self) -> usize {
        self.min
    }

    /// 上限.
    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }

    /// `count` 是否落在区间内 (两端闭).
    #[inline]
    pub fn contains(&self, count: usize) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

/// AIF 提取参数. 跨研究保留, 除非被显式修改.
///
/// 字段直接公开, 使用前应调用 [`Self::validate`] (流程入口会替你调用).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExtractionParameters {
    /// 种子评分窗口宽度, 正奇数.
    pub kernel_nx: usize,

    /// 种子评分窗口高度, 正奇数.
    pub kernel_ny: usize,

    /// 候选 AIF 体素阈值, `(0, 1]`.
    pub min_fraction: f64,

    /// 主动脉掩膜离群值剔除的标准差倍数, `> 0`.
    pub max_stdev: f64,

    /// 主动脉掩膜目标体素数下限.
    pub aorta_num_voxels_min: usize,

    /// 主动脉掩膜目标体素数上限, 必须大于下限.
    pub aorta_num_voxels_max: usize,
}

impl Default for ExtractionParameters {
    fn default() -> Self {
        Self {
            kernel_nx: defaults::KERNEL_NX,
            kernel_ny: defaults::KERNEL_NY,
            min_fraction: defaults::MIN_FRACTION,
            max_stdev: defaults::MAX_STDEV,
            aorta_num_voxels_min: defaults::AORTA_NUM_VOXELS_MIN,
            aorta_num_voxels_max: defaults::AORTA_NUM_VOXELS_MAX,
        }
    }
}

impl ExtractionParameters {
    /// 检查全部参数. 任一非法则返回 [`AifError::Configuration`].
    pub fn validate(&self) -> AifResult<()> {
        self.kernel_shape()?;
        self.min_fraction()?;
        self.aorta_band()?;
        if !(self.max_stdev > 0.0 && self.max_stdev.is_finite()) {
            return Err(AifError::config(format!(
                "max_stdev must be positive, got {}",
                self.max_stdev
            )));
        }
        Ok(())
    }

    /// 种子评分窗口.
    #[inline]
    pub fn kernel_shape(&self) -> AifResult<KernelShape> {
        KernelShape::new(self.kernel_nx, self.kernel_ny)
    }

    /// 候选 AIF 体素阈值.
    #[inline]
    pub fn min_fraction(&self) -> AifResult<Fraction> {
        Fraction::new(self.min_fraction)
    }

    /// 主动脉掩膜目标体素数区间.
    #[inline]
    pub fn aorta_band(&self) -> AifResult<VoxelCountBand> {
        VoxelCountBand::new(self.aorta_num_voxels_min, self.aorta_num_voxels_max)
    }

    /// 按原样记录当前参数.
    pub(crate) fn log(&self) {
        log::info!(
            "kernel_nx: {}, kernel_ny: {}",
            self.kernel_nx,
            self.kernel_ny
        );
        log::info!(
            "Voxel selection. minFraction: {:.2}, maxStddev: {:.2}",
            self.min_fraction,
            self.max_stdev
        );
        log::info!(
            "Aorta mask. numVoxels_min: {}, numVoxels_max: {}",
            self.aorta_num_voxels_min,
            self.aorta_num_voxels_max
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_shape_rejects_even_or_zero() {
        assert!(KernelShape::new(3, 7).is_ok());
        assert!(KernelShape::new(1, 1).is_ok());
        assert!(matches!(
            KernelShape::new(2, 7),
            Err(AifError::Configuration(_))
        ));
        assert!(KernelShape::new(3, 0).is_err());
        assert!(KernelShape::new(0, 0).is_err());
    }

    #[test]
    fn test_kernel_widen_keeps_odd() {
        let k = KernelShape::new(3, 7).unwrap().widened();
        assert_eq!((k.width(), k.height()), (5, 9));
        assert!(KernelShape::new(k.width(), k.height()).is_ok());
    }

    #[test]
    fn test_fraction_range() {
        assert!(Fraction::new(1.0).is_ok());
        assert!(Fraction::new(0.0).is_err());
        assert!(Fraction::new(1.01).is_err());
        assert!(Fraction::new(f64::NAN).is_err());
        let f = Fraction::from_percent(70.0).unwrap();
        assert!((f.get() - 0.7).abs() < 1e-12);
        assert!(Fraction::from_percent(0.0).is_err());
    }

    #[test]
    fn test_band_inclusive() {
        let b = VoxelCountBand::new(475, 525).unwrap();
        assert!(b.contains(475));
        assert!(b.contains(525));
        assert!(!b.contains(474));
        assert!(!b.contains(526));
        assert!(VoxelCountBand::new(10, 10).is_err());
    }

    #[test]
    fn test_default_parameters_valid() {
        let p = ExtractionParameters::default();
        assert!(p.validate().is_ok());
        assert_eq!((p.kernel_nx, p.kernel_ny), (3, 7));
        assert_eq!((p.aorta_num_voxels_min, p.aorta_num_voxels_max), (475, 525));
    }

    #[test]
    fn test_invalid_parameters() {
        let p = ExtractionParameters {
            aorta_num_voxels_min: 600,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(AifError::Configuration(_))));

        let p = ExtractionParameters {
            max_stdev: 0.0,
            ..Default::default()
        };
        assert!(p.validate().is_err());

        let p = ExtractionParameters {
            min_fraction: 0.0,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }
}
