//! AIF 曲线与统计量.

use ndarray::{s, Array1};

use crate::{AifError, AifResult, DynamicSeries, VoxelMask};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 对最终 AIF 曲线计算一次的统计量.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AifMeasures {
    /// 增强前时间点个数.
    pub num_baseline: usize,

    /// AIF 掩膜的体素个数.
    pub num_voxels: usize,

    /// 曲线前 `num_baseline` 个值的均值.
    pub ave_baseline: f64,

    /// 曲线前 `num_baseline` 个值的极差 (最大减最小).
    pub max_diff_baseline: f64,

    /// 曲线最大值.
    pub max_val: f64,
}

impl AifMeasures {
    /// 报告用的定长数组 `[numBaseline, numVoxels, aveBaseline, maxDiffBaseline, maxVal]`.
    pub fn to_array(&self) -> [f64; 5] {
        [
            self.num_baseline as f64,
            self.num_voxels as f64,
            self.ave_baseline,
            self.max_diff_baseline,
            self.max_val,
        ]
    }
}

/// 每个时间点上掩膜内体素的平均强度, 以及其统计量.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AifCurve {
    values: Array1<f64>,
    measures: AifMeasures,
}

impl AifCurve {
    /// 曲线, 长度为 `nt`.
    #[inline]
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// 统计量.
    #[inline]
    pub fn measures(&self) -> &AifMeasures {
        &self.measures
    }

    /// 时间点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 曲线是否为空. 由 [`extract_curve`] 得到的曲线总是非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 拆分为曲线和统计量.
    #[inline]
    pub fn into_parts(self) -> (Array1<f64>, AifMeasures) {
        (self.values, self.measures)
    }
}

/// 在 `mask` 上对 `series` 的每个时间点求平均强度, 得到 AIF 曲线.
///
/// 掩膜为空时返回 [`AifError::EmptySelection`]; 形状不一致或 `num_baseline`
/// 不在 `[1, nt)` 内时返回 [`AifError::Configuration`].
pub fn extract_curve(
    mask: &VoxelMask,
    series: &DynamicSeries,
    num_baseline: usize,
) -> AifResult<AifCurve> {
    if mask.shape() != series.dims() {
        return Err(AifError::config(format!(
            "AIF mask shape {:?} differs from series volume {:?}",
            mask.shape(),
            series.dims()
        )));
    }
    let nt = series.nt();
    if num_baseline == 0 || num_baseline >= nt {
        return Err(AifError::config(format!(
            "numBaseline must lie in [1, {nt}), got {num_baseline}"
        )));
    }
    let positions = mask.positions();
    if positions.is_empty() {
        return Err(AifError::EmptySelection("AIF mask is empty"));
    }

    let mut values = Array1::<f64>::zeros(nt);
    for &(z, h, w) in positions.iter() {
        values += &series
            .slice_frames(z)
            .slice(s![.., h, w])
            .mapv(|v| v as f64);
    }
    values /= positions.len() as f64;

    let base = values.slice(s![..num_baseline]);
    let fold_min = base.fold(f64::INFINITY, |a, &b| a.min(b));
    let fold_max = base.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let measures = AifMeasures {
        num_baseline,
        num_voxels: positions.len(),
        ave_baseline: base.sum() / num_baseline as f64,
        max_diff_baseline: fold_max - fold_min,
        max_val: values.fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
    };
    log::info!(
        "AIF extracted over {} voxels: baseline {:.3}, peak {:.3}",
        measures.num_voxels,
        measures.ave_baseline,
        measures.max_val
    );
    Ok(AifCurve { values, measures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 两个切片, 4 个时间点, `2 * 2` 图像. 强度为 `t * (z + 1) + h`.
    fn series() -> DynamicSeries {
        let nt = 4;
        let data = Array3::from_shape_fn((2 * nt, 2, 2), |(zt, h, _)| {
            let (z, t) = (zt / nt, zt % nt);
            (t * (z + 1) + h) as f32
        });
        DynamicSeries::new(data, nt).unwrap()
    }

    #[test]
    fn test_extract_curve() {
        let mut mask = VoxelMask::empty((2, 2, 2));
        mask[(0, 0, 0)] = true; // t
        mask[(1, 1, 1)] = true; // 2t + 1
        let curve = extract_curve(&mask, &series(), 2).unwrap();
        // (3t + 1) / 2
        let expected = [0.5, 2.0, 3.5, 5.0];
        assert_eq!(curve.len(), 4);
        for (v, e) in curve.values().iter().zip(expected) {
            assert!(f64_eq(*v, e));
        }

        let m = curve.measures();
        assert_eq!(m.num_baseline, 2);
        assert_eq!(m.num_voxels, 2);
        assert!(f64_eq(m.ave_baseline, 1.25));
        assert!(f64_eq(m.max_diff_baseline, 1.5));
        assert!(f64_eq(m.max_val, 5.0));
        assert_eq!(m.to_array()[1], 2.0);
    }

    #[test]
    fn test_extract_curve_errors() {
        let s = series();
        assert!(matches!(
            extract_curve(&VoxelMask::empty((2, 2, 2)), &s, 1),
            Err(AifError::EmptySelection(_))
        ));
        let mask = VoxelMask::singleton((2, 2, 2), (0, 0, 0)).unwrap();
        assert!(extract_curve(&mask, &s, 0).is_err());
        assert!(extract_curve(&mask, &s, 4).is_err());
        let wrong = VoxelMask::singleton((3, 2, 2), (0, 0, 0)).unwrap();
        assert!(matches!(
            extract_curve(&wrong, &s, 1),
            Err(AifError::Configuration(_))
        ));
    }
}
