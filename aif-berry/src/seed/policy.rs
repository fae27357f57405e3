//! 种子评分策略.

use ndarray::Zip;

use super::SeedMaps;
use crate::consts::TTP_LATE_OFFSET;
use crate::stats::{self, max_of};
use crate::{AifError, AifResult, KernelShape, VoxelMap};

/// 由窗口统计得到的四个归一化分项, 各自位于 `[0, 1]`.
pub(crate) struct ScoreTerms {
    /// 最大增强窗口均值 / 全局最大窗口均值.
    pub mean: VoxelMap,

    /// `1 - 最大增强窗口 IQR / 全局最大值`.
    pub iqr: VoxelMap,

    /// `1 - min(达峰时间窗口均值, late) / late`, `late = numBaseline + 3`.
    pub ttp: VoxelMap,

    /// `1 - 达峰时间窗口 IQR / 全局最大值`.
    pub ttp_iqr: VoxelMap,
}

/// 把窗口 IQR 反转为均匀性分项. 若 IQR 处处为零, 则处处同样均匀, 分项取 1.
fn homogeneity(iqr: VoxelMap, what: &str) -> VoxelMap {
    match max_of(iqr.iter().copied()) {
        Some(m) if m > 0.0 => iqr.mapv_into(|v| 1.0 - v / m),
        _ => {
            log::debug!("{what} window IQR is zero everywhere, homogeneity term set to 1");
            iqr.mapv_into(|_| 1.0)
        }
    }
}

impl ScoreTerms {
    pub(crate) fn compute(maps: &SeedMaps, kernel: KernelShape) -> AifResult<Self> {
        let mean = stats::window_mean(maps.max_int, kernel);
        let max_mean = max_of(mean.iter().copied()).unwrap_or(0.0);
        if max_mean <= 0.0 {
            return Err(AifError::DegenerateNormalization(
                "maximum intensity window mean is zero everywhere",
            ));
        }
        let late = maps.num_baseline as f64 + TTP_LATE_OFFSET;

        Ok(Self {
            mean: mean / max_mean,
            iqr: homogeneity(stats::window_iqr(maps.max_int, kernel), "maximum intensity"),
            ttp: stats::window_mean(maps.ttp, kernel).mapv_into(|v| 1.0 - v.min(late) / late),
            ttp_iqr: homogeneity(stats::window_iqr(maps.ttp, kernel), "time to peak"),
        })
    }
}

/// 种子评分公式. 输入为最大增强图与达峰时间图, 输出 `[0, 1]` 评分图.
///
/// 实现者不需要处理信号缺失体素, [`super::find_aorta_seed`] 会把它们清零.
pub trait SeedScorePolicy {
    /// 策略名称, 用于日志和对比实验.
    fn name(&self) -> &'static str;

    /// 在窗口 `kernel` 上计算每个体素的评分.
    fn compute_seed_score(&self, maps: &SeedMaps, kernel: KernelShape) -> AifResult<VoxelMap>;
}

/// 默认策略: `((均值 + 达峰时间) / 2) * ((IQR + 达峰时间 IQR) / 2)`.
///
/// "强度水平" 两项彼此相关, 取平均; "均匀性" 两项同理. 两组之间视为独立, 相乘.
#[derive(Copy, Clone, Debug, Default)]
pub struct WindowedScore;

impl SeedScorePolicy for WindowedScore {
    fn name(&self) -> &'static str {
        "windowed"
    }

    fn compute_seed_score(&self, maps: &SeedMaps, kernel: KernelShape) -> AifResult<VoxelMap> {
        let ScoreTerms {
            mut mean,
            iqr,
            ttp,
            ttp_iqr,
        } = ScoreTerms::compute(maps, kernel)?;
        Zip::from(&mut mean)
            .and(&iqr)
            .and(&ttp)
            .and(&ttp_iqr)
            .for_each(|m, &i, &t, &ti| *m = ((*m + t) / 2.0) * ((i + ti) / 2.0));
        Ok(mean)
    }
}

/// 早期策略: 四个分项的算术平均.
#[derive(Copy, Clone, Debug, Default)]
pub struct AdditiveScore;

impl SeedScorePolicy for AdditiveScore {
    fn name(&self) -> &'static str {
        "additive"
    }

    fn compute_seed_score(&self, maps: &SeedMaps, kernel: KernelShape) -> AifResult<VoxelMap> {
        let terms = ScoreTerms::compute(maps, kernel)?;
        Ok((terms.mean + &terms.iqr + &terms.ttp + &terms.ttp_iqr) / 4.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VoxelMask;
    use ndarray::Array3;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// `1 * 7 * 11` 的图. `x = 1..=3` 是晚强化的亮带, `x = 6..=8` 是早强化的亮带.
    fn two_strips() -> (VoxelMap, VoxelMap) {
        let max_int = Array3::from_shape_fn((1, 7, 11), |(_, _, w)| match w {
            1..=3 | 6..=8 => 10.0,
            _ => 1.0,
        });
        let ttp = Array3::from_shape_fn((1, 7, 11), |(_, _, w)| match w {
            1..=3 => 9.0,
            _ => 0.0,
        });
        (max_int, ttp)
    }

    #[test]
    fn test_windowed_prefers_early_strip() {
        let (max_int, ttp) = two_strips();
        let zero = VoxelMask::empty((1, 7, 11));
        let maps = SeedMaps::new(&max_int, &ttp, &zero, 1).unwrap();
        let score = WindowedScore
            .compute_seed_score(&maps, KernelShape::default())
            .unwrap();
        assert!(f64_eq(score[(0, 3, 7)], 1.0));
        assert!(f64_eq(score[(0, 3, 2)], 0.5));
        assert!(score.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_additive_differs_from_windowed() {
        let (max_int, ttp) = two_strips();
        let zero = VoxelMask::empty((1, 7, 11));
        let maps = SeedMaps::new(&max_int, &ttp, &zero, 1).unwrap();
        let score = AdditiveScore
            .compute_seed_score(&maps, KernelShape::default())
            .unwrap();
        assert!(f64_eq(score[(0, 3, 7)], 1.0));
        assert!(f64_eq(score[(0, 3, 2)], 0.75));
    }

    #[test]
    fn test_flat_ttp_is_homogeneous() {
        let (max_int, _) = two_strips();
        let ttp = Array3::zeros((1, 7, 11));
        let zero = VoxelMask::empty((1, 7, 11));
        let maps = SeedMaps::new(&max_int, &ttp, &zero, 1).unwrap();
        let terms = ScoreTerms::compute(&maps, KernelShape::default()).unwrap();
        assert!(terms.ttp_iqr.iter().all(|&v| v == 1.0));
        assert!(terms.ttp.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_no_enhancement_is_degenerate() {
        let max_int = Array3::zeros((1, 7, 3));
        let ttp = Array3::zeros((1, 7, 3));
        let zero = VoxelMask::empty((1, 7, 3));
        let maps = SeedMaps::new(&max_int, &ttp, &zero, 1).unwrap();
        assert!(matches!(
            WindowedScore.compute_seed_score(&maps, KernelShape::default()),
            Err(AifError::DegenerateNormalization(_))
        ));
    }
}
