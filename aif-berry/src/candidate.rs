//! 候选 AIF 体素.
//!
//! 动脉血的基线信号低、增强幅度高. 因此评分为
//! `(最大增强 / maxV) * (1 - 基线 / maxV)`, 其中 `maxV` 为参与评分体素的最大增强.
//! 评分高于 `fraction * 最高分` 的体素成为候选, 首尾两个切片总是被排除.

use ndarray::Zip;

use crate::stats::{max_of, mean_std};
use crate::{AifError, AifResult, Fraction, Idx3d, VoxelMap, VoxelMask};

fn check_shape(what: &str, got: Idx3d, want: Idx3d) -> AifResult<()> {
    if got != want {
        return Err(AifError::config(format!(
            "{what} shape {got:?} differs from {want:?}"
        )));
    }
    Ok(())
}

/// 从主动脉掩膜中原地剔除最大增强高于 `μ + max_stdev * σ` 的体素 (血管壁部分容积或伪影),
/// 返回剔除的个数. `μ`, `σ` 为掩膜内最大增强的总体均值和标准差.
pub fn reject_upper_outliers(
    aorta: &mut VoxelMask,
    max_int: &VoxelMap,
    max_stdev: f64,
) -> AifResult<usize> {
    check_shape("aorta mask", aorta.shape(), max_int.dim())?;
    let positions = aorta.positions();
    let (mu, sigma) = mean_std(positions.iter().map(|&p| max_int[p]))
        .ok_or(AifError::EmptySelection("aorta mask is empty"))?;
    let upper = mu + max_stdev * sigma;

    let mut removed = 0;
    for p in positions {
        if max_int[p] > upper {
            aorta[p] = false;
            removed += 1;
        }
    }
    log::debug!(
        "aorta outlier rejection: mean {mu:.3}, std {sigma:.3}, upper {upper:.3}, {removed} removed"
    );
    Ok(removed)
}

/// 评分高于 `fraction * 最高分` 的体素, 并清除首尾切片.
fn threshold_scores(score: &VoxelMap, fraction: Fraction) -> AifResult<VoxelMask> {
    let best = max_of(score.iter().copied()).unwrap_or(0.0);
    if best <= 0.0 {
        return Err(AifError::EmptySelection("no positive candidate score"));
    }
    let threshold = fraction.get() * best;
    let mut mask = VoxelMask::from(score.mapv(|s| s > threshold));
    mask.clear_edge_slices();
    if !mask.has_selection() {
        return Err(AifError::EmptySelection(
            "no candidate voxel outside the edge slices",
        ));
    }
    log::debug!("{} candidate AIF voxels", mask.count());
    Ok(mask)
}

/// 在主动脉掩膜内挑选候选 AIF 体素.
///
/// 首先调用 [`reject_upper_outliers`] 修改 `aorta`. 掩膜为空时返回
/// [`AifError::EmptySelection`]; 掩膜内最大增强不为正时返回
/// [`AifError::DegenerateNormalization`].
pub fn generate_candidates(
    aorta: &mut VoxelMask,
    max_int: &VoxelMap,
    baseline: &VoxelMap,
    fraction: Fraction,
    max_stdev: f64,
) -> AifResult<VoxelMask> {
    check_shape("baseline map", baseline.dim(), max_int.dim())?;
    reject_upper_outliers(aorta, max_int, max_stdev)?;

    let max_v = max_of(aorta.positions().into_iter().map(|p| max_int[p]))
        .ok_or(AifError::EmptySelection("aorta mask is empty"))?;
    if max_v <= 0.0 {
        return Err(AifError::DegenerateNormalization(
            "no enhancement inside the aorta mask",
        ));
    }

    let mut score = VoxelMap::zeros(max_int.dim());
    Zip::from(&mut score)
        .and(aorta.data())
        .and(max_int)
        .and(baseline)
        .for_each(|s, &inside, &mi, &b| {
            if inside {
                *s = (mi / max_v) * (1.0 - b / max_v);
            }
        });
    threshold_scores(&score, fraction)
}

/// 不使用主动脉掩膜, 在整个体积上挑选候选 AIF 体素.
///
/// 评分与 [`generate_candidates`] 相同, 但 `maxV` 取全体积, 并额外乘以种子评分图 `seed_score`.
pub fn generate_candidates_global(
    max_int: &VoxelMap,
    baseline: &VoxelMap,
    seed_score: &VoxelMap,
    fraction: Fraction,
) -> AifResult<VoxelMask> {
    check_shape("baseline map", baseline.dim(), max_int.dim())?;
    check_shape("seed score map", seed_score.dim(), max_int.dim())?;

    let max_v = max_of(max_int.iter().copied()).unwrap_or(0.0);
    if max_v <= 0.0 {
        return Err(AifError::DegenerateNormalization("no enhancement in the volume"));
    }
    let mut score = VoxelMap::zeros(max_int.dim());
    Zip::from(&mut score)
        .and(max_int)
        .and(baseline)
        .and(seed_score)
        .for_each(|s, &mi, &b, &k| *s = (mi / max_v) * (1.0 - b / max_v) * k);
    threshold_scores(&score, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// `3 * 3 * 7`, 主动脉掩膜为整个中间切片. 最大增强为 10, `(1, 1, 3)` 为 1000 的亮点.
    fn setup() -> (VoxelMask, VoxelMap, VoxelMap) {
        let dims = (3, 3, 7);
        let max_int = Array3::from_shape_fn(dims, |p| {
            if p == (1, 1, 3) {
                1000.0
            } else {
                10.0
            }
        });
        let mut baseline = Array3::zeros(dims);
        baseline[(1, 0, 0)] = 5.0;
        let aorta = VoxelMask::from(Array3::from_shape_fn(dims, |(z, _, _)| z == 1));
        (aorta, max_int, baseline)
    }

    #[test]
    fn test_outlier_rejected_in_place() {
        let (mut aorta, max_int, _) = setup();
        assert_eq!(reject_upper_outliers(&mut aorta, &max_int, 3.0).unwrap(), 1);
        assert_eq!(aorta.count(), 20);
        assert!(!aorta[(1, 1, 3)]);
    }

    #[test]
    fn test_uniform_mask_keeps_everything() {
        let dims = (3, 2, 2);
        let max_int = Array3::from_elem(dims, 4.0);
        let mut aorta = VoxelMask::from(Array3::from_elem(dims, true));
        assert_eq!(reject_upper_outliers(&mut aorta, &max_int, 3.0).unwrap(), 0);
        assert_eq!(aorta.count(), 12);
    }

    #[test]
    fn test_generate_candidates() {
        let (mut aorta, max_int, baseline) = setup();
        let fraction = Fraction::new(0.9).unwrap();
        let cand = generate_candidates(&mut aorta, &max_int, &baseline, fraction, 3.0).unwrap();
        // 剔除亮点后 maxV = 10. (1, 0, 0) 的评分为 0.5, 其余为 1.
        assert_eq!(cand.count(), 19);
        assert!(!cand[(1, 0, 0)]);
        assert!(!cand[(1, 1, 3)]);
        assert_eq!(aorta.count(), 20);
    }

    #[test]
    fn test_empty_aorta() {
        let (_, max_int, baseline) = setup();
        let mut aorta = VoxelMask::empty((3, 3, 7));
        let fraction = Fraction::new(0.9).unwrap();
        assert!(matches!(
            generate_candidates(&mut aorta, &max_int, &baseline, fraction, 3.0),
            Err(AifError::EmptySelection(_))
        ));
    }

    #[test]
    fn test_no_enhancement_in_aorta() {
        let (mut aorta, _, baseline) = setup();
        let max_int = Array3::zeros((3, 3, 7));
        let fraction = Fraction::new(0.9).unwrap();
        assert!(matches!(
            generate_candidates(&mut aorta, &max_int, &baseline, fraction, 3.0),
            Err(AifError::DegenerateNormalization(_))
        ));
    }

    #[test]
    fn test_baseline_above_enhancement() {
        // 基线高于掩膜内最大增强, 评分全为负.
        let dims = (3, 2, 2);
        let max_int = Array3::from_elem(dims, 10.0);
        let baseline = Array3::from_elem(dims, 20.0);
        let mut aorta = VoxelMask::from(Array3::from_elem(dims, true));
        let fraction = Fraction::new(0.9).unwrap();
        assert!(matches!(
            generate_candidates(&mut aorta, &max_int, &baseline, fraction, 3.0),
            Err(AifError::EmptySelection("no positive candidate score"))
        ));
    }

    #[test]
    fn test_edge_slices_only() {
        let dims = (2, 2, 2);
        let max_int = Array3::from_elem(dims, 5.0);
        let baseline = Array3::zeros(dims);
        let mut aorta = VoxelMask::from(Array3::from_elem(dims, true));
        let fraction = Fraction::new(0.5).unwrap();
        assert!(matches!(
            generate_candidates(&mut aorta, &max_int, &baseline, fraction, 3.0),
            Err(AifError::EmptySelection(_))
        ));
    }

    #[test]
    fn test_generate_candidates_global() {
        let dims = (4, 3, 3);
        let max_int = Array3::from_shape_fn(dims, |(_, h, w)| if (h, w) == (1, 1) { 8.0 } else { 2.0 });
        let baseline = Array3::from_elem(dims, 1.0);
        let seed_score = Array3::from_elem(dims, 1.0);
        let fraction = Fraction::new(0.9).unwrap();
        let cand = generate_candidates_global(&max_int, &baseline, &seed_score, fraction).unwrap();
        assert_eq!(cand.positions(), vec![(1, 1, 1), (2, 1, 1)]);

        // 种子评分为零的位置不会成为候选.
        let mut seed_score = seed_score;
        seed_score[(2, 1, 1)] = 0.0;
        let cand = generate_candidates_global(&max_int, &baseline, &seed_score, fraction).unwrap();
        assert_eq!(cand.positions(), vec![(1, 1, 1)]);
    }

    #[test]
    fn test_global_shape_mismatch() {
        let max_int = Array3::zeros((3, 3, 3));
        let baseline = Array3::zeros((3, 3, 2));
        let fraction = Fraction::new(0.9).unwrap();
        assert!(matches!(
            generate_candidates_global(&max_int, &baseline, &max_int, fraction),
            Err(AifError::Configuration(_))
        ));
    }
}
