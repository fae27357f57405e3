//! 主动脉种子定位.
//!
//! 在切片内 `kernel_ny * kernel_nx` 窗口上统计最大增强图和达峰时间图, 得到 `[0, 1]` 评分图.
//! 评分最高的体素即为种子. 评分公式见 [`SeedScorePolicy`].

use binary_heap_plus::BinaryHeap;
use ndarray::Zip;

use crate::{AifError, AifResult, KernelShape, MapGenerator, Seed, VoxelMap, VoxelMask};

mod policy;

pub use policy::{AdditiveScore, SeedScorePolicy, WindowedScore};

/// 种子评分需要的派生图.
#[derive(Copy, Clone)]
pub struct SeedMaps<'a> {
    /// 最大增强图.
    pub max_int: &'a VoxelMap,

    /// 达峰时间图.
    pub ttp: &'a VoxelMap,

    /// 零最小强度 (信号缺失) 掩膜.
    pub zero_min: &'a VoxelMask,

    /// 增强前时间点个数.
    pub num_baseline: usize,
}

impl<'a> SeedMaps<'a> {
    /// 直接由各图构建. 形状不一致或 `num_baseline == 0` 时返回 `Err`.
    pub fn new(
        max_int: &'a VoxelMap,
        ttp: &'a VoxelMap,
        zero_min: &'a VoxelMask,
        num_baseline: usize,
    ) -> AifResult<Self> {
        if max_int.dim() != ttp.dim() || max_int.dim() != zero_min.shape() {
            return Err(AifError::config(format!(
                "map shapes differ: {:?}, {:?}, {:?}",
                max_int.dim(),
                ttp.dim(),
                zero_min.shape()
            )));
        }
        if num_baseline == 0 {
            return Err(AifError::config("numBaseline must be positive"));
        }
        Ok(Self {
            max_int,
            ttp,
            zero_min,
            num_baseline,
        })
    }

    /// 从生成器中取出 (必要时计算) 所需的图.
    pub fn from_generator(maps: &'a MapGenerator) -> AifResult<Self> {
        let max_int = maps.maximum_intensity_map()?;
        let ttp = maps.time_to_peak_map()?;
        let zero_min = maps.zero_min_intensity_map()?;
        let num_baseline = maps
            .num_baseline()
            .ok_or(AifError::NoData("numBaseline not set"))?;
        Ok(Self {
            max_int,
            ttp,
            zero_min,
            num_baseline,
        })
    }
}

/// 种子定位结果.
#[derive(Clone, Debug)]
pub struct SeedSelection {
    /// 种子体素.
    pub seed: Seed,

    /// 种子处的评分.
    pub score: f64,

    /// 只包含种子的掩膜.
    pub mask: VoxelMask,
}

/// 行优先序下第一个最大值. 跳过 NaN.
fn first_argmax(map: &VoxelMap) -> Option<(Seed, f64)> {
    let mut best: Option<(Seed, f64)> = None;
    for (pos, &v) in map.indexed_iter() {
        if v.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((pos, v));
        }
    }
    best
}

/// 用 `policy` 计算评分图, 并把信号缺失体素的评分置零.
pub fn compute_seed_score(
    maps: &SeedMaps,
    policy: &dyn SeedScorePolicy,
    kernel: KernelShape,
) -> AifResult<VoxelMap> {
    let mut score = policy.compute_seed_score(maps, kernel)?;
    Zip::from(&mut score)
        .and(maps.zero_min.data())
        .for_each(|s, &dropout| {
            if dropout {
                *s = 0.0;
            }
        });
    Ok(score)
}

/// 在评分图上取种子. 评分处处为零时返回 [`AifError::EmptySelection`].
pub fn select_seed(score: &VoxelMap) -> AifResult<SeedSelection> {
    match first_argmax(score) {
        Some((seed, v)) if v > 0.0 => Ok(SeedSelection {
            seed,
            score: v,
            mask: VoxelMask::singleton(score.dim(), seed)?,
        }),
        _ => Err(AifError::EmptySelection("seed score is zero everywhere")),
    }
}

/// 定位主动脉种子, 并把评分图发布到 `maps` 供显示.
pub fn find_aorta_seed(
    maps: &mut MapGenerator,
    policy: &dyn SeedScorePolicy,
    kernel: KernelShape,
) -> AifResult<SeedSelection> {
    let score = compute_seed_score(&SeedMaps::from_generator(maps)?, policy, kernel)?;
    let selection = select_seed(&score);
    maps.publish_score_map(score);
    let selection = selection?;
    log::info!(
        "aorta seed ({} policy, kernel {}x{}): {:?}, score {:.4}",
        policy.name(),
        kernel.width(),
        kernel.height(),
        selection.seed,
        selection.score
    );
    Ok(selection)
}

/// 最大增强图中最亮的 `n` 个体素, 作为交互选择主动脉时的候选种子.
///
/// 值相同时行优先序靠前者优先. `n` 超过体素总数时取全部; `n == 0` 返回 `Err`.
pub fn candidate_seeds(max_int: &VoxelMap, n: usize) -> AifResult<VoxelMask> {
    if n == 0 {
        return Err(AifError::config("number of candidate seeds must be positive"));
    }
    let n = n.min(max_int.len());

    // 堆顶为当前保留的最差者: 值更小, 或值相同但位置更靠后.
    let mut heap: BinaryHeap<(Seed, f64), _> =
        BinaryHeap::new_by(|a: &(Seed, f64), b: &(Seed, f64)| {
            b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
        });
    heap.reserve(n + 1);
    for (pos, &v) in max_int.indexed_iter() {
        if v.is_nan() {
            continue;
        }
        heap.push((pos, v));
        if heap.len() > n {
            heap.pop();
        }
    }

    let mut mask = VoxelMask::empty(max_int.dim());
    for (pos, _) in heap.into_vec() {
        mask[pos] = true;
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DynamicSeries;
    use ndarray::Array3;

    /// `1 * 7 * 9` 的图, `x = 3..=5` 为亮带.
    fn strip() -> VoxelMap {
        Array3::from_shape_fn((1, 7, 9), |(_, _, w)| {
            if (3..=5).contains(&w) {
                10.0
            } else {
                1.0
            }
        })
    }

    #[test]
    fn test_seed_at_strip_center() {
        let max_int = strip();
        let ttp = Array3::zeros((1, 7, 9));
        let zero = VoxelMask::empty((1, 7, 9));
        let maps = SeedMaps::new(&max_int, &ttp, &zero, 1).unwrap();
        let score = compute_seed_score(&maps, &WindowedScore, KernelShape::default()).unwrap();
        let sel = select_seed(&score).unwrap();
        assert_eq!(sel.seed, (0, 0, 4));
        assert_eq!(sel.mask.positions(), vec![(0, 0, 4)]);
        assert!((sel.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dropout_excluded() {
        let max_int = strip();
        let ttp = Array3::zeros((1, 7, 9));
        let mut zero = VoxelMask::empty((1, 7, 9));
        zero[(0, 0, 4)] = true;
        let maps = SeedMaps::new(&max_int, &ttp, &zero, 1).unwrap();
        let score = compute_seed_score(&maps, &WindowedScore, KernelShape::default()).unwrap();
        assert_eq!(score[(0, 0, 4)], 0.0);
        assert_eq!(select_seed(&score).unwrap().seed, (0, 1, 4));
    }

    #[test]
    fn test_all_zero_score() {
        let score = Array3::zeros((2, 3, 3));
        assert!(matches!(
            select_seed(&score),
            Err(AifError::EmptySelection(_))
        ));
    }

    #[test]
    fn test_seed_maps_shape_mismatch() {
        let max_int = strip();
        let ttp = Array3::zeros((1, 7, 8));
        let zero = VoxelMask::empty((1, 7, 9));
        assert!(SeedMaps::new(&max_int, &ttp, &zero, 1).is_err());
    }

    #[test]
    fn test_find_aorta_seed_publishes_score() {
        // 基线为 0, 亮带之后恒为 10, 背景恒为 1.
        let nt = 4;
        let data = Array3::from_shape_fn((nt, 7, 9), |(t, _, w)| match (t, w) {
            (0, 3..=5) => 0.0,
            (_, 3..=5) => 10.0,
            _ => 1.0,
        });
        let mut maps = MapGenerator::new();
        maps.set_dynamics(DynamicSeries::new(data, nt).unwrap());
        maps.set_num_baseline(1).unwrap();

        assert!(maps.score_map().is_none());
        let sel = find_aorta_seed(&mut maps, &WindowedScore, KernelShape::default()).unwrap();
        assert_eq!(sel.seed, (0, 0, 4));
        assert_eq!(maps.score_map().map(|s| s.dim()), Some((1, 7, 9)));
    }

    #[test]
    fn test_find_aorta_seed_without_data() {
        let mut maps = MapGenerator::new();
        assert!(matches!(
            find_aorta_seed(&mut maps, &WindowedScore, KernelShape::default()),
            Err(AifError::NoData(_))
        ));
    }

    #[test]
    fn test_candidate_seeds() {
        let map = Array3::from_shape_vec((1, 2, 3), vec![5.0, 1.0, 5.0, 7.0, 5.0, 0.0]).unwrap();
        let top = candidate_seeds(&map, 3).unwrap();
        // 7 以及三个 5 中行优先序靠前的两个.
        assert_eq!(top.positions(), vec![(0, 0, 0), (0, 0, 2), (0, 1, 0)]);

        assert_eq!(candidate_seeds(&map, 100).unwrap().count(), 6);
        assert!(matches!(
            candidate_seeds(&map, 0),
            Err(AifError::Configuration(_))
        ));
    }
}
