//! 最大增强图上的 6-连通区域生长, 以及逼近目标体素数的阈值搜索.

use std::collections::VecDeque;

use crate::consts::flood::{INITIAL_FRACTION, INITIAL_STEP, MIN_STEP};
use crate::data::neighbour;
use crate::{AifError, AifResult, Fraction, Seed, VoxelCountBand, VoxelMap, VoxelMask};

mod search;

use search::ThresholdSearch;

/// 区域生长的起点: 单个种子体素, 或一个掩膜内的全部体素.
#[derive(Copy, Clone, Debug)]
pub enum FloodSeed<'a> {
    /// 单个体素. 阈值参考值为该体素的强度.
    Voxel(Seed),

    /// 掩膜内的全部体素. 阈值参考值为其中的最大强度.
    Mask(&'a VoxelMask),
}

impl From<Seed> for FloodSeed<'_> {
    #[inline]
    fn from(seed: Seed) -> Self {
        Self::Voxel(seed)
    }
}

impl<'a> From<&'a VoxelMask> for FloodSeed<'a> {
    #[inline]
    fn from(mask: &'a VoxelMask) -> Self {
        Self::Mask(mask)
    }
}

/// 解析后的起点集合和阈值参考强度.
struct Starts {
    positions: Vec<Seed>,
    reference: f64,
}

impl Starts {
    fn resolve(max_int: &VoxelMap, seed: FloodSeed) -> AifResult<Self> {
        let dims = max_int.dim();
        let positions = match seed {
            FloodSeed::Voxel(pos) => {
                if !neighbour::check(pos, dims) {
                    return Err(AifError::config(format!("seed {pos:?} outside {dims:?}")));
                }
                vec![pos]
            }
            FloodSeed::Mask(mask) => {
                if mask.shape() != dims {
                    return Err(AifError::config(format!(
                        "seed mask shape {:?} differs from map shape {dims:?}",
                        mask.shape()
                    )));
                }
                mask.positions()
            }
        };
        let reference = crate::stats::max_of(positions.iter().map(|&p| max_int[p]))
            .ok_or(AifError::EmptySelection("flood fill seed mask is empty"))?;
        if reference <= 0.0 {
            return Err(AifError::DegenerateNormalization(
                "flood fill seed has no enhancement",
            ));
        }
        Ok(Self {
            positions,
            reference,
        })
    }

    /// 广度优先生长. 体素被纳入当且仅当其强度不小于 `fraction * reference`.
    fn fill(&self, max_int: &VoxelMap, fraction: f64) -> VoxelMask {
        let threshold = fraction * self.reference;
        let dims = max_int.dim();
        let mut mask = VoxelMask::empty(dims);
        let mut bfs_q = VecDeque::with_capacity(64);

        for &pos in self.positions.iter() {
            if !mask[pos] && max_int[pos] >= threshold {
                mask[pos] = true;
                bfs_q.push_back(pos);
            }
        }
        while let Some(cur) = bfs_q.pop_front() {
            for neigh in neighbour::neighbour6(cur) {
                if neighbour::check(neigh, dims) && !mask[neigh] && max_int[neigh] >= threshold {
                    mask[neigh] = true;
                    bfs_q.push_back(neigh);
                }
            }
        }
        mask
    }
}

/// 从 `seed` 出发, 在 `max_int` 上做 6-连通 (仅面相邻) 区域生长.
///
/// 阈值为 `fraction` 乘以种子强度 (掩膜起点取掩膜内最大强度).
/// 种子强度不为正时返回 [`AifError::DegenerateNormalization`], 而不是空掩膜:
/// 此时任何阈值都没有意义. 掩膜起点为空时返回 [`AifError::EmptySelection`].
pub fn flood_fill<'a>(
    max_int: &VoxelMap,
    seed: impl Into<FloodSeed<'a>>,
    fraction: Fraction,
) -> AifResult<VoxelMask> {
    let starts = Starts::resolve(max_int, seed.into())?;
    Ok(starts.fill(max_int, fraction.get()))
}

/// [`flood_fill_to_target_size`] 的结果.
#[derive(Clone, Debug)]
pub struct FloodFillOutcome {
    /// 最后一次生长得到的掩膜.
    pub mask: VoxelMask,

    /// 最后一次生长使用的阈值比例.
    pub fraction: f64,

    /// `mask` 中的体素个数.
    pub count: usize,

    /// `count` 是否落在目标区间内. 为 `false` 时 `mask` 只是尽力而为的结果.
    pub converged: bool,

    /// 生长次数.
    pub iterations: usize,
}

impl FloodFillOutcome {
    /// 不含掩膜的搜索摘要.
    #[inline]
    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            fraction: self.fraction,
            count: self.count,
            converged: self.converged,
            iterations: self.iterations,
        }
    }

    /// 拆分为掩膜和搜索摘要.
    #[inline]
    pub fn into_parts(self) -> (VoxelMask, SearchSummary) {
        let summary = self.summary();
        (self.mask, summary)
    }
}

/// 阈值搜索的摘要. 由选择流程保留, 供调用方判断是否需要重新询问用户.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SearchSummary {
    /// 最后一次生长使用的阈值比例.
    pub fraction: f64,

    /// 最后一次生长得到的体素个数.
    pub count: usize,

    /// 体素个数是否落在目标区间内.
    pub converged: bool,

    /// 生长次数.
    pub iterations: usize,
}

/// 调整阈值比例, 使区域生长的体素数落在 `band` 内.
///
/// 从比例 0.7, 步长 0.1 开始. 体素数落入区间, 比例离开 `(0, 1)`,
/// 或步长不大于 `1e-5` 时停止. 后两种情况不是错误, 结果中 `converged` 为 `false`.
pub fn flood_fill_to_target_size<'a>(
    max_int: &VoxelMap,
    seed: impl Into<FloodSeed<'a>>,
    band: VoxelCountBand,
) -> AifResult<FloodFillOutcome> {
    let starts = Starts::resolve(max_int, seed.into())?;
    let mut search = ThresholdSearch::new(INITIAL_FRACTION, INITIAL_STEP, MIN_STEP);
    let mut iterations = 0;

    loop {
        let fraction = search.fraction();
        let mask = starts.fill(max_int, fraction);
        let count = mask.count();
        iterations += 1;
        log::debug!("flood fill probe {iterations}: fraction {fraction:.5}, {count} voxels");

        if band.contains(count) {
            log::info!("aorta mask voxels: {count} (fraction {fraction:.5})");
            return Ok(FloodFillOutcome {
                mask,
                fraction,
                count,
                converged: true,
                iterations,
            });
        }
        search.update(count, band);
        if !search.is_open() {
            log::warn!(
                "flood fill search stopped at {count} voxels after {iterations} probes, \
                 target [{}, {}] not reached",
                band.min(),
                band.max()
            );
            return Ok(FloodFillOutcome {
                mask,
                fraction,
                count,
                converged: false,
                iterations,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// 一条长为 `n` 的线, 强度从种子处的 `n` 开始逐个减 1.
    fn ramp_line(n: usize) -> VoxelMap {
        Array3::from_shape_fn((1, 1, n), |(_, _, w)| (n - w) as f64)
    }

    #[test]
    fn test_six_connected_only() {
        let mut map = Array3::zeros((1, 3, 3));
        map[(0, 1, 1)] = 10.0;
        map[(0, 0, 0)] = 10.0;
        map[(0, 1, 2)] = 9.0;
        let mask = flood_fill(&map, (0, 1, 1), Fraction::new(0.5).unwrap()).unwrap();
        assert_eq!(mask.positions(), vec![(0, 1, 1), (0, 1, 2)]);
    }

    #[test]
    fn test_crosses_slices() {
        let map = Array3::from_elem((3, 1, 1), 4.0);
        let mask = flood_fill(&map, (1, 0, 0), Fraction::new(1.0).unwrap()).unwrap();
        assert_eq!(mask.count(), 3);
    }

    #[test]
    fn test_monotonic_in_fraction() {
        let map = Array3::from_shape_fn((3, 8, 8), |(z, h, w)| {
            ((z * 31 + h * 17 + w * 7) % 13) as f64 + if (h, w) == (4, 4) { 20.0 } else { 0.0 }
        });
        let mut last = 0;
        for p in (1..=10).rev() {
            let f = Fraction::new(p as f64 / 10.0).unwrap();
            let count = flood_fill(&map, (1, 4, 4), f).unwrap().count();
            assert!(count >= last);
            last = count;
        }
    }

    #[test]
    fn test_seed_errors() {
        let map = Array3::zeros((2, 2, 2));
        let f = Fraction::new(0.5).unwrap();
        assert!(matches!(
            flood_fill(&map, (0, 0, 0), f),
            Err(AifError::DegenerateNormalization(_))
        ));
        assert!(matches!(
            flood_fill(&map, (2, 0, 0), f),
            Err(AifError::Configuration(_))
        ));
        let empty = VoxelMask::empty((2, 2, 2));
        assert!(matches!(
            flood_fill(&map, &empty, f),
            Err(AifError::EmptySelection(_))
        ));
    }

    #[test]
    fn test_mask_seed_uses_brightest_voxel() {
        let map = ramp_line(10);
        let mut seeds = VoxelMask::empty((1, 1, 10));
        seeds[(0, 0, 0)] = true;
        seeds[(0, 0, 9)] = true;
        // 参考强度 10, 阈值 7.5: 只有 w = 0..=2. w = 9 (强度 1) 不满足阈值.
        let mask = flood_fill(&map, &seeds, Fraction::new(0.75).unwrap()).unwrap();
        assert_eq!(mask.count(), 3);
        assert!(!mask[(0, 0, 9)]);
    }

    #[test]
    fn test_target_size_reached() {
        let map = ramp_line(1000);
        let band = VoxelCountBand::new(475, 525).unwrap();
        let out = flood_fill_to_target_size(&map, (0, 0, 0), band).unwrap();
        // 0.7 -> 301 个, 0.6 -> 401 个, 0.5 -> 501 个.
        assert!(out.converged);
        assert!(band.contains(out.count));
        assert_eq!(out.count, out.mask.count());
        assert_eq!(out.iterations, 3);
        assert!((out.fraction - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_target_size_from_above() {
        // 0.7 -> 1201 个, 超出上限, 步长减半并转向提高阈值.
        let map = ramp_line(4000);
        let band = VoxelCountBand::new(475, 525).unwrap();
        let out = flood_fill_to_target_size(&map, (0, 0, 0), band).unwrap();
        assert!(out.converged);
        assert!(band.contains(out.count));
        assert!(out.fraction > 0.7);
    }

    #[test]
    fn test_target_size_unreachable() {
        let map = Array3::from_elem((1, 1, 10), 5.0);
        let band = VoxelCountBand::new(475, 525).unwrap();
        let out = flood_fill_to_target_size(&map, (0, 0, 3), band).unwrap();
        assert!(!out.converged);
        assert_eq!(out.count, 10);
        assert!(out.iterations >= 1);

        let (mask, summary) = out.into_parts();
        assert_eq!(mask.count(), 10);
        assert!(!summary.converged);
        assert_eq!(summary.count, 10);
    }
}
