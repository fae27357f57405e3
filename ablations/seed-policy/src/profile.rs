use std::time::Duration;

use aif_berry::prelude::*;

use crate::phantom::Phantom;

/// 单个评分策略在体模上的一次完整运行记录.
#[derive(Clone, Debug, Default)]
pub struct Profile {
    pub seed: Option<Seed>,
    pub seed_in_vessel: bool,
    pub aorta_voxels: usize,

    /// 主动脉掩膜的阈值搜索是否达到目标体素数.
    pub aorta_converged: bool,
    pub candidate_voxels: usize,
    pub patch_voxels: usize,

    /// AIF 掩膜中落在真实血管内的比例.
    pub patch_precision: f64,
    pub peak: f64,
    pub elapsed: Duration,
    pub error: Option<String>,
}

#[inline]
fn count_of(mask: Option<&VoxelMask>) -> usize {
    mask.map_or(0, VoxelMask::count)
}

impl Profile {
    /// 从选择器当前状态整理记录. `outcome` 为流程返回值.
    pub fn collect(
        phantom: &Phantom,
        selector: &AifSelector,
        outcome: AifResult<AifCurve>,
        elapsed: Duration,
    ) -> Self {
        let seed = selector.seed();
        let aif = selector.aif_mask();
        let patch_precision = aif.map_or(0.0, |m| {
            let hits = m
                .positions()
                .into_iter()
                .filter(|&p| phantom.vessel[p])
                .count();
            hits as f64 / m.count().max(1) as f64
        });
        let (peak, error) = match outcome {
            Ok(curve) => (curve.measures().max_val, None),
            Err(e) => (0.0, Some(e.to_string())),
        };
        Self {
            seed,
            seed_in_vessel: seed.map_or(false, |s| phantom.vessel[s]),
            aorta_voxels: count_of(selector.aorta_mask()),
            aorta_converged: selector.aorta_search().map_or(false, |s| s.converged),
            candidate_voxels: count_of(selector.candidate_mask()),
            patch_voxels: count_of(aif),
            patch_precision,
            peak,
            elapsed,
            error,
        }
    }
}
