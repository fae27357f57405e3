//! 26-连通分量标记, 以及最大连通块的选取.

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::data::neighbour::neighbour26;
use crate::{AifError, AifResult, Idx3d, VoxelMap, VoxelMask};

/// 一个连通块内全部体素的索引.
pub type Patch = Vec<Idx3d>;

/// 以 `3 * 3 * 3` 全 1 结构元标记 `mask` 的连通分量.
///
/// 分量按其行优先序第一个体素的先后排列; 每个分量内按广度优先顺序存放.
pub fn label_components(mask: &VoxelMask) -> Vec<Patch> {
    let mut visited = VoxelMask::empty(mask.shape());
    let mut ans = Vec::with_capacity(4);
    let mut bfs_q = VecDeque::with_capacity(16);

    for pos in mask.positions() {
        if visited[pos] {
            continue;
        }
        visited[pos] = true;
        bfs_q.push_back(pos);
        let mut this_patch = Patch::with_capacity(1);
        while let Some(cur) = bfs_q.pop_front() {
            this_patch.push(cur);
            for neigh in neighbour26(cur) {
                if mask.get(neigh) == Some(true) && !visited[neigh] {
                    visited[neigh] = true;
                    bfs_q.push_back(neigh);
                }
            }
        }
        ans.push(this_patch);
    }
    ans
}

#[inline]
fn mean_of(patch: &[Idx3d], max_int: &VoxelMap) -> f64 {
    patch.iter().map(|&p| max_int[p]).sum::<f64>() / patch.len() as f64
}

/// 选出候选掩膜中体素最多的 26-连通块.
///
/// 体素数相同时, 最大增强均值更高者胜出; 仍相同则保留先标记的块.
/// 候选为空时返回 [`AifError::EmptySelection`].
pub fn pick_largest_patch(candidates: &VoxelMask, max_int: &VoxelMap) -> AifResult<VoxelMask> {
    if candidates.shape() != max_int.dim() {
        return Err(AifError::config(format!(
            "candidate mask shape {:?} differs from map shape {:?}",
            candidates.shape(),
            max_int.dim()
        )));
    }
    let patches = label_components(candidates);
    let Some(first) = patches.first() else {
        return Err(AifError::EmptySelection("candidate mask is empty"));
    };

    let mut best = 0;
    let mut best_mean = mean_of(first, max_int);
    for (i, patch) in patches.iter().enumerate().skip(1) {
        match patch.len().cmp(&patches[best].len()) {
            Ordering::Greater => {
                best = i;
                best_mean = mean_of(patch, max_int);
            }
            Ordering::Equal => {
                log::debug!("found a patch matching the largest size ({})", patch.len());
                let mean = mean_of(patch, max_int);
                if mean > best_mean {
                    best = i;
                    best_mean = mean;
                }
            }
            Ordering::Less => {}
        }
    }

    let mut mask = VoxelMask::empty(candidates.shape());
    for &p in patches[best].iter() {
        mask[p] = true;
    }
    log::info!(
        "AIF patch: {} voxels, largest of {} patches",
        patches[best].len(),
        patches.len()
    );
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn mask_of(dims: Idx3d, voxels: &[Idx3d]) -> VoxelMask {
        let mut m = VoxelMask::empty(dims);
        for &p in voxels {
            m[p] = true;
        }
        m
    }

    #[test]
    fn test_picks_ten_over_seven() {
        let dims = (3, 6, 12);
        // 第 0 行前 10 个, 第 4 行后 7 个. 两者相隔两行, 不相连.
        let ten: Vec<_> = (0..10).map(|w| (1, 0, w)).collect();
        let seven: Vec<_> = (5..12).map(|w| (1, 4, w)).collect();
        let all: Vec<_> = ten.iter().chain(seven.iter()).copied().collect();
        let cand = mask_of(dims, &all);
        let max_int = Array3::ones(dims);

        assert_eq!(label_components(&cand).len(), 2);
        let picked = pick_largest_patch(&cand, &max_int).unwrap();
        assert_eq!(picked, mask_of(dims, &ten));
    }

    #[test]
    fn test_singleton_patch() {
        let dims = (5, 3, 3);
        let cand = mask_of(dims, &[(2, 1, 1)]);
        let picked = pick_largest_patch(&cand, &Array3::zeros(dims)).unwrap();
        assert_eq!(picked, cand);
    }

    #[test]
    fn test_diagonal_is_connected() {
        let dims = (3, 3, 3);
        let cand = mask_of(dims, &[(0, 0, 0), (1, 1, 1), (2, 2, 2)]);
        let patches = label_components(&cand);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].len(), 3);
    }

    #[test]
    fn test_tie_broken_by_mean_intensity() {
        let dims = (1, 1, 7);
        let cand = mask_of(dims, &[(0, 0, 0), (0, 0, 1), (0, 0, 4), (0, 0, 5)]);
        let mut max_int = Array3::from_elem(dims, 1.0);
        max_int[(0, 0, 5)] = 3.0;
        let picked = pick_largest_patch(&cand, &max_int).unwrap();
        assert_eq!(picked.positions(), vec![(0, 0, 4), (0, 0, 5)]);

        // 均值也相同时保留先标记的块.
        let picked = pick_largest_patch(&cand, &Array3::ones(dims)).unwrap();
        assert_eq!(picked.positions(), vec![(0, 0, 0), (0, 0, 1)]);
    }

    #[test]
    fn test_empty_candidates() {
        let dims = (2, 2, 2);
        assert!(matches!(
            pick_largest_patch(&VoxelMask::empty(dims), &Array3::zeros(dims)),
            Err(AifError::EmptySelection(_))
        ));
    }
}
