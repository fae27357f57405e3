use std::ops::{Index, IndexMut};

use ndarray::{s, Array3, ArrayView3, Axis};

use super::neighbour;
use crate::{AifError, AifResult, Idx3d, Seed};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 与派生图同形状 `(nz, ny, nx)` 的布尔掩膜.
///
/// 每个阶段返回的掩膜都是独立的快照, 修改其中一个不会影响另一个.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoxelMask {
    data: Array3<bool>,
}

impl Index<Idx3d> for VoxelMask {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for VoxelMask {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl From<Array3<bool>> for VoxelMask {
    #[inline]
    fn from(data: Array3<bool>) -> Self {
        Self { data }
    }
}

impl VoxelMask {
    /// 创建形状为 `dims` 的全 `false` 掩膜.
    #[inline]
    pub fn empty(dims: Idx3d) -> Self {
        Self {
            data: Array3::from_elem(dims, false),
        }
    }

    /// 创建仅 `seed` 处为 `true` 的掩膜. `seed` 越界时返回 `Err`.
    pub fn singleton(dims: Idx3d, seed: Seed) -> AifResult<Self> {
        if !neighbour::check(seed, dims) {
            return Err(AifError::config(format!("seed {seed:?} outside {dims:?}")));
        }
        let mut mask = Self::empty(dims);
        mask[seed] = true;
        Ok(mask)
    }

    /// 形状 `(nz, ny, nx)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 检查索引是否合法.
    #[inline]
    pub fn check(&self, pos: Idx3d) -> bool {
        neighbour::check(pos, self.shape())
    }

    /// 获取给定位置的值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx3d) -> Option<bool> {
        self.data.get(pos).copied()
    }

    /// 被选中的体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|v| **v).count()
    }

    /// 是否至少选中了一个体素.
    #[inline]
    pub fn has_selection(&self) -> bool {
        self.data.iter().any(|v| *v)
    }

    /// 收集所有被选中体素的索引, 结果按行优先存储.
    pub fn positions(&self) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(pos, v)| v.then_some(pos))
            .collect()
    }

    /// 行优先序下第一个被选中的体素. 全 `false` 时返回 `None`.
    #[inline]
    pub fn first_position(&self) -> Option<Idx3d> {
        self.data
            .indexed_iter()
            .find_map(|(pos, v)| v.then_some(pos))
    }

    /// 将首尾两个切片置为 `false`.
    pub fn clear_edge_slices(&mut self) {
        let nz = self.data.len_of(Axis(0));
        if nz == 0 {
            return;
        }
        self.data.index_axis_mut(Axis(0), 0).fill(false);
        self.data.index_axis_mut(Axis(0), nz - 1).fill(false);
    }

    /// 第 `z` 个切片上选中的体素个数. 越界时 panic.
    #[inline]
    pub fn count_in_slice(&self, z: usize) -> usize {
        self.data.slice(s![z, .., ..]).iter().filter(|v| **v).count()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, bool> {
        self.data.view()
    }
}
