use std::ops::Index;

use ndarray::{s, Array3, ArrayView3, Axis};

use crate::{AifError, AifResult, Idx3d, Idx4d};

mod mask;
pub(crate) mod neighbour;
mod window;

pub use mask::VoxelMask;
pub use window::DisplayWindow;

/// 4D 动态增强序列. 强度值以 `f32` 保存.
///
/// 底层是 `(nz * nt, ny, nx)` 的三维数组, 第一维按切片优先交错存放:
/// 第 `z` 个切片在第 `t` 个时间点的图像位于 `z * nt + t`.
///
/// 创建后不可修改; 重新加载时整体替换.
#[derive(Debug, Clone)]
pub struct DynamicSeries {
    data: Array3<f32>,
    nt: usize,
}

impl Index<Idx4d> for DynamicSeries {
    type Output = f32;

    /// 按 `(z, t, h, w)` 索引. 越界时 panic.
    #[inline]
    fn index(&self, (z, t, h, w): Idx4d) -> &Self::Output {
        assert!(t < self.nt, "时间点越界");
        &self.data[(z * self.nt + t, h, w)]
    }
}

impl DynamicSeries {
    /// 用切片优先交错的 `(nz * nt, ny, nx)` 数组和时间点个数 `nt` 创建序列.
    ///
    /// 数据为空, `nt < 2`, 或第一维不能被 `nt` 整除时返回 [`AifError::Configuration`].
    pub fn new(data: Array3<f32>, nt: usize) -> AifResult<Self> {
        let (nzt, ny, nx) = data.dim();
        if nzt == 0 || ny == 0 || nx == 0 {
            return Err(AifError::config("dynamic series is empty"));
        }
        if nt < 2 {
            return Err(AifError::config(format!(
                "dynamic series needs at least 2 timepoints, got {nt}"
            )));
        }
        if nzt % nt != 0 {
            return Err(AifError::config(format!(
                "first axis {nzt} is not a multiple of nt = {nt}"
            )));
        }
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().to_owned()
        };
        Ok(Self { data, nt })
    }

    /// 时间点个数.
    #[inline]
    pub fn nt(&self) -> usize {
        self.nt
    }

    /// 空间切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.data.len_of(Axis(0)) / self.nt
    }

    /// 单个时间点的体积形状 `(nz, ny, nx)`. 同时也是所有派生图的形状.
    #[inline]
    pub fn dims(&self) -> Idx3d {
        let (_, ny, nx) = self.data.dim();
        (self.len_z(), ny, nx)
    }

    /// 持久化时使用的形状描述 `[nt, nz, ny, nx]`.
    #[inline]
    pub fn shape4(&self) -> [usize; 4] {
        let (nz, ny, nx) = self.dims();
        [self.nt, nz, ny, nx]
    }

    /// 获得底层数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 第 `z` 个切片的全部时间帧, 形状 `(nt, ny, nx)`.
    ///
    /// 当 `z` 越界时 panic.
    #[inline]
    pub fn slice_frames(&self, z: usize) -> ArrayView3<'_, f32> {
        let start = z * self.nt;
        self.data.slice(s![start..start + self.nt, .., ..])
    }

    /// 第 `t` 个时间点的整个体积, 形状 `(nz, ny, nx)`. 供显示使用.
    pub fn timepoint_volume(&self, t: usize) -> AifResult<Array3<f32>> {
        if t >= self.nt {
            return Err(AifError::config(format!(
                "timepoint {t} out of range 0..{}",
                self.nt
            )));
        }
        Ok(self.data.slice(s![t..;self.nt, .., ..]).to_owned())
    }

    /// 单个体素 `(z, h, w)` 的原始时间曲线.
    pub fn voxel_curve(&self, (z, h, w): Idx3d) -> AifResult<Vec<f32>> {
        let (nz, ny, nx) = self.dims();
        if z >= nz || h >= ny || w >= nx {
            return Err(AifError::config(format!(
                "voxel {:?} outside {:?}",
                (z, h, w),
                (nz, ny, nx)
            )));
        }
        Ok(self.slice_frames(z).slice(s![.., h, w]).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 两个切片, 三个时间点, 值编码为 `100 * z + 10 * t + h * 2 + w`.
    fn tiny() -> DynamicSeries {
        let (nz, nt, ny, nx) = (2, 3, 2, 2);
        let data = Array3::from_shape_fn((nz * nt, ny, nx), |(zt, h, w)| {
            let (z, t) = (zt / nt, zt % nt);
            (100 * z + 10 * t + h * 2 + w) as f32
        });
        DynamicSeries::new(data, nt).unwrap()
    }

    #[test]
    fn test_series_dims() {
        let s = tiny();
        assert_eq!(s.dims(), (2, 2, 2));
        assert_eq!(s.shape4(), [3, 2, 2, 2]);
        assert_eq!(s.len_z(), 2);
        assert_eq!(s[(1, 2, 1, 0)], 122.0);
    }

    #[test]
    fn test_series_invalid() {
        let data = Array3::<f32>::zeros((5, 2, 2));
        assert!(matches!(
            DynamicSeries::new(data.clone(), 2),
            Err(AifError::Configuration(_))
        ));
        assert!(DynamicSeries::new(data, 1).is_err());
        assert!(DynamicSeries::new(Array3::<f32>::zeros((0, 2, 2)), 2).is_err());
    }

    #[test]
    fn test_timepoint_volume() {
        let s = tiny();
        let v = s.timepoint_volume(1).unwrap();
        assert_eq!(v.dim(), (2, 2, 2));
        assert_eq!(v[(0, 0, 0)], 10.0);
        assert_eq!(v[(1, 1, 1)], 113.0);
        assert!(s.timepoint_volume(3).is_err());
    }

    #[test]
    fn test_voxel_curve() {
        let s = tiny();
        assert_eq!(s.voxel_curve((1, 0, 1)).unwrap(), vec![101.0, 111.0, 121.0]);
        assert!(s.voxel_curve((2, 0, 0)).is_err());
    }
}
