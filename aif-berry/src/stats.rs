//! 切片内窗口统计, 以及逐切片执行的辅助函数.
//!
//! 窗口深度恒为 1. 越界时按 "反射" 方式取值 (`d c b a | a b c d | d c b a`),
//! 窗口比图大时反复折叠.

use ndarray::{Array2, Array3, ArrayView2, Axis};
use num::Float;
use ordered_float::OrderedFloat;

use crate::{KernelShape, VoxelMap};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 对 `0..nz` 的每个切片执行 `op`, 按切片顺序收集结果.
///
/// 打开 `rayon` feature 时并行执行. 调用方在全部切片完成后才拿到结果.
pub(crate) fn per_slice<T, F>(nz: usize, op: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            (0..nz).into_par_iter().map(op).collect()
        } else {
            (0..nz).map(op).collect()
        }
    }
}

/// 将逐切片结果拼成 `(nz, ny, nx)` 的三维图.
pub(crate) fn stack(dims: (usize, usize, usize), slices: Vec<Array2<f64>>) -> VoxelMap {
    let mut map = Array3::zeros(dims);
    for (mut dst, src) in map.axis_iter_mut(Axis(0)).zip(slices) {
        dst.assign(&src);
    }
    map
}

/// 将可能越界的下标 `i` 反射回 `[0, n)`.
#[inline]
fn reflect(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let r = i.rem_euclid(period) as usize;
    if r < n {
        r
    } else {
        2 * n - 1 - r
    }
}

/// 收集以 `(h, w)` 为中心的窗口内的全部取值.
fn gather(sli: ArrayView2<f64>, (h, w): (usize, usize), kernel: KernelShape, buf: &mut Vec<f64>) {
    let (ny, nx) = sli.dim();
    let (hh, hw) = (kernel.half_height() as isize, kernel.half_width() as isize);
    buf.clear();
    for dh in -hh..=hh {
        let y = reflect(h as isize + dh, ny);
        for dw in -hw..=hw {
            buf.push(sli[(y, reflect(w as isize + dw, nx))]);
        }
    }
}

/// 对每个切片的每个像素, 在窗口取值上执行 `reduce`.
fn window_reduce<F>(map: &VoxelMap, kernel: KernelShape, reduce: F) -> VoxelMap
where
    F: Fn(&mut Vec<f64>) -> f64 + Sync + Send,
{
    let slices = per_slice(map.len_of(Axis(0)), |z| {
        let sli = map.index_axis(Axis(0), z);
        let mut buf = Vec::with_capacity(kernel.size());
        Array2::from_shape_fn(sli.dim(), |pos| {
            gather(sli, pos, kernel, &mut buf);
            reduce(&mut buf)
        })
    });
    stack(map.dim(), slices)
}

/// `n` 个值中第 `percent` 百分位的零起始秩.
#[inline]
fn percentile_rank(n: usize, percent: f64) -> usize {
    ((n as f64 * percent / 100.0) as usize).min(n - 1)
}

/// 窗口均值.
pub(crate) fn window_mean(map: &VoxelMap, kernel: KernelShape) -> VoxelMap {
    window_reduce(map, kernel, |buf| buf.iter().sum::<f64>() / buf.len() as f64)
}

/// 窗口百分位数. 取排序后第 `floor(n * percent / 100)` 个值.
pub(crate) fn window_percentile(map: &VoxelMap, kernel: KernelShape, percent: f64) -> VoxelMap {
    let rank = percentile_rank(kernel.size(), percent);
    window_reduce(map, kernel, move |buf| {
        let (_, v, _) = buf.select_nth_unstable_by_key(rank, |v| OrderedFloat(*v));
        *v
    })
}

/// 窗口四分位距 (第 75 与第 25 百分位数之差).
pub(crate) fn window_iqr(map: &VoxelMap, kernel: KernelShape) -> VoxelMap {
    let lo = percentile_rank(kernel.size(), 25.0);
    let hi = percentile_rank(kernel.size(), 75.0);
    window_reduce(map, kernel, move |buf| {
        buf.sort_unstable_by_key(|v| OrderedFloat(*v));
        buf[hi] - buf[lo]
    })
}

/// 总体均值与总体标准差. 输入为空时返回 `None`.
pub(crate) fn mean_std<F: Float>(values: impl Iterator<Item = F> + Clone) -> Option<(F, F)> {
    let (sum, n) = values
        .clone()
        .fold((F::zero(), 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        return None;
    }
    let n = <F as num::NumCast>::from(n)?;
    let mean = sum / n;
    let var = values.fold(F::zero(), |acc, v| acc + (v - mean).powi(2)) / n;
    Some((mean, var.sqrt()))
}

/// 忽略 NaN 的最大值. 输入为空 (或全为 NaN) 时返回 `None`.
pub(crate) fn max_of<F: Float>(values: impl Iterator<Item = F>) -> Option<F> {
    values.filter(|v| !v.is_nan()).reduce(F::max)
}
