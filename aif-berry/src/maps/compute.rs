//! 派生图的逐切片计算.
//!
//! 每个切片写入互不重叠的输出区域, 切片之间不共享任何数据.

use ndarray::{s, Array2, ArrayView3, Axis, Zip};

use crate::stats::{per_slice, stack};
use crate::{DynamicSeries, VoxelMap};

/// 前 `num_baseline` 帧的逐像素均值, 形状 `(ny, nx)`.
fn baseline_of(frames: ArrayView3<f32>, num_baseline: usize) -> Array2<f64> {
    let mut acc = Array2::<f64>::zeros((frames.len_of(Axis(1)), frames.len_of(Axis(2))));
    for frame in frames.slice(s![..num_baseline, .., ..]).axis_iter(Axis(0)) {
        Zip::from(&mut acc)
            .and(&frame)
            .for_each(|a, &v| *a += v as f64);
    }
    acc / num_baseline as f64
}

/// 基线 (增强前) 均值图.
pub(crate) fn baseline_map(series: &DynamicSeries, num_baseline: usize) -> VoxelMap {
    let slices = per_slice(series.len_z(), |z| {
        baseline_of(series.slice_frames(z), num_baseline)
    });
    stack(series.dims(), slices)
}

/// 同一遍扫描中计算最大增强图和达峰时间图.
///
/// 每个增强后时间点先减去基线均值并截断负值, 然后取最大值及其 **首次** 出现的下标.
/// 达峰时间是增强后时间点中的零起始下标.
pub(crate) fn max_and_ttp_maps(series: &DynamicSeries, num_baseline: usize) -> (VoxelMap, VoxelMap) {
    let slices = per_slice(series.len_z(), |z| {
        let frames = series.slice_frames(z);
        let base = baseline_of(frames, num_baseline);
        let post = frames.slice(s![num_baseline.., .., ..]);

        let mut max_int = Array2::<f64>::from_elem(base.dim(), f64::NEG_INFINITY);
        let mut ttp = Array2::<f64>::zeros(base.dim());
        for (t, frame) in post.axis_iter(Axis(0)).enumerate() {
            Zip::from(&mut max_int)
                .and(&mut ttp)
                .and(&frame)
                .and(&base)
                .for_each(|m, p, &v, &b| {
                    let enhancement = (v as f64 - b).max(0.0);
                    // 严格大于: 并列时保留第一个最大值.
                    if enhancement > *m {
                        *m = enhancement;
                        *p = t as f64;
                    }
                });
        }
        (max_int, ttp)
    });
    let (max_slices, ttp_slices): (Vec<_>, Vec<_>) = slices.into_iter().unzip();
    (
        stack(series.dims(), max_slices),
        stack(series.dims(), ttp_slices),
    )
}

/// 增强后时间点上的原始最小强度图.
pub(crate) fn min_map(series: &DynamicSeries, num_baseline: usize) -> VoxelMap {
    let slices = per_slice(series.len_z(), |z| {
        series
            .slice_frames(z)
            .slice(s![num_baseline.., .., ..])
            .fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v as f64))
    });
    stack(series.dims(), slices)
}
