//! 三维邻域.

use crate::Idx3d;

/// 获得 `(z, h, w)` 前后上下左右六个面相邻的索引. 不检查越界.
///
/// 下溢的分量会回绕为极大值, 调用方用形状检查即可过滤.
#[inline]
pub(crate) fn neighbour6((z, h, w): Idx3d) -> [Idx3d; 6] {
    [
        (z, h, w.wrapping_sub(1)),
        (z, h, w.saturating_add(1)),
        (z, h.wrapping_sub(1), w),
        (z, h.saturating_add(1), w),
        (z.wrapping_sub(1), h, w),
        (z.saturating_add(1), h, w),
    ]
}

/// 获得 `(z, h, w)` 在 `3 * 3 * 3` 全 1 结构元下的 26 个相邻索引. 不检查越界.
pub(crate) fn neighbour26((z, h, w): Idx3d) -> impl Iterator<Item = Idx3d> {
    const OFFSETS: [isize; 3] = [-1, 0, 1];
    itertools::iproduct!(OFFSETS, OFFSETS, OFFSETS)
        .filter(|&off| off != (0, 0, 0))
        .map(move |(dz, dh, dw)| {
            (
                z.wrapping_add_signed(dz),
                h.wrapping_add_signed(dh),
                w.wrapping_add_signed(dw),
            )
        })
}

/// 判断索引是否位于形状 `dims` 内.
#[inline]
pub(crate) fn check((z0, h0, w0): Idx3d, (z, h, w): Idx3d) -> bool {
    z0 < z && h0 < h && w0 < w
}
