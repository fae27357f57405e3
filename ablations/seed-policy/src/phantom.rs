//! 合成 DCE 体模.
//!
//! - 沿 z 方向的圆柱形 "主动脉", 早强化, 中心最亮并向边缘减弱;
//! - 一个晚强化的方块 (例如肾实质), 峰值比主动脉更高但出现在最后一个时间点;
//! - 左上角信号缺失;
//! - 其余为轻微强化的背景, 叠加确定性的抖动.

use aif_berry::prelude::*;
use ndarray::Array3;

const NZ: usize = 8;
const NY: usize = 48;
const NX: usize = 48;
const NT: usize = 12;
const NB: usize = 3;

const VESSEL_CENTER: (f32, f32) = (24.0, 20.0);
const VESSEL_RADIUS: f32 = 7.0;

/// 主动脉增强曲线 (相对峰值), 从第一个增强后时间点开始.
const BOLUS: [f32; NT - NB] = [0.5, 1.0, 0.8, 0.6, 0.5, 0.45, 0.4, 0.35, 0.3];

/// 合成研究.
pub struct Phantom {
    pub series: DynamicSeries,
    pub num_baseline: usize,

    /// 圆柱内部的真实体素.
    pub vessel: VoxelMask,
}

#[inline]
fn vessel_radius(h: usize, w: usize) -> f32 {
    let (ch, cw) = VESSEL_CENTER;
    ((h as f32 - ch).powi(2) + (w as f32 - cw).powi(2)).sqrt()
}

#[inline]
fn jitter(z: usize, t: usize, h: usize, w: usize) -> f32 {
    ((z * 7919 + t * 104_729 + h * 31 + w * 17) % 13) as f32 * 0.5 - 3.0
}

fn intensity(z: usize, t: usize, h: usize, w: usize) -> f32 {
    if h < 4 && w < 4 {
        return 0.0;
    }
    let r = vessel_radius(h, w);
    let (base, enhancement) = if r <= VESSEL_RADIUS {
        let amp = 200.0 * (1.0 - 0.5 * r / VESSEL_RADIUS);
        (30.0, if t < NB { 0.0 } else { amp * BOLUS[t - NB] })
    } else if (34..44).contains(&h) && (6..18).contains(&w) {
        let ramp = t.saturating_sub(NB) as f32 / (NT - 1 - NB) as f32;
        (50.0, 250.0 * ramp)
    } else {
        (40.0, if t >= 7 { 10.0 } else { 0.0 })
    };
    base + enhancement + jitter(z, t, h, w)
}

impl Phantom {
    pub fn build() -> Self {
        let data = Array3::from_shape_fn((NZ * NT, NY, NX), |(zt, h, w)| {
            intensity(zt / NT, zt % NT, h, w)
        });
        let vessel = VoxelMask::from(Array3::from_shape_fn((NZ, NY, NX), |(_, h, w)| {
            vessel_radius(h, w) <= VESSEL_RADIUS
        }));
        Self {
            series: DynamicSeries::new(data, NT).expect("phantom shape is valid"),
            num_baseline: NB,
            vessel,
        }
    }
}
