#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 从 4D 动态增强 (DCE) 序列中选取主动脉体素, 并提取动脉输入函数 (AIF).
//!
//! 该 crate 只负责体素选择与曲线提取的数值部分. 参数采集 (对话框)、图像显示、
//! DICOM 目录读取都由上层交互程序负责, 本库仅通过 [`workflow::ParameterSource`]
//! 与之交互.
//!
//! # 注意
//!
//! 1. 所有阶段都是输入确定的纯函数, 唯一的共享可变状态是 [`MapGenerator`] 内部的缓存.
//! 2. 数据不足或选择为空时返回 [`AifError`], 而不会除零或返回全零结果.
//!
//! # 开发计划
//!
//! ### 动态序列与派生图 ✅
//!
//! 基线均值图, 最大增强图, 达峰时间图, 最小强度图 (及零最小强度掩膜).
//! 四者共享同一失效条件, 按需计算并缓存.
//!
//! 实现位于 `aif-berry/src/maps`.
//!
//! ### 主动脉种子评分 ✅
//!
//! 在 `kernel_ny * kernel_nx` 的切片内窗口上统计最大增强图和达峰时间图的均值与四分位距,
//! 组合得到 `[0, 1]` 评分. 评分公式是可替换的策略 ([`seed::SeedScorePolicy`]).
//!
//! 实现位于 `aif-berry/src/seed`.
//!
//! ### 6-连通区域生长 & 目标体素数自适应搜索 ✅
//!
//! 实现位于 `aif-berry/src/grow`.
//!
//! ### 候选 AIF 体素 & 26-连通最大连通块 ✅
//!
//! 实现位于 `aif-berry/src/candidate.rs` 和 `aif-berry/src/patch.rs`.
//!
//! ### AIF 曲线与统计量 ✅
//!
//! 实现位于 `aif-berry/src/curve.rs`.
//!
//! ### npz 持久化 ✅
//!
//! 动态序列与掩膜均以 `{data, dims}` 的 npz 归档保存, 与 numpy 互通.
//!
//! 实现位于 `aif-berry/src/io`.
//!
//! ### 药代动力学模型拟合 ❌
//!
//! 不在本库范围内.

/// 三维索引 `(z, h, w)`, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 动态序列四维索引 `(z, t, h, w)`.
pub type Idx4d = (usize, usize, usize, usize);

/// 主动脉种子体素的三维索引 `(z, h, w)`. 总是位于图的范围内.
pub type Seed = Idx3d;

/// 体素级别的派生图 (基线, 最大增强, 达峰时间, 评分). 形状总是 `(nz, ny, nx)`.
pub type VoxelMap = ndarray::Array3<f64>;

pub mod consts;

mod error;
pub use error::{AifError, AifResult};

mod params;
pub use params::{ExtractionParameters, Fraction, KernelShape, VoxelCountBand};

/// 动态序列, 掩膜等基础数据结构.
mod data;
pub use data::{DisplayWindow, DynamicSeries, VoxelMask};

/// 切片内窗口统计.
mod stats;

pub mod maps;
pub use maps::{MapGenerator, MapKind, NamedMap};

pub mod seed;

pub mod grow;

pub mod candidate;

pub mod patch;

pub mod curve;
pub use curve::{AifCurve, AifMeasures};

pub mod io;

pub mod workflow;

pub mod prelude;
