//! 通用常量.

/// [`crate::ExtractionParameters`] 的默认值.
pub mod defaults {
    /// 种子评分窗口宽度 (x 方向体素数).
    pub const KERNEL_NX: usize = 3;

    /// 种子评分窗口高度 (y 方向体素数).
    pub const KERNEL_NY: usize = 7;

    /// 候选 AIF 体素的评分阈值 (相对最高分的比例).
    pub const MIN_FRACTION: f64 = 0.9;

    /// 主动脉掩膜上离群值剔除的标准差倍数.
    pub const MAX_STDEV: f64 = 3.0;

    /// 主动脉掩膜目标体素数下限.
    pub const AORTA_NUM_VOXELS_MIN: usize = 475;

    /// 主动脉掩膜目标体素数上限.
    pub const AORTA_NUM_VOXELS_MAX: usize = 525;
}

/// 目标体素数自适应区域生长的搜索常量.
pub mod flood {
    /// 初始阈值比例.
    pub const INITIAL_FRACTION: f64 = 0.7;

    /// 初始步长.
    pub const INITIAL_STEP: f64 = 0.1;

    /// 步长不大于该值时停止搜索.
    pub const MIN_STEP: f64 = 1e-5;
}

/// 达峰时间晚于 `numBaseline + TTP_LATE_OFFSET` 的体素被视为 "晚强化", 评分取下限.
pub const TTP_LATE_OFFSET: f64 = 3.0;

/// 种子重新查找时, 窗口在每个方向上加宽的体素数.
pub const KERNEL_WIDEN_STEP: usize = 2;

/// 交给显示端的派生图名称.
pub mod names {
    /// 最大增强图.
    pub const MAXIMUM_INTENSITY: &str = "Maximum Intensity Map";

    /// 达峰时间图.
    pub const TIME_TO_PEAK: &str = "Time To Peak Map";

    /// 基线均值图.
    pub const MEAN_BASELINE: &str = "Mean Baseline Map";

    /// 最小强度图.
    pub const MINIMUM_INTENSITY: &str = "Minimum Intensity Map";

    /// 主动脉种子评分图.
    pub const SEED_SCORE: &str = "Aorta seed score maps";
}
