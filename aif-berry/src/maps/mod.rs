//! 由动态序列派生的体素图, 及其缓存.
//!
//! 所有派生图共享同一个失效条件: 序列或 `numBaseline` 改变. 每张图最多计算一次,
//! 计算完成后才会被放入缓存, 因此不会出现只写了一部分的图.

use once_cell::unsync::OnceCell;

use crate::consts::names;
use crate::{AifError, AifResult, DynamicSeries, VoxelMap, VoxelMask};

mod compute;

/// 可以交给显示端的派生图种类.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MapKind {
    /// 最大增强图.
    MaximumIntensity,

    /// 达峰时间图.
    TimeToPeak,

    /// 基线均值图.
    MeanBaseline,

    /// 增强后最小强度图.
    MinimumIntensity,

    /// 最近一次发布的主动脉种子评分图.
    SeedScore,
}

impl MapKind {
    /// 显示用名称.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MaximumIntensity => names::MAXIMUM_INTENSITY,
            Self::TimeToPeak => names::TIME_TO_PEAK,
            Self::MeanBaseline => names::MEAN_BASELINE,
            Self::MinimumIntensity => names::MINIMUM_INTENSITY,
            Self::SeedScore => names::SEED_SCORE,
        }
    }
}

/// 带名称的派生图快照, 供显示使用.
#[derive(Clone, Debug)]
pub struct NamedMap {
    /// 显示名称, 如 "Maximum Intensity Map".
    pub name: &'static str,

    /// 图数据.
    pub map: VoxelMap,
}

/// 派生图缓存. 全部字段一起失效.
#[derive(Default)]
struct MapCache {
    baseline: OnceCell<VoxelMap>,

    /// (最大增强图, 达峰时间图). 二者在同一遍扫描中产生.
    max_maps: OnceCell<(VoxelMap, VoxelMap)>,

    min_int: OnceCell<VoxelMap>,

    zero_min: OnceCell<VoxelMask>,

    score: Option<VoxelMap>,
}

/// 持有动态序列, 并按需生成、缓存派生图.
///
/// 缓存使用单线程的 `OnceCell`, 所以查询方法只需 `&self`.
/// 该结构不是 `Sync` 的; 并行只发生在单张图的逐切片计算内部.
#[derive(Default)]
pub struct MapGenerator {
    series: Option<DynamicSeries>,
    num_baseline: Option<usize>,
    cache: MapCache,
}

impl MapGenerator {
    /// 创建空的生成器.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置动态序列. 旧序列, 已缓存的图和 `numBaseline` 一并清空.
    pub fn set_dynamics(&mut self, series: DynamicSeries) {
        log::info!(
            "dynamic series set: nt = {}, dims = {:?}",
            series.nt(),
            series.dims()
        );
        self.series = Some(series);
        self.num_baseline = None;
        self.invalidate();
    }

    /// 设置增强前时间点个数, 要求 `1 <= n < nt`.
    ///
    /// 值改变时全部图失效.
    pub fn set_num_baseline(&mut self, n: usize) -> AifResult<()> {
        let series = self.series()?;
        if n == 0 || n >= series.nt() {
            return Err(AifError::config(format!(
                "numBaseline must lie in [1, {}), got {n}",
                series.nt()
            )));
        }
        if self.num_baseline != Some(n) {
            self.num_baseline = Some(n);
            self.invalidate();
        }
        Ok(())
    }

    /// 清空序列, `numBaseline` 和所有缓存.
    pub fn reset(&mut self) {
        self.series = None;
        self.num_baseline = None;
        self.invalidate();
    }

    /// 一次性清空所有缓存的图.
    #[inline]
    pub fn invalidate(&mut self) {
        self.cache = MapCache::default();
    }

    /// 当前序列.
    #[inline]
    pub fn series(&self) -> AifResult<&DynamicSeries> {
        self.series
            .as_ref()
            .ok_or(AifError::NoData("dynamic series not set"))
    }

    /// 增强前时间点个数 (若已设置).
    #[inline]
    pub fn num_baseline(&self) -> Option<usize> {
        self.num_baseline
    }

    /// 增强前时间点个数是否已知.
    #[inline]
    pub fn is_num_baseline_set(&self) -> bool {
        self.num_baseline.is_some()
    }

    fn require(&self) -> AifResult<(&DynamicSeries, usize)> {
        let series = self.series()?;
        let n = self
            .num_baseline
            .ok_or(AifError::NoData("numBaseline not set"))?;
        Ok((series, n))
    }

    /// 基线 (增强前) 均值图.
    pub fn baseline_map(&self) -> AifResult<&VoxelMap> {
        self.cache.baseline.get_or_try_init(|| {
            let (series, n) = self.require()?;
            log::info!("generating baseline map");
            Ok(compute::baseline_map(series, n))
        })
    }

    fn max_maps(&self) -> AifResult<&(VoxelMap, VoxelMap)> {
        self.cache.max_maps.get_or_try_init(|| {
            let (series, n) = self.require()?;
            log::info!("generating maximum intensity and time to peak maps");
            Ok(compute::max_and_ttp_maps(series, n))
        })
    }

    /// 最大增强图: 增强后时间点减去基线均值并截断负值后的最大值.
    #[inline]
    pub fn maximum_intensity_map(&self) -> AifResult<&VoxelMap> {
        Ok(&self.max_maps()?.0)
    }

    /// 达峰时间图: 最大增强在增强后时间点中首次出现的零起始下标.
    /// 取值为 `[0, nt - numBaseline)` 内的整数.
    #[inline]
    pub fn time_to_peak_map(&self) -> AifResult<&VoxelMap> {
        Ok(&self.max_maps()?.1)
    }

    /// 增强后时间点上的最小原始强度图.
    pub fn minimum_intensity_map(&self) -> AifResult<&VoxelMap> {
        self.cache.min_int.get_or_try_init(|| {
            let (series, n) = self.require()?;
            log::info!("generating minimum intensity map");
            Ok(compute::min_map(series, n))
        })
    }

    /// 增强后最小强度恰好为零的体素 (信号缺失 / 背景), 评分时被排除.
    pub fn zero_min_intensity_map(&self) -> AifResult<&VoxelMask> {
        self.cache.zero_min.get_or_try_init(|| {
            let min = self.minimum_intensity_map()?;
            Ok(VoxelMask::from(min.mapv(|v| v == 0.0)))
        })
    }

    /// 发布种子评分图, 供显示使用. 随其它图一起失效.
    pub fn publish_score_map(&mut self, score: VoxelMap) {
        self.cache.score = Some(score);
    }

    /// 最近一次发布的种子评分图.
    #[inline]
    pub fn score_map(&self) -> Option<&VoxelMap> {
        self.cache.score.as_ref()
    }

    /// 获得带名称的派生图快照.
    pub fn named_map(&self, kind: MapKind) -> AifResult<NamedMap> {
        let map = match kind {
            MapKind::MaximumIntensity => self.maximum_intensity_map()?,
            MapKind::TimeToPeak => self.time_to_peak_map()?,
            MapKind::MeanBaseline => self.baseline_map()?,
            MapKind::MinimumIntensity => self.minimum_intensity_map()?,
            MapKind::SeedScore => self
                .score_map()
                .ok_or(AifError::NoData("seed score map not published"))?,
        };
        Ok(NamedMap {
            name: kind.name(),
            map: map.clone(),
        })
    }
}
