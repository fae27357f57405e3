//! 交互流程边界.
//!
//! 核心各阶段都是纯函数; 当前的种子、主动脉掩膜、候选掩膜和最终 AIF 掩膜由
//! [`AifSelector`] 持有, 只在一次选择流程完整成功后才整体更新.
//! 参数采集 (对话框) 由调用方实现 [`ParameterSource`] 提供, 每次询问都是阻塞调用.

use crate::candidate::{generate_candidates, generate_candidates_global};
use crate::curve::extract_curve;
use crate::grow::{flood_fill, flood_fill_to_target_size, SearchSummary};
use crate::patch::pick_largest_patch;
use crate::seed::{self, SeedMaps, SeedScorePolicy, WindowedScore};
use crate::{
    AifCurve, AifError, AifResult, DynamicSeries, ExtractionParameters, Fraction, KernelShape,
    MapGenerator, Seed, VoxelMask,
};

/// 需要用户给出阈值的阶段.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ThresholdStage {
    /// 由种子区域生长得到主动脉掩膜. 阈值为种子强度的百分比.
    AortaMask,

    /// 在主动脉掩膜内挑选候选 AIF 体素. 阈值为最高分的百分比.
    CandidateVoxels,
}

/// 用户对种子的决定.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SeedDecision {
    /// 接受该种子.
    Accept,

    /// 加宽窗口后重新查找.
    Refind,

    /// 放弃本次选择.
    Cancel,
}

/// 交互参数来源. 返回 `None` 表示用户取消.
pub trait ParameterSource {
    /// 询问增强前时间点个数. `nt` 为序列的时间点个数.
    fn num_baseline(&mut self, nt: usize) -> Option<usize>;

    /// 询问种子评分窗口, `current` 为当前参数中的窗口.
    fn kernel_shape(&mut self, current: KernelShape) -> Option<KernelShape>;

    /// 询问某阶段的阈值, 取值为界面上的百分比 `[0, 100]`.
    fn threshold_percent(&mut self, stage: ThresholdStage) -> Option<f64>;

    /// 展示种子并询问是否接受.
    fn accept_seed(&mut self, seed: Seed) -> SeedDecision;
}

/// 一次成功选择的全部结果.
#[derive(Clone, Debug, Default)]
struct SelectionState {
    seed: Option<Seed>,
    aorta_mask: Option<VoxelMask>,
    aorta_search: Option<SearchSummary>,
    candidate_mask: Option<VoxelMask>,
    aif_mask: Option<VoxelMask>,
    curve: Option<AifCurve>,
}

/// 候选掩膜之后的共同部分: 最大连通块与曲线.
struct Finished {
    candidates: VoxelMask,
    aif: VoxelMask,
    curve: AifCurve,
}

/// AIF 选择流程.
///
/// 持有提取参数、派生图生成器、种子评分策略和最近一次成功选择的结果.
/// 参数在 [`Self::reset`] 后保留.
pub struct AifSelector {
    params: ExtractionParameters,
    maps: MapGenerator,
    policy: Box<dyn SeedScorePolicy>,
    state: SelectionState,
}

impl AifSelector {
    /// 以默认评分策略 [`WindowedScore`] 创建.
    pub fn new(params: ExtractionParameters) -> AifResult<Self> {
        Self::with_policy(params, Box::new(WindowedScore))
    }

    /// 指定种子评分策略创建.
    pub fn with_policy(
        params: ExtractionParameters,
        policy: Box<dyn SeedScorePolicy>,
    ) -> AifResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            maps: MapGenerator::new(),
            policy,
            state: SelectionState::default(),
        })
    }

    /// 当前参数.
    #[inline]
    pub fn params(&self) -> &ExtractionParameters {
        &self.params
    }

    /// 替换参数. 非法时保持原参数不变.
    pub fn set_params(&mut self, params: ExtractionParameters) -> AifResult<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// 当前种子评分策略名称.
    #[inline]
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// 替换种子评分策略.
    pub fn set_policy(&mut self, policy: Box<dyn SeedScorePolicy>) {
        self.policy = policy;
    }

    /// 派生图生成器, 用于显示.
    #[inline]
    pub fn maps(&self) -> &MapGenerator {
        &self.maps
    }

    /// 设置新的动态序列. 派生图、`numBaseline` 和选择结果都被清空.
    pub fn set_dynamics(&mut self, series: DynamicSeries) {
        self.maps.set_dynamics(series);
        self.state = SelectionState::default();
    }

    /// 设置增强前时间点个数. 值改变时选择结果被清空.
    pub fn set_num_baseline(&mut self, n: usize) -> AifResult<()> {
        let changed = self.maps.num_baseline() != Some(n);
        self.maps.set_num_baseline(n)?;
        if changed {
            self.state = SelectionState::default();
        }
        Ok(())
    }

    /// 以外部 (例如手工勾画) 的主动脉掩膜替换当前主动脉掩膜.
    pub fn set_aorta_mask(&mut self, mask: VoxelMask) -> AifResult<()> {
        let dims = self.maps.series()?.dims();
        if mask.shape() != dims {
            return Err(AifError::config(format!(
                "aorta mask shape {:?} differs from series volume {dims:?}",
                mask.shape()
            )));
        }
        self.state.aorta_mask = Some(mask);
        self.state.aorta_search = None;
        Ok(())
    }

    /// 清空序列、派生图和选择结果. 参数保留.
    pub fn reset(&mut self) {
        self.maps.reset();
        self.state = SelectionState::default();
    }

    /// 最近一次选择使用的种子. 全局选择不使用种子.
    #[inline]
    pub fn seed(&self) -> Option<Seed> {
        self.state.seed
    }

    /// 当前主动脉掩膜 (已剔除离群体素).
    #[inline]
    pub fn aorta_mask(&self) -> Option<&VoxelMask> {
        self.state.aorta_mask.as_ref()
    }

    /// 自动流程中主动脉掩膜阈值搜索的摘要. 其他流程或手工掩膜时为 `None`.
    ///
    /// `converged` 为 `false` 时主动脉掩膜未达到目标体素数, 调用方可据此重新询问用户.
    #[inline]
    pub fn aorta_search(&self) -> Option<&SearchSummary> {
        self.state.aorta_search.as_ref()
    }

    /// 最近一次的候选 AIF 体素.
    #[inline]
    pub fn candidate_mask(&self) -> Option<&VoxelMask> {
        self.state.candidate_mask.as_ref()
    }

    /// 最近一次的最终 AIF 掩膜.
    #[inline]
    pub fn aif_mask(&self) -> Option<&VoxelMask> {
        self.state.aif_mask.as_ref()
    }

    /// 最近一次的 AIF 曲线.
    #[inline]
    pub fn curve(&self) -> Option<&AifCurve> {
        self.state.curve.as_ref()
    }

    /// 最大增强图中最亮的 `n` 个体素, 供用户挑选主动脉.
    pub fn candidate_seed_mask(&self, n: usize) -> AifResult<VoxelMask> {
        seed::candidate_seeds(self.maps.maximum_intensity_map()?, n)
    }

    fn finish_from_candidates(&self, candidates: VoxelMask) -> AifResult<Finished> {
        let aif = pick_largest_patch(&candidates, self.maps.maximum_intensity_map()?)?;
        let num_baseline = self
            .maps
            .num_baseline()
            .ok_or(AifError::NoData("numBaseline not set"))?;
        let curve = extract_curve(&aif, self.maps.series()?, num_baseline)?;
        Ok(Finished {
            candidates,
            aif,
            curve,
        })
    }

    /// 从主动脉掩膜开始, 完成候选、连通块和曲线. `aorta` 会被剔除离群体素.
    fn finish_from_aorta(&self, aorta: &mut VoxelMask, fraction: Fraction) -> AifResult<Finished> {
        let candidates = generate_candidates(
            aorta,
            self.maps.maximum_intensity_map()?,
            self.maps.baseline_map()?,
            fraction,
            self.params.max_stdev,
        )?;
        self.finish_from_candidates(candidates)
    }

    fn commit(
        &mut self,
        seed: Option<Seed>,
        aorta: Option<VoxelMask>,
        aorta_search: Option<SearchSummary>,
        done: Finished,
    ) -> AifCurve {
        self.state = SelectionState {
            seed,
            aorta_mask: aorta,
            aorta_search,
            candidate_mask: Some(done.candidates),
            aif_mask: Some(done.aif),
            curve: Some(done.curve.clone()),
        };
        self.params.log();
        done.curve
    }

    /// 自动流程: 种子 → 逼近目标体素数的区域生长 → 候选体素 → 最大连通块 → 曲线.
    ///
    /// `fraction` 为候选体素阈值.
    pub fn select_from_mask_auto(&mut self, fraction: Fraction) -> AifResult<AifCurve> {
        let kernel = self.params.kernel_shape()?;
        let band = self.params.aorta_band()?;
        let selection = seed::find_aorta_seed(&mut self.maps, self.policy.as_ref(), kernel)?;

        let outcome =
            flood_fill_to_target_size(self.maps.maximum_intensity_map()?, selection.seed, band)?;
        let (mut aorta, search) = outcome.into_parts();
        let done = self.finish_from_aorta(&mut aorta, fraction)?;
        Ok(self.commit(Some(selection.seed), Some(aorta), Some(search), done))
    }

    /// 从当前主动脉掩膜 (例如经 [`Self::set_aorta_mask`] 设置) 继续选择.
    pub fn select_from_aorta_mask(&mut self, fraction: Fraction) -> AifResult<AifCurve> {
        let mut aorta = self
            .state
            .aorta_mask
            .clone()
            .ok_or(AifError::NoData("aorta mask not set"))?;
        let done = self.finish_from_aorta(&mut aorta, fraction)?;
        let (seed, search) = (self.state.seed, self.state.aorta_search);
        Ok(self.commit(seed, Some(aorta), search, done))
    }

    /// 交互流程. 全部阈值由 `source` 给出, 种子可以反复重新查找.
    ///
    /// 用户在任意一步取消时返回 `Ok(None)`, 之前成功选择的结果保持不变.
    /// 接受的窗口写回参数.
    pub fn select_from_mask_user(
        &mut self,
        source: &mut dyn ParameterSource,
    ) -> AifResult<Option<AifCurve>> {
        if !self.maps.is_num_baseline_set() {
            let nt = self.maps.series()?.nt();
            let Some(n) = source.num_baseline(nt) else {
                return Ok(None);
            };
            self.set_num_baseline(n)?;
        }

        let Some(mut kernel) = source.kernel_shape(self.params.kernel_shape()?) else {
            return Ok(None);
        };
        let seed = loop {
            let selection = seed::find_aorta_seed(&mut self.maps, self.policy.as_ref(), kernel)?;
            match source.accept_seed(selection.seed) {
                SeedDecision::Accept => break selection.seed,
                SeedDecision::Refind => {
                    kernel = kernel.widened();
                    log::info!(
                        "refinding aorta seed with kernel {}x{}",
                        kernel.width(),
                        kernel.height()
                    );
                }
                SeedDecision::Cancel => return Ok(None),
            }
        };

        let Some(percent) = source.threshold_percent(ThresholdStage::AortaMask) else {
            return Ok(None);
        };
        let mut aorta = flood_fill(
            self.maps.maximum_intensity_map()?,
            seed,
            Fraction::from_percent(percent)?,
        )?;

        let Some(percent) = source.threshold_percent(ThresholdStage::CandidateVoxels) else {
            return Ok(None);
        };
        let done = self.finish_from_aorta(&mut aorta, Fraction::from_percent(percent)?)?;

        self.params.kernel_nx = kernel.width();
        self.params.kernel_ny = kernel.height();
        Ok(Some(self.commit(Some(seed), Some(aorta), None, done)))
    }

    /// 全局流程: 不生成主动脉掩膜, 在整个体积上用种子评分加权挑选候选体素.
    pub fn select_global(&mut self, fraction: Fraction) -> AifResult<AifCurve> {
        let kernel = self.params.kernel_shape()?;
        let score = {
            let maps = SeedMaps::from_generator(&self.maps)?;
            seed::compute_seed_score(&maps, self.policy.as_ref(), kernel)?
        };
        let candidates = generate_candidates_global(
            self.maps.maximum_intensity_map()?,
            self.maps.baseline_map()?,
            &score,
            fraction,
        )?;
        let done = self.finish_from_candidates(candidates)?;
        self.maps.publish_score_map(score);
        Ok(self.commit(None, None, None, done))
    }
}
