//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Idx4d, Seed, VoxelMap};

pub use crate::data::{DisplayWindow, DynamicSeries, VoxelMask};
pub use crate::error::{AifError, AifResult};
pub use crate::maps::{MapGenerator, MapKind, NamedMap};
pub use crate::params::{ExtractionParameters, Fraction, KernelShape, VoxelCountBand};

pub use crate::seed::{AdditiveScore, SeedScorePolicy, WindowedScore};

pub use crate::curve::{AifCurve, AifMeasures};
pub use crate::grow::{FloodFillOutcome, SearchSummary};
pub use crate::workflow::{AifSelector, ParameterSource, SeedDecision, ThresholdStage};
