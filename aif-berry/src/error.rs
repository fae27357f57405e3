//! 运行时错误.

use thiserror::Error;

/// 体素选择与曲线提取的运行时错误.
///
/// 错误总是在发现它的阶段产生, 核心内部不做恢复; 由上层流程决定重新询问用户还是放弃.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AifError {
    /// 动态序列或所需的派生图尚未设置.
    #[error("no data: {0}")]
    NoData(&'static str),

    /// 需要非空体素集合的地方得到了空集合.
    #[error("empty selection: {0}")]
    EmptySelection(&'static str),

    /// 归一化除数为零 (例如整个体积都没有增强).
    #[error("degenerate normalization: {0}")]
    DegenerateNormalization(&'static str),

    /// 参数非法.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// 体素选择 / 曲线提取运行时结果.
pub type AifResult<T> = Result<T, AifError>;

impl AifError {
    /// 便捷构造 [`AifError::Configuration`].
    #[inline]
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
