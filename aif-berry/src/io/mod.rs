//! 动态序列与掩膜的 npz 持久化.
//!
//! 两种归档都与 numpy 互通 (`np.load`):
//!
//! - 序列归档: `data` (`f32`, `(nz * nt, ny, nx)`, 切片优先交错) 和 `dims` (`i64`, `[nt, nz, ny, nx]`).
//! - 掩膜归档: `mask` (`bool`, `(nz, ny, nx)`) 和 `dims` (`i64`, `[nz, ny, nx]`).

use ndarray_npy::{ReadNpzError, WriteNpzError};
use thiserror::Error;

use crate::AifError;

mod npz;

pub use npz::{
    load_mask, load_series, read_mask, read_series, save_mask, save_series, write_mask,
    write_series,
};

/// 读写归档时的错误.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// 底层 I/O 错误.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 读取 npz 文件错误.
    #[error("failed to read npz archive: {0}")]
    ReadNpz(#[from] ReadNpzError),

    /// 写入 npz 文件错误.
    #[error("failed to write npz archive: {0}")]
    WriteNpz(#[from] WriteNpzError),

    /// 归档缺少必需的条目.
    #[error("npz archive has no entry named {0:?}")]
    MissingEntry(&'static str),

    /// 形状描述与数组形状不一致.
    #[error("shape descriptor {dims:?} does not match array shape {shape:?}")]
    ShapeMismatch {
        /// 归档中的形状描述.
        dims: Vec<i64>,

        /// 数组的实际形状.
        shape: Vec<usize>,
    },

    /// 内容可以读出, 但不构成合法的序列或掩膜.
    #[error(transparent)]
    Invalid(#[from] AifError),
}

/// 归档读写结果.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
