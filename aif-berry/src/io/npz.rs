use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use ndarray::{Array, Array1, Array3, Dimension, Ix1, Ix3, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter, ReadableElement};

use super::{ArchiveError, ArchiveResult};
use crate::{DynamicSeries, VoxelMask};

const DATA: &str = "data";
const MASK: &str = "mask";
const DIMS: &str = "dims";

/// 按条目名读取数组. numpy 写入的条目带 `.npy` 后缀, 两种写法都接受.
fn entry<R, T, D>(npz: &mut NpzReader<R>, stem: &'static str) -> ArchiveResult<Array<T, D>>
where
    R: Read + Seek,
    T: ReadableElement,
    D: Dimension,
{
    let with_ext = format!("{stem}.npy");
    let name = npz
        .names()?
        .into_iter()
        .find(|n| *n == with_ext || n == stem)
        .ok_or(ArchiveError::MissingEntry(stem))?;
    Ok(npz.by_name::<OwnedRepr<T>, D>(&name)?)
}

/// 把 `i64` 形状描述转换为定长 `usize` 数组. 长度不符或含负数时返回 `None`.
fn as_usize<const N: usize>(dims: &Array1<i64>) -> Option<[usize; N]> {
    if dims.len() != N {
        return None;
    }
    let mut out = [0; N];
    for (o, &d) in out.iter_mut().zip(dims.iter()) {
        *o = usize::try_from(d).ok()?;
    }
    Some(out)
}

fn dims_of(shape: &[usize]) -> Array1<i64> {
    shape.iter().map(|&d| d as i64).collect()
}

/// 将动态序列写入压缩 npz 归档, 返回底层 writer.
pub fn write_series<W: Write + Seek>(writer: W, series: &DynamicSeries) -> ArchiveResult<W> {
    let mut npz = NpzWriter::new_compressed(writer);
    npz.add_array(DATA, &series.data())?;
    npz.add_array(DIMS, &dims_of(&series.shape4()))?;
    Ok(npz.finish()?)
}

/// 从 npz 归档读取动态序列. `dims` 与 `data` 的形状不一致时返回 [`ArchiveError::ShapeMismatch`].
pub fn read_series<R: Read + Seek>(reader: R) -> ArchiveResult<DynamicSeries> {
    let mut npz = NpzReader::new(reader)?;
    let data: Array3<f32> = entry::<_, _, Ix3>(&mut npz, DATA)?;
    let dims: Array1<i64> = entry::<_, _, Ix1>(&mut npz, DIMS)?;

    let (nzt, ny, nx) = data.dim();
    let mismatch = || ArchiveError::ShapeMismatch {
        dims: dims.to_vec(),
        shape: vec![nzt, ny, nx],
    };
    let [nt, nz, dy, dx] = as_usize::<4>(&dims).ok_or_else(mismatch)?;
    if nt.checked_mul(nz) != Some(nzt) || dy != ny || dx != nx {
        return Err(mismatch());
    }
    log::debug!("series archive read: nt = {nt}, dims = {:?}", (nz, ny, nx));
    Ok(DynamicSeries::new(data, nt)?)
}

/// 将掩膜写入压缩 npz 归档, 返回底层 writer.
pub fn write_mask<W: Write + Seek>(writer: W, mask: &VoxelMask) -> ArchiveResult<W> {
    let (nz, ny, nx) = mask.shape();
    let mut npz = NpzWriter::new_compressed(writer);
    npz.add_array(MASK, &mask.data())?;
    npz.add_array(DIMS, &dims_of(&[nz, ny, nx]))?;
    Ok(npz.finish()?)
}

/// 从 npz 归档读取掩膜.
pub fn read_mask<R: Read + Seek>(reader: R) -> ArchiveResult<VoxelMask> {
    let mut npz = NpzReader::new(reader)?;
    let data: Array3<bool> = entry::<_, _, Ix3>(&mut npz, MASK)?;
    let dims: Array1<i64> = entry::<_, _, Ix1>(&mut npz, DIMS)?;

    let (nz, ny, nx) = data.dim();
    if as_usize::<3>(&dims) != Some([nz, ny, nx]) {
        return Err(ArchiveError::ShapeMismatch {
            dims: dims.to_vec(),
            shape: vec![nz, ny, nx],
        });
    }
    Ok(VoxelMask::from(data))
}

/// 将动态序列保存到路径 `p`.
pub fn save_series<P: AsRef<Path>>(p: P, series: &DynamicSeries) -> ArchiveResult<()> {
    let file = BufWriter::new(File::create(p.as_ref())?);
    write_series(file, series)?.flush()?;
    log::info!("series saved to {}", p.as_ref().display());
    Ok(())
}

/// 从路径 `p` 加载动态序列.
pub fn load_series<P: AsRef<Path>>(p: P) -> ArchiveResult<DynamicSeries> {
    read_series(BufReader::new(File::open(p.as_ref())?))
}

/// 将掩膜保存到路径 `p`.
pub fn save_mask<P: AsRef<Path>>(p: P, mask: &VoxelMask) -> ArchiveResult<()> {
    let file = BufWriter::new(File::create(p.as_ref())?);
    write_mask(file, mask)?.flush()?;
    log::info!("mask saved to {}", p.as_ref().display());
    Ok(())
}

/// 从路径 `p` 加载掩膜.
pub fn load_mask<P: AsRef<Path>>(p: P) -> ArchiveResult<VoxelMask> {
    read_mask(BufReader::new(File::open(p.as_ref())?))
}
