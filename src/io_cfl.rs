use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use log::debug;
use num_complex::Complex32;
use crate::{ArrayDim, Error, Result, N_DIMS};
use crate::dims::collapse_to_pipeline;

/// first line of every header we write
const HDR_COMMENT: &str = "# Dimensions";


fn with_suffix(base:&Path,ext:&str) -> PathBuf {
    let mut s = OsString::from(base.as_os_str());
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// header file path for a base name
pub fn hdr_path(cfl_file_base_name:impl AsRef<Path>) -> PathBuf {
    with_suffix(cfl_file_base_name.as_ref(),"hdr")
}

/// binary payload path for a base name
pub fn cfl_path(cfl_file_base_name:impl AsRef<Path>) -> PathBuf {
    with_suffix(cfl_file_base_name.as_ref(),"cfl")
}

/// write a complex array to a .hdr/.cfl pair. The shape may have at most 15 axes.
/// Existing files are overwritten.
pub fn write_cfl(cfl_file_base_name:impl AsRef<Path>, data:&[Complex32], shape:&[usize]) -> Result<()> {
    if shape.len() >= N_DIMS {
        return Err(Error::DimensionOverflow(shape.len()));
    }
    assert!(shape.iter().all(|&d| d > 0),"array extents must be non-zero");
    let dims = ArrayDim::from_shape(shape);
    assert_eq!(dims.numel(), data.len(), "data buffer and array dims must be consistent");

    let base = cfl_file_base_name.as_ref();
    write_cfl_hdr(base,&dims)?;

    let path = cfl_path(base);
    let f = File::create(&path).map_err(Error::io(&path))?;
    let mut w = BufWriter::new(f);
    w.write_all(bytemuck::cast_slice(data)).map_err(Error::io(&path))?;
    w.flush().map_err(Error::io(&path))?;
    debug!("wrote {} with dims {:?}",path.display(),dims.shape_ns());
    Ok(())
}

/// write a complex array using the non-singleton part of its dims
pub fn write_cfl_dims(cfl_file_base_name:impl AsRef<Path>, data:&[Complex32], dims:&ArrayDim) -> Result<()> {
    write_cfl(cfl_file_base_name,data,dims.shape_ns())
}

fn write_cfl_hdr(base:&Path,dims:&ArrayDim) -> Result<()> {
    let path = hdr_path(base);
    let extents = dims.shape().iter().map(|d| d.to_string()).collect::<Vec<_>>().join(" ");
    let mut f = File::create(&path).map_err(Error::io(&path))?;
    write!(f,"{HDR_COMMENT}\n{extents}\n").map_err(Error::io(&path))?;
    Ok(())
}

/// read the 16 axis extents from a header. Fewer than 16 listed extents are padded with 1
pub fn read_cfl_hdr(cfl_file_base_name:impl AsRef<Path>) -> Result<ArrayDim> {
    let path = hdr_path(cfl_file_base_name);
    let text = std::fs::read_to_string(&path).map_err(Error::io(&path))?;
    let parse_err = |reason:String| Error::HeaderParse { path: path.clone(), reason };

    let line = text.lines().nth(1)
        .ok_or_else(|| parse_err(String::from("expected a comment line followed by a line of extents")))?;

    let extents = line.split_whitespace().map(|tok| {
        tok.parse::<usize>().map_err(|e| parse_err(format!("bad extent '{tok}': {e}")))
    }).collect::<Result<Vec<usize>>>()?;

    if extents.is_empty() {
        return Err(parse_err(String::from("no extents listed")));
    }
    if extents.len() > N_DIMS {
        return Err(parse_err(format!("{} extents listed, at most {N_DIMS} are allowed",extents.len())));
    }
    if extents.contains(&0) {
        return Err(parse_err(format!("zero extent in {extents:?}")));
    }
    // the payload byte count must be addressable
    extents.iter()
        .try_fold(size_of::<Complex32>(),|acc,&d| acc.checked_mul(d))
        .ok_or_else(|| parse_err(format!("extents {extents:?} overflow the addressable payload size")))?;
    Ok(ArrayDim::from_shape(&extents))
}

/// read a .hdr/.cfl pair keeping all 16 axes
pub fn read_cfl(cfl_file_base_name:impl AsRef<Path>) -> Result<(Vec<Complex32>, ArrayDim)> {
    let base = cfl_file_base_name.as_ref();
    let dims = read_cfl_hdr(base)?;

    let path = cfl_path(base);
    let mut f = File::open(&path).map_err(Error::io(&path))?;
    let found = f.metadata().map_err(Error::io(&path))?.len();
    let expected = (dims.numel() * size_of::<Complex32>()) as u64;
    if found < expected {
        return Err(Error::TruncatedFile { path, expected, found });
    }

    let mut data = dims.alloc(Complex32::ZERO);
    f.read_exact(bytemuck::cast_slice_mut(data.as_mut_slice())).map_err(|source| {
        if source.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::TruncatedFile { path: path.clone(), expected, found }
        } else {
            Error::Io { path: path.clone(), source }
        }
    })?;
    debug!("read {} with dims {:?}",path.display(),dims.shape_ns());
    Ok((data, dims))
}

/// read a .hdr/.cfl pair into the 7 pipeline axes. Every axis from 4 onward is folded
/// into the repetition axis, so the original meaning of those axes is lost.
pub fn read_cfl_pipeline(cfl_file_base_name:impl AsRef<Path>) -> Result<(Vec<Complex32>, ArrayDim)> {
    let (data,dims) = read_cfl(cfl_file_base_name)?;
    let collapsed = collapse_to_pipeline(&dims);
    assert_eq!(collapsed.numel(),data.len(),"collapsed dims must preserve the element count");
    Ok((data,collapsed))
}
