/*
    Pipeline axis conventions and the mapping to/from the interchange layout.
    Pipeline arrays are [RO, E1, E2, CHA, N, S, LOC] in the first 7 slots of an ArrayDim.
 */
use std::path::{Path, PathBuf};
use log::debug;
use num_complex::Complex32;
use crate::{ArrayDim, Error, Result};
use crate::io_cfl::{read_cfl, write_cfl};

/// readout
pub const RO: usize = 0;
/// first phase encode
pub const E1: usize = 1;
/// second phase encode (partition)
pub const E2: usize = 2;
/// receive channel
pub const CHA: usize = 3;
/// repetition
pub const N: usize = 4;
/// segment
pub const S: usize = 5;
/// slice / location
pub const LOC: usize = 6;

pub const N_PIPELINE_DIMS: usize = 7;

#[cfg(test)]
mod tests {
    use num_complex::Complex32;
    use crate::ArrayDim;
    use crate::dims::*;

    fn indexed(dims:&ArrayDim) -> Vec<Complex32> {
        (0..dims.numel()).map(|i| Complex32::new(i as f32, -(i as f32))).collect()
    }

    #[test]
    fn collapse_folds_axes_from_four() {
        let dims = ArrayDim::from_shape(&[4,4,4,2,3,2,1,5]);
        let c = collapse_to_pipeline(&dims);
        assert_eq!(pipeline_shape(&c),[4,4,4,2,30,1,1]);
        assert_eq!(c.numel(),dims.numel());
    }

    #[test]
    fn require_pipeline_rejects_extra_axes() {
        let ok = ArrayDim::from_shape(&[4,4,1,2,3,2,2]);
        assert_eq!(require_pipeline(&ok).unwrap(),ok);
        let bad = ArrayDim::from_shape(&[4,4,1,2,3,2,2,2]);
        assert!(matches!(require_pipeline(&bad),Err(Error::NotPipelineShaped(_))));
    }

    #[test]
    fn chunks_follow_loc_s_n_nesting() {
        let dims = pipeline_dims([2,3,1,2,3,2,2]);
        let x = indexed(&dims);
        let chunks = to_chunks(&x,&dims);
        assert_eq!(chunks.len(),12);
        let order:Vec<_> = chunks.iter().map(|c|(c.loc,c.s,c.n)).collect();
        assert_eq!(&order[0..4],&[(0,0,0),(0,0,1),(0,0,2),(0,1,0)]);
        assert_eq!(order[11],(1,1,2));
        for c in &chunks {
            assert_eq!(c.shape,[2,3,1,2]);
            let first = dims.calc_addr(&[0,0,0,0,c.n,c.s,c.loc]);
            assert_eq!(c.data[0],x[first]);
        }
    }

    #[test]
    fn chunk_round_trip() {
        let dims = pipeline_dims([3,2,2,2,2,3,2]);
        let x = indexed(&dims);
        let chunks = to_chunks(&x,&dims);
        let y = from_chunks(chunks.iter().map(|c|c.data),dims);
        assert_eq!(x,y);
    }

    #[test]
    #[should_panic]
    fn from_chunks_count_mismatch_panics() {
        let dims = pipeline_dims([2,2,1,1,2,1,1]);
        let x = indexed(&dims);
        let chunks = to_chunks(&x,&dims);
        from_chunks(chunks.iter().take(1).map(|c|c.data),dims);
    }

    #[test]
    fn chunk_files_round_trip() {
        let base = std::env::temp_dir().join(format!("cfl_recon_chunks_{}",std::process::id()));
        let dims = pipeline_dims([4,3,1,2,2,1,2]);
        let x = indexed(&dims);
        let bases = write_cfl_chunks(&base,&x,&dims).unwrap();
        assert_eq!(bases.len(),4);
        let y = read_cfl_chunks(&bases,dims).unwrap();
        for b in &bases {
            std::fs::remove_file(crate::io_cfl::hdr_path(b)).ok();
            std::fs::remove_file(crate::io_cfl::cfl_path(b)).ok();
        }
        assert_eq!(x,y);
    }

}

/// build pipeline dims from the 7 extents [RO, E1, E2, CHA, N, S, LOC]
pub fn pipeline_dims(shape:[usize;N_PIPELINE_DIMS]) -> ArrayDim {
    ArrayDim::from_shape(&shape)
}

/// the 7 pipeline extents of dims
pub fn pipeline_shape(dims:&ArrayDim) -> [usize;N_PIPELINE_DIMS] {
    let mut s = [1;N_PIPELINE_DIMS];
    s.copy_from_slice(&dims.shape()[0..N_PIPELINE_DIMS]);
    s
}

/// fold every interchange axis from 4 onward into the repetition axis: [d0,d1,d2,d3,prod(d4..),1,1]
pub fn collapse_to_pipeline(dims:&ArrayDim) -> ArrayDim {
    let shape = dims.shape();
    let rep:usize = shape[N..].iter().product();
    pipeline_dims([shape[RO],shape[E1],shape[E2],shape[CHA],rep,1,1])
}

/// check that dims only use the 7 pipeline axes without discarding anything
pub fn require_pipeline(dims:&ArrayDim) -> Result<ArrayDim> {
    if dims.shape()[N_PIPELINE_DIMS..].iter().any(|&d| d != 1) {
        return Err(Error::NotPipelineShaped(dims.shape_ns().to_vec()));
    }
    Ok(*dims)
}

/// a borrowed [RO, E1, E2, CHA] slab of a pipeline array
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub data: &'a [Complex32],
    pub shape: [usize;4],
    pub n: usize,
    pub s: usize,
    pub loc: usize,
}

/// split a pipeline array into 4-D slabs, iterating LOC (outer), S, then N (inner)
pub fn to_chunks<'a>(data:&'a [Complex32], dims:&ArrayDim) -> Vec<Chunk<'a>> {
    assert_eq!(dims.numel(),data.len(),"data buffer and array dims must be consistent");
    let [ro,e1,e2,cha,n_n,n_s,n_loc] = pipeline_shape(dims);
    assert_eq!(dims.numel(),ro * e1 * e2 * cha * n_n * n_s * n_loc,"only pipeline shaped arrays can be chunked");
    let slab = ro * e1 * e2 * cha;
    let mut chunks = Vec::with_capacity(n_n * n_s * n_loc);
    for loc in 0..n_loc {
        for s in 0..n_s {
            for n in 0..n_n {
                let start = dims.calc_addr(&[0,0,0,0,n,s,loc]);
                chunks.push(Chunk {
                    data: &data[start..start + slab],
                    shape: [ro,e1,e2,cha],
                    n,
                    s,
                    loc,
                });
            }
        }
    }
    chunks
}

/// reassemble slabs emitted in LOC, S, N nesting order into a buffer with the target dims.
/// The concatenated buffer is already in column-major order for the target, so only the
/// shape is reassigned.
pub fn from_chunks<'a>(chunks:impl IntoIterator<Item=&'a [Complex32]>, target:ArrayDim) -> Vec<Complex32> {
    let mut flat = Vec::with_capacity(target.numel());
    for c in chunks {
        flat.extend_from_slice(c);
    }
    assert_eq!(flat.len(),target.numel(),"chunk elements do not match the target dims");
    flat
}

/// write each 4-D slab as its own interchange pair named `<base>_<index>`, returning the
/// base names in nesting order
pub fn write_cfl_chunks(cfl_file_base_name:impl AsRef<Path>, data:&[Complex32], dims:&ArrayDim) -> Result<Vec<PathBuf>> {
    let base = cfl_file_base_name.as_ref();
    let chunks = to_chunks(data,dims);
    let mut bases = Vec::with_capacity(chunks.len());
    for (i,c) in chunks.iter().enumerate() {
        let mut name = base.as_os_str().to_owned();
        name.push(format!("_{i:04}"));
        let chunk_base = PathBuf::from(name);
        write_cfl(&chunk_base,c.data,&c.shape)?;
        bases.push(chunk_base);
    }
    debug!("wrote {} chunks of {:?}",bases.len(),dims.shape_ns());
    Ok(bases)
}

/// read slabs written by `write_cfl_chunks` (in the same order) back into the target dims
pub fn read_cfl_chunks(bases:&[impl AsRef<Path>], target:ArrayDim) -> Result<Vec<Complex32>> {
    let slabs = bases.iter().map(|b| read_cfl(b).map(|(d,_)| d)).collect::<Result<Vec<_>>>()?;
    Ok(from_chunks(slabs.iter().map(|s|s.as_slice()),target))
}
