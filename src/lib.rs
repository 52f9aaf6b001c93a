/*
    Interchange and post-processing for multi-channel MRI k-space arrays.
    Arrays are column-major with a static 16-slot shape, matching the .hdr/.cfl
    container used by the external reconstruction toolbox. Pipeline arrays use the
    first 7 slots as [RO, E1, E2, CHA, N, S, LOC].
 */
pub mod error;
pub mod io_cfl;
pub mod dims;
pub mod sampling;
pub mod fft;
pub mod coil_combine;
pub mod solver;
pub mod recon;

pub use error::{Error, Result};
pub use num_complex::Complex32;

/// number of axis slots in the interchange format
pub const N_DIMS:usize = 16;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn calc_addr_matches_linear_fill() {
        let dims = ArrayDim::new()
            .with_dim(0,4)
            .with_dim(1,3);
        let src = (0..dims.numel()).collect::<Vec<usize>>();
        let mut dst = dims.alloc(0);
        for i in 0..dims.size(0) {
            for j in 0..dims.size(1) {
                let addr = dims.calc_addr(&[i,j,0,0,0,0,0,0,0,0,0,0,0,0,0,0]);
                dst[addr] = src[addr];
            }
        }
        assert_eq!(src,dst);
    }

    #[test]
    fn slab_broadcast_over_outer_axis() {
        let nx = 12;
        let ny = 7;
        let nz = 5;
        let src_dims = ArrayDim::from_shape(&[nx,ny]);
        let src = (0..src_dims.numel()).collect::<Vec<usize>>();
        let dst_dims = ArrayDim::from_shape(&[nx,ny,nz]);
        let mut dst = dst_dims.alloc(0);
        for i in 0..src_dims.size(0) {
            for j in 0..src_dims.size(1) {
                let src_addr = src_dims.calc_addr(&[i,j]);
                for k in 0..dst_dims.size(2) {
                    let dst_addr = dst_dims.calc_addr(&[i,j,k]);
                    dst[dst_addr] = src[src_addr];
                }
            }
        }
        let c = dst_dims.shape()[0..2].iter().product();
        assert_eq!(src,dst[0..c]);
        assert_eq!(src,dst[(nz - 1) * c..]);
    }

    #[test]
    fn test_shape_ns() {
        let dims = ArrayDim::from_shape(&[3,4,5,1,6]);
        assert_eq!(dims.shape_ns(),&[3,4,5,1,6]);
        let dims = ArrayDim::from_shape(&[1;16]);
        assert_eq!(dims.shape_ns(),&[1]);
    }

    #[test]
    fn strides_are_column_major() {
        let dims = ArrayDim::from_shape(&[4,3,2]);
        assert_eq!(&dims.strides()[0..4],&[1,4,12,24]);
        // trailing singleton slots keep the full volume stride
        assert_eq!(dims.strides()[15],24);
        let dims = dims.with_dim(1,5);
        assert_eq!(&dims.strides()[0..4],&[1,4,20,40]);
    }

}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct ArrayDim {
    shape: [usize; N_DIMS],
    strides: [usize; N_DIMS],
}

impl Default for ArrayDim {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayDim {

    pub fn new() -> ArrayDim {
        ArrayDim{
            shape: [1;N_DIMS],
            strides: [1;N_DIMS],
        }
    }

    /// build dims from a shape of up to 16 axes. Missing trailing axes are singleton
    pub fn from_shape(shape: &[usize]) -> ArrayDim {
        assert!(shape.len() <= N_DIMS,"only axes of up to 16 are supported");
        let mut dims = [1;N_DIMS];
        for (d,s) in dims.iter_mut().zip(shape.iter()) {
            *d = *s;
        }
        let mut strides = [1;N_DIMS];
        Self::calc_strides(&dims, &mut strides);
        Self {
            shape: dims,
            strides,
        }
    }

    /// return the shape with all singleton dimensions intact
    pub fn shape(&self) -> &[usize; N_DIMS] {
        &self.shape
    }

    /// return the shape with trailing singleton dimensions removed
    pub fn shape_ns(&self) -> &[usize] {
        if let Some(i) = self.shape.iter().rev().position(|&dim| dim != 1) {
            let new_len = self.shape.len() - i;
            &self.shape[..new_len]
        } else {
            &[1]
        }
    }

    pub fn strides(&self) -> &[usize; N_DIMS] {
        &self.strides
    }

    pub fn size(&self, dim:usize) -> usize {
        assert!(dim < N_DIMS);
        self.shape[dim]
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn with_dim(mut self,axis:usize,dim:usize) -> ArrayDim {
        assert!(axis < N_DIMS,"only axes of up to 16 are supported");
        self.shape[axis] = dim;
        self.update_strides();
        self
    }

    fn calc_strides(dims:&[usize],strides:&mut [usize]) {
        let mut stride = 1;
        for (dim,s) in dims.iter().zip(strides.iter_mut()) {
            *s = stride;
            stride *= dim;
        }
    }

    fn update_strides(&mut self) {
        Self::calc_strides(&self.shape,&mut self.strides);
    }

    #[inline]
    /// calculate the element address from the index (subscripts)
    pub fn calc_addr(&self,idx: &[usize]) -> usize {
        let mut offset = 0;
        for (i,stride) in idx.iter().zip(self.strides.iter()) {
            offset += i * stride;
        }
        offset
    }

    /// allocates a vector of values the size of dims
    pub fn alloc<T:Sized + Clone>(&self,value:T) -> Vec<T> {
        vec![value;self.numel()]
    }

}
