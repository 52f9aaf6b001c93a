//! Centered FFTs over selected axes of column-major arrays.
//!
//! Each transform is `fftshift(fft(ifftshift(x)))` along every requested axis with
//! orthonormal `1/sqrt(n)` scaling, so the forward and inverse transforms are exact
//! inverses and zero spatial frequency sits at index `n/2`.

use std::sync::Arc;
use num_complex::Complex32;
use num_traits::Zero;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};
use crate::ArrayDim;

pub use rustfft::FftDirection;


/// in-place centered transform of `data` along each of `axes`
pub fn fftc(data:&mut [Complex32], dims:&ArrayDim, axes:&[usize], direction:FftDirection) {
    assert_eq!(dims.numel(),data.len(),"data buffer and array dims must be consistent");
    let mut planner = FftPlanner::<f32>::new();
    for &axis in axes {
        let n = dims.size(axis);
        if n < 2 {
            continue;
        }
        let plan = planner.plan_fft(n,direction);
        transform_axis(data,dims.strides()[axis],n,&plan);
    }
}

/// transform every line along one axis. Lines live inside contiguous blocks of
/// `stride * n` elements, so blocks are processed in parallel
fn transform_axis(data:&mut [Complex32], stride:usize, n:usize, plan:&Arc<dyn Fft<f32>>) {
    let scale = 1. / (n as f32).sqrt();
    let half = n / 2;
    data.par_chunks_mut(stride * n).for_each(|block| {
        let mut line = vec![Complex32::zero(); n];
        let mut scratch = vec![Complex32::zero(); plan.get_inplace_scratch_len()];
        for offset in 0..stride {
            for (k,v) in line.iter_mut().enumerate() {
                *v = block[offset + k * stride];
            }
            // ifftshift
            line.rotate_left(half);
            plan.process_with_scratch(&mut line,&mut scratch);
            // fftshift
            line.rotate_right(half);
            for (k,v) in line.iter().enumerate() {
                block[offset + k * stride] = *v * scale;
            }
        }
    });
}

pub fn ifft2c(data:&mut [Complex32], dims:&ArrayDim) {
    fftc(data,dims,&[0,1],FftDirection::Inverse)
}

pub fn ifft3c(data:&mut [Complex32], dims:&ArrayDim) {
    fftc(data,dims,&[0,1,2],FftDirection::Inverse)
}

pub fn fft2c(data:&mut [Complex32], dims:&ArrayDim) {
    fftc(data,dims,&[0,1],FftDirection::Forward)
}

pub fn fft3c(data:&mut [Complex32], dims:&ArrayDim) {
    fftc(data,dims,&[0,1,2],FftDirection::Forward)
}
