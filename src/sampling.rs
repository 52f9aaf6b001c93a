use log::debug;
use num_complex::Complex32;
use serde::Serialize;
use crate::{ArrayDim, Error, Result};
use crate::dims::{pipeline_shape, pipeline_dims};

/// gaps larger than this multiple of the acceleration factor count as irregular
const GAP_FACTOR: f32 = 1.5;
/// more irregular gaps than this along either center line means variable density
const MAX_REGULAR_GAPS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPattern {
    /// evenly spaced phase encode lines (parallel imaging style)
    Uniform,
    /// irregular spacing, e.g. Poisson-disc
    VariableDensity,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SamplingReport {
    pub pattern: SamplingPattern,
    /// acquired (e1,e2) locations summed over all repetitions and segments
    pub num_readout_lines: usize,
    /// S*N*E1*E2 / num_readout_lines, or None when nothing was acquired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_acceleration: Option<f32>,
}

impl SamplingReport {
    /// the report as a toml table
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Report(e.to_string()))
    }
}


/// classify the undersampling scheme of pipeline shaped k-space
pub fn classify(kspace:&[Complex32], dims:&ArrayDim, acce_factor_e1:f32, acce_factor_e2:f32) -> SamplingPattern {
    analyze(kspace,dims,acce_factor_e1,acce_factor_e2).pattern
}

/// inspect the occupancy of the center readout sample of channel 0 (first slice) over all
/// repetitions and segments, and compare the acquired line spacing through the center of
/// the (E1,E2) plane against the acceleration factors
pub fn analyze(kspace:&[Complex32], dims:&ArrayDim, acce_factor_e1:f32, acce_factor_e2:f32) -> SamplingReport {
    assert_eq!(dims.numel(),kspace.len(),"data buffer and array dims must be consistent");
    let [ro,e1,e2,_,n,s,_] = pipeline_shape(dims);

    let mask_dims = pipeline_dims([e1,e2,1,1,1,1,1]);
    let mut mask = mask_dims.alloc(false);
    let mut num_readout_lines = 0usize;

    for is in 0..s {
        for rep in 0..n {
            for j in 0..e2 {
                for i in 0..e1 {
                    let addr = dims.calc_addr(&[ro / 2,i,j,0,rep,is,0]);
                    if kspace[addr].norm() > 0. {
                        num_readout_lines += 1;
                        mask[mask_dims.calc_addr(&[i,j])] = true;
                    }
                }
            }
        }
    }

    if num_readout_lines == 0 {
        debug!("no acquired readout lines found, assuming uniform sampling");
        return SamplingReport {
            pattern: SamplingPattern::Uniform,
            num_readout_lines,
            effective_acceleration: None,
        };
    }

    let effective_acceleration = (s * n * e1 * e2) as f32 / num_readout_lines as f32;
    debug!("effective acceleration factor: {effective_acceleration}");

    // row through the center of E1 (runs along E2), column through the center of E2 (runs along E1)
    let row_acq = (0..e2).filter(|&j| mask[mask_dims.calc_addr(&[e1 / 2,j])]).collect::<Vec<_>>();
    let col_acq = (0..e1).filter(|&i| mask[mask_dims.calc_addr(&[i,e2 / 2])]).collect::<Vec<_>>();

    let row_gaps = count_large_gaps(&row_acq,acce_factor_e1);
    let col_gaps = count_large_gaps(&col_acq,acce_factor_e2);

    let pattern = if row_gaps > MAX_REGULAR_GAPS || col_gaps > MAX_REGULAR_GAPS {
        SamplingPattern::VariableDensity
    } else {
        SamplingPattern::Uniform
    };
    debug!("large gaps (row, col): ({row_gaps}, {col_gaps}) -> {pattern:?}");

    SamplingReport {
        pattern,
        num_readout_lines,
        effective_acceleration: Some(effective_acceleration),
    }
}

/// count consecutive index differences larger than GAP_FACTOR * acce_factor
fn count_large_gaps(acquired:&[usize], acce_factor:f32) -> usize {
    let limit = GAP_FACTOR * acce_factor;
    acquired.windows(2).filter(|w| (w[1] - w[0]) as f32 > limit).count()
}
