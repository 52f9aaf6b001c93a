/*
    Per encoding space reconstruction: stage arrays in a work directory, hand them to the
    external solver, read the result back and combine channels.
 */
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use log::{debug, info, warn};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use crate::{ArrayDim, Error, Result};
use crate::coil_combine::coil_combine;
use crate::dims::{pipeline_shape, require_pipeline, CHA, E1, E2};
use crate::io_cfl::{read_cfl_pipeline, write_cfl};
use crate::sampling::{analyze, SamplingReport};
use crate::solver::{CompressionRequest, ReconRequest, Solver};

/// base name of the staged k-space pair
pub const INPUT_NAME: &str = "input_data";
/// base name of the staged calibration pair
pub const REFERENCE_NAME: &str = "reference_data";


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconParams {
    /// directory under which a fresh work directory is created for every encoding space
    pub work_location: PathBuf,
    /// remove the work directory once the solver output has been read
    pub delete_work_dir: bool,
    /// toolbox executable used for channel compression
    pub bart: PathBuf,
    /// command script used for reconstruction
    pub script: PathBuf,
    /// command script used instead of `script` for variable density sampled data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vd_script: Option<PathBuf>,
    pub lambda_l1: f32,
    pub n_iter_l1: u32,
    pub esp_maps: u32,
    /// calibration region size for channel compression
    pub calib_size: usize,
    /// number of channels after compression
    pub dst_channels: usize,
}

impl Default for ReconParams {
    fn default() -> Self {
        Self {
            work_location: std::env::temp_dir(),
            delete_work_dir: true,
            bart: PathBuf::from("bart"),
            script: PathBuf::from("recon.sh"),
            vd_script: None,
            lambda_l1: 0.002,
            n_iter_l1: 15,
            esp_maps: 2,
            calib_size: 24,
            dst_channels: 12,
        }
    }
}

impl ReconParams {

    pub fn from_toml_file(file:impl AsRef<Path>) -> Result<Self> {
        let path = file.as_ref();
        let mut toml_str = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut toml_str))
            .map_err(Error::io(path))?;
        Self::from_toml_str(&toml_str)
    }

    pub fn from_toml_str(toml_str:&str) -> Result<Self> {
        let params:Self = toml::from_str(toml_str).map_err(|e| Error::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let mut s = toml::to_string(self).map_err(|e| Error::Config(e.to_string()))?;
        s.push('\n');
        Ok(s)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.lambda_l1 >= 0.) {
            return Err(Error::Config(format!("lambda_l1 must be non-negative, got {}",self.lambda_l1)));
        }
        if self.n_iter_l1 == 0 {
            return Err(Error::Config(String::from("n_iter_l1 must be at least 1")));
        }
        if self.esp_maps == 0 {
            return Err(Error::Config(String::from("esp_maps must be at least 1")));
        }
        if self.calib_size == 0 || self.dst_channels == 0 {
            return Err(Error::Config(String::from("calib_size and dst_channels must be at least 1")));
        }
        Ok(())
    }

}

/// a uniquely named scratch directory for one solver run. It is removed on drop when
/// `delete` is set.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    delete: bool,
}

impl WorkDir {

    /// create `bart_HH_MM_SS__<id>` under `location`
    pub fn create(location:impl AsRef<Path>, delete:bool) -> Result<Self> {
        let location = location.as_ref();
        std::fs::create_dir_all(location).map_err(Error::io(location))?;
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0) % 86400;
        let id:u32 = rand::random_range(1..=10000);
        let name = format!("bart_{:02}_{:02}_{:02}__{}",secs / 3600,(secs / 60) % 60,secs % 60,id);
        let path = location.join(name);
        std::fs::create_dir(&path).map_err(Error::io(&path))?;
        debug!("created work directory {}",path.display());
        Ok(Self { path, delete })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name:&str) -> PathBuf {
        self.path.join(name)
    }

}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.delete {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("failed to remove work directory {}: {}",self.path.display(),e);
            }
        }
    }
}

/// the arrays of one encoding space, all in pipeline order [RO,E1,E2,CHA,N,S,LOC]
#[derive(Debug, Clone)]
pub struct EncodingSpace {
    pub kspace: Vec<Complex32>,
    pub kspace_dims: ArrayDim,
    pub reference: Vec<Complex32>,
    pub reference_dims: ArrayDim,
    pub coil_map: Vec<Complex32>,
    pub coil_map_dims: ArrayDim,
    pub acce_factor_e1: f32,
    pub acce_factor_e2: f32,
}

#[derive(Debug, Clone)]
pub struct ReconOutput {
    /// single channel images [RO,E1,E2,1,N,S,LOC]
    pub image: Vec<Complex32>,
    pub dims: ArrayDim,
    pub sampling: SamplingReport,
}

#[derive(Debug, Clone)]
pub struct CompressedSpace {
    pub kspace: Vec<Complex32>,
    pub kspace_dims: ArrayDim,
    pub reference: Vec<Complex32>,
    pub reference_dims: ArrayDim,
}

pub struct Reconstructor<S:Solver> {
    params: ReconParams,
    solver: S,
}

impl<S:Solver> Reconstructor<S> {

    pub fn new(params:ReconParams, solver:S) -> Self {
        Self { params, solver }
    }

    pub fn params(&self) -> &ReconParams {
        &self.params
    }

    /// full pipeline: stage, classify sampling, solve, read back and coil combine
    pub fn reconstruct(&self, space:&EncodingSpace) -> Result<ReconOutput> {
        let work_dir = WorkDir::create(&self.params.work_location,self.params.delete_work_dir)?;
        stage(&work_dir,REFERENCE_NAME,&space.reference,&space.reference_dims)?;
        stage(&work_dir,INPUT_NAME,&space.kspace,&space.kspace_dims)?;

        let sampling = analyze(&space.kspace,&space.kspace_dims,space.acce_factor_e1,space.acce_factor_e2);
        info!("sampling pattern: {:?}",sampling.pattern);

        let request = ReconRequest {
            input: String::from(INPUT_NAME),
            reference: String::from(REFERENCE_NAME),
            lambda_l1: self.params.lambda_l1,
            n_iter_l1: self.params.n_iter_l1,
            esp_maps: self.params.esp_maps,
            pattern: sampling.pattern,
        };
        let output = self.solver.reconstruct(work_dir.path(),&request)?;
        let (full_kspace,full_dims) = read_cfl_pipeline(work_dir.join(&output))?;
        drop(work_dir);
        debug!("solver output {output} has pipeline dims {:?}",pipeline_shape(&full_dims));

        let (image,dims) = coil_combine(&full_kspace,&full_dims,&space.coil_map,&space.coil_map_dims)?;
        info!("reconstructed image with dims {:?}",pipeline_shape(&dims));
        Ok(ReconOutput { image, dims, sampling })
    }

    /// channel compression only. Returns None when the target channel count is not smaller
    /// than the channel count of both data and reference.
    pub fn compress(&self, space:&EncodingSpace) -> Result<Option<CompressedSpace>> {
        let cha = space.kspace_dims.size(CHA);
        let cha_ref = space.reference_dims.size(CHA);
        let dst = self.params.dst_channels;
        if !(dst < cha && dst < cha_ref) {
            warn!("skipping channel compression: {dst} channels requested, data has {cha}, reference has {cha_ref}");
            return Ok(None);
        }

        let work_dir = WorkDir::create(&self.params.work_location,self.params.delete_work_dir)?;
        stage(&work_dir,REFERENCE_NAME,&space.reference,&space.reference_dims)?;
        stage(&work_dir,INPUT_NAME,&space.kspace,&space.kspace_dims)?;

        let calib_size = self.params.calib_size
            .min(space.reference_dims.size(E1))
            .min(space.reference_dims.size(E2));
        let request = CompressionRequest {
            input: String::from(INPUT_NAME),
            reference: String::from(REFERENCE_NAME),
            calib_size,
            dst_channels: dst,
        };
        let names = self.solver.compress_channels(work_dir.path(),&request)?;
        let (kspace,kspace_dims) = read_cfl_pipeline(work_dir.join(&names.input))?;
        let (reference,reference_dims) = read_cfl_pipeline(work_dir.join(&names.reference))?;
        Ok(Some(CompressedSpace { kspace, kspace_dims, reference, reference_dims }))
    }

}

/// write a pipeline array into the work directory
fn stage(work_dir:&WorkDir, name:&str, data:&[Complex32], dims:&ArrayDim) -> Result<()> {
    let dims = require_pipeline(dims)?;
    debug!("{name} [RO, E1, E2, CHA, N, S, LOC] = {:?}",pipeline_shape(&dims));
    write_cfl(work_dir.join(name),data,&pipeline_shape(&dims))
}
