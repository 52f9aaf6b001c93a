/*
    Boundary to the external reconstruction toolbox. The toolbox consumes and produces
    interchange pairs inside a work directory; everything about how it is invoked lives
    behind the Solver trait so the rest of the crate can run against a stand-in.
 */
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use log::{debug, info};
use crate::{Error, Result};
use crate::sampling::SamplingPattern;

/// base name of the channel compression matrix written by the toolbox
pub const CC_MATRIX: &str = "cc_matrix";
pub const CC_INPUT: &str = "cc_input_data";
pub const CC_REFERENCE: &str = "cc_reference_data";

#[derive(Debug, Clone)]
pub struct ReconRequest {
    /// base name of the k-space pair inside the work directory
    pub input: String,
    /// base name of the calibration pair inside the work directory
    pub reference: String,
    pub lambda_l1: f32,
    pub n_iter_l1: u32,
    pub esp_maps: u32,
    pub pattern: SamplingPattern,
}

#[derive(Debug, Clone)]
pub struct CompressionRequest {
    pub input: String,
    pub reference: String,
    pub calib_size: usize,
    pub dst_channels: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedNames {
    pub input: String,
    pub reference: String,
}

pub trait Solver: Send + Sync {
    /// run the reconstruction and return the base name of its output inside `work_dir`
    fn reconstruct(&self, work_dir:&Path, request:&ReconRequest) -> Result<String>;

    /// compress the receive channels of input and reference data
    fn compress_channels(&self, work_dir:&Path, request:&CompressionRequest) -> Result<CompressedNames>;
}


/// the output base name of a command script: the last whitespace separated token of the
/// last line that invokes the toolbox
pub fn script_output_name(script:&str) -> Option<String> {
    script.lines()
        .filter(|line| !line.trim().is_empty() && line.contains("bart"))
        .last()
        .and_then(|line| line.split_whitespace().last())
        .map(String::from)
}

/// runs a command script for reconstruction and the toolbox binary for channel compression
#[derive(Debug, Clone)]
pub struct ScriptSolver {
    bart: PathBuf,
    script: PathBuf,
    vd_script: Option<PathBuf>,
}

impl ScriptSolver {

    pub fn new(bart:impl AsRef<Path>, script:impl AsRef<Path>) -> Self {
        Self {
            bart: bart.as_ref().to_path_buf(),
            script: script.as_ref().to_path_buf(),
            vd_script: None,
        }
    }

    /// script to use for variable density sampled data
    pub fn with_vd_script(mut self, vd_script:impl AsRef<Path>) -> Self {
        self.vd_script = Some(vd_script.as_ref().to_path_buf());
        self
    }

    fn script_for(&self, pattern:SamplingPattern) -> &Path {
        match (pattern,&self.vd_script) {
            (SamplingPattern::VariableDensity,Some(vd)) => vd,
            _ => &self.script,
        }
    }

    fn run<I,S>(&self, program:&Path, args:I, work_dir:&Path) -> Result<()>
    where I:IntoIterator<Item=S>, S:AsRef<OsStr>
    {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(work_dir);
        debug!("running {:?} in {}",cmd,work_dir.display());
        let status = cmd.status().map_err(Error::io(program))?;
        if !status.success() {
            return Err(Error::Solver(format!("{:?} exited with {}",cmd,status)));
        }
        Ok(())
    }

}

impl Solver for ScriptSolver {

    fn reconstruct(&self, work_dir:&Path, request:&ReconRequest) -> Result<String> {
        let script = self.script_for(request.pattern);
        let text = std::fs::read_to_string(script).map_err(Error::io(script))?;
        let output = script_output_name(&text)
            .ok_or_else(|| Error::Solver(format!("{} contains no toolbox command",script.display())))?;
        info!("running {} for {:?} sampling",script.display(),request.pattern);
        self.run(script,[
            String::from("-w"),request.lambda_l1.to_string(),
            String::from("-i"),request.n_iter_l1.to_string(),
            String::from("-m"),request.esp_maps.to_string(),
            request.input.clone(),
        ],work_dir)?;
        Ok(output)
    }

    fn compress_channels(&self, work_dir:&Path, request:&CompressionRequest) -> Result<CompressedNames> {
        info!("compressing to {} channels with calibration size {}",request.dst_channels,request.calib_size);
        let calib = request.calib_size.to_string();
        let dst = request.dst_channels.to_string();
        self.run(&self.bart,["cc","-r",calib.as_str(),"-G",request.reference.as_str(),CC_MATRIX],work_dir)?;
        self.run(&self.bart,["ccapply","-p",dst.as_str(),"-G",request.input.as_str(),CC_MATRIX,CC_INPUT],work_dir)?;
        self.run(&self.bart,["ccapply","-p",dst.as_str(),"-G",request.reference.as_str(),CC_MATRIX,CC_REFERENCE],work_dir)?;
        Ok(CompressedNames {
            input: String::from(CC_INPUT),
            reference: String::from(CC_REFERENCE),
        })
    }

}
