use std::path::PathBuf;
use clap::Parser;
use log::info;
use cfl_recon::coil_combine::coil_combine;
use cfl_recon::dims::require_pipeline;
use cfl_recon::io_cfl::{read_cfl, write_cfl_dims};

/// combine multi-channel k-space [RO,E1,E2,CHA,N,S,LOC] into single channel images
#[derive(Parser)]
struct Args {
    /// k-space cfl base name
    kspace: PathBuf,
    /// coil sensitivity map cfl base name
    coil_map: PathBuf,
    /// output cfl base name
    output: PathBuf,
}

fn main() -> Result<(), cfl_recon::Error> {
    env_logger::init();
    let args = Args::parse();

    let (kspace,kspace_dims) = read_cfl(&args.kspace)?;
    let (coil_map,map_dims) = read_cfl(&args.coil_map)?;
    let kspace_dims = require_pipeline(&kspace_dims)?;
    let map_dims = require_pipeline(&map_dims)?;

    let (image,dims) = coil_combine(&kspace,&kspace_dims,&coil_map,&map_dims)?;
    write_cfl_dims(&args.output,&image,&dims)?;
    info!("wrote {} with dims {:?}",args.output.display(),dims.shape_ns());
    Ok(())
}
