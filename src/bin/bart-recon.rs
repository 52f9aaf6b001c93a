use std::path::PathBuf;
use clap::Parser;
use log::info;
use cfl_recon::dims::require_pipeline;
use cfl_recon::io_cfl::{read_cfl, write_cfl_dims};
use cfl_recon::recon::{EncodingSpace, ReconParams, Reconstructor};
use cfl_recon::solver::ScriptSolver;

/// reconstruct one encoding space with the external toolbox and combine channels
#[derive(Parser)]
struct Args {
    /// recon parameter file (toml)
    params: PathBuf,
    /// k-space cfl base name [RO,E1,E2,CHA,N,S,LOC]
    kspace: PathBuf,
    /// calibration (reference) cfl base name
    reference: PathBuf,
    /// coil sensitivity map cfl base name
    coil_map: PathBuf,
    /// output cfl base name
    output: PathBuf,
    /// acceleration factor along the first phase encode
    #[clap(long, default_value_t = 1.)]
    acce_e1: f32,
    /// acceleration factor along the second phase encode
    #[clap(long, default_value_t = 1.)]
    acce_e2: f32,
    /// only run channel compression, writing <output>_data and <output>_ref
    #[clap(long)]
    compress_only: bool,
}

fn main() -> Result<(), cfl_recon::Error> {
    env_logger::init();
    let args = Args::parse();

    let params = ReconParams::from_toml_file(args.params.with_extension("toml"))?;
    let mut solver = ScriptSolver::new(&params.bart,&params.script);
    if let Some(vd_script) = &params.vd_script {
        solver = solver.with_vd_script(vd_script);
    }

    let (kspace,kspace_dims) = read_cfl(&args.kspace)?;
    let (reference,reference_dims) = read_cfl(&args.reference)?;
    let (coil_map,coil_map_dims) = read_cfl(&args.coil_map)?;

    let space = EncodingSpace {
        kspace,
        kspace_dims: require_pipeline(&kspace_dims)?,
        reference,
        reference_dims: require_pipeline(&reference_dims)?,
        coil_map,
        coil_map_dims: require_pipeline(&coil_map_dims)?,
        acce_factor_e1: args.acce_e1,
        acce_factor_e2: args.acce_e2,
    };

    let recon = Reconstructor::new(params,solver);

    if args.compress_only {
        match recon.compress(&space)? {
            Some(c) => {
                let mut data_out = args.output.clone().into_os_string();
                data_out.push("_data");
                let mut ref_out = args.output.clone().into_os_string();
                ref_out.push("_ref");
                write_cfl_dims(&data_out,&c.kspace,&c.kspace_dims)?;
                write_cfl_dims(&ref_out,&c.reference,&c.reference_dims)?;
                info!("wrote compressed data with {:?}",c.kspace_dims.shape_ns());
            }
            None => info!("channel compression not needed"),
        }
        return Ok(());
    }

    let out = recon.reconstruct(&space)?;
    write_cfl_dims(&args.output,&out.image,&out.dims)?;
    info!("wrote {} ({:?} sampling)",args.output.display(),out.sampling.pattern);
    Ok(())
}
