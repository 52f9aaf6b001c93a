use std::path::PathBuf;
use clap::Parser;
use cfl_recon::io_cfl::read_cfl_pipeline;
use cfl_recon::sampling::analyze;

/// report whether k-space was sampled uniformly or with variable density
#[derive(Parser)]
struct Args {
    /// k-space cfl base name
    kspace: PathBuf,
    /// acceleration factor along the first phase encode
    #[clap(long, default_value_t = 1.)]
    acce_e1: f32,
    /// acceleration factor along the second phase encode
    #[clap(long, default_value_t = 1.)]
    acce_e2: f32,
}

fn main() -> Result<(), cfl_recon::Error> {
    env_logger::init();
    let args = Args::parse();
    let (kspace,dims) = read_cfl_pipeline(&args.kspace)?;
    let report = analyze(&kspace,&dims,args.acce_e1,args.acce_e2);
    print!("{}",report.to_toml_string()?);
    Ok(())
}
