use std::path::PathBuf;
use clap::Parser;
use cfl_recon::recon::ReconParams;

#[derive(Debug, Parser)]
struct Args {
    /// path to recon parameters file to write
    parameter_file: PathBuf,
}

fn main() -> Result<(), cfl_recon::Error> {
    let args = Args::parse();
    let params = ReconParams::default();
    let toml_string = params.to_toml_string()?;
    let filename = args.parameter_file.with_extension("toml");
    std::fs::write(&filename,toml_string).map_err(|source| cfl_recon::Error::Io { path: filename.clone(), source })?;
    println!("wrote default parameter file to {}",filename.display());
    Ok(())
}
