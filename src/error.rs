use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// a file of the interchange pair (or the work directory) could not be opened, read or written
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse header {path}: {reason}")]
    HeaderParse {
        path: PathBuf,
        reason: String,
    },

    #[error("{path} is truncated: expected {expected} bytes, found {found}")]
    TruncatedFile {
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    #[error("{0} axes do not fit in the 16 slot interchange header")]
    DimensionOverflow(usize),

    #[error("array with shape {0:?} has non-singleton axes beyond the 7 pipeline axes")]
    NotPipelineShaped(Vec<usize>),

    #[error("coil map shape {map:?} is incompatible with image shape {image:?}")]
    CoilMapShape {
        image: Vec<usize>,
        map: Vec<usize>,
    },

    #[error("external solver failed: {0}")]
    Solver(String),

    #[error("invalid recon parameters: {0}")]
    Config(String),

    #[error("failed to format report: {0}")]
    Report(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
}
