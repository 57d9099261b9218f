use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvalidIncludeErrorDetails {
    #[error("invalid pattern")]
    Pattern(#[from] glob::PatternError),

    #[error("cannot read a matched path")]
    Glob(#[from] glob::GlobError),

    #[error("cannot read {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("nested too deeply (more than {0} levels)")]
    TooDeep(usize),
}

#[derive(Error, Debug)]
#[error("invalid include `{line}`")]
pub struct InvalidIncludeError {
    pub line: String,
    #[source]
    pub details: InvalidIncludeErrorDetails,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to open SSH config file {}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read SSH config")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    InvalidInclude(#[from] InvalidIncludeError),
}
