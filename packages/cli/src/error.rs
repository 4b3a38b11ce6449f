use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Kvfs(#[from] kvfs_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file {path}: {message}")]
    Config { path: PathBuf, message: String },
}
