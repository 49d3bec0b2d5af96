use std::path::PathBuf;
use thiserror::Error;

/// Failure of a top-level parse. Every variant aborts the whole call; no
/// partial output is returned.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// The requested path is already part of the current inclusion chain.
    #[error("circular include found, path: {}", path.display())]
    CircularInclude { path: PathBuf },

    /// Neither the including file's directory nor any search root contains the
    /// requested path.
    #[error("could not find shader with include path: {}", path.display())]
    IncludeNotFound { path: PathBuf },

    /// The file was resolved but could not be opened or read.
    #[error("failed to open file at path: {}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PreprocessError {
    /// The path the error refers to: the requested spelling for
    /// `CircularInclude`/`IncludeNotFound`, the resolved path for
    /// `UnreadableFile`.
    pub fn path(&self) -> &std::path::Path {
        match self {
            PreprocessError::CircularInclude { path }
            | PreprocessError::IncludeNotFound { path }
            | PreprocessError::UnreadableFile { path, .. } => path,
        }
    }
}

pub type Result<T> = std::result::Result<T, PreprocessError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(String),
}
