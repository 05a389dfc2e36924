use std::path::{Path, PathBuf};

/// An error that occurred while preparing the runner or processing a
/// test document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("resources must be set before the runner is initialized")]
    ResourcesNotSet,
    #[error("the runner has already been initialized")]
    AlreadyInitialized,
    #[error("the runner has not been initialized")]
    NotInitialized,
    #[error("cannot compile {path}: {message}")]
    Compilation { path: PathBuf, message: String },
    #[error("cannot execute {path}: {message}")]
    Execution { path: PathBuf, message: String },
    #[error("cannot resolve reference: {reference}")]
    Resolution { reference: String },
    #[error("catalog source failed: {0}")]
    CatalogSource(String),
    #[error("no bundled resource for {logical}")]
    MissingResource { logical: String },
    #[error("cannot load document: {0}")]
    Documents(String),
    #[error(transparent)]
    Schematron(#[from] xspec_schematron::Error),
    #[error(transparent)]
    Xot(#[from] xot::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn compilation(path: &Path, message: impl Into<String>) -> Self {
        Error::Compilation {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn execution(path: &Path, message: impl Into<String>) -> Self {
        Error::Execution {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Errors scoped to a single test document; the batch keeps going
    /// when one of these occurs.
    pub fn is_per_document(&self) -> bool {
        matches!(
            self,
            Error::Compilation { .. } | Error::Execution { .. } | Error::Resolution { .. }
        )
    }
}

pub type Result<V> = std::result::Result<V, Error>;
