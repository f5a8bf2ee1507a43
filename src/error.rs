use std::path::PathBuf;

use git2::Oid;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Cannot open git repository at {path}: {source}")]
    OpenRepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Get repository references failed: {0}")]
    Enumerate(#[source] git2::Error),

    #[error("Reference {name}: commit object {hash} failed: {source}")]
    ResolveCommit {
        name: String,
        hash: Oid,
        #[source]
        source: git2::Error,
    },

    #[error("Resolve revision {name} ({hash}) failed: {source}")]
    ResolveRevision {
        name: String,
        hash: Oid,
        #[source]
        source: git2::Error,
    },

    #[error("Reference {name}: tag object {hash} failed: {source}")]
    ResolveTag {
        name: String,
        hash: Oid,
        #[source]
        source: git2::Error,
    },

    #[error("Config document #{doc}: {message}")]
    Config { doc: usize, message: String },

    #[error("Config file {path} does not exist")]
    ConfigNotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn config(doc: usize, message: impl Into<String>) -> Self {
        AppError::Config {
            doc,
            message: message.into(),
        }
    }
}
