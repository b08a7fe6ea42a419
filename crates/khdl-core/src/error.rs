//! Error taxonomy shared by the URL model, transfer layer and album pipeline.

use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`], stable across `Step` wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedUrl,
    InvalidArgument,
    Init,
    Transport,
    Io,
    NotFound,
}

/// Pipeline stage reported when an album run aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FetchAlbum,
    FindSongList,
    PrepareDirectory,
    FetchSongPage,
    FindDownloadLink,
    DownloadFile,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::FetchAlbum => "fetching album page",
            Step::FindSongList => "locating song list",
            Step::PrepareDirectory => "preparing output directory",
            Step::FetchSongPage => "fetching song page",
            Step::FindDownloadLink => "locating download link",
            Step::DownloadFile => "downloading file",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed URL `{url}`: {reason}")]
    MalformedUrl { url: String, reason: &'static str },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to initialize HTTP client")]
    Init(#[source] curl::Error),

    #[error("{context}: {message}")]
    Transport { context: String, message: String },

    #[error("{context} ({})", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{step} failed for {target}")]
    Step {
        step: Step,
        target: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedUrl { .. } => ErrorKind::MalformedUrl,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Init(_) => ErrorKind::Init,
            Error::Transport { .. } => ErrorKind::Transport,
            Error::Io { .. } => ErrorKind::Io,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Step { source, .. } => source.kind(),
        }
    }

    pub(crate) fn transport(context: impl Into<String>, err: impl fmt::Display) -> Self {
        Error::Transport {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn at(self, step: Step, target: impl fmt::Display) -> Self {
        Error::Step {
            step,
            target: target.to_string(),
            source: Box::new(self),
        }
    }
}
