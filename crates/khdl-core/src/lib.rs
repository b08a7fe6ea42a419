pub mod config;
pub mod logging;

pub mod album;
pub mod error;
pub mod extract;
pub mod progress;
pub mod transfer;
pub mod url_model;

pub use album::{AlbumDownloader, AlbumListing, AlbumSummary};
pub use error::{Error, ErrorKind, Result, Step};
pub use url_model::Url;
