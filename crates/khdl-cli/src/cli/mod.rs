//! CLI for khinsider-dl.

mod progress_bar;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use khdl_core::album::AlbumDownloader;
use khdl_core::config;
use khdl_core::transfer::{CurlOptions, CurlTransport};
use khdl_core::Url;
use std::path::PathBuf;

use progress_bar::TerminalProgress;

/// Top-level CLI for khinsider-dl.
#[derive(Debug, Parser)]
#[command(name = "khinsider-dl", version)]
#[command(about = "A tool for bulk downloading songs from khinsider", long_about = None)]
pub struct Cli {
    /// Download page for the album/soundtrack.
    pub input: Option<String>,

    /// Output directory (default: the album title under the current directory).
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Comma-separated list of file extensions to download with priority. The
    /// left-most item is tried first; if a song has none, the next one is tried.
    /// Defaults to the config file's list (flac,mp3).
    #[arg(short = 't', long = "type", value_name = "EXT,...", value_delimiter = ',')]
    pub types: Vec<String>,
}

impl Cli {
    pub fn run_from_args() -> Result<()> {
        Cli::parse().run()
    }

    fn run(self) -> Result<()> {
        let Some(input) = self.input.as_deref() else {
            Cli::command().print_help()?;
            println!();
            return Ok(());
        };

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let extensions = self.extensions().unwrap_or_else(|| cfg.extensions.clone());

        let album_url = Url::parse(input)?;
        let transport = CurlTransport::new(CurlOptions {
            user_agent: cfg.user_agent.clone(),
        });
        let downloader = AlbumDownloader::new(&transport, cfg.markup.clone());

        let mut progress = TerminalProgress::new();
        let summary = downloader.run(
            &album_url,
            self.directory.as_deref(),
            &extensions,
            &mut progress,
        )?;
        tracing::info!(
            files = summary.files.len(),
            dir = %summary.directory.display(),
            "album complete"
        );

        println!("All files downloaded to \"{}\"", summary.directory.display());
        Ok(())
    }

    /// Extensions from `-t`, trimmed; `None` when the flag was not given.
    fn extensions(&self) -> Option<Vec<String>> {
        let exts: Vec<String> = self
            .types
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        (!exts.is_empty()).then_some(exts)
    }
}
