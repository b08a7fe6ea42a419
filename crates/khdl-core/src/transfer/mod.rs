//! HTTP transfers: page fetches, HEAD probes and streamed file downloads.
//!
//! Uses the curl crate (libcurl Easy handles). Every call blocks the current
//! thread until the transfer completes.

mod head;
mod sink;

pub use sink::{BodySink, FileSink, PageBuffer};

use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use crate::url_model::Url;
use curl::easy::Easy;
use std::cell::RefCell;
use std::path::Path;
use std::str;

/// The HTTP operations the album pipeline needs.
pub trait Transport {
    /// GET `url` and return the whole body as text.
    fn fetch_page(&self, url: &Url) -> Result<String>;

    /// HEAD `url` and return its declared `Content-Length`.
    fn probe_content_length(&self, url: &Url) -> Result<u64>;

    /// Probe the size of `url`, then stream its body into `dest`, reporting to `progress`.
    /// Returns the number of bytes written.
    fn download_file(&self, url: &Url, dest: &Path, progress: &mut dyn ProgressSink)
        -> Result<u64>;
}

/// Per-handle options applied to every request.
#[derive(Debug, Clone, Default)]
pub struct CurlOptions {
    pub user_agent: Option<String>,
}

/// [`Transport`] backed by libcurl.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: CurlOptions,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }

    fn easy(&self, url: &Url) -> Result<Easy> {
        let mut easy = Easy::new();
        easy.url(&url.to_string()).map_err(Error::Init)?;
        easy.follow_location(true).map_err(Error::Init)?;
        if let Some(agent) = &self.options.user_agent {
            easy.useragent(agent).map_err(Error::Init)?;
        }
        Ok(easy)
    }
}

impl Transport for CurlTransport {
    fn fetch_page(&self, url: &Url) -> Result<String> {
        let mut easy = self.easy(url)?;
        let mut page = PageBuffer::new();
        stream_body(&mut easy, &mut page, url)?;
        tracing::debug!(%url, "fetched page");
        Ok(page.into_string())
    }

    fn probe_content_length(&self, url: &Url) -> Result<u64> {
        let mut headers: Vec<String> = Vec::new();

        let mut easy = self.easy(url)?;
        easy.nobody(true).map_err(Error::Init)?; // HEAD request

        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = str::from_utf8(data) {
                        headers.push(s.trim_end().to_string());
                    }
                    true
                })
                .map_err(Error::Init)?;
            transfer
                .perform()
                .map_err(|e| Error::transport(format!("HEAD {url}"), e))?;
        }

        check_status(&mut easy, "HEAD", url)?;

        head::content_length(&headers).ok_or_else(|| Error::Transport {
            context: format!("HEAD {url}"),
            message: "response has no readable Content-Length".to_string(),
        })
    }

    fn download_file(
        &self,
        url: &Url,
        dest: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<u64> {
        let total = self.probe_content_length(url)?;
        let mut easy = self.easy(url)?;
        tracing::info!(%url, dest = %dest.display(), total, "downloading");

        let mut file = FileSink::create(dest, total, progress)?;
        let streamed = stream_body(&mut easy, &mut file, url);
        let closed = file.close();
        if let Err(e) = streamed {
            tracing::warn!(dest = %dest.display(), "download aborted, partial file left behind");
            return Err(e);
        }
        let written = closed?;

        if written != total {
            tracing::warn!(written, total, "size differs from probed Content-Length");
        }
        progress.finish();
        Ok(written)
    }
}

/// Runs a GET on `easy`, streaming the body into `sink` with progress enabled.
///
/// A failed sink write aborts the transfer and is returned instead of the
/// resulting curl error.
fn stream_body(easy: &mut Easy, sink: &mut dyn BodySink, url: &Url) -> Result<()> {
    easy.progress(true).map_err(Error::Init)?;

    let sink = RefCell::new(sink);
    let write_error: RefCell<Option<Error>> = RefCell::new(None);

    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| match sink.borrow_mut().write(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    *write_error.borrow_mut() = Some(e);
                    Ok(0) // abort transfer
                }
            })
            .map_err(Error::Init)?;
        transfer
            .progress_function(|_dl_total, dl_now, _ul_total, _ul_now| {
                sink.borrow_mut().progress(dl_now as u64);
                true
            })
            .map_err(Error::Init)?;
        transfer.perform()
    };

    if let Some(e) = write_error.into_inner() {
        return Err(e);
    }
    performed.map_err(|e| Error::transport(format!("GET {url}"), e))?;
    check_status(easy, "GET", url)
}

fn check_status(easy: &mut Easy, method: &str, url: &Url) -> Result<()> {
    let code = easy
        .response_code()
        .map_err(|e| Error::transport(format!("{method} {url}"), e))?;
    if !(200..300).contains(&code) {
        return Err(Error::Transport {
            context: format!("{method} {url}"),
            message: format!("HTTP {code}"),
        });
    }
    Ok(())
}
