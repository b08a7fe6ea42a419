//! Album pipeline: album page → song pages → download links → files on disk.
//!
//! Strictly sequential. The first failing step aborts the whole run and is
//! reported as [`Error::Step`] naming the step and the URL it failed on.

use crate::error::{Error, Result, Step};
use crate::extract::{self, MarkupRules};
use crate::progress::ProgressSink;
use crate::transfer::Transport;
use crate::url_model::{decode_uri_component, sanitize_file_name, Url};
use scraper::Html;
use std::io;
use std::path::{Path, PathBuf};

/// What an album page lists.
#[derive(Debug, Clone)]
pub struct AlbumListing {
    pub url: Url,
    /// Empty when the page has no title heading.
    pub title: String,
    /// Song page URLs, deduplicated, in page order.
    pub song_pages: Vec<Url>,
}

/// Outcome of a completed album run.
#[derive(Debug, Clone)]
pub struct AlbumSummary {
    pub title: String,
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

pub struct AlbumDownloader<'t, T: Transport + ?Sized> {
    transport: &'t T,
    rules: MarkupRules,
}

impl<'t, T: Transport + ?Sized> AlbumDownloader<'t, T> {
    pub fn new(transport: &'t T, rules: MarkupRules) -> Self {
        Self { transport, rules }
    }

    /// Discover, prepare the output directory, then download every song.
    pub fn run(
        &self,
        album_url: &Url,
        directory: Option<&Path>,
        extensions: &[String],
        progress: &mut dyn ProgressSink,
    ) -> Result<AlbumSummary> {
        check_extensions(extensions)?;
        let listing = self.discover(album_url)?;
        let directory = resolve_output_dir(directory, &listing.title)
            .map_err(|e| e.at(Step::PrepareDirectory, &listing.url))?;
        progress.album(&listing, &directory);
        let files = self.download(&listing, &directory, extensions, progress)?;
        Ok(AlbumSummary {
            title: listing.title,
            directory,
            files,
        })
    }

    /// Fetch the album page and extract its title and song page links.
    pub fn discover(&self, album_url: &Url) -> Result<AlbumListing> {
        let html = self
            .transport
            .fetch_page(album_url)
            .map_err(|e| e.at(Step::FetchAlbum, album_url))?;
        let doc = Html::parse_document(&html);

        let title = extract::find_album_title(doc.root_element(), &self.rules);
        let table = extract::find_song_list(doc.root_element(), &self.rules).ok_or_else(|| {
            Error::NotFound("song list table".to_string()).at(Step::FindSongList, album_url)
        })?;
        let song_pages = extract::collect_anchor_hrefs(table, &self.rules)
            .iter()
            .map(|href| album_url.resolve(href))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.at(Step::FindSongList, album_url))?;

        tracing::info!(%album_url, title = %title, songs = song_pages.len(), "album discovered");
        Ok(AlbumListing {
            url: album_url.clone(),
            title,
            song_pages,
        })
    }

    /// Download every song of `listing` into `directory`. Returns the saved paths in order.
    pub fn download(
        &self,
        listing: &AlbumListing,
        directory: &Path,
        extensions: &[String],
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<PathBuf>> {
        check_extensions(extensions)?;
        let total = listing.song_pages.len();
        let mut saved = Vec::with_capacity(total);
        for (i, page) in listing.song_pages.iter().enumerate() {
            tracing::debug!(song = i + 1, total, %page, "processing song page");
            saved.push(self.download_song(page, directory, extensions, progress)?);
        }
        Ok(saved)
    }

    fn download_song(
        &self,
        page: &Url,
        directory: &Path,
        extensions: &[String],
        progress: &mut dyn ProgressSink,
    ) -> Result<PathBuf> {
        let html = self
            .transport
            .fetch_page(page)
            .map_err(|e| e.at(Step::FetchSongPage, page))?;

        let doc = Html::parse_document(&html);
        let link = extract::find_download_link(doc.root_element(), extensions, &self.rules, page)
            .map_err(|e| e.at(Step::FindDownloadLink, page))?
            .ok_or_else(|| {
                Error::NotFound(format!("link ending in any of [{}]", extensions.join(", ")))
                    .at(Step::FindDownloadLink, page)
            })?;

        let file_name = sanitize_file_name(&decode_uri_component(link.last_subpath()));
        if file_name.is_empty() {
            return Err(Error::NotFound("file name".to_string()).at(Step::FindDownloadLink, &link));
        }

        let dest = directory.join(file_name);
        self.transport
            .download_file(&link, &dest, progress)
            .map_err(|e| e.at(Step::DownloadFile, &link))?;
        Ok(dest)
    }
}

fn check_extensions(extensions: &[String]) -> Result<()> {
    if extensions.iter().all(|ext| ext.is_empty()) {
        return Err(Error::InvalidArgument(
            "extension priority list is empty".to_string(),
        ));
    }
    Ok(())
}

/// Output directory for an album: `requested` if given, else the sanitized
/// album title under the current working directory. Created if absent.
///
/// An absolute `requested` path is used as-is; the working directory is only
/// consulted for relative paths and title-derived names.
pub fn resolve_output_dir(requested: Option<&Path>, title: &str) -> Result<PathBuf> {
    if let Some(dir) = requested.filter(|dir| dir.is_absolute()) {
        return ensure_dir(dir.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| Error::io("failed to read current directory", ".", e))?;
    output_dir_under(&cwd, requested, title)
}

fn output_dir_under(base: &Path, requested: Option<&Path>, title: &str) -> Result<PathBuf> {
    let dir = match requested {
        Some(dir) => base.join(dir),
        None => {
            let name = sanitize_file_name(title);
            if name.is_empty() {
                return Err(Error::NotFound("album title".to_string()));
            }
            base.join(name)
        }
    };
    ensure_dir(dir)
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(Error::io(
                "output path must be a folder",
                dir,
                io::Error::new(io::ErrorKind::AlreadyExists, "not a directory"),
            ));
        }
    } else {
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::io("failed to create directory", &dir, e))?;
        tracing::info!(dir = %dir.display(), "created output directory");
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::progress::NoProgress;
    use crate::transfer::{BodySink, FileSink};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned pages and file bodies keyed by rendered URL.
    #[derive(Default)]
    struct FakeTransport {
        pages: HashMap<String, String>,
        files: HashMap<String, Vec<u8>>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeTransport {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        fn file(mut self, url: &str, body: &[u8]) -> Self {
            self.files.insert(url.to_string(), body.to_vec());
            self
        }

        fn missing(url: &Url) -> Error {
            Error::Transport {
                context: format!("GET {url}"),
                message: "HTTP 404".to_string(),
            }
        }
    }

    impl Transport for FakeTransport {
        fn fetch_page(&self, url: &Url) -> Result<String> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages
                .get(&url.to_string())
                .cloned()
                .ok_or_else(|| Self::missing(url))
        }

        fn probe_content_length(&self, url: &Url) -> Result<u64> {
            self.files
                .get(&url.to_string())
                .map(|b| b.len() as u64)
                .ok_or_else(|| Self::missing(url))
        }

        fn download_file(
            &self,
            url: &Url,
            dest: &Path,
            progress: &mut dyn ProgressSink,
        ) -> Result<u64> {
            let total = self.probe_content_length(url)?;
            self.requests.borrow_mut().push(url.to_string());
            let mut sink = FileSink::create(dest, total, progress)?;
            sink.write(&self.files[&url.to_string()])?;
            sink.progress(total);
            sink.close()
        }
    }

    const ALBUM: &str = "https://downloads.khinsider.com/game-soundtracks/album/robotics-notes";

    fn album_html() -> String {
        format!(
            "<h2>Nav</h2><h2>Search</h2><h2>Forums</h2><h2>Robotics;Notes OST</h2>\
             <table id=songlist>\
               <tr><td><a href=\"/game-soundtracks/album/robotics-notes/01%2520Opening.mp3\">Opening</a></td>\
                   <td><a href=\"/game-soundtracks/album/robotics-notes/01%2520Opening.mp3\">2:01</a></td></tr>\
               <tr><td><a href=\"/game-soundtracks/album/robotics-notes/02%2520Kaito.mp3\">Kaito</a></td></tr>\
             </table>\
             <a href=\"{ALBUM}/unrelated\">outside the table</a>"
        )
    }

    fn song_html(name: &str) -> String {
        format!(
            "<a href=\"https://cdn.example.org/soundtracks/robotics-notes/{name}.mp3\">mp3</a>\
             <a href=\"https://cdn.example.org/soundtracks/robotics-notes/{name}.flac\">flac</a>"
        )
    }

    fn full_site() -> FakeTransport {
        FakeTransport::default()
            .page(ALBUM, &album_html())
            .page(&format!("{ALBUM}/01%2520Opening.mp3"), &song_html("01%20Opening"))
            .page(&format!("{ALBUM}/02%2520Kaito.mp3"), &song_html("02%20Kaito"))
            .file(
                "https://cdn.example.org/soundtracks/robotics-notes/01%20Opening.flac",
                b"flac-one",
            )
            .file(
                "https://cdn.example.org/soundtracks/robotics-notes/02%20Kaito.flac",
                b"flac-two",
            )
    }

    fn flac_then_mp3() -> Vec<String> {
        vec!["flac".to_string(), "mp3".to_string()]
    }

    #[test]
    fn discover_reads_title_and_song_pages_in_order() {
        let transport = full_site();
        let downloader = AlbumDownloader::new(&transport, MarkupRules::default());
        let listing = downloader.discover(&Url::parse(ALBUM).unwrap()).unwrap();

        assert_eq!(listing.title, "Robotics;Notes OST");
        let pages: Vec<String> = listing.song_pages.iter().map(Url::to_string).collect();
        assert_eq!(
            pages,
            [
                format!("{ALBUM}/01%2520Opening.mp3"),
                format!("{ALBUM}/02%2520Kaito.mp3")
            ]
        );
    }

    #[test]
    fn downloads_preferred_format_named_after_decoded_segment() {
        let transport = full_site();
        let downloader = AlbumDownloader::new(&transport, MarkupRules::default());
        let listing = downloader.discover(&Url::parse(ALBUM).unwrap()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let files = downloader
            .download(&listing, dir.path(), &flac_then_mp3(), &mut NoProgress)
            .unwrap();

        assert_eq!(
            files,
            [
                dir.path().join("01 Opening.flac"),
                dir.path().join("02 Kaito.flac")
            ]
        );
        assert_eq!(std::fs::read(&files[0]).unwrap(), b"flac-one");
        assert_eq!(std::fs::read(&files[1]).unwrap(), b"flac-two");
    }

    #[test]
    fn missing_song_list_is_not_found() {
        let transport = FakeTransport::default().page(ALBUM, "<h2>only</h2><table></table>");
        let downloader = AlbumDownloader::new(&transport, MarkupRules::default());
        let err = downloader.discover(&Url::parse(ALBUM).unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(err, Error::Step { step: Step::FindSongList, .. }));
    }

    #[test]
    fn album_fetch_failure_names_step() {
        let transport = FakeTransport::default();
        let downloader = AlbumDownloader::new(&transport, MarkupRules::default());
        let err = downloader.discover(&Url::parse(ALBUM).unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(matches!(err, Error::Step { step: Step::FetchAlbum, .. }));
    }

    #[test]
    fn first_song_without_matching_link_stops_the_run() {
        let transport = full_site().page(
            &format!("{ALBUM}/01%2520Opening.mp3"),
            "<a href=\"https://cdn.example.org/cover.jpg\">cover</a>",
        );
        let downloader = AlbumDownloader::new(&transport, MarkupRules::default());
        let listing = downloader.discover(&Url::parse(ALBUM).unwrap()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let err = downloader
            .download(&listing, dir.path(), &flac_then_mp3(), &mut NoProgress)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(err, Error::Step { step: Step::FindDownloadLink, .. }));
        // the second song page was never requested
        assert!(!transport
            .requests
            .borrow()
            .iter()
            .any(|u| u.ends_with("02%2520Kaito.mp3")));
    }

    #[test]
    fn download_failure_names_step() {
        let mut transport = full_site();
        transport
            .files
            .remove("https://cdn.example.org/soundtracks/robotics-notes/02%20Kaito.flac");
        let downloader = AlbumDownloader::new(&transport, MarkupRules::default());
        let listing = downloader.discover(&Url::parse(ALBUM).unwrap()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let err = downloader
            .download(&listing, dir.path(), &flac_then_mp3(), &mut NoProgress)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(matches!(err, Error::Step { step: Step::DownloadFile, .. }));
        assert!(dir.path().join("01 Opening.flac").exists());
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let transport = full_site();
        let downloader = AlbumDownloader::new(&transport, MarkupRules::default());
        let err = downloader
            .run(&Url::parse(ALBUM).unwrap(), None, &[], &mut NoProgress)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(transport.requests.borrow().is_empty());
    }

    #[test]
    fn run_into_requested_directory() {
        let transport = full_site();
        let downloader = AlbumDownloader::new(&transport, MarkupRules::default());
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("ost");

        let mut announced = AlbumAnnouncements::default();
        let summary = downloader
            .run(
                &Url::parse(ALBUM).unwrap(),
                Some(&target),
                &flac_then_mp3(),
                &mut announced,
            )
            .unwrap();
        assert_eq!(summary.title, "Robotics;Notes OST");
        assert_eq!(summary.directory, target);
        assert_eq!(summary.files.len(), 2);
        assert!(target.join("02 Kaito.flac").is_file());
        assert_eq!(
            announced.0,
            [("Robotics;Notes OST".to_string(), ALBUM.to_string(), target)]
        );
    }

    #[derive(Default)]
    struct AlbumAnnouncements(Vec<(String, String, PathBuf)>);

    impl ProgressSink for AlbumAnnouncements {
        fn album(&mut self, listing: &AlbumListing, directory: &Path) {
            self.0.push((
                listing.title.clone(),
                listing.url.to_string(),
                directory.to_path_buf(),
            ));
        }
        fn start(&mut self, _label: &str, _total: u64) {}
        fn update(&mut self, _current: u64) {}
        fn finish(&mut self) {}
    }

    #[test]
    fn unusable_output_dir_names_prepare_step() {
        let transport = full_site();
        let downloader = AlbumDownloader::new(&transport, MarkupRules::default());
        let dir = tempfile::tempdir().unwrap();
        let taken = dir.path().join("taken");
        std::fs::write(&taken, b"x").unwrap();

        let err = downloader
            .run(
                &Url::parse(ALBUM).unwrap(),
                Some(&taken),
                &flac_then_mp3(),
                &mut NoProgress,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(err, Error::Step { step: Step::PrepareDirectory, .. }));
    }

    #[test]
    fn output_dir_from_title() {
        let base = tempfile::tempdir().unwrap();
        let dir = output_dir_under(base.path(), None, "Robotics;Notes OST").unwrap();
        assert_eq!(dir, base.path().join("Robotics;Notes OST"));
        assert!(dir.is_dir());

        // existing directory is reused
        assert_eq!(
            output_dir_under(base.path(), None, "Robotics;Notes OST").unwrap(),
            dir
        );
    }

    #[test]
    fn absolute_requested_dir_is_used_as_is() {
        let base = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("nested").join("ost");

        let dir = resolve_output_dir(Some(&target), "").unwrap();
        assert_eq!(dir, target);
        assert!(dir.is_dir());
        assert_eq!(
            output_dir_under(base.path(), Some(&target), "ignored").unwrap(),
            target
        );
    }

    #[test]
    fn output_dir_errors() {
        let base = tempfile::tempdir().unwrap();
        assert_eq!(
            output_dir_under(base.path(), None, "  ").unwrap_err().kind(),
            ErrorKind::NotFound
        );

        let file = base.path().join("taken");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(
            output_dir_under(base.path(), Some(Path::new("taken")), "")
                .unwrap_err()
                .kind(),
            ErrorKind::Io
        );
    }
}
