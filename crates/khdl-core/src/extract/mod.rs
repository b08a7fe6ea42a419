//! Structured data extraction from album and song pages.
//!
//! Every extractor walks the parsed document with [`walk::elements`], so
//! "first" and "n-th" always mean document order.

mod walk;

pub use walk::{elements, Elements};

use crate::error::Result;
use crate::url_model::Url;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Site-specific markup heuristics.
///
/// The defaults describe the album pages of downloads.khinsider.com: the album
/// title is the text of the 4th `<h2>` and the song list is the first `<table>`
/// carrying an `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupRules {
    pub title_tag: String,
    /// 1-based occurrence of `title_tag` holding the album title.
    pub title_occurrence: usize,
    pub song_table_tag: String,
    pub song_table_attr: String,
    pub anchor_tag: String,
    pub href_attr: String,
}

impl Default for MarkupRules {
    fn default() -> Self {
        Self {
            title_tag: "h2".to_string(),
            title_occurrence: 4,
            song_table_tag: "table".to_string(),
            song_table_attr: "id".to_string(),
            anchor_tag: "a".to_string(),
            href_attr: "href".to_string(),
        }
    }
}

fn is_tag(el: &ElementRef<'_>, tag: &str) -> bool {
    el.value().name().eq_ignore_ascii_case(tag)
}

/// Returns the text of the first child of the `title_occurrence`-th title heading,
/// or an empty string when the page has fewer headings.
pub fn find_album_title(root: ElementRef<'_>, rules: &MarkupRules) -> String {
    let Some(skip) = rules.title_occurrence.checked_sub(1) else {
        return String::new();
    };
    elements(root)
        .filter(|el| is_tag(el, &rules.title_tag))
        .nth(skip)
        .map(first_child_text)
        .unwrap_or_default()
}

fn first_child_text(heading: ElementRef<'_>) -> String {
    let Some(child) = heading.first_child() else {
        return String::new();
    };
    if let Some(text) = child.value().as_text() {
        return text.trim().to_string();
    }
    ElementRef::wrap(child)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// First song-table element carrying a non-empty identifier attribute.
pub fn find_song_list<'a>(root: ElementRef<'a>, rules: &MarkupRules) -> Option<ElementRef<'a>> {
    elements(root).find(|el| {
        is_tag(el, &rules.song_table_tag)
            && el
                .value()
                .attr(&rules.song_table_attr)
                .is_some_and(|id| !id.is_empty())
    })
}

/// Every distinct anchor href under `subtree`, in first-seen order.
pub fn collect_anchor_hrefs(subtree: ElementRef<'_>, rules: &MarkupRules) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut hrefs = Vec::new();
    for el in elements(subtree).filter(|el| is_tag(el, &rules.anchor_tag)) {
        if let Some(href) = el.value().attr(&rules.href_attr) {
            if seen.insert(href) {
                hrefs.push(href.to_string());
            }
        }
    }
    hrefs
}

/// Picks the download link for the most preferred extension present on the page.
///
/// One pass records, per extension, the first anchor whose href ends with it
/// (case-sensitive suffix match; an href counts toward the highest-priority
/// extension it matches). The winning href is resolved against `page`.
/// Returns `Ok(None)` when no configured extension matched any anchor.
pub fn find_download_link(
    root: ElementRef<'_>,
    extensions: &[String],
    rules: &MarkupRules,
    page: &Url,
) -> Result<Option<Url>> {
    let mut first_by_ext: Vec<Option<&str>> = vec![None; extensions.len()];

    for el in elements(root).filter(|el| is_tag(el, &rules.anchor_tag)) {
        let Some(href) = el.value().attr(&rules.href_attr) else {
            continue;
        };
        if let Some(idx) = extensions
            .iter()
            .position(|ext| !ext.is_empty() && href.ends_with(ext.as_str()))
        {
            first_by_ext[idx].get_or_insert(href);
        }
    }

    match first_by_ext.into_iter().flatten().next() {
        Some(href) => {
            tracing::debug!(href, "selected download link");
            page.resolve(href).map(Some)
        }
        None => Ok(None),
    }
}
