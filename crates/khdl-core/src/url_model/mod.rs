//! Minimal URL model: scheme, authority and path segments.
//!
//! Only what the album pipeline needs is modeled. Query strings, fragments,
//! ports and userinfo are carried verbatim inside the authority or the last
//! segment and never interpreted.

mod decode;
mod sanitize;

pub use decode::decode_uri_component;
pub use sanitize::sanitize_file_name;

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A parsed absolute URL.
///
/// Path segments are stored innermost-first (the last segment of the rendered
/// URL is `paths[0]`) and reversed again when rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    scheme: String,
    base: String,
    paths: Vec<String>,
}

impl Url {
    /// Parses `input` as `scheme://authority[/path...]`.
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = |reason| Error::MalformedUrl {
            url: input.to_string(),
            reason,
        };

        let (scheme, rest) = input
            .split_once(':')
            .ok_or_else(|| malformed("missing scheme delimiter"))?;
        if scheme.is_empty() {
            return Err(malformed("empty scheme"));
        }
        let rest = rest
            .strip_prefix("//")
            .ok_or_else(|| malformed("missing `//` after scheme"))?;

        let (base, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(&rest[idx..])),
            None => (rest, None),
        };
        if base.is_empty() {
            return Err(malformed("empty authority"));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            base: base.to_string(),
            paths: path.map(segments_innermost_first).unwrap_or_default(),
        })
    }

    /// Replaces every path segment with those of `path`, which must start with `/`.
    pub fn set_path(&mut self, path: &str) -> Result<()> {
        if !path.starts_with('/') {
            return Err(Error::InvalidArgument(format!(
                "path `{path}` must begin with a leading slash"
            )));
        }
        self.paths = segments_innermost_first(path);
        Ok(())
    }

    /// Resolves a link found on the page at `self`.
    ///
    /// Absolute links are parsed as-is, protocol-relative links (`//host/..`)
    /// inherit this scheme and root-relative links (`/a/b`) keep this origin.
    /// A `://` later in a relative link (e.g. inside its query) does not make it absolute.
    pub fn resolve(&self, href: &str) -> Result<Url> {
        if href.starts_with("//") {
            return Url::parse(&format!("{}:{}", self.scheme, href));
        }
        if !href.starts_with('/') && has_scheme(href) {
            return Url::parse(href);
        }
        let mut url = self.clone();
        url.set_path(href)?;
        Ok(url)
    }

    /// Innermost path segment, or `""` when the URL has no path.
    pub fn last_subpath(&self) -> &str {
        self.paths.first().map(String::as_str).unwrap_or("")
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn base_domain(&self) -> &str {
        &self.base
    }

    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.base)
    }

    /// Path segments in rendered (outermost-first) order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().rev().map(String::as_str)
    }
}

/// Whether `href` starts with `scheme://`, where scheme is `ALPHA *(ALPHA / DIGIT / "+" / "-" / ".")`.
fn has_scheme(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Splits an absolute path on its last `/` until exhausted, deepest segment first.
fn segments_innermost_first(path: &str) -> Vec<String> {
    let mut rest = path;
    let mut out = Vec::new();
    while let Some(idx) = rest.rfind('/') {
        out.push(rest[idx + 1..].to_string());
        rest = &rest[..idx];
    }
    out
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.base)?;
        for segment in self.segments() {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Url {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Url::parse(s)
    }
}
