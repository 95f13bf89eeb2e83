use std::{borrow::Borrow, fmt::Display, ops::Deref, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Error produced when a url can't be turned into a [Site]. Sites with such urls are never
/// tracked.
#[derive(Debug, Error)]
pub enum MalformedUrl {
    #[error("Can't parse {url:?} as a url")]
    Unparseable {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Url {url:?} doesn't have a hostname")]
    MissingHost { url: String },
}

/// Normalized hostname that is used as a key for accumulated time. For example
/// `https://www.GitHub.com/rust-lang` becomes `github.com`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Site(Arc<str>);

impl Site {
    /// Extracts a site from a full url. Urls without a scheme are treated as http urls, so
    /// `github.com/foo` works too.
    pub fn from_url(raw: &str) -> Result<Site, MalformedUrl> {
        let raw = raw.trim();
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{raw}"))
                .map_err(|source| MalformedUrl::Unparseable {
                    url: raw.to_string(),
                    source,
                })?,
            Err(source) => {
                return Err(MalformedUrl::Unparseable {
                    url: raw.to_string(),
                    source,
                })
            }
        };

        url.host_str()
            .and_then(Site::from_host)
            .ok_or_else(|| MalformedUrl::MissingHost {
                url: raw.to_string(),
            })
    }

    /// Normalizes an already extracted hostname.
    pub fn from_host(host: &str) -> Option<Site> {
        let host = host.trim().trim_end_matches('.').to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        if host.is_empty() {
            None
        } else {
            Some(Site(host.into()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Site {
    type Error = MalformedUrl;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Site::from_host(&value).ok_or(MalformedUrl::MissingHost { url: value })
    }
}

impl Deref for Site {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for Site {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{MalformedUrl, Site};

    #[test]
    fn strips_scheme_path_and_www() {
        let site = Site::from_url("https://www.github.com/rust-lang/rust?tab=readme").unwrap();
        assert_eq!(site.as_str(), "github.com");
    }

    #[test]
    fn keeps_subdomains_other_than_www() {
        let site = Site::from_url("https://docs.google.com/document/d/1").unwrap();
        assert_eq!(site.as_str(), "docs.google.com");

        // Only the leading www is stripped.
        let site = Site::from_url("http://shop.www.example.com").unwrap();
        assert_eq!(site.as_str(), "shop.www.example.com");
    }

    #[test]
    fn drops_port_and_case() {
        let site = Site::from_url("http://LocalHost:3000/index.html").unwrap();
        assert_eq!(site.as_str(), "localhost");
    }

    #[test]
    fn accepts_bare_hostnames() {
        let site = Site::from_url("www.youtube.com/watch?v=1").unwrap();
        assert_eq!(site.as_str(), "youtube.com");
    }

    #[test]
    fn rejects_urls_without_host() {
        assert!(matches!(
            Site::from_url("about:blank"),
            Err(MalformedUrl::MissingHost { .. })
        ));
        assert!(matches!(
            Site::from_url("file:///tmp/notes.txt"),
            Err(MalformedUrl::MissingHost { .. })
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Site::from_url("http://exa mple.com").is_err());
        assert!(Site::from_url("").is_err());
    }

    #[test]
    fn deserializes_with_normalization() {
        let site: Site = serde_json::from_str("\"WWW.Reddit.com\"").unwrap();
        assert_eq!(site.as_str(), "reddit.com");
        assert!(serde_json::from_str::<Site>("\"\"").is_err());
    }
}
