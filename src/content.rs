//! Content-reference classifier
//!
//! Recognizes links to the video streaming service the receiver has a
//! dedicated app for, and pulls out the embedded content id:
//!
//! - long form: `https://www.youtube.com/watch?v=<id>` and
//!   `https://www.youtube.com/playlist?list=<id>` (id in the query)
//! - short form: `https://youtu.be/<id>` (id in the path)
//!
//! Anything else, including malformed URIs, classifies as `None`.

use url::Url;

pub const LONG_DOMAIN: &str = "youtube.com";
pub const SHORT_DOMAIN: &str = "youtu.be";

const SCHEME: &str = "https";
const WATCH_ENDPOINT: &str = "watch";
const PLAYLIST_ENDPOINT: &str = "playlist";
const VIDEO_QUERY: &str = "v";
const PLAYLIST_QUERY: &str = "list";

/// Whether a reference points at one item or a collection of items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Item,
    Collection,
}

/// A recognized content reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    pub kind: ContentKind,
    pub id: String,
}

impl ContentRef {
    pub fn item(id: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Item,
            id: id.into(),
        }
    }

    pub fn collection(id: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Collection,
            id: id.into(),
        }
    }

    /// Canonical long-form URL for this reference
    pub fn canonical_url(&self) -> String {
        match self.kind {
            ContentKind::Item => watch_url(&self.id),
            ContentKind::Collection => format!(
                "{}://{}/{}?{}={}",
                SCHEME, LONG_DOMAIN, PLAYLIST_ENDPOINT, PLAYLIST_QUERY, self.id
            ),
        }
    }
}

/// Canonical watch URL for a bare item id
pub fn watch_url(id: &str) -> String {
    format!(
        "{}://{}/{}?{}={}",
        SCHEME, LONG_DOMAIN, WATCH_ENDPOINT, VIDEO_QUERY, id
    )
}

/// The domain family a URI belongs to, if recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Long,
    Short,
}

/// Registrable domain of a URL: the last two host labels
fn domain(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return None;
    }
    Some(labels[labels.len() - 2..].join(".").to_lowercase())
}

fn family(url: &Url) -> Option<Family> {
    match domain(url)?.as_str() {
        LONG_DOMAIN => Some(Family::Long),
        SHORT_DOMAIN => Some(Family::Short),
        _ => None,
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| is_valid_id(v))
}

/// Parse a URI and classify it. Only absolute http(s) URLs with a host are
/// considered well-formed.
pub fn classify(uri: &str) -> Option<ContentRef> {
    let url = Url::parse(uri.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let first_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next())
        .unwrap_or_default()
        .to_string();

    match family(&url)? {
        Family::Long => match first_segment.as_str() {
            WATCH_ENDPOINT => query_value(&url, VIDEO_QUERY).map(ContentRef::item),
            PLAYLIST_ENDPOINT => query_value(&url, PLAYLIST_QUERY).map(ContentRef::collection),
            _ => None,
        },
        Family::Short => {
            if is_valid_id(&first_segment) {
                Some(ContentRef::item(first_segment))
            } else {
                query_value(&url, PLAYLIST_QUERY).map(ContentRef::collection)
            }
        }
    }
}

/// Embedded content id of a recognized URI
pub fn content_id(uri: &str) -> Option<String> {
    classify(uri).map(|r| r.id)
}

/// Whether `uri` belongs to a recognized domain family at all
pub fn is_recognized_domain(uri: &str) -> bool {
    Url::parse(uri.trim())
        .ok()
        .and_then(|url| family(&url))
        .is_some()
}
