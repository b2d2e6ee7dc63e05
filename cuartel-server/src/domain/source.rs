//! Upstream station sources.

use serde::Deserialize;

/// Built-in station pages, in registry order.
const DEFAULT_SOURCES: [(&str, &str); 22] = [
    ("1 CBS", "https://icbs.cl/c/v/124"),
    ("2 CBS", "https://icbs.cl/c/v/247"),
    ("3 CBS", "https://icbs.cl/c/v/370"),
    ("4 CBS", "https://icbs.cl/c/v/493"),
    ("5 CBS", "https://icbs.cl/c/v/616"),
    ("6 CBS", "https://icbs.cl/c/v/739"),
    ("7 CBS", "https://icbs.cl/c/v/862"),
    ("8 CBS", "https://icbs.cl/c/v/985"),
    ("9 CBS", "https://icbs.cl/c/v/1108"),
    ("10 CBS", "https://icbs.cl/c/v/1231"),
    ("11 CBS", "https://icbs.cl/c/v/1354"),
    ("12 CBS", "https://icbs.cl/c/v/1477"),
    ("13 CBS", "https://icbs.cl/c/v/1600"),
    ("14 CBS", "https://icbs.cl/c/v/1723"),
    ("15 CBS", "https://icbs.cl/c/v/1846"),
    ("16 CBS", "https://icbs.cl/c/v/1969"),
    ("17 CBS", "https://icbs.cl/c/v/2092"),
    ("18 CBS", "https://icbs.cl/c/v/2215"),
    ("19 CBS", "https://icbs.cl/c/v/2338"),
    ("20 CBS", "https://icbs.cl/c/v/2461"),
    ("21 CBS", "https://icbs.cl/c/v/2584"),
    ("22 CBS", "https://icbs.cl/c/v/2707"),
];

/// One upstream station page.
///
/// Field names follow the sources file format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Source {
    /// Station name, e.g. "7 CBS".
    #[serde(rename = "nombre")]
    pub name: String,

    /// Page to scrape.
    pub url: String,
}

impl Source {
    /// Create a new source.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Ordering key for this source's records.
    pub fn sort_key(&self) -> u64 {
        station_sort_key(&self.name)
    }
}

/// Ordered, immutable list of sources polled on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    sources: Vec<Source>,
}

impl Registry {
    /// Create a registry from an explicit list of sources.
    pub fn new(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    /// The sources, in registry order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(
            DEFAULT_SOURCES
                .iter()
                .map(|(name, url)| Source::new(*name, *url))
                .collect(),
        )
    }
}

/// Leading integer of a station name, used to order records.
///
/// Names that don't start with a digit sort as 0, so they come first.
/// Digits are read up to the first whitespace; a name like "7B CBS" is
/// also treated as 0.
pub fn station_sort_key(name: &str) -> u64 {
    if !name.starts_with(|c: char| c.is_ascii_digit()) {
        return 0;
    }

    name.split_whitespace()
        .next()
        .and_then(|prefix| prefix.parse().ok())
        .unwrap_or(0)
}
