//! Content search adapter: queries an external content source for candidate
//! documents and extracts full text, summaries, and named sections.
//!
//! The pipeline depends only on the [`ContentSource`] trait. The shipped
//! implementation is [`WikipediaSource`] over the MediaWiki action API.
//! Search is best-effort end to end: per-item failures are skipped and a
//! total failure returns an empty list rather than an error.

pub mod transcript;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, instrument, warn};

use courseforge_shared::{CourseForgeError, Result};

/// Default timeout for content-source requests.
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// User-Agent string for content requests.
const USER_AGENT: &str = concat!("courseforge/", env!("CARGO_PKG_VERSION"));

// Matches `== Heading ==` style MediaWiki section markers in plaintext extracts.
static SECTION_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^==+\s*(.+?)\s*==+\s*$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A candidate document returned by a search query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Document title.
    pub title: String,
    /// Canonical document URL.
    pub url: String,
    /// Provider name (e.g., "wikipedia").
    pub source: String,
}

/// A named section of a fetched document.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Section heading text.
    pub heading: String,
    /// Section body text.
    pub body: String,
}

/// A fully fetched document: summary, full text, and named sections.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub title: String,
    pub url: String,
    /// Lead text before the first section heading.
    pub summary: String,
    /// Complete plaintext of the document.
    pub full_text: String,
    /// Named sections in document order.
    pub sections: Vec<Section>,
}

// ---------------------------------------------------------------------------
// ContentSource trait
// ---------------------------------------------------------------------------

/// A provider of candidate documents for course assembly.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Search for candidate documents. Best-effort: never errors, per-item
    /// failures are skipped, total failure yields an empty list.
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit>;

    /// Fetch the full document for a previously returned title.
    async fn fetch(&self, title: &str) -> Result<SourceDocument>;
}

// ---------------------------------------------------------------------------
// Wikipedia implementation
// ---------------------------------------------------------------------------

/// [`ContentSource`] backed by the MediaWiki action API.
pub struct WikipediaSource {
    api_url: String,
    client: reqwest::Client,
}

impl WikipediaSource {
    /// Source against English Wikipedia.
    pub fn new() -> Result<Self> {
        Self::with_api_url("https://en.wikipedia.org/w/api.php")
    }

    /// Source against a custom API endpoint (used by tests).
    pub fn with_api_url(api_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| CourseForgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_url: api_url.into(),
            client,
        })
    }

    /// Run a search query, returning matching page titles.
    async fn search_titles(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", &max_results.to_string()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| CourseForgeError::Network(format!("search: {e}")))?
            .error_for_status()
            .map_err(|e| CourseForgeError::Network(format!("search: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CourseForgeError::parse(format!("search response: {e}")))?;

        let titles = body["query"]["search"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|item| item["title"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(titles)
    }

    /// Resolve a title to its canonical page (following redirects).
    /// Returns the resolved title and canonical URL.
    async fn resolve_page(&self, title: &str) -> Result<(String, String)> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("prop", "info"),
                ("inprop", "url"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| CourseForgeError::Network(format!("{title}: {e}")))?
            .error_for_status()
            .map_err(|e| CourseForgeError::Network(format!("{title}: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CourseForgeError::parse(format!("{title}: {e}")))?;

        let page = first_page(&body)
            .ok_or_else(|| CourseForgeError::parse(format!("{title}: no page in response")))?;

        if page.get("missing").is_some() {
            return Err(CourseForgeError::validation(format!("{title}: page missing")));
        }

        let resolved = page["title"]
            .as_str()
            .ok_or_else(|| CourseForgeError::parse(format!("{title}: page has no title")))?
            .to_string();
        let url = page["fullurl"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| fallback_page_url(&resolved));

        Ok((resolved, url))
    }
}

#[async_trait]
impl ContentSource for WikipediaSource {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        let titles = match self.search_titles(query, max_results).await {
            Ok(titles) => titles,
            Err(e) => {
                warn!(error = %e, "search failed, returning no candidates");
                return Vec::new();
            }
        };

        let mut hits = Vec::new();
        for title in titles {
            // Per-item failures (e.g., a redirect that fails to resolve)
            // drop the candidate, never the whole search.
            match self.resolve_page(&title).await {
                Ok((resolved, url)) => hits.push(SearchHit {
                    title: resolved,
                    url,
                    source: "wikipedia".into(),
                }),
                Err(e) => {
                    debug!(title = %title, error = %e, "skipping unresolvable candidate");
                }
            }
        }

        hits
    }

    #[instrument(skip(self))]
    async fn fetch(&self, title: &str) -> Result<SourceDocument> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("prop", "extracts|info"),
                ("inprop", "url"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| CourseForgeError::Network(format!("{title}: {e}")))?
            .error_for_status()
            .map_err(|e| CourseForgeError::Network(format!("{title}: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CourseForgeError::parse(format!("{title}: {e}")))?;

        let page = first_page(&body)
            .ok_or_else(|| CourseForgeError::parse(format!("{title}: no page in response")))?;

        let resolved = page["title"].as_str().unwrap_or(title).to_string();
        let extract = page["extract"].as_str().unwrap_or_default();
        let url = page["fullurl"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| fallback_page_url(&resolved));

        let (summary, sections) = split_sections(extract);

        Ok(SourceDocument {
            title: resolved,
            url,
            summary,
            full_text: extract.to_string(),
            sections,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pull the first page object out of a `query.pages` response map.
fn first_page(body: &serde_json::Value) -> Option<&serde_json::Value> {
    body["query"]["pages"].as_object().and_then(|pages| {
        // Page ids are arbitrary keys; a well-formed response has exactly one.
        pages.values().next()
    })
}

/// Canonical-URL guess for a page title when the API omits `fullurl`.
pub fn fallback_page_url(title: &str) -> String {
    format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_"))
}

/// Split a plaintext extract into lead summary and named sections.
///
/// MediaWiki plaintext extracts mark headings as `== Heading ==` lines.
/// Nested sub-headings are folded into their parent section's body.
pub fn split_sections(extract: &str) -> (String, Vec<Section>) {
    let mut boundaries: Vec<(usize, usize, String, usize)> = Vec::new();

    for caps in SECTION_HEADING_RE.captures_iter(extract) {
        let whole = caps.get(0).expect("match");
        let heading_line = whole.as_str();
        let level = heading_line.chars().take_while(|&c| c == '=').count();
        boundaries.push((
            whole.start(),
            whole.end(),
            caps[1].trim_matches('=').trim().to_string(),
            level,
        ));
    }

    let summary_end = boundaries
        .first()
        .map(|(start, ..)| *start)
        .unwrap_or(extract.len());
    let summary = extract[..summary_end].trim().to_string();

    let mut sections = Vec::new();
    for (i, (_, end, heading, level)) in boundaries.iter().enumerate() {
        // Only top-level (==) headings start a new section.
        if *level > 2 {
            continue;
        }

        // Body runs to the next top-level heading (or end of text),
        // keeping any nested sub-section text inline.
        let body_end = boundaries[i + 1..]
            .iter()
            .find(|(.., l)| *l <= 2)
            .map(|(start, ..)| *start)
            .unwrap_or(extract.len());

        let body = extract[*end..body_end].trim().to_string();
        sections.push(Section {
            heading: heading.clone(),
            body,
        });
    }

    (summary, sections)
}
