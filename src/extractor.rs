//! Turns raw feed items into normalized headline candidates.
//!
//! Nothing in here touches the network or the database.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::config::ConfigError;

pub const MAX_TITLE_CHARS: usize = 150;
const TRUNCATED_TITLE_CHARS: usize = 147;
const ELLIPSIS: &str = "...";

pub const DEFAULT_KEYWORDS: &[&str] = &["Ayuntamiento"];

static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta").expect("valid meta selector"));
static DATE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)date").expect("date name regex"));
static PUBLISHED_PROPERTY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)published").expect("published property regex"));
static DAY_MONTH_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{2}/\d{2}/\d{4}\b").expect("dd/mm/yyyy regex"));
static BARE_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("year regex"));

/// A headline ready to be stored. The database assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsCandidate {
    pub title: String,
    pub link: String,
    pub date: Option<String>,
    pub author_section: Option<String>,
    pub detected_keyword: Option<String>,
}

/// The fields pulled out of one feed item before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub date: Option<String>,
    pub author_section: Option<String>,
    /// Summary or content markup, used when date or author is missing
    pub description: Option<String>,
}

/// Decode entities, trim, and cap the title at [`MAX_TITLE_CHARS`].
pub fn normalize_title(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let trimmed = decoded.trim();

    if trimmed.chars().count() <= MAX_TITLE_CHARS {
        return trimmed.to_string();
    }

    let mut out: String = trimmed.chars().take(TRUNCATED_TITLE_CHARS).collect();
    out.truncate(out.trim_end().len());
    out.push_str(ELLIPSIS);
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedDetails {
    pub date: Option<String>,
    pub author_section: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct MetaTag {
    name: Option<String>,
    property: Option<String>,
    content: Option<String>,
}

impl MetaTag {
    fn non_empty_content(&self) -> Option<String> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Default)]
struct PageMetadata {
    tags: Vec<MetaTag>,
}

impl PageMetadata {
    fn parse(markup: &str) -> Self {
        if markup.trim().is_empty() {
            return Self::default();
        }

        let document = Html::parse_document(markup);
        let tags = document
            .select(&META_SELECTOR)
            .map(|el| {
                let attr = |key: &str| el.value().attr(key).map(str::to_string);
                MetaTag {
                    name: attr("name"),
                    property: attr("property"),
                    content: attr("content"),
                }
            })
            .collect();

        Self { tags }
    }

    fn date(&self) -> Option<String> {
        self.tags
            .iter()
            .filter(|tag| {
                tag.name.as_deref().is_some_and(|n| DATE_NAME_RE.is_match(n))
                    || tag
                        .property
                        .as_deref()
                        .is_some_and(|p| PUBLISHED_PROPERTY_RE.is_match(p))
            })
            .find_map(MetaTag::non_empty_content)
    }

    fn author(&self) -> Option<String> {
        self.tags
            .iter()
            .filter(|tag| {
                tag.name
                    .as_deref()
                    .is_some_and(|n| n.trim().eq_ignore_ascii_case("author"))
            })
            .find_map(MetaTag::non_empty_content)
    }
}

/// Ways of finding a publication date, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStrategy {
    /// `<meta name="...date...">` or `<meta property="...published...">`
    Metadata,
    /// `dd/mm/yyyy` in the page text
    DayMonthYear,
    /// A year between 1900 and 2099 in the page text
    BareYear,
}

pub const DATE_STRATEGIES: [DateStrategy; 3] = [
    DateStrategy::Metadata,
    DateStrategy::DayMonthYear,
    DateStrategy::BareYear,
];

impl DateStrategy {
    fn detect(self, metadata: &PageMetadata, text: &str) -> Option<String> {
        match self {
            DateStrategy::Metadata => metadata.date(),
            DateStrategy::DayMonthYear => DAY_MONTH_YEAR_RE
                .find(text)
                .map(|m| m.as_str().to_string()),
            DateStrategy::BareYear => BARE_YEAR_RE.find(text).map(|m| m.as_str().to_string()),
        }
    }
}

/// Find the date and author/section of a page.
///
/// The date comes from the first entry of [`DATE_STRATEGIES`] that finds one.
/// The author only ever comes from `<meta name="author">`.
pub fn detect_date_and_author(page_markup: &str, page_text: &str) -> DetectedDetails {
    let metadata = PageMetadata::parse(page_markup);

    let date = DATE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.detect(&metadata, page_text));

    DetectedDetails {
        date,
        author_section: metadata.author(),
    }
}

/// Visible text of an HTML fragment, whitespace collapsed.
pub fn markup_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive, word-bounded keyword patterns tried in order.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    patterns: Vec<Regex>,
}

impl KeywordMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| AsRef::<str>::as_ref(p))
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                Regex::new(&format!(r"(?i)\b(?:{})\b", p)).map_err(|source| {
                    ConfigError::InvalidKeyword {
                        pattern: p.to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Literal text matched by the first pattern that hits.
    pub fn detect_keyword(&self, text: &str) -> Option<String> {
        self.patterns
            .iter()
            .find_map(|re| re.find(text))
            .map(|m| m.as_str().to_string())
    }
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS).expect("default keyword patterns compile")
    }
}

fn keyword_text(title: &str, author_section: Option<&str>) -> String {
    match author_section {
        Some(author) => format!("{} {}", title, author),
        None => title.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Normalize a raw item into a candidate. `None` when it has no usable title or link.
pub fn build_candidate(raw: RawItem, keywords: &KeywordMatcher) -> Option<NewsCandidate> {
    let link = non_empty(raw.link)?;
    let title = normalize_title(raw.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }

    let mut date = non_empty(raw.date);
    let mut author_section = non_empty(raw.author_section);

    if date.is_none() || author_section.is_none() {
        if let Some(markup) = raw.description.as_deref().filter(|d| !d.trim().is_empty()) {
            let details = detect_date_and_author(markup, &markup_text(markup));
            date = date.or(details.date);
            author_section = author_section.or(details.author_section);
        }
    }

    let detected_keyword =
        keywords.detect_keyword(&keyword_text(&title, author_section.as_deref()));

    Some(NewsCandidate {
        title,
        link,
        date,
        author_section,
        detected_keyword,
    })
}
