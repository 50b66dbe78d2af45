use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use feed_rs::parser;
use reqwest::Client;
use serde::Deserialize;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::{insert_news, InsertResult};
use crate::extractor::{build_candidate, KeywordMatcher, NewsCandidate, RawItem};

pub struct Ingestor {
    client: Client,
    feed_url: String,
    keywords: KeywordMatcher,
}

impl Ingestor {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent("MundoHeadlines/1.0 (RSS Reader)")
            .build()?;

        Ok(Self {
            client,
            feed_url: config.feed_url.clone(),
            keywords: KeywordMatcher::new(&config.keywords)?,
        })
    }

    /// Fetch the feed once and store up to `max_items` new headlines.
    ///
    /// Fetch and parse failures end the run with nothing inserted. Only
    /// storage errors are returned.
    pub async fn run_ingestion(
        &self,
        conn: &mut SqliteConnection,
        max_items: usize,
    ) -> anyhow::Result<usize> {
        let candidates = self.fetch_candidates(max_items).await;
        store_candidates(conn, &candidates).await
    }

    /// Fetch the feed and build up to `max_items` candidates.
    ///
    /// Needs no database connection. A failed fetch or parse yields no
    /// candidates.
    pub async fn fetch_candidates(&self, max_items: usize) -> Vec<NewsCandidate> {
        match self.fetch_feed().await {
            Ok((feed, pub_dates)) => {
                extract_candidates(feed, &pub_dates, max_items, &self.keywords)
            }
            Err(e) => {
                warn!("Failed to fetch feed '{}': {}", self.feed_url, e);
                Vec::new()
            }
        }
    }

    async fn fetch_feed(&self) -> anyhow::Result<(Feed, Vec<Option<String>>)> {
        info!("Fetching feed: {}", self.feed_url);

        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        let parsed = parser::parse(&bytes[..])?;
        let pub_dates = item_pub_dates(&bytes);
        Ok((parsed, pub_dates))
    }
}

/// Insert each candidate, skipping links already stored.
pub async fn store_candidates(
    conn: &mut SqliteConnection,
    candidates: &[NewsCandidate],
) -> anyhow::Result<usize> {
    let mut outcomes = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        outcomes.push(insert_news(conn, candidate).await?);
    }

    let inserted = count_inserted(&outcomes);
    info!("Stored {} new of {} items", inserted, candidates.len());
    Ok(inserted)
}

pub fn count_inserted(outcomes: &[InsertResult]) -> usize {
    outcomes.iter().filter(|o| o.is_inserted()).count()
}

/// The first `max_items` entries of a parsed feed, normalized.
///
/// `pub_dates` holds the `pubDate` text of each RSS item in document order.
/// It is only used when it lines up one to one with the feed entries.
pub fn extract_candidates(
    feed: Feed,
    pub_dates: &[Option<String>],
    max_items: usize,
    keywords: &KeywordMatcher,
) -> Vec<NewsCandidate> {
    let aligned = pub_dates.len() == feed.entries.len();
    if !aligned && !pub_dates.is_empty() {
        debug!(
            "{} pubDate values for {} entries, using parsed dates",
            pub_dates.len(),
            feed.entries.len()
        );
    }

    feed.entries
        .into_iter()
        .enumerate()
        .take(max_items)
        .filter_map(|(i, entry)| {
            let pub_date = if aligned { pub_dates[i].clone() } else { None };
            let raw = raw_item(entry, pub_date);
            let title = raw.title.clone().unwrap_or_default();
            let candidate = build_candidate(raw, keywords);
            if candidate.is_none() {
                warn!("Skipping entry without title or link: {}", title);
            }
            candidate
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// `pubDate` text of every RSS item, as written in the feed.
///
/// feed-rs only keeps the parsed timestamp. Anything that is not an RSS
/// document gives an empty list.
pub fn item_pub_dates(xml_bytes: &[u8]) -> Vec<Option<String>> {
    let xml = match std::str::from_utf8(xml_bytes) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    match quick_xml::de::from_str::<RssDocument>(xml) {
        Ok(doc) => doc
            .channel
            .items
            .into_iter()
            .map(|item| {
                item.pub_date
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
            })
            .collect(),
        Err(e) => {
            debug!("Could not read pubDate text: {}", e);
            Vec::new()
        }
    }
}

fn format_date(published: DateTime<Utc>) -> String {
    published.to_rfc2822()
}

/// Pull the fields we care about out of a feed-rs entry.
///
/// `pub_date` is the item's date text as written. The parsed timestamp is
/// only used without it.
pub fn raw_item(entry: Entry, pub_date: Option<String>) -> RawItem {
    let title = entry.title.map(|t| t.content);

    let link = entry.links.into_iter().next().map(|l| l.href);

    let date = pub_date.or_else(|| entry.published.or(entry.updated).map(format_date));

    // feed-rs names RSS <author> contacts "author" and keeps the text in email
    let author_section = entry
        .authors
        .into_iter()
        .filter_map(|p| {
            if p.name == "author" {
                p.email
            } else {
                Some(p.name)
            }
        })
        .map(|a| a.trim().to_string())
        .find(|a| !a.is_empty())
        .or_else(|| {
            entry
                .categories
                .into_iter()
                .map(|c| c.label.unwrap_or(c.term))
                .find(|c| !c.trim().is_empty())
        });

    let description = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body));

    RawItem {
        title,
        link,
        date,
        author_section,
        description,
    }
}
