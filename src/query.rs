//! Read side: filtered, newest-first listings.

use sqlx::SqliteConnection;

use crate::db::NewsRecord;

pub const MAX_NEWS: i64 = 10;

/// Optional listing filters. Blank values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsFilter {
    /// Substring matched against title, link, date or author/section
    pub search: Option<String>,
    /// Exact author/section
    pub author: Option<String>,
}

impl NewsFilter {
    pub fn new(search: Option<String>, author: Option<String>) -> Self {
        Self {
            search: clean(search),
            author: clean(author),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build a `LIKE` pattern that matches `text` literally anywhere in a column.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// TODO: the search also hits `link` and `date`, so a number like "2024" matches
// most URLs. Decide whether search should be limited to title and author.
pub async fn list_news(
    conn: &mut SqliteConnection,
    filter: &NewsFilter,
    limit: i64,
) -> anyhow::Result<Vec<NewsRecord>> {
    let search = filter.search.as_deref().map(like_pattern);

    let records = sqlx::query_as::<_, NewsRecord>(
        r#"
        SELECT id, title, link, date, author_section, detected_keyword
        FROM news
        WHERE (?1 IS NULL
               OR title LIKE ?1 ESCAPE '\'
               OR link LIKE ?1 ESCAPE '\'
               OR date LIKE ?1 ESCAPE '\'
               OR author_section LIKE ?1 ESCAPE '\')
          AND (?2 IS NULL OR author_section = ?2)
        ORDER BY id DESC
        LIMIT ?3
        "#,
    )
    .bind(search)
    .bind(filter.author.as_deref())
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(records)
}

/// Distinct, non-empty author/section values, alphabetically.
pub async fn list_distinct_authors(conn: &mut SqliteConnection) -> anyhow::Result<Vec<String>> {
    let authors: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT author_section
        FROM news
        WHERE author_section IS NOT NULL AND author_section != ''
        ORDER BY author_section
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(authors.into_iter().map(|(a,)| a).collect())
}
