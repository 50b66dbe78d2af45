use sqlx::pool::PoolConnection;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, Sqlite, SqliteConnection, SqlitePool};

use crate::extractor::NewsCandidate;

#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct NewsRecord {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub date: Option<String>,
    pub author_section: Option<String>,
    pub detected_keyword: Option<String>,
}

/// Outcome of storing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    Inserted(NewsRecord),
    /// A record with the same link already exists and was left untouched
    DuplicateSkipped,
}

impl InsertResult {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertResult::Inserted(_))
    }
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                date TEXT,
                author_section TEXT,
                detected_keyword TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Check out a connection for the duration of one request.
    ///
    /// The connection goes back to the pool when the guard is dropped.
    pub async fn acquire(&self) -> anyhow::Result<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }
}

/// Insert a candidate unless its link is already stored.
pub async fn insert_news(
    conn: &mut SqliteConnection,
    candidate: &NewsCandidate,
) -> anyhow::Result<InsertResult> {
    let result = sqlx::query_as::<_, NewsRecord>(
        r#"
        INSERT INTO news (title, link, date, author_section, detected_keyword)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, title, link, date, author_section, detected_keyword
        "#,
    )
    .bind(&candidate.title)
    .bind(&candidate.link)
    .bind(&candidate.date)
    .bind(&candidate.author_section)
    .bind(&candidate.detected_keyword)
    .fetch_one(&mut *conn)
    .await;

    match result {
        Ok(record) => Ok(InsertResult::Inserted(record)),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Ok(InsertResult::DuplicateSkipped)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn count_news(conn: &mut SqliteConnection) -> anyhow::Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM news")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count.0)
}
