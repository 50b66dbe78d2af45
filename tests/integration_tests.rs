//! Integration tests for the mundo-headlines reader
//!
//! These tests verify the full workflow from configuration loading
//! through ingestion, storage and the listing queries.

use std::io::Write;
use tempfile::NamedTempFile;

mod common {
    use tempfile::TempDir;

    /// Create a temporary directory for test databases
    pub fn create_temp_dir() -> TempDir {
        tempfile::tempdir().expect("Failed to create temp directory")
    }

    /// Create a test database path
    pub fn create_db_path(temp_dir: &TempDir) -> String {
        let db_path = temp_dir.path().join("test.db");
        format!("sqlite:{}?mode=rwc", db_path.display())
    }

    pub fn rss(items: &[(&str, &str, Option<&str>)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, author)| {
                let author = author
                    .map(|a| format!("<author>{}</author>", a))
                    .unwrap_or_default();
                format!(
                    "<item><title>{}</title><link>{}</link>{}</item>",
                    title, link, author
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <rss version="2.0"><channel><title>El Mundo</title>{}</channel></rss>"#,
            body
        )
    }
}

#[cfg(test)]
mod config_integration_tests {
    use super::*;
    use mundo_headlines::config::Config;

    #[test]
    fn test_load_actual_headlines_config() {
        let config = Config::load("headlines.toml");
        assert!(config.is_ok(), "Failed to load headlines.toml: {:?}", config.err());

        let config = config.unwrap();
        assert!(config.feed_url.starts_with("https://"));
        assert!(config.max_items > 0, "max_items should be positive");
        assert_eq!(config.keywords, vec!["Ayuntamiento".to_string()]);
    }

    #[test]
    fn test_config_file_overrides() {
        let toml_content = r#"
            feed_url = "https://example.com/rss.xml"
            max_items = 3
            keywords = ["Ayuntamiento", "Gobierno"]
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.feed_url, "https://example.com/rss.xml");
        assert_eq!(config.max_items, 3);
        assert_eq!(config.max_news, 10);
        assert_eq!(config.keywords.len(), 2);
    }
}

#[cfg(test)]
mod database_integration_tests {
    use super::common::*;
    use mundo_headlines::db::{count_news, insert_news, Database, InsertResult};
    use mundo_headlines::extractor::NewsCandidate;
    use mundo_headlines::query::{list_news, NewsFilter};

    fn candidate(i: usize) -> NewsCandidate {
        NewsCandidate {
            title: format!("Titular {}", i),
            link: format!("https://www.elmundo.es/{}.html", i),
            date: None,
            author_section: None,
            detected_keyword: None,
        }
    }

    #[tokio::test]
    async fn test_database_persistence() {
        let temp_dir = create_temp_dir();
        let db_url = create_db_path(&temp_dir);

        {
            let db = Database::new(&db_url).await.unwrap();
            db.initialize().await.unwrap();
            let mut conn = db.acquire().await.unwrap();
            insert_news(&mut conn, &candidate(1)).await.unwrap();
        }

        // Reopen and verify the record and the uniqueness constraint survived
        {
            let db = Database::new(&db_url).await.unwrap();
            db.initialize().await.unwrap();
            let mut conn = db.acquire().await.unwrap();

            assert_eq!(count_news(&mut conn).await.unwrap(), 1);
            let again = insert_news(&mut conn, &candidate(1)).await.unwrap();
            assert_eq!(again, InsertResult::DuplicateSkipped);

            let records = list_news(&mut conn, &NewsFilter::default(), 10)
                .await
                .unwrap();
            assert_eq!(records[0].title, "Titular 1");
        }
    }

    #[tokio::test]
    async fn test_links_stay_unique() {
        let temp_dir = create_temp_dir();
        let db_url = create_db_path(&temp_dir);

        let db = Database::new(&db_url).await.unwrap();
        db.initialize().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        for _ in 0..3 {
            for i in 1..=10 {
                insert_news(&mut conn, &candidate(i)).await.unwrap();
            }
        }

        assert_eq!(count_news(&mut conn).await.unwrap(), 10);

        let records = list_news(&mut conn, &NewsFilter::default(), 100)
            .await
            .unwrap();
        let mut links: Vec<_> = records.iter().map(|r| r.link.clone()).collect();
        links.sort();
        links.dedup();
        assert_eq!(links.len(), 10);
    }
}

#[cfg(test)]
mod end_to_end_tests {
    use super::common::*;
    use mundo_headlines::config::Config;
    use mundo_headlines::db::{count_news, insert_news, Database};
    use mundo_headlines::extractor::NewsCandidate;
    use mundo_headlines::ingestor::Ingestor;
    use mundo_headlines::query::{list_distinct_authors, list_news, NewsFilter, MAX_NEWS};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve_feed(body: String) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/elmundo/rss/portada.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    fn ingestor_for(server: &MockServer) -> Ingestor {
        let config = Config {
            feed_url: format!("{}/elmundo/rss/portada.xml", server.uri()),
            ..Config::default()
        };
        Ingestor::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_in_feed_counts_two_of_three() {
        let temp_dir = create_temp_dir();
        let db = Database::new(&create_db_path(&temp_dir)).await.unwrap();
        db.initialize().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let existing = NewsCandidate {
            title: "Ya publicada".to_string(),
            link: "https://www.elmundo.es/b.html".to_string(),
            date: None,
            author_section: None,
            detected_keyword: None,
        };
        insert_news(&mut conn, &existing).await.unwrap();
        let before = count_news(&mut conn).await.unwrap();

        let server = serve_feed(rss(&[
            ("Primera", "https://www.elmundo.es/a.html", None),
            ("Segunda", "https://www.elmundo.es/b.html", None),
            ("Tercera", "https://www.elmundo.es/c.html", None),
        ]))
        .await;

        let inserted = ingestor_for(&server)
            .run_ingestion(&mut conn, 10)
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(count_news(&mut conn).await.unwrap(), before + 2);
    }

    #[tokio::test]
    async fn test_ingest_then_query_workflow() {
        let temp_dir = create_temp_dir();
        let db = Database::new(&create_db_path(&temp_dir)).await.unwrap();
        db.initialize().await.unwrap();

        let server = serve_feed(rss(&[
            (
                "El Ayuntamiento de Madrid &amp;amp; la EMT",
                "https://www.elmundo.es/madrid/1.html",
                Some("Madrid"),
            ),
            ("Debate en el Senado", "https://www.elmundo.es/espana/2.html", Some("España")),
            ("Gana el Real Madrid", "https://www.elmundo.es/deportes/3.html", None),
        ]))
        .await;
        let ingestor = ingestor_for(&server);

        // Each step gets its own connection, as a request would
        {
            let mut conn = db.acquire().await.unwrap();
            assert_eq!(ingestor.run_ingestion(&mut conn, 10).await.unwrap(), 3);
        }
        {
            let mut conn = db.acquire().await.unwrap();
            assert_eq!(ingestor.run_ingestion(&mut conn, 10).await.unwrap(), 0);
        }

        let mut conn = db.acquire().await.unwrap();

        let all = list_news(&mut conn, &NewsFilter::default(), MAX_NEWS)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title, "Gana el Real Madrid");
        assert_eq!(all[2].title, "El Ayuntamiento de Madrid & la EMT");
        assert_eq!(all[2].detected_keyword.as_deref(), Some("Ayuntamiento"));
        assert_eq!(all[1].detected_keyword, None);

        let madrid = list_news(
            &mut conn,
            &NewsFilter::new(None, Some("Madrid".to_string())),
            MAX_NEWS,
        )
        .await
        .unwrap();
        assert_eq!(madrid.len(), 1);

        let authors = list_distinct_authors(&mut conn).await.unwrap();
        assert_eq!(authors, vec!["España".to_string(), "Madrid".to_string()]);
    }

    #[tokio::test]
    async fn test_max_items_bounds_insertions() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.initialize().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let items: Vec<(String, String)> = (1..=15)
            .map(|i| {
                (
                    format!("Titular {}", i),
                    format!("https://www.elmundo.es/{}.html", i),
                )
            })
            .collect();
        let refs: Vec<(&str, &str, Option<&str>)> = items
            .iter()
            .map(|(t, l)| (t.as_str(), l.as_str(), None))
            .collect();
        let server = serve_feed(rss(&refs)).await;

        let inserted = ingestor_for(&server)
            .run_ingestion(&mut conn, 10)
            .await
            .unwrap();
        assert_eq!(inserted, 10);

        let records = list_news(&mut conn, &NewsFilter::default(), MAX_NEWS)
            .await
            .unwrap();
        assert_eq!(records[0].title, "Titular 10");
    }
}
