//! Mundo Headlines - a headline reader for El Mundo's RSS feed
//!
//! This crate fetches the feed on demand, stores new headlines in SQLite
//! and serves a searchable listing page.

pub mod config;
pub mod db;
pub mod extractor;
pub mod ingestor;
pub mod query;
pub mod routes;
