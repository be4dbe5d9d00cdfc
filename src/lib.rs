//! cinescout: movie discovery with local favorites and AI summaries
//!
//! This library provides:
//! - A favorites store persisted through a file-backed key-value adapter
//! - A per-movie AI summary cache with a 24-hour staleness policy
//! - A movie catalog client (popular + search) for TMDB-compatible APIs
//! - A chat assistant flow over any OpenAI-compatible completion endpoint

pub mod catalog;
pub mod chat;
pub mod config;
pub mod favorites;
pub mod llm;
pub mod storage;
pub mod summary;

pub use catalog::{CatalogClient, CatalogError, Movie};
pub use chat::{ChatSession, SendOutcome};
pub use config::Config;
pub use favorites::FavoritesStore;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use summary::{SummaryCache, SummaryGenerator, SummaryService};
