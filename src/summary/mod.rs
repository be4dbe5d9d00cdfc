//! AI movie summaries: cache, generator, and per-card state
//!
//! Summaries are generated by the LLM once per movie and cached in the
//! key-value store under `summary_{movie_id}` as `{ text, timestamp }`.
//! Entries older than 24 hours are eligible for a silent background
//! regeneration; they are overwritten on success, never deleted (the store
//! has no eviction, a carried-over limitation of the source data model).

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::catalog::Movie;
use crate::llm::{ChatCompleter, ChatMessage, LlmError};
use crate::storage::KeyValueStore;

/// Cached summaries become eligible for background refresh after 24 hours.
/// The boundary is exclusive: an entry aged exactly 24h is not yet stale.
pub const STALE_AFTER_MS: i64 = 24 * 60 * 60 * 1000;

/// Model output shorter than this is treated as degenerate and rejected.
/// Counted in chars, not bytes; summaries are Arabic text.
pub const MIN_SUMMARY_CHARS: usize = 15;

/// Current wall-clock time as milliseconds since the epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn summary_key(movie_id: u64) -> String {
    format!("summary_{}", movie_id)
}

/// Summary generation errors
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The LLM call itself failed (HTTP, network, malformed response)
    #[error("Summary delivery failed: {0}")]
    Delivery(#[from] LlmError),

    /// Model output was below the plausibility floor
    #[error("Summary implausibly short ({len} chars, need {MIN_SUMMARY_CHARS})")]
    TooShort { len: usize },
}

/// One cached summary, keyed by movie id in the store.
///
/// `timestamp` is milliseconds since the epoch at generation time; the wire
/// layout (`{ text, timestamp }`) is what earlier deployments persisted, so
/// it must not change shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryCacheEntry {
    pub text: String,
    pub timestamp: i64,
}

/// Per-movie summary cache over the key-value store.
#[derive(Clone)]
pub struct SummaryCache {
    store: Arc<dyn KeyValueStore>,
}

impl SummaryCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Look up the cached entry for a movie. Read or parse failures are
    /// logged and reported as a miss.
    pub fn read(&self, movie_id: u64) -> Option<SummaryCacheEntry> {
        let raw = match self.store.get(&summary_key(movie_id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(movie_id, "Failed to read cached summary: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(movie_id, "Corrupt cached summary, treating as absent: {}", e);
                None
            }
        }
    }

    /// Whether `entry` is past the staleness threshold at time `now_ms`.
    /// Exclusive boundary: exactly [`STALE_AFTER_MS`] old is not stale.
    pub fn is_stale(entry: &SummaryCacheEntry, now_ms: i64) -> bool {
        now_ms - entry.timestamp > STALE_AFTER_MS
    }

    /// Upsert the entry for a movie and persist immediately.
    pub fn write(&self, movie_id: u64, text: &str, now_ms: i64) -> anyhow::Result<()> {
        let entry = SummaryCacheEntry {
            text: text.to_string(),
            timestamp: now_ms,
        };
        let raw = serde_json::to_string(&entry)?;
        self.store.set(&summary_key(movie_id), &raw)
    }
}

/// Generates one summary per call via the LLM.
pub struct SummaryGenerator {
    completer: Arc<dyn ChatCompleter>,
}

impl SummaryGenerator {
    pub fn new(completer: Arc<dyn ChatCompleter>) -> Self {
        Self { completer }
    }

    /// Ask the model for a short film-critic blurb about `movie`.
    ///
    /// Output is trimmed; anything under [`MIN_SUMMARY_CHARS`] chars fails
    /// as degenerate rather than being shown to the user.
    pub async fn generate(&self, movie: &Movie) -> Result<String, GenerationError> {
        let prompt = build_prompt(movie);
        let reply = self
            .completer
            .complete(&[ChatMessage::user(prompt)])
            .await?;
        let text = reply.trim();
        let len = text.chars().count();
        if len < MIN_SUMMARY_CHARS {
            return Err(GenerationError::TooShort { len });
        }
        Ok(text.to_string())
    }
}

fn build_prompt(movie: &Movie) -> String {
    let year_part = movie
        .release_year()
        .map(|y| format!(" ({})", y))
        .unwrap_or_default();
    format!(
        "اكتب نبذة جذابة وملهمة عن فيلم \"{}\"{}.\n\
         اجعلها قصيرة (3-4 جمل)، بأسلوب ناقد سينمائي محترف، بالعربية الفصحى الراقية.",
        movie.title, year_part
    )
}

/// Per-card view state for one movie's summary.
///
/// Replaces the hover-latch of the source UI with explicit state: a
/// `pending` flag enforcing at most one in-flight generation per card, and a
/// `live` flag that drops late background results after teardown.
pub struct MovieSummaryState {
    movie_id: u64,
    text: Option<String>,
    error: Option<String>,
    pending: bool,
    live: bool,
}

impl MovieSummaryState {
    pub fn new(movie_id: u64) -> Self {
        Self {
            movie_id,
            text: None,
            error: None,
            pending: false,
            live: true,
        }
    }

    /// Load any cached summary. Returns true when a background refresh is
    /// warranted (an entry exists and is past the staleness threshold).
    pub fn hydrate(&mut self, cache: &SummaryCache, now_ms: i64) -> bool {
        match cache.read(self.movie_id) {
            Some(entry) => {
                let stale = SummaryCache::is_stale(&entry, now_ms);
                self.text = Some(entry.text);
                stale
            }
            None => false,
        }
    }

    /// Single-flight latch: returns false if a generation is already
    /// outstanding for this card.
    pub fn begin_request(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        self.error = None;
        true
    }

    pub fn apply_success(&mut self, text: String) {
        self.pending = false;
        self.error = None;
        self.text = Some(text);
    }

    pub fn apply_failure(&mut self, message: String) {
        self.pending = false;
        self.error = Some(message);
    }

    /// Mark the card torn down; late background results are dropped.
    pub fn detach(&mut self) {
        self.live = false;
    }

    pub fn movie_id(&self) -> u64 {
        self.movie_id
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Cache + generator composed into the policy callers use.
pub struct SummaryService {
    cache: SummaryCache,
    generator: SummaryGenerator,
}

impl SummaryService {
    pub fn new(cache: SummaryCache, generator: SummaryGenerator) -> Self {
        Self { cache, generator }
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    /// Cached text for `movie`, with a flag saying whether it is stale.
    pub fn cached(&self, movie_id: u64, now_ms: i64) -> Option<(String, bool)> {
        self.cache
            .read(movie_id)
            .map(|entry| (entry.text.clone(), SummaryCache::is_stale(&entry, now_ms)))
    }

    /// Generate a fresh summary and persist it with the call's timestamp.
    pub async fn generate_and_store(&self, movie: &Movie) -> Result<String, GenerationError> {
        let text = self.generator.generate(movie).await?;
        if let Err(e) = self.cache.write(movie.id, &text, now_ms()) {
            tracing::warn!(movie_id = movie.id, "Failed to persist summary: {}", e);
        }
        Ok(text)
    }
}

/// Fire a detached background refresh for a stale entry.
///
/// Failures are swallowed (the stale summary stays on screen); a successful
/// result is applied only if the card is still live and for the same movie,
/// so a superseded card cannot receive a stale write.
pub fn spawn_refresh(
    service: Arc<SummaryService>,
    movie: Movie,
    state: Arc<Mutex<MovieSummaryState>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match service.generate_and_store(&movie).await {
            Ok(text) => apply_refreshed(&state, &movie, text),
            Err(e) => {
                tracing::debug!(movie_id = movie.id, "Background refresh failed: {}", e);
            }
        }
    })
}

fn apply_refreshed(state: &Mutex<MovieSummaryState>, movie: &Movie, text: String) {
    let mut state = state.lock().expect("summary state lock poisoned");
    if state.is_live() && state.movie_id() == movie.id {
        state.apply_success(text);
    }
}
