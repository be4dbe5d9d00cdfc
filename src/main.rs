use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod chat;
mod config;
mod favorites;
mod llm;
mod storage;
mod summary;

use catalog::{CatalogClient, Movie};
use chat::{ChatSession, SendOutcome};
use config::Config;
use favorites::FavoritesStore;
use llm::OpenAiCompatClient;
use storage::FileStore;
use summary::{
    now_ms, spawn_refresh, MovieSummaryState, SummaryCache, SummaryGenerator, SummaryService,
};

#[derive(Parser)]
#[command(name = "cinescout")]
#[command(author, version, about = "Cinescout - movie discovery with local favorites and AI summaries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the data directory (favorites and cached summaries)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List popular movies from the catalog
    Popular,

    /// Search the catalog (an empty query falls back to popular movies)
    Search {
        /// Free-text query
        query: Vec<String>,
    },

    /// Manage the local favorites list
    Fav {
        #[command(subcommand)]
        action: FavCommands,
    },

    /// Show an AI summary for the first movie matching the query
    Summary {
        /// Free-text query resolving the movie
        query: Vec<String>,
    },

    /// Chat with the movie assistant
    Chat {
        /// One-shot message (omit for an interactive session)
        message: Option<String>,
    },
}

#[derive(Subcommand)]
enum FavCommands {
    /// List favorites in insertion order
    List,

    /// Toggle the first movie matching the query
    Toggle {
        /// Free-text query resolving the movie
        query: Vec<String>,
    },

    /// Remove a favorite by its catalog id
    Remove { id: u64 },

    /// Remove all favorites
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "cinescout=debug"
    } else {
        "cinescout=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load()?;
    let store = open_store(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Popular => {
            let movies = catalog_client(&config)?.popular().await?;
            let favs = FavoritesStore::load(store);
            print_movies(&movies, &favs);
        }
        Commands::Search { query } => {
            let client = catalog_client(&config)?;
            let query = query.join(" ");
            let movies = if query.trim().is_empty() {
                client.popular().await?
            } else {
                client.search(&query).await?
            };
            let favs = FavoritesStore::load(store);
            print_movies(&movies, &favs);
        }
        Commands::Fav { action } => run_fav(action, &config, store).await?,
        Commands::Summary { query } => run_summary(&query.join(" "), &config, store).await?,
        Commands::Chat { message } => run_chat(message, &config).await?,
    }

    Ok(())
}

fn open_store(data_dir: Option<&std::path::Path>) -> Result<Arc<FileStore>> {
    let store = match data_dir {
        Some(dir) => FileStore::at(dir)?,
        None => FileStore::new()?,
    };
    Ok(Arc::new(store))
}

fn catalog_client(config: &Config) -> Result<CatalogClient> {
    let api_key = config.catalog.resolve_api_key().context(
        "No catalog API key; set catalog.api_key in config.toml or the TMDB_API_KEY environment variable",
    )?;
    Ok(CatalogClient::new(
        &config.catalog.base_url,
        api_key,
        config.http.timeout(),
    ))
}

fn llm_completer(config: &Config, model: &str) -> Result<Arc<OpenAiCompatClient>> {
    let api_key = config.llm.resolve_api_key().context(
        "No LLM API key; set llm.api_key in config.toml or the OPENROUTER_API_KEY environment variable",
    )?;
    let client = OpenAiCompatClient::new(
        &config.llm.endpoint,
        api_key,
        model,
        config.http.timeout(),
    )
    .with_max_tokens(config.llm.max_tokens)
    .with_header("X-Title", "cinescout");
    Ok(Arc::new(client))
}

fn print_movies(movies: &[Movie], favs: &FavoritesStore) {
    if movies.is_empty() {
        println!("No movies found.");
        return;
    }
    for movie in movies {
        let marker = if favs.is_favorite(movie.id) { "★" } else { " " };
        let year = movie.release_year().unwrap_or("----");
        println!("{} {:>8}  {}  ({})", marker, movie.id, movie.title, year);
    }
}

/// Resolve the first search hit for a query, or fail with a clear message.
async fn resolve_movie(query: &str, config: &Config) -> Result<Movie> {
    if query.trim().is_empty() {
        bail!("A search query is required");
    }
    let movies = catalog_client(config)?.search(query).await?;
    movies
        .into_iter()
        .next()
        .with_context(|| format!("No movie matched '{}'", query))
}

async fn run_fav(action: FavCommands, config: &Config, store: Arc<FileStore>) -> Result<()> {
    let mut favs = FavoritesStore::load(store);
    match action {
        FavCommands::List => {
            if favs.count() == 0 {
                println!("No favorites yet.");
            } else {
                for movie in favs.movies() {
                    let year = movie.release_year().unwrap_or("----");
                    println!("★ {:>8}  {}  ({})", movie.id, movie.title, year);
                }
                println!("{} favorite(s)", favs.count());
            }
        }
        FavCommands::Toggle { query } => {
            let movie = resolve_movie(&query.join(" "), config).await?;
            let title = movie.title.clone();
            if favs.toggle(movie)? {
                println!("Added '{}' to favorites.", title);
            } else {
                println!("Removed '{}' from favorites.", title);
            }
        }
        FavCommands::Remove { id } => {
            if favs.remove(id)? {
                println!("Removed favorite {}.", id);
            } else {
                println!("No favorite with id {}.", id);
            }
        }
        FavCommands::Clear => {
            favs.clear_all()?;
            println!("Favorites cleared.");
        }
    }
    Ok(())
}

async fn run_summary(query: &str, config: &Config, store: Arc<FileStore>) -> Result<()> {
    let movie = resolve_movie(query, config).await?;
    let completer = llm_completer(config, &config.llm.summary_model)?;
    let service = Arc::new(SummaryService::new(
        SummaryCache::new(store),
        SummaryGenerator::new(completer),
    ));

    let state = Arc::new(Mutex::new(MovieSummaryState::new(movie.id)));
    let needs_refresh = state
        .lock()
        .expect("summary state lock poisoned")
        .hydrate(service.cache(), now_ms());

    let cached = state
        .lock()
        .expect("summary state lock poisoned")
        .text()
        .map(str::to_string);

    match cached {
        Some(text) => {
            println!("{}  ({})", movie.title, movie.release_year().unwrap_or("----"));
            println!("{}", text);
            if needs_refresh {
                tracing::info!(movie_id = movie.id, "Cached summary is stale, refreshing");
                // Let the refresh finish before the process exits
                spawn_refresh(service, movie, state).await.ok();
            }
        }
        None => {
            state
                .lock()
                .expect("summary state lock poisoned")
                .begin_request();
            match service.generate_and_store(&movie).await {
                Ok(text) => {
                    println!("{}  ({})", movie.title, movie.release_year().unwrap_or("----"));
                    println!("{}", text);
                }
                Err(e) => {
                    println!("حدث خطأ أثناء الحصول على الملخص. حاول مرة أخرى بعد قليل.");
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

async fn run_chat(message: Option<String>, config: &Config) -> Result<()> {
    let completer = llm_completer(config, &config.llm.chat_model)?;
    let mut session = ChatSession::new();

    if let Some(message) = message {
        session.send_user_turn(completer.as_ref(), &message).await;
        println!("{}", session.last_assistant());
        return Ok(());
    }

    println!("{}", session.last_assistant());
    println!("(type 'exit' to leave)");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        match session.send_user_turn(completer.as_ref(), line).await {
            SendOutcome::Rejected(_) => continue,
            SendOutcome::Delivered | SendOutcome::Failed(_) => {
                println!("{}", session.last_assistant());
            }
        }
    }

    Ok(())
}
