use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use article_mirror::cache::ResponseCache;
use article_mirror::config::Config;
use article_mirror::db::Repository;
use article_mirror::error::Result;
use article_mirror::notion::NotionClient;
use article_mirror::reader::{ArticleReader, DEFAULT_PAGE_SIZE, DEFAULT_RELATED_LIMIT};
use article_mirror::scheduler::{sync_and_invalidate, Scheduler};
use article_mirror::sync::SyncEngine;

#[derive(Parser)]
#[command(name = "article-mirror", version, about = "Mirror published Notion articles into SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync changes since the last run (full sync when there is no previous run)
    Sync {
        /// Re-read the whole collection and remove articles no longer published
        #[arg(long)]
        full: bool,
    },
    /// Show the last sync watermark
    Status,
    /// Run incremental syncs on the configured interval until Ctrl-C
    Schedule,
    /// List published articles, newest first
    List {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Show one article by slug
    Show { slug: String },
    /// Full-text search over title, excerpt and why-it-matters
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Articles sharing a topic with the given one
    Related {
        slug: String,
        #[arg(long, default_value_t = DEFAULT_RELATED_LIMIT)]
        limit: usize,
    },
    /// List topics in use
    Topics {
        /// Show how many articles use each topic
        #[arg(long)]
        counts: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info and above unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let repository = Arc::new(Repository::new(&config.db_path).await?);
    let cache = Arc::new(ResponseCache::new(Duration::from_secs(
        u64::from(config.cache_ttl_minutes) * 60,
    )));
    let reader = Arc::new(ArticleReader::new(Arc::clone(&repository), cache));

    match cli.command {
        Command::Sync { full } => {
            let engine = build_engine(&config, Arc::clone(&repository))?;
            let report = sync_and_invalidate(&engine, &reader, full).await;
            print_json(&report)?;
            if !report.success {
                std::process::exit(1);
            }
        }
        Command::Status => print_json(&repository.sync_status().await?)?,
        Command::Schedule => {
            let engine = Arc::new(build_engine(&config, Arc::clone(&repository))?);
            let interval = Duration::from_secs(u64::from(config.sync_interval_minutes.max(1)) * 60);
            tracing::info!("Syncing every {} minutes", interval.as_secs() / 60);

            let scheduler = Scheduler::new(engine, reader, interval);
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    }
                })
                .await;
        }
        Command::List {
            topic,
            page_size,
            cursor,
        } => {
            let page = reader
                .published_articles(topic.as_deref(), page_size, cursor.as_deref())
                .await?;
            print_json(&page)?;
        }
        Command::Show { slug } => match reader.article_by_slug(&slug).await? {
            Some(article) => print_json(&article)?,
            None => {
                eprintln!("No published article with slug {:?}", slug);
                std::process::exit(1);
            }
        },
        Command::Search {
            query,
            page_size,
            offset,
        } => {
            let results = reader.search(&query, page_size, offset).await?;
            print_json(&results)?;
        }
        Command::Related { slug, limit } => {
            let articles = reader.related(&slug, limit).await?;
            print_json(&articles)?;
        }
        Command::Topics { counts } => {
            if counts {
                print_json(&reader.topic_counts().await?)?;
            } else {
                print_json(&reader.all_topics().await?)?;
            }
        }
    }

    Ok(())
}

fn build_engine(config: &Config, repository: Arc<Repository>) -> Result<SyncEngine<NotionClient>> {
    let client = NotionClient::from_config(config)?;
    Ok(SyncEngine::new(client, repository, config.database_id()?))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
