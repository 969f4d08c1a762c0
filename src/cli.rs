//! CLI glue for figshare-publish: command parsing and the async [`run`]
//! entrypoint used by `main` and by integration tests.
//!
//! All reconciliation logic lives in `figshare-publish-core`; this module
//! only wires configuration, the HTTP client and the batch driver together.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use figshare_publish_core::batch::{publish_all, ArticleStatus, PublishReport};
use figshare_publish_core::contract::AuthorResolver;
use figshare_publish_core::reconcile::ArtifactLayout;
use figshare_publish_core::sidecar;

use crate::load_config::{credentials_from_env, load_articles, load_config};
use crate::upload::FigshareClient;

/// CLI for figshare-publish: deposit generated article PDFs on Figshare.
#[derive(Parser)]
#[clap(
    name = "figshare-publish",
    version,
    about = "Publish generated article PDFs to Figshare and write citation records"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, update or skip the Figshare record of every article
    Publish {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Path to the YAML article manifest
        #[clap(long)]
        articles: PathBuf,
    },
    /// Show the recorded Figshare state of every article without contacting Figshare
    Status {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Path to the YAML article manifest
        #[clap(long)]
        articles: PathBuf,
    },
}

/// Async CLI entrypoint. Individual article failures do not make this fail;
/// configuration and output directory problems do.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Publish { config, articles } => publish(&config, &articles).await,
        Commands::Status { config, articles } => status(&config, &articles),
    }
}

async fn publish(config_path: &Path, articles_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let articles = load_articles(articles_path)?;
    let credentials = credentials_from_env()?;
    tracing::info!(command = "publish", articles = articles.len(), "Starting publish run");

    let client = FigshareClient::new(config.client_config(credentials));
    let resolver: Option<&dyn AuthorResolver> = if config.figshare.resolve_author_names {
        Some(&client)
    } else {
        None
    };

    let report = publish_all(
        &client,
        resolver,
        &config.publish,
        &articles,
        &config.output_dir,
    )
    .await
    .map_err(|e| {
        tracing::error!(command = "publish", error = %e, "Publish run aborted");
        anyhow::Error::new(e)
    })?;

    print_report(&report);
    tracing::info!(
        command = "publish",
        published = report.published(),
        skipped = report.skipped(),
        failed = report.failed(),
        "Publish run complete"
    );
    Ok(())
}

fn print_report(report: &PublishReport) {
    for article in &report.articles {
        match &article.status {
            ArticleStatus::Published {
                remote_id,
                persistent_id,
                created,
                uploaded,
            } => {
                let action = match (created, uploaded) {
                    (true, _) => "created",
                    (false, true) => "uploaded",
                    (false, false) => "unchanged",
                };
                println!("{}: {action} (article {remote_id}, {persistent_id})", article.slug);
            }
            ArticleStatus::Skipped(reason) => println!("{}: skipped, {reason}", article.slug),
            ArticleStatus::Failed(reason) => println!("{}: FAILED, {reason}", article.slug),
        }
    }
    println!(
        "Published {}, skipped {}, failed {}.",
        report.published(),
        report.skipped(),
        report.failed()
    );
}

fn status(config_path: &Path, articles_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let articles = load_articles(articles_path)?;
    let layout = ArtifactLayout::under(&config.output_dir);

    for article in &articles {
        let sidecar_file = sidecar::sidecar_path(&layout.pdf_path(&article.slug));
        let line = match sidecar::load(&sidecar_file) {
            Ok(None) => "unpublished".to_string(),
            Ok(Some(state)) if state.pending_upload => {
                format!("pending upload (article {})", state.remote_id)
            }
            Ok(Some(state)) if state.pending_public => format!(
                "uploaded {}, not yet public (article {})",
                state.persistent_id, state.remote_id
            ),
            Ok(Some(state)) => format!(
                "published {} (article {})",
                state.persistent_id, state.remote_id
            ),
            Err(e) => {
                tracing::error!(slug = %article.slug, error = %e, "Unreadable sidecar");
                format!("error: {e}")
            }
        };
        println!("{}: {line}", article.slug);
    }
    Ok(())
}
