//! Batch driver: reconcile every article the publishing pipeline knows about.
//!
//! # Responsibilities
//! - Prepare the `pdf/` and `bib/` output directories (failure aborts the batch)
//! - Optionally resolve author names to ids before reconciliation
//! - Reconcile articles strictly one after another, in the given order
//! - Isolate failures: one article's error is logged and the next article still runs
//!
//! The returned [`PublishReport`] is the only record of per-article results
//! besides the log.

use std::fs;
use std::path::Path;

use tracing::{error, info};

use crate::authors::resolve_author_ids;
use crate::contract::{Article, AuthorResolver, DepositClient};
use crate::error::{BatchError, PublishError};
use crate::reconcile::{reconcile, ArtifactLayout, Outcome, PublishSettings, SkipReason};
use crate::sidecar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleStatus {
    Published {
        remote_id: i64,
        persistent_id: String,
        created: bool,
        uploaded: bool,
    },
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleReport {
    pub slug: String,
    pub status: ArticleStatus,
}

#[derive(Debug, Default)]
pub struct PublishReport {
    pub articles: Vec<ArticleReport>,
}

impl PublishReport {
    pub fn published(&self) -> usize {
        self.count(|s| matches!(s, ArticleStatus::Published { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ArticleStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ArticleStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&ArticleStatus) -> bool) -> usize {
        self.articles.iter().filter(|a| pred(&a.status)).count()
    }
}

/// Create the output layout beneath `output_root`. Existing directories are fine.
pub fn prepare_layout(output_root: &Path) -> Result<ArtifactLayout, BatchError> {
    let layout = ArtifactLayout::under(output_root);
    for dir in [&layout.pdf_dir, &layout.bib_dir] {
        fs::create_dir_all(dir).map_err(|source| BatchError::OutputDir {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(layout)
}

/// Publish all `articles`. `resolver`, when given, fills in author ids for
/// articles that carry names but no pre-resolved ids.
pub async fn publish_all<C, R>(
    client: &C,
    resolver: Option<&R>,
    settings: &PublishSettings,
    articles: &[Article],
    output_root: &Path,
) -> Result<PublishReport, BatchError>
where
    C: DepositClient + ?Sized,
    R: AuthorResolver + ?Sized,
{
    let layout = prepare_layout(output_root)?;
    info!(
        articles = articles.len(),
        pdf_dir = %layout.pdf_dir.display(),
        "[PUBLISH] Uploading PDF files to Figshare"
    );

    let mut report = PublishReport::default();
    for article in articles {
        let status = match publish_one(client, resolver, settings, article, &layout).await {
            Ok(outcome) => status_of(&outcome),
            Err(PublishError::MissingArtifact(path)) => {
                error!(slug = %article.slug, path = %path.display(), "[PUBLISH][ERROR] Missing PDF file");
                ArticleStatus::Skipped(format!("missing PDF file: {}", path.display()))
            }
            Err(e) => {
                let payload = match &e {
                    PublishError::Remote(remote) => remote.payload().cloned(),
                    _ => None,
                };
                error!(
                    slug = %article.slug,
                    artifact = %layout.pdf_path(&article.slug).display(),
                    error = %e,
                    ?payload,
                    "[PUBLISH][ERROR] Article failed, continuing with next"
                );
                ArticleStatus::Failed(e.to_string())
            }
        };
        report.articles.push(ArticleReport {
            slug: article.slug.clone(),
            status,
        });
    }

    info!(
        published = report.published(),
        skipped = report.skipped(),
        failed = report.failed(),
        "[PUBLISH] Batch complete"
    );
    Ok(report)
}

async fn publish_one<C, R>(
    client: &C,
    resolver: Option<&R>,
    settings: &PublishSettings,
    article: &Article,
    layout: &ArtifactLayout,
) -> Result<Outcome, PublishError>
where
    C: DepositClient + ?Sized,
    R: AuthorResolver + ?Sized,
{
    match resolver {
        Some(resolver) if needs_author_ids(settings, article, layout) => {
            let mut resolved = article.clone();
            resolved.author_ids = resolve_author_ids(resolver, &article.authors).await?;
            info!(slug = %article.slug, author_ids = ?resolved.author_ids, "[PUBLISH] Resolved author names");
            reconcile(client, settings, &resolved, layout).await
        }
        _ => reconcile(client, settings, article, layout).await,
    }
}

/// Author names only need resolving when this run is about to create the
/// remote record: names but no ids, a publishable artifact, and no sidecar.
fn needs_author_ids(settings: &PublishSettings, article: &Article, layout: &ArtifactLayout) -> bool {
    if !article.author_ids.is_empty() || article.author_names().is_empty() {
        return false;
    }
    let artifact = layout.pdf_path(&article.slug);
    article.has_source_kind(&settings.source_extension)
        && artifact.is_file()
        && matches!(sidecar::load(&sidecar::sidecar_path(&artifact)), Ok(None))
}

fn status_of(outcome: &Outcome) -> ArticleStatus {
    match outcome {
        Outcome::Published { state, .. } => ArticleStatus::Published {
            remote_id: state.remote_id,
            persistent_id: state.persistent_id.clone(),
            created: outcome.created(),
            uploaded: outcome.uploaded(),
        },
        Outcome::Skipped(SkipReason::UnsupportedSource(path)) => {
            ArticleStatus::Skipped(format!("unsupported source: {}", path.display()))
        }
    }
}
