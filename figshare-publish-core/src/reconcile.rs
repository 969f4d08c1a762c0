//! Reconciliation engine: bring one article to the published-and-recorded
//! state with the fewest remote calls.
//!
//! # States
//! ```text
//! NoRemoteRecord
//!   -> CreatedPendingMetadata      create_record succeeded
//!   -> MetadataSetPendingUpload    category, tag, authors set; sidecar saved with pending_upload = true
//!   -> PublishedAndRecorded        binary uploaded; sidecar saved with pending_upload = false
//! ```
//!
//! A sidecar on disk is authoritative: its presence alone means the remote
//! record exists and `create_record` is never called again for that artifact.
//! Only the upload phase is resumable. A failure while setting metadata leaves
//! no sidecar, so the next run creates a fresh record; the orphaned record on
//! the service is not cleaned up.
//!
//! With `make_public` enabled, a confirmed upload is recorded with
//! `pending_public = true` before the visibility call. A failed visibility
//! call is retried alone on the next run.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::citation::{self, CitationFields, CitationSettings};
use crate::contract::{Article, CreatedRecord, DepositClient};
use crate::error::PublishError;
use crate::sidecar::{self, SidecarState};

/// Everything the engine needs besides the client and the article.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub category_id: i64,
    pub tag: String,
    /// Extension an article's source must carry to be published (e.g. `rst`).
    pub source_extension: String,
    /// Make the record public right after the upload.
    pub make_public: bool,
    pub citation: CitationSettings,
}

/// Output directory layout: `<root>/pdf` holds PDFs and sidecars,
/// `<root>/bib` holds citations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub pdf_dir: PathBuf,
    pub bib_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn under(output_root: &Path) -> Self {
        Self {
            pdf_dir: output_root.join("pdf"),
            bib_dir: output_root.join("bib"),
        }
    }

    pub fn pdf_path(&self, slug: &str) -> PathBuf {
        self.pdf_dir.join(format!("{slug}.pdf"))
    }

    pub fn citation_path(&self, slug: &str, extension: &str) -> PathBuf {
        self.bib_dir
            .join(format!("{slug}.{}", extension.trim_start_matches('.')))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    NoRemoteRecord,
    CreatedPendingMetadata,
    MetadataSetPendingUpload,
    PublishedAndRecorded,
}

impl ReconcileState {
    /// State implied by what is on disk.
    pub fn from_sidecar(state: Option<&SidecarState>) -> Self {
        match state {
            None => ReconcileState::NoRemoteRecord,
            Some(s) if s.pending_upload => ReconcileState::MetadataSetPendingUpload,
            Some(_) => ReconcileState::PublishedAndRecorded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The article was not authored in the publishable source format.
    UnsupportedSource(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Published {
        /// State found on disk when the run started.
        resumed_from: ReconcileState,
        /// Sidecar content after the run.
        state: SidecarState,
        citation_path: PathBuf,
    },
    Skipped(SkipReason),
}

impl Outcome {
    /// True when this run created the remote record.
    pub fn created(&self) -> bool {
        matches!(
            self,
            Outcome::Published {
                resumed_from: ReconcileState::NoRemoteRecord,
                ..
            }
        )
    }

    /// True when this run uploaded the binary.
    pub fn uploaded(&self) -> bool {
        matches!(
            self,
            Outcome::Published {
                resumed_from: ReconcileState::NoRemoteRecord
                    | ReconcileState::MetadataSetPendingUpload,
                ..
            }
        )
    }
}

/// Reconcile one article against the remote service.
///
/// Returns `Err(PublishError::MissingArtifact)` without any remote call when
/// the PDF has not been generated. Remote errors propagate unchanged.
pub async fn reconcile<C>(
    client: &C,
    settings: &PublishSettings,
    article: &Article,
    layout: &ArtifactLayout,
) -> Result<Outcome, PublishError>
where
    C: DepositClient + ?Sized,
{
    let slug = article.slug.as_str();

    if !article.has_source_kind(&settings.source_extension) {
        debug!(
            slug,
            source = %article.source_path.display(),
            expected = %settings.source_extension,
            "[PUBLISH] Source kind not publishable, skipping"
        );
        return Ok(Outcome::Skipped(SkipReason::UnsupportedSource(
            article.source_path.clone(),
        )));
    }

    let artifact = layout.pdf_path(slug);
    if !artifact.is_file() {
        return Err(PublishError::MissingArtifact(artifact));
    }

    let sidecar_file = sidecar::sidecar_path(&artifact);
    let existing = sidecar::load(&sidecar_file)?;
    let resumed_from = ReconcileState::from_sidecar(existing.as_ref());
    info!(slug, state = ?resumed_from, "[PUBLISH] Reconciling article");

    let mut state = match existing {
        Some(state) => state,
        None => {
            let record = create_with_metadata(client, settings, article).await?;
            let state = SidecarState {
                remote_id: record.remote_id,
                persistent_id: record.persistent_id,
                pending_upload: true,
                pending_public: false,
            };
            sidecar::save(&sidecar_file, &state)?;
            info!(
                slug,
                remote_id = state.remote_id,
                state = ?ReconcileState::MetadataSetPendingUpload,
                "[PUBLISH] Metadata set, upload pending"
            );
            state
        }
    };

    if state.pending_upload {
        info!(slug, remote_id = state.remote_id, file = %artifact.display(), "[PUBLISH] Uploading PDF");
        client.upload_binary(state.remote_id, &artifact).await?;
        state.pending_upload = false;
        state.pending_public = settings.make_public;
        sidecar::save(&sidecar_file, &state)?;
        info!(slug, remote_id = state.remote_id, "[PUBLISH] Upload confirmed");
    }

    // Runs after the upload milestone is on disk, so a failure here never
    // causes the binary to be uploaded twice.
    if state.pending_public {
        client.set_visibility_public(state.remote_id).await?;
        state.pending_public = false;
        info!(slug, remote_id = state.remote_id, "[PUBLISH] Record made public");
    }

    sidecar::save(&sidecar_file, &state)?;

    let citation_path = write_citation(settings, article, &state, layout)?;

    info!(
        slug,
        remote_id = state.remote_id,
        persistent_id = %state.persistent_id,
        state = ?ReconcileState::PublishedAndRecorded,
        "[PUBLISH] Article published and recorded"
    );
    Ok(Outcome::Published {
        resumed_from,
        state,
        citation_path,
    })
}

/// Create the record and set category, tag and authors, in that order.
/// Any failure aborts; nothing is persisted here.
async fn create_with_metadata<C>(
    client: &C,
    settings: &PublishSettings,
    article: &Article,
) -> Result<CreatedRecord, PublishError>
where
    C: DepositClient + ?Sized,
{
    let slug = article.slug.as_str();

    let record = client.create_record(&article.title, &article.summary).await?;
    info!(
        slug,
        remote_id = record.remote_id,
        persistent_id = %record.persistent_id,
        state = ?ReconcileState::CreatedPendingMetadata,
        "[PUBLISH] Created remote record"
    );

    client
        .set_category(record.remote_id, settings.category_id)
        .await?;
    client.set_tag(record.remote_id, &settings.tag).await?;
    if !article.author_ids.is_empty() {
        client
            .attach_authors(record.remote_id, &article.author_ids)
            .await?;
    }
    debug!(slug, remote_id = record.remote_id, "[PUBLISH] Metadata set");

    Ok(record)
}

fn write_citation(
    settings: &PublishSettings,
    article: &Article,
    state: &SidecarState,
    layout: &ArtifactLayout,
) -> Result<PathBuf, PublishError> {
    let fields = CitationFields {
        authors: &article.authors,
        title: &article.title,
        doi: citation::strip_doi_prefix(&state.persistent_id),
        url: &state.persistent_id,
        tag: &settings.tag,
        slug: &article.slug,
    };
    let path = layout.citation_path(&article.slug, &settings.citation.extension);
    citation::write_citation(&path, &settings.citation.template.render(&fields))?;
    Ok(path)
}
