//! # contract: the seams between the reconciliation engine and the outside world
//!
//! - [`Article`] is produced by the publishing pipeline and only ever borrowed here.
//! - [`DepositClient`] is the remote deposit service, one method per domain operation.
//! - [`AuthorResolver`] is the optional upstream `name -> id` lookup; the
//!   reconciliation engine never calls it.
//!
//! Both traits are annotated for `mockall` so tests can script the remote side
//! call by call, including ordering via `mockall::Sequence`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// One authored article as supplied by the publishing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub slug: String,
    pub title: String,
    /// Human-readable summary, sent as the record description.
    pub summary: String,
    /// Raw author list, comma separated, used for display and citations.
    #[serde(default)]
    pub authors: String,
    /// Remote author identifiers, already resolved, in citation order.
    #[serde(default)]
    pub author_ids: Vec<i64>,
    /// Path of the authored source the PDF was generated from.
    pub source_path: PathBuf,
}

impl Article {
    /// Individual author names from the raw list, trimmed, empties dropped.
    pub fn author_names(&self) -> Vec<String> {
        self.authors
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// True when the source file carries the expected extension (case-insensitive).
    pub fn has_source_kind(&self, extension: &str) -> bool {
        self.source_path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension.trim_start_matches('.')))
    }
}

/// Identifiers handed back by the service when a record is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRecord {
    pub remote_id: i64,
    /// DOI-like persistent identifier, e.g. `http://dx.doi.org/10.6084/m9.figshare.852126`.
    pub persistent_id: String,
}

/// Acknowledgment of a successful call; carries the raw success payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ack(pub serde_json::Value);

/// One author returned by an author search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorHit {
    pub id: i64,
    pub full_name: String,
}

/// Remote deposit service. Implementors own transport and signing; callers
/// never pass credentials.
///
/// No call is retried. A call that did not return `Ok` must be treated as
/// not having happened.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DepositClient: Send + Sync {
    /// Create a private record. Never returns a partial record: an error
    /// payload from the service is always an `Err`.
    async fn create_record(&self, title: &str, summary: &str)
        -> Result<CreatedRecord, ClientError>;

    async fn set_category(&self, remote_id: i64, category_id: i64) -> Result<Ack, ClientError>;

    async fn set_tag(&self, remote_id: i64, tag_name: &str) -> Result<Ack, ClientError>;

    /// Associate authors with the record in slice order.
    async fn attach_authors(&self, remote_id: i64, author_ids: &[i64])
        -> Result<Ack, ClientError>;

    /// Attach the binary as file content. Fails with `ClientError::MissingFile`
    /// before any network traffic when `file_path` does not exist.
    async fn upload_binary(&self, remote_id: i64, file_path: &Path) -> Result<Ack, ClientError>;

    async fn set_visibility_public(&self, remote_id: i64) -> Result<Ack, ClientError>;
}

/// Lookup and registration of authors by display name.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AuthorResolver: Send + Sync {
    async fn search_authors(&self, name: &str) -> Result<Vec<AuthorHit>, ClientError>;

    /// Register a new author and return its id.
    async fn create_author(&self, name: &str) -> Result<i64, ClientError>;
}
