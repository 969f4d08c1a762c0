//! Sidecar state store: a small JSON file next to each PDF recording what the
//! remote service already knows about it.
//!
//! The store has a single writer per file and no locking. Saves go through a
//! temp file in the target directory and a rename, so a crash mid-write
//! leaves either the old or the new content.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::PublishError;

const SIDECAR_SUFFIX: &str = "-figshare.json";

/// Reconciliation progress for one artifact.
///
/// While `pending_upload` is true the binary has not been confirmed uploaded
/// for `remote_id`. `pending_public` is only set once the upload is confirmed,
/// and only written to disk while it is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarState {
    #[serde(rename = "article_id")]
    pub remote_id: i64,
    #[serde(alias = "doi")]
    pub persistent_id: String,
    #[serde(default)]
    pub pending_upload: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending_public: bool,
}

/// Sidecar location for an artifact: `paper.pdf` -> `paper-figshare.json`,
/// in the same directory.
pub fn sidecar_path(artifact: &Path) -> PathBuf {
    let stem = artifact
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    artifact.with_file_name(format!("{stem}{SIDECAR_SUFFIX}"))
}

/// Read the sidecar at `path`. A missing file is `Ok(None)`; a file that
/// exists but does not parse is `StateCorruption`.
pub fn load(path: &Path) -> Result<Option<SidecarState>, PublishError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No sidecar present");
            return Ok(None);
        }
        Err(source) => {
            return Err(PublishError::SidecarIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let state: SidecarState =
        serde_json::from_str(&raw).map_err(|source| PublishError::StateCorruption {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), ?state, "Loaded sidecar");
    Ok(Some(state))
}

/// Overwrite the sidecar at `path` with `state`.
pub fn save(path: &Path, state: &SidecarState) -> Result<(), PublishError> {
    let io_err = |source: io::Error| PublishError::SidecarIo {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let body = serde_json::to_string_pretty(state).map_err(|e| io_err(e.into()))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(body.as_bytes()).map_err(io_err)?;
    tmp.write_all(b"\n").map_err(io_err)?;
    tmp.as_file_mut().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    info!(
        path = %path.display(),
        remote_id = state.remote_id,
        pending_upload = state.pending_upload,
        pending_public = state.pending_public,
        "Saved sidecar"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_path_replaces_pdf_suffix() {
        let path = sidecar_path(Path::new("/out/pdf/my-paper.pdf"));
        assert_eq!(path, PathBuf::from("/out/pdf/my-paper-figshare.json"));
    }

    #[test]
    fn doi_key_is_accepted_as_persistent_id() {
        let state: SidecarState =
            serde_json::from_str(r#"{"article_id": 852126, "doi": "http://dx.doi.org/10.1/a"}"#)
                .unwrap();
        assert_eq!(state.remote_id, 852126);
        assert_eq!(state.persistent_id, "http://dx.doi.org/10.1/a");
        assert!(!state.pending_upload);
    }
}
