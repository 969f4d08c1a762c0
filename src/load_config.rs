//! `load_config` module: loads the static YAML configuration and the article
//! manifest, and injects signing secrets from the environment.
//!
//! # Responsibilities
//! - Parse user-supplied YAML into typed sections, applying defaults
//! - Turn the citation template string into a parsed template, failing early on unknown fields
//! - Read the four OAuth secrets from environment variables; YAML never holds secrets
//!
//! # Errors
//! All errors use `anyhow::Error` with context and surface at the CLI boundary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figshare_publish_core::citation::{CitationSettings, CitationTemplate};
use figshare_publish_core::contract::Article;
use figshare_publish_core::reconcile::PublishSettings;
use serde::Deserialize;
use tracing::{error, info};

use crate::oauth::Credentials;
use crate::upload::{ClientConfig, DEFAULT_BASE_URL};

pub const ENV_CLIENT_KEY: &str = "FIGSHARE_CLIENT_KEY";
pub const ENV_CLIENT_SECRET: &str = "FIGSHARE_CLIENT_SECRET";
pub const ENV_TOKEN_KEY: &str = "FIGSHARE_TOKEN_KEY";
pub const ENV_TOKEN_SECRET: &str = "FIGSHARE_TOKEN_SECRET";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FigshareSection {
    pub base_url: String,
    /// Default: 77, applied computer science.
    pub category_id: i64,
    pub tag: String,
    pub defined_type: String,
    pub make_public: bool,
    pub resolve_author_names: bool,
}

impl Default for FigshareSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            category_id: 77,
            tag: "proceedings".to_string(),
            defined_type: "dataset".to_string(),
            make_public: false,
            resolve_author_names: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CitationSection {
    pub template: String,
    #[serde(default = "default_citation_extension")]
    pub extension: String,
}

fn default_citation_extension() -> String {
    "bib".to_string()
}

fn default_source_extension() -> String {
    "rst".to_string()
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    output_dir: PathBuf,
    #[serde(default)]
    figshare: FigshareSection,
    #[serde(default = "default_source_extension")]
    source_extension: String,
    citation: CitationSection,
}

/// Configuration as used by the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub output_dir: PathBuf,
    pub figshare: FigshareSection,
    pub publish: PublishSettings,
}

impl CliConfig {
    pub fn client_config(&self, credentials: Credentials) -> ClientConfig {
        ClientConfig {
            base_url: self.figshare.base_url.clone(),
            defined_type: self.figshare.defined_type.clone(),
            credentials,
        }
    }
}

fn read_file(kind: &str, path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            info!(path = ?path, kind, "File read successfully");
            Ok(content)
        }
        Err(e) => {
            error!(error = ?e, path = ?path, kind, "Failed to read file");
            Err(anyhow::anyhow!("Failed to read {kind} file {:?}: {}", path, e))
        }
    }
}

/// Loads the static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");
    let content = read_file("config", path_ref)?;

    let raw: RawConfig = match serde_yaml::from_str(&content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let template = CitationTemplate::parse(&raw.citation.template)
        .context("Invalid citation template in config")?;

    let publish = PublishSettings {
        category_id: raw.figshare.category_id,
        tag: raw.figshare.tag.clone(),
        source_extension: raw.source_extension,
        make_public: raw.figshare.make_public,
        citation: CitationSettings {
            template,
            extension: raw.citation.extension,
        },
    };

    info!(
        output_dir = %raw.output_dir.display(),
        base_url = %raw.figshare.base_url,
        category_id = publish.category_id,
        tag = %publish.tag,
        "Config loaded"
    );

    Ok(CliConfig {
        output_dir: raw.output_dir,
        figshare: raw.figshare,
        publish,
    })
}

/// Loads the article manifest: a YAML list of articles in publishing order.
pub fn load_articles<P: AsRef<Path>>(path: P) -> Result<Vec<Article>> {
    let path_ref = path.as_ref();
    let content = read_file("articles", path_ref)?;
    if content.trim().is_empty() {
        info!(path = ?path_ref, "Article manifest is empty");
        return Ok(Vec::new());
    }
    let articles: Vec<Article> = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, path = ?path_ref, "Failed to parse articles YAML");
        anyhow::anyhow!("Failed to parse articles YAML: {e}")
    })?;
    info!(count = articles.len(), "Articles loaded");
    Ok(articles)
}

/// Reads the OAuth credential from the environment.
pub fn credentials_from_env() -> Result<Credentials> {
    let var = |name: &str| {
        std::env::var(name).map_err(|e| {
            error!(error = ?e, var = name, "Required environment variable not set");
            anyhow::anyhow!("{name} environment variable not set: {e}")
        })
    };
    let credentials = Credentials {
        consumer_key: var(ENV_CLIENT_KEY)?,
        consumer_secret: var(ENV_CLIENT_SECRET)?,
        token_key: var(ENV_TOKEN_KEY)?,
        token_secret: var(ENV_TOKEN_SECRET)?,
    };
    info!("Figshare credentials found in env");
    Ok(credentials)
}
