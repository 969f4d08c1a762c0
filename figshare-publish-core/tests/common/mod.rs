#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use figshare_publish_core::citation::{CitationSettings, CitationTemplate};
use figshare_publish_core::contract::{Article, CreatedRecord};
use figshare_publish_core::reconcile::{ArtifactLayout, PublishSettings};

pub const DOI: &str = "http://dx.doi.org/10.1/xyz";

pub fn settings() -> PublishSettings {
    PublishSettings {
        category_id: 77,
        tag: "proceedings".to_string(),
        source_extension: "rst".to_string(),
        make_public: false,
        citation: CitationSettings {
            template: CitationTemplate::parse("{authors}|{title}|{doi}|{url}|{tag}")
                .expect("test template parses"),
            extension: "bib".to_string(),
        },
    }
}

pub fn article(slug: &str) -> Article {
    Article {
        slug: slug.to_string(),
        title: format!("Title of {slug}"),
        summary: "Summary goes here".to_string(),
        authors: "Firstname Lastname, Firstname2 Lastname2".to_string(),
        author_ids: vec![10, 20],
        source_path: PathBuf::from(format!("content/{slug}.rst")),
    }
}

pub fn record(remote_id: i64) -> CreatedRecord {
    CreatedRecord {
        remote_id,
        persistent_id: DOI.to_string(),
    }
}

/// Layout under `root` with both directories created.
pub fn layout(root: &Path) -> ArtifactLayout {
    let layout = ArtifactLayout::under(root);
    fs::create_dir_all(&layout.pdf_dir).unwrap();
    fs::create_dir_all(&layout.bib_dir).unwrap();
    layout
}

pub fn write_pdf(layout: &ArtifactLayout, slug: &str) -> PathBuf {
    let path = layout.pdf_path(slug);
    fs::write(&path, b"%PDF-1.4 test").unwrap();
    path
}
