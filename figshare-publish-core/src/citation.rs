//! Citation records derived from a published article.
//!
//! Templates use `{field}` placeholders and `{{` / `}}` for literal braces,
//! so a BibTeX entry can be written as:
//!
//! ```text
//! @misc{{{slug},
//!   author = {{{authors}}},
//!   title = {{{title}}},
//!   doi = {{{doi}}},
//!   url = {{{url}}},
//!   keywords = {{{tag}}}
//! }}
//! ```

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use crate::error::CitationError;

const FIELDS: [&str; 6] = ["authors", "title", "doi", "url", "tag", "slug"];

const DOI_RESOLVER_PREFIXES: [&str; 4] = [
    "http://dx.doi.org/",
    "https://dx.doi.org/",
    "http://doi.org/",
    "https://doi.org/",
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_]+)\}|[{}]").expect("citation token pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(&'static str),
}

/// Parsed citation template. Unknown fields are rejected up front so a bad
/// template fails the run before any article is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationTemplate {
    segments: Vec<Segment>,
}

/// Values substituted into a [`CitationTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct CitationFields<'a> {
    pub authors: &'a str,
    pub title: &'a str,
    pub doi: &'a str,
    pub url: &'a str,
    pub tag: &'a str,
    pub slug: &'a str,
}

impl<'a> CitationFields<'a> {
    fn get(&self, field: &str) -> &'a str {
        match field {
            "authors" => self.authors,
            "title" => self.title,
            "doi" => self.doi,
            "url" => self.url,
            "tag" => self.tag,
            _ => self.slug,
        }
    }
}

impl CitationTemplate {
    pub fn parse(template: &str) -> Result<Self, CitationError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in token_pattern().captures_iter(template) {
            let whole = caps.get(0).expect("group 0 is always present");
            literal.push_str(&template[last..whole.start()]);
            last = whole.end();

            match whole.as_str() {
                "{{" => literal.push('{'),
                "}}" => literal.push('}'),
                "{" | "}" => return Err(CitationError::UnbalancedBrace(whole.start())),
                _ => {
                    let name = &caps[1];
                    let field = FIELDS
                        .iter()
                        .find(|f| **f == name)
                        .copied()
                        .ok_or_else(|| CitationError::UnknownField(name.to_string()))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
            }
        }
        literal.push_str(&template[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, fields: &CitationFields<'_>) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Field(name) => fields.get(name),
            })
            .collect()
    }
}

/// Citation output settings.
#[derive(Debug, Clone)]
pub struct CitationSettings {
    pub template: CitationTemplate,
    /// File extension of the written record, without the dot.
    pub extension: String,
}

/// Bare DOI from a persistent identifier: any leading resolver URL is removed.
pub fn strip_doi_prefix(persistent_id: &str) -> &str {
    DOI_RESOLVER_PREFIXES
        .iter()
        .find_map(|prefix| persistent_id.strip_prefix(prefix))
        .unwrap_or(persistent_id)
}

/// Write (or overwrite) one citation record.
pub fn write_citation(path: &Path, content: &str) -> Result<(), CitationError> {
    fs::write(path, content).map_err(|source| CitationError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Wrote citation");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> CitationFields<'static> {
        CitationFields {
            authors: "Ada Lovelace, Charles Babbage",
            title: "Notes",
            doi: "10.1/xyz",
            url: "http://dx.doi.org/10.1/xyz",
            tag: "proceedings",
            slug: "notes",
        }
    }

    #[test]
    fn renders_bibtex_with_escaped_braces() {
        let template =
            CitationTemplate::parse("@misc{{{slug}, doi = {{{doi}}}, title = {{{title}}}}}")
                .unwrap();
        assert_eq!(
            template.render(&fields()),
            "@misc{notes, doi = {10.1/xyz}, title = {Notes}}"
        );
    }

    #[test]
    fn rejects_unknown_field() {
        let err = CitationTemplate::parse("{journal}").unwrap_err();
        assert!(matches!(err, CitationError::UnknownField(f) if f == "journal"));
    }

    #[test]
    fn rejects_stray_brace() {
        let err = CitationTemplate::parse("title = {title").unwrap_err();
        assert!(matches!(err, CitationError::UnbalancedBrace(8)));
    }

    #[test]
    fn strips_known_resolver_prefixes_only() {
        assert_eq!(strip_doi_prefix("http://dx.doi.org/10.1/xyz"), "10.1/xyz");
        assert_eq!(strip_doi_prefix("https://doi.org/10.1/xyz"), "10.1/xyz");
        assert_eq!(strip_doi_prefix("10.1/xyz"), "10.1/xyz");
        assert_eq!(
            strip_doi_prefix("http://example.org/10.1/xyz"),
            "http://example.org/10.1/xyz"
        );
    }
}
