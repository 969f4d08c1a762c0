//! Optional upstream step turning author display names into remote author ids.
//!
//! Runs before reconciliation so the engine only ever sees resolved ids.

use tracing::{debug, info};

use crate::contract::{AuthorHit, AuthorResolver};
use crate::error::ClientError;

/// Resolve each comma-separated name in `raw_names`, preserving order.
///
/// An exact (case-insensitive) name match wins; otherwise the first hit is
/// used. Names with no hits are registered as new authors.
pub async fn resolve_author_ids<R>(resolver: &R, raw_names: &str) -> Result<Vec<i64>, ClientError>
where
    R: AuthorResolver + ?Sized,
{
    let mut ids = Vec::new();
    for name in raw_names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let hits = resolver.search_authors(name).await?;
        let id = match pick(&hits, name) {
            Some(hit) => {
                debug!(name, author_id = hit.id, "Resolved author by search");
                hit.id
            }
            None => {
                let id = resolver.create_author(name).await?;
                info!(name, author_id = id, "Registered new author");
                id
            }
        };
        ids.push(id);
    }
    Ok(ids)
}

fn pick<'a>(hits: &'a [AuthorHit], name: &str) -> Option<&'a AuthorHit> {
    hits.iter()
        .find(|hit| hit.full_name.eq_ignore_ascii_case(name))
        .or_else(|| hits.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockAuthorResolver;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn prefers_exact_match_and_creates_missing() {
        let mut resolver = MockAuthorResolver::new();
        resolver
            .expect_search_authors()
            .with(eq("Ada Lovelace"))
            .returning(|_| {
                Ok(vec![
                    AuthorHit { id: 1, full_name: "Ada King".into() },
                    AuthorHit { id: 2, full_name: "ada lovelace".into() },
                ])
            });
        resolver
            .expect_search_authors()
            .with(eq("Charles Babbage"))
            .returning(|_| Ok(vec![]));
        resolver
            .expect_create_author()
            .with(eq("Charles Babbage"))
            .times(1)
            .returning(|_| Ok(7));

        let ids = resolve_author_ids(&resolver, " Ada Lovelace, ,Charles Babbage ")
            .await
            .expect("resolution succeeds");
        assert_eq!(ids, vec![2, 7]);
    }

    #[tokio::test]
    async fn search_failure_propagates() {
        let mut resolver = MockAuthorResolver::new();
        resolver.expect_search_authors().returning(|_| {
            Err(ClientError::Service {
                operation: "search_authors",
                payload: serde_json::json!({"error": "denied"}),
            })
        });
        resolver.expect_create_author().never();

        let err = resolve_author_ids(&resolver, "Ada Lovelace").await.unwrap_err();
        assert!(err.payload().is_some());
    }
}
