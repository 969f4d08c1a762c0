#![doc = "Figshare client: the reqwest implementation of the core deposit and author-resolution contracts."]
//
//! # Figshare v1 client
//!
//! [`FigshareClient`] implements [`DepositClient`] and [`AuthorResolver`]
//! against the Figshare `my_data` API. Every request is signed with OAuth 1.0a
//! using the [`Credentials`] handed to [`FigshareClient::new`]; nothing is read
//! from the environment here.
//!
//! Responses are classified once, in [`classify`]: a non-2xx status or an
//! `error` key in the body is a [`ClientError::Service`] carrying the payload,
//! anything else is the success payload. Calls are never retried.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};

use figshare_publish_core::contract::{Ack, AuthorHit, AuthorResolver, CreatedRecord, DepositClient};
use figshare_publish_core::error::ClientError;

use crate::oauth::{authorization_header, Credentials, Nonce};

pub const DEFAULT_BASE_URL: &str = "http://api.figshare.com/v1";

/// Connection settings for [`FigshareClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Figshare item type for new records, e.g. `dataset`.
    pub defined_type: String,
    pub credentials: Credentials,
}

pub struct FigshareClient {
    http: reqwest::Client,
    base_url: String,
    defined_type: String,
    credentials: Credentials,
}

impl FigshareClient {
    pub fn new(config: ClientConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let credentials_set = !config.credentials.consumer_key.is_empty()
            && !config.credentials.token_key.is_empty();
        tracing::info!(base_url = %base_url, credentials_set, "Initialized FigshareClient");
        Self {
            http: reqwest::Client::new(),
            base_url,
            defined_type: config.defined_type,
            credentials: config.credentials,
        }
    }

    fn endpoint(&self, operation: &'static str, path: &str) -> Result<Url, ClientError> {
        Url::parse(&format!("{}/{}", self.base_url, path)).map_err(|e| ClientError::Transport {
            operation,
            message: format!("invalid endpoint URL: {e}"),
        })
    }

    fn article_endpoint(
        &self,
        operation: &'static str,
        remote_id: i64,
        suffix: &str,
    ) -> Result<Url, ClientError> {
        self.endpoint(operation, &format!("my_data/articles/{remote_id}/{suffix}"))
    }

    /// Start a request with the OAuth header already attached.
    fn signed(&self, method: Method, url: Url) -> RequestBuilder {
        let header = authorization_header(method.as_str(), &url, &self.credentials, &Nonce::fresh());
        self.http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, header)
    }

    async fn dispatch(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Value, ClientError> {
        let transport = |e: reqwest::Error| ClientError::Transport {
            operation,
            message: e.to_string(),
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        let result = classify(operation, status, &body);
        match &result {
            Ok(_) => tracing::debug!(operation, %status, "Figshare call succeeded"),
            Err(e) => tracing::error!(operation, %status, error = %e, "Figshare call failed"),
        }
        result
    }

    async fn put_json(
        &self,
        operation: &'static str,
        url: Url,
        body: Value,
    ) -> Result<Ack, ClientError> {
        let request = self.signed(Method::PUT, url).json(&body);
        self.dispatch(operation, request).await.map(Ack)
    }
}

/// Tagged result for one response: `Ok(payload)` or `Err(Service { payload })`.
pub fn classify(
    operation: &'static str,
    status: StatusCode,
    body: &[u8],
) -> Result<Value, ClientError> {
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                Value::String(String::from_utf8_lossy(body).into_owned())
            }
            Err(e) => {
                return Err(ClientError::Transport {
                    operation,
                    message: format!("undecodable response body: {e}"),
                })
            }
        }
    };

    if !status.is_success() || payload.get("error").is_some() {
        return Err(ClientError::Service { operation, payload });
    }
    Ok(payload)
}

fn required_i64(
    operation: &'static str,
    payload: &Value,
    key: &str,
) -> Result<i64, ClientError> {
    payload
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ClientError::Service {
            operation,
            payload: payload.clone(),
        })
}

#[async_trait]
impl DepositClient for FigshareClient {
    async fn create_record(&self, title: &str, summary: &str) -> Result<CreatedRecord, ClientError> {
        const OP: &str = "create_record";
        tracing::info!(title, "Creating Figshare article");
        let url = self.endpoint(OP, "my_data/articles")?;
        let body = json!({
            "title": title,
            "description": summary,
            "defined_type": self.defined_type,
        });
        let payload = self
            .dispatch(OP, self.signed(Method::POST, url).json(&body))
            .await?;

        let remote_id = required_i64(OP, &payload, "article_id")?;
        let persistent_id = payload
            .get("doi")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Service {
                operation: OP,
                payload: payload.clone(),
            })?
            .to_string();
        tracing::info!(remote_id, persistent_id = %persistent_id, "Created Figshare article");
        Ok(CreatedRecord {
            remote_id,
            persistent_id,
        })
    }

    async fn set_category(&self, remote_id: i64, category_id: i64) -> Result<Ack, ClientError> {
        const OP: &str = "set_category";
        tracing::info!(remote_id, category_id, "Setting category");
        let url = self.article_endpoint(OP, remote_id, "categories")?;
        self.put_json(OP, url, json!({ "category_id": category_id }))
            .await
    }

    async fn set_tag(&self, remote_id: i64, tag_name: &str) -> Result<Ack, ClientError> {
        const OP: &str = "set_tag";
        tracing::info!(remote_id, tag_name, "Setting tag");
        let url = self.article_endpoint(OP, remote_id, "tags")?;
        self.put_json(OP, url, json!({ "tag_name": tag_name })).await
    }

    async fn attach_authors(&self, remote_id: i64, author_ids: &[i64]) -> Result<Ack, ClientError> {
        const OP: &str = "attach_authors";
        let mut last = Ack::default();
        for author_id in author_ids {
            tracing::info!(remote_id, author_id, "Attaching author");
            let url = self.article_endpoint(OP, remote_id, "authors")?;
            last = self.put_json(OP, url, json!({ "author_id": author_id })).await?;
        }
        Ok(last)
    }

    async fn upload_binary(&self, remote_id: i64, file_path: &Path) -> Result<Ack, ClientError> {
        const OP: &str = "upload_binary";
        if !file_path.is_file() {
            tracing::error!(file = %file_path.display(), "File to upload is missing");
            return Err(ClientError::MissingFile(file_path.to_path_buf()));
        }
        let io_failure = |e: std::io::Error| ClientError::Transport {
            operation: OP,
            message: format!("reading {}: {e}", file_path.display()),
        };

        let file = tokio::fs::File::open(file_path).await.map_err(io_failure)?;
        let length = file.metadata().await.map_err(io_failure)?.len();
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        tracing::info!(remote_id, file = %file_path.display(), bytes = length, "Uploading file");

        let part = Part::stream_with_length(reqwest::Body::from(file), length)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| ClientError::Transport {
                operation: OP,
                message: e.to_string(),
            })?;
        let form = Form::new().part("filedata", part);

        let url = self.article_endpoint(OP, remote_id, "files")?;
        let payload = self
            .dispatch(OP, self.signed(Method::PUT, url).multipart(form))
            .await?;
        Ok(Ack(payload))
    }

    async fn set_visibility_public(&self, remote_id: i64) -> Result<Ack, ClientError> {
        const OP: &str = "set_visibility_public";
        tracing::info!(remote_id, "Making article public");
        let url = self.article_endpoint(OP, remote_id, "action/make_public")?;
        self.dispatch(OP, self.signed(Method::POST, url))
            .await
            .map(Ack)
    }
}

#[async_trait]
impl AuthorResolver for FigshareClient {
    async fn search_authors(&self, name: &str) -> Result<Vec<AuthorHit>, ClientError> {
        const OP: &str = "search_authors";
        let mut url = self.endpoint(OP, "my_data/authors")?;
        url.query_pairs_mut().append_pair("search_for", name);
        let payload = self.dispatch(OP, self.signed(Method::GET, url)).await?;

        let hits = match payload.get("items") {
            Some(items) => serde_json::from_value::<Vec<AuthorHit>>(items.clone()).map_err(|e| {
                ClientError::Transport {
                    operation: OP,
                    message: format!("unexpected author search items: {e}"),
                }
            })?,
            None => Vec::new(),
        };
        tracing::info!(name, hits = hits.len(), "Searched authors");
        Ok(hits)
    }

    async fn create_author(&self, name: &str) -> Result<i64, ClientError> {
        const OP: &str = "create_author";
        let url = self.endpoint(OP, "my_data/authors")?;
        let payload = self
            .dispatch(OP, self.signed(Method::POST, url).json(&json!({ "full_name": name })))
            .await?;
        required_i64(OP, &payload, "author_id")
    }
}
