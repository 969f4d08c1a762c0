//! OAuth 1.0a request signing (HMAC-SHA1, `Authorization` header form).
//!
//! Only the URL's query parameters take part in the signature. Request bodies
//! sent by this crate are JSON or multipart, neither of which is signed under
//! OAuth 1.0a.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 5849 section 3.6: everything but unreserved characters is encoded.
const OAUTH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The fixed four-part credential every request is signed with.
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token_key: String,
    pub token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("token_key", &self.token_key)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

/// Per-request nonce and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    pub nonce: String,
    pub timestamp: u64,
}

impl Nonce {
    pub fn fresh() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            timestamp,
        }
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE).to_string()
}

fn protocol_params(credentials: &Credentials, nonce: &Nonce) -> Vec<(&'static str, String)> {
    vec![
        ("oauth_consumer_key", credentials.consumer_key.clone()),
        ("oauth_nonce", nonce.nonce.clone()),
        ("oauth_signature_method", "HMAC-SHA1".to_string()),
        ("oauth_timestamp", nonce.timestamp.to_string()),
        ("oauth_token", credentials.token_key.clone()),
        ("oauth_version", "1.0".to_string()),
    ]
}

/// Scheme, host, non-default port and path; no query or fragment.
fn base_string_uri(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}

pub(crate) fn signature_base_string(
    method: &str,
    url: &Url,
    credentials: &Credentials,
    nonce: &Nonce,
) -> String {
    let mut params: Vec<(String, String)> = protocol_params(credentials, nonce)
        .into_iter()
        .map(|(k, v)| (encode(k), encode(&v)))
        .chain(url.query_pairs().map(|(k, v)| (encode(&k), encode(&v))))
        .collect();
    params.sort();

    let normalized = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(&base_string_uri(url)),
        encode(&normalized)
    )
}

fn sign(base_string: &str, credentials: &Credentials) -> String {
    let key = format!(
        "{}&{}",
        encode(&credentials.consumer_secret),
        encode(&credentials.token_secret)
    );
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(base_string.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// `Authorization` header value for one request.
pub fn authorization_header(
    method: &str,
    url: &Url,
    credentials: &Credentials,
    nonce: &Nonce,
) -> String {
    let signature = sign(
        &signature_base_string(method, url, credentials, nonce),
        credentials,
    );

    let mut params = protocol_params(credentials, nonce);
    params.push(("oauth_signature", signature));
    params.sort();

    let fields = params
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {fields}")
}
