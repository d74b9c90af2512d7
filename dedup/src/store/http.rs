//! HTTP page backend for the remote key/value store.
//!
//! Speaks the store's flat-JSON contract: a page is read with `GET` and
//! written with `POST` against a single records endpoint, addressed by the
//! derived page key carried in a secret header. Authentication, TLS, and
//! retry policy beyond what [`reqwest`] provides are out of scope here.

use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

use crate::bail;
use crate::config::RemoteStoreConfig;
use crate::error::{DedupResult, ErrorKind};
use crate::store::base::{PageBackend, PageBody};

/// Path of the records endpoint on the remote store.
const RECORDS_PATH: &str = "/api/records";

/// Header carrying the derived page key.
const SECRET_HEADER: &str = "X-Secret";

/// [`PageBackend`] backed by a remote HTTP key/value store.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a backend for the store at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Creates a backend from a [`RemoteStoreConfig`].
    pub fn from_config(config: &RemoteStoreConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    fn records_url(&self) -> String {
        format!("{}{RECORDS_PATH}", self.base_url.trim_end_matches('/'))
    }

    /// Turns a response into a page body, surfacing remote failures.
    ///
    /// Non-success responses become [`ErrorKind::TransportError`] with the
    /// remote-supplied `error` reason text appended when the body carries one.
    async fn into_body(response: Response) -> DedupResult<PageBody> {
        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<Value>()
                .await
                .ok()
                .as_ref()
                .and_then(|value| value.get("error"))
                .and_then(Value::as_str)
                .map(|error| format!("\nReason: {error}"))
                .unwrap_or_default();

            bail!(
                ErrorKind::TransportError,
                "Remote store request failed",
                detail = format!("status {status}{reason}")
            );
        }

        Ok(response.json::<PageBody>().await?)
    }
}

impl PageBackend for HttpBackend {
    async fn fetch_page(&self, key: String) -> DedupResult<PageBody> {
        debug!(%key, "fetching page from remote store");

        let response = self
            .client
            .get(self.records_url())
            .header(SECRET_HEADER, key)
            .send()
            .await?;

        Self::into_body(response).await
    }

    async fn store_page(&self, key: String, body: PageBody) -> DedupResult<PageBody> {
        debug!(%key, fields = body.len(), "storing page to remote store");

        let response = self
            .client
            .post(self.records_url())
            .header(SECRET_HEADER, key)
            .json(&body)
            .send()
            .await?;

        Self::into_body(response).await
    }
}
