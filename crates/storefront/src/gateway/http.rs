//! JSON-over-HTTP document store client.
//!
//! # Routes
//!
//! ```text
//! POST   {base}/{collection}        create  -> {"id": "..."}
//! GET    {base}/{collection}        query   -> {"documents": [{"id", "fields"}]}
//!        ?field=userId&op=eq&value=uid-1
//! GET    {base}/{collection}/{id}   get     -> {"id", "fields"} | 404
//! PUT    {base}/{collection}/{id}   set
//! PATCH  {base}/{collection}/{id}   update
//! DELETE {base}/{collection}/{id}   delete
//! ```
//!
//! Every request carries `?key=<api key>`; requests made while signed in
//! also carry the session token as a bearer token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::store::{Document, DocumentStore, Fields, Filter, StoreError};
use crate::auth::AuthGateway;

#[derive(Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

/// Client for a hosted document API.
#[derive(Clone)]
pub struct HttpDocumentStore {
    inner: Arc<HttpDocumentStoreInner>,
}

#[derive(Clone)]
struct HttpDocumentStoreInner {
    client: reqwest::Client,
    base: Url,
    api_key: SecretString,
    auth: Option<Arc<dyn AuthGateway>>,
}

impl HttpDocumentStore {
    /// Create a client for the API rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Transport` if the HTTP client cannot be built.
    pub fn new(
        base: Url,
        api_key: SecretString,
        timeout: Option<Duration>,
    ) -> Result<Self, StoreError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            inner: Arc::new(HttpDocumentStoreInner {
                client: builder.build()?,
                base,
                api_key,
                auth: None,
            }),
        })
    }

    /// Attach the session provider whose token authorizes requests.
    #[must_use]
    pub fn with_auth(self, auth: Arc<dyn AuthGateway>) -> Self {
        let inner = Arc::unwrap_or_clone(self.inner);
        Self {
            inner: Arc::new(HttpDocumentStoreInner {
                auth: Some(auth),
                ..inner
            }),
        }
    }

    fn url(&self, collection: &str, id: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.inner.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| StoreError::Transport("base url cannot carry a path".to_owned()))?;
            segments.pop_if_empty().push(collection);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.inner.auth.as_ref().and_then(|auth| auth.id_token()) {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        Ok(self.authorize(request).send().await?)
    }
}

/// Map a non-success status to a store error.
async fn check(
    response: Response,
    collection: &str,
    id: Option<&str>,
) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail: String = body.chars().take(300).collect();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Permission(detail),
        StatusCode::NOT_FOUND => StoreError::NotFound {
            collection: collection.to_owned(),
            id: id.unwrap_or_default().to_owned(),
        },
        _ => StoreError::Transport(format!("{status}: {detail}")),
    })
}

async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| StoreError::Malformed(e.to_string()))
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    #[instrument(skip(self, fields))]
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let url = self.url(collection, None)?;
        let response = self.send(self.inner.client.post(url).json(&fields)).await?;
        let created: CreatedResponse = json(check(response, collection, None).await?).await?;
        debug!(id = %created.id, "document created");
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let url = self.url(collection, Some(id))?;
        let response = self.send(self.inner.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let mut doc: Document = json(check(response, collection, Some(id)).await?).await?;
        if doc.id.is_empty() {
            id.clone_into(&mut doc.id);
        }
        Ok(Some(doc))
    }

    #[instrument(skip(self))]
    async fn query(
        &self,
        collection: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut url = self.url(collection, None)?;
        if let Some(filter) = filter {
            url.query_pairs_mut()
                .append_pair("field", &filter.field)
                .append_pair("op", filter.op.as_str())
                .append_pair("value", &filter.value_param());
        }
        let response = self.send(self.inner.client.get(url)).await?;
        let page: QueryResponse = json(check(response, collection, None).await?).await?;
        Ok(page.documents)
    }

    #[instrument(skip(self, fields))]
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let url = self.url(collection, Some(id))?;
        let response = self.send(self.inner.client.put(url).json(&fields)).await?;
        check(response, collection, Some(id)).await?;
        Ok(())
    }

    #[instrument(skip(self, partial))]
    async fn update(&self, collection: &str, id: &str, partial: Fields) -> Result<(), StoreError> {
        let url = self.url(collection, Some(id))?;
        let response = self.send(self.inner.client.patch(url).json(&partial)).await?;
        check(response, collection, Some(id)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = self.url(collection, Some(id))?;
        let response = self.send(self.inner.client.delete(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(response, collection, Some(id)).await?;
        Ok(())
    }
}
