//! SPARQL 1.1 protocol client over HTTP

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{Graph, Triple};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Client;

use crate::client::{Endpoint, GraphStore, RequestContext, Solution};
use crate::error::StoreError;
use crate::results;

const SPARQL_JSON: &str = "application/sparql-results+json";
const N_TRIPLES: &str = "application/n-triples";
const MAX_ERROR_BODY: usize = 512;

/// Store client speaking the SPARQL protocol (form-encoded POST)
#[derive(Clone)]
pub struct SparqlHttpClient {
    client: Client,
    endpoint: String,
    high_load_endpoint: Option<String>,
    update_field: String,
    request_timeout: Duration,
}

impl SparqlHttpClient {
    /// Client for a single endpoint with default timeouts
    pub fn new(endpoint: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_timeouts(endpoint, Duration::from_secs(5), Duration::from_secs(300))
    }

    /// Client with explicit connect and request timeouts
    pub fn with_timeouts(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            high_load_endpoint: None,
            update_field: "query".to_string(),
            request_timeout,
        })
    }

    /// Endpoint used for [`Endpoint::HighLoad`] calls
    #[must_use]
    pub fn with_high_load_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.high_load_endpoint = Some(endpoint.into());
        self
    }

    /// Form field carrying updates (`query` or `update`)
    #[must_use]
    pub fn with_update_field(mut self, field: impl Into<String>) -> Self {
        self.update_field = field.into();
        self
    }

    fn url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::HighLoad => self.high_load_endpoint.as_deref().unwrap_or(&self.endpoint),
            Endpoint::Default => &self.endpoint,
        }
    }

    fn headers(ctx: &RequestContext, accept: &'static str) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::with_capacity(ctx.headers.len() + 1);
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        for (name, value) in &ctx.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| StoreError::Transport(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| StoreError::Transport(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    async fn post(
        &self,
        field: &str,
        body: &str,
        ctx: &RequestContext,
        accept: &'static str,
    ) -> Result<Vec<u8>, StoreError> {
        let url = self.url(ctx.endpoint);
        tracing::debug!(url, field, len = body.len(), "sparql request");
        let response = self
            .client
            .post(url)
            .headers(Self::headers(ctx, accept)?)
            .form(&[(field, body)])
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if status.is_client_error() || status.is_server_error() {
            let mut body = String::from_utf8_lossy(&bytes).into_owned();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(bytes.to_vec())
    }
}

impl fmt::Debug for SparqlHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparqlHttpClient")
            .field("endpoint", &self.endpoint)
            .field("high_load_endpoint", &self.high_load_endpoint)
            .field("update_field", &self.update_field)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GraphStore for SparqlHttpClient {
    async fn ask(&self, query: &str, ctx: &RequestContext) -> Result<bool, StoreError> {
        let body = self.post("query", query, ctx, SPARQL_JSON).await?;
        results::parse_boolean(&body)
    }

    async fn select(
        &self,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<Vec<Solution>, StoreError> {
        let body = self.post("query", query, ctx, SPARQL_JSON).await?;
        results::parse_solutions(&body)
    }

    async fn construct(&self, query: &str, ctx: &RequestContext) -> Result<Graph, StoreError> {
        let body = self.post("query", query, ctx, N_TRIPLES).await?;
        let mut graph = Graph::new();
        for quad in RdfParser::from_format(RdfFormat::NTriples).for_reader(body.as_slice()) {
            let quad = quad.map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
            graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
        }
        Ok(graph)
    }

    async fn update(&self, update: &str, ctx: &RequestContext) -> Result<(), StoreError> {
        self.post(&self.update_field, update, ctx, SPARQL_JSON)
            .await
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_load_falls_back_to_default() {
        let client = SparqlHttpClient::new("http://db:8890/sparql").unwrap();
        assert_eq!(client.url(Endpoint::HighLoad), "http://db:8890/sparql");
        let client = client.with_high_load_endpoint("http://virtuoso:8890/sparql");
        assert_eq!(client.url(Endpoint::HighLoad), "http://virtuoso:8890/sparql");
        assert_eq!(client.url(Endpoint::Default), "http://db:8890/sparql");
    }

    #[test]
    fn forwards_context_headers() {
        let ctx = RequestContext::new().with_header("mu-auth-sudo", "true");
        let headers = SparqlHttpClient::headers(&ctx, SPARQL_JSON).unwrap();
        assert_eq!(headers.get("mu-auth-sudo").unwrap(), "true");
        assert_eq!(headers.get(ACCEPT).unwrap(), SPARQL_JSON);
    }

    #[test]
    fn rejects_invalid_header_names() {
        let ctx = RequestContext::new().with_header("bad header", "x");
        assert!(SparqlHttpClient::headers(&ctx, SPARQL_JSON).is_err());
    }
}
