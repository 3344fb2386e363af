//! Client for the Robokache document store, where questions are parent
//! documents and answers are their children.

use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode,
        header::{AUTHORIZATION, CONTENT_LENGTH, HOST},
    },
};
use reqwest::RequestBuilder;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    config::normalize_base_url,
    error::UpstreamError,
    logging::{category_upstream, method_label, status_label},
    upstream::UpstreamClient,
};

/// Visibility assigned to answers created on behalf of a question owner.
pub const ANSWER_VISIBILITY: u8 = 2;

const SERVICE: &str = "robokache";

const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Clone)]
pub struct RobokacheClient {
    base_url: String,
    upstream: UpstreamClient,
}

impl RobokacheClient {
    pub fn new(base_url: &str, upstream: UpstreamClient) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            upstream,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn question_data(
        &self,
        question_id: &str,
        authorization: Option<&HeaderValue>,
    ) -> Result<Value, UpstreamError> {
        let request = self.upstream.client().get(self.data_url(question_id));
        self.upstream
            .fetch_json(SERVICE, with_authorization(request, authorization))
            .await
    }

    /// Creates an empty answer document under `parent` and returns its id.
    pub async fn create_answer(
        &self,
        parent: &str,
        authorization: Option<&HeaderValue>,
    ) -> Result<String, UpstreamError> {
        let request = self
            .upstream
            .client()
            .post(format!("{}/api/document", self.base_url))
            .json(&json!({ "parent": parent, "visibility": ANSWER_VISIBILITY }));
        let created = self
            .upstream
            .fetch_json(SERVICE, with_authorization(request, authorization))
            .await?;
        match created.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(UpstreamError::MissingField {
                service: SERVICE.to_string(),
                field: "id",
            }),
        }
    }

    pub async fn set_answer_data(
        &self,
        answer_id: &str,
        data: &Value,
        authorization: Option<&HeaderValue>,
    ) -> Result<(), UpstreamError> {
        let request = self.upstream.client().put(self.data_url(answer_id)).json(data);
        self.upstream
            .fetch(SERVICE, with_authorization(request, authorization))
            .await
            .map(|_| ())
    }

    /// Relays a request to `{base}/api/{path}` and hands the upstream response
    /// back as is. Hop-by-hop headers are dropped in both directions.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Response<Body> {
        let mut url = format!("{}/api/{}", self.base_url, path.trim_start_matches('/'));
        if let Some(query) = query.filter(|query| !query.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        let mut outbound = self
            .upstream
            .client()
            .request(method.clone(), &url)
            .body(body);
        for (name, value) in headers {
            if name != HOST && name != CONTENT_LENGTH && !is_hop_by_hop(name) {
                outbound = outbound.header(name, value);
            }
        }

        let metrics = self.upstream.metrics();
        metrics.record_upstream_request();
        let started = Instant::now();
        let upstream_response = match outbound.send().await {
            Ok(response) => response,
            Err(err) => {
                metrics.record_upstream_error();
                warn!(url = %url, "{} robokache request failed: {err}", category_upstream());
                return text_response(StatusCode::BAD_GATEWAY, "bad gateway");
            }
        };

        let status = upstream_response.status();
        let upstream_headers = upstream_response.headers().clone();
        let body = match upstream_response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                metrics.record_upstream_error();
                warn!(
                    url = %url,
                    "{} failed reading robokache response body: {err}",
                    category_upstream()
                );
                return text_response(StatusCode::BAD_GATEWAY, "bad gateway");
            }
        };
        info!(
            service = SERVICE,
            url = %url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} {} {}",
            category_upstream(),
            method_label(method.as_str()),
            status_label(status.as_u16())
        );

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        for (name, value) in &upstream_headers {
            if name != CONTENT_LENGTH && !is_hop_by_hop(name) {
                response.headers_mut().append(name, value.clone());
            }
        }
        response
    }

    fn data_url(&self, document_id: &str) -> String {
        format!("{}/api/document/{document_id}/data", self.base_url)
    }
}

fn with_authorization(request: RequestBuilder, authorization: Option<&HeaderValue>) -> RequestBuilder {
    match authorization {
        Some(value) => request.header(AUTHORIZATION, value.clone()),
        None => request,
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

fn text_response(status: StatusCode, text: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(text.to_string()));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_headers_are_recognized() {
        assert!(is_hop_by_hop(&HeaderName::from_static("transfer-encoding")));
        assert!(is_hop_by_hop(&HeaderName::from_static("connection")));
        assert!(!is_hop_by_hop(&AUTHORIZATION));
        assert!(!is_hop_by_hop(&HeaderName::from_static("content-type")));
    }
}
