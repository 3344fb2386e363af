use std::{error::Error as _, sync::Arc, time::Instant};

use axum::body::Bytes;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    error::UpstreamError,
    logging::{category_upstream, method_label, status_label},
    metrics::ServiceMetrics,
};

/// Shared HTTP client for every outbound call, with logging and counters.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    metrics: Arc<ServiceMetrics>,
}

impl UpstreamClient {
    pub fn new(client: Client, metrics: Arc<ServiceMetrics>) -> Self {
        Self { client, metrics }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    /// Sends `request` and returns the raw body of a 2xx response.
    pub async fn fetch(&self, service: &str, request: RequestBuilder) -> Result<Bytes, UpstreamError> {
        let request = request.build().map_err(UpstreamError::Build)?;
        let method = request.method().clone();
        let url = request.url().to_string();
        let started = Instant::now();
        self.metrics.record_upstream_request();

        let result = async {
            let response = self.client.execute(request).await.map_err(|source| {
                UpstreamError::Transport {
                    url: url.clone(),
                    source,
                }
            })?;
            let status = response.status();
            if !status.is_success() {
                return Err(UpstreamError::Status {
                    url: url.clone(),
                    status,
                });
            }
            let body = response.bytes().await.map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;
            Ok::<_, UpstreamError>((status, body))
        }
        .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok((status, body)) => info!(
                service,
                url = %url,
                elapsed_ms,
                bytes = body.len(),
                "{} {} {}",
                category_upstream(),
                method_label(method.as_str()),
                status_label(status.as_u16())
            ),
            Err(err) => {
                self.metrics.record_upstream_error();
                let status = match err {
                    UpstreamError::Status { status, .. } => status.as_u16(),
                    _ => 0,
                };
                warn!(
                    service,
                    url = %url,
                    elapsed_ms,
                    status,
                    "{} {} failed: {}",
                    category_upstream(),
                    method_label(method.as_str()),
                    describe(err)
                );
            }
        }
        result.map(|(_, body)| body)
    }

    /// Like [`UpstreamClient::fetch`], but the body must be JSON.
    pub async fn fetch_json(
        &self,
        service: &str,
        request: RequestBuilder,
    ) -> Result<Value, UpstreamError> {
        let body = self.fetch(service, request).await?;
        serde_json::from_slice(&body).map_err(|err| {
            warn!(service, "{} unparseable JSON body: {err}", category_upstream());
            UpstreamError::UnparseableJson {
                service: service.to_string(),
            }
        })
    }
}

fn describe(err: &UpstreamError) -> String {
    match err.source() {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}
