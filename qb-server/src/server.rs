mod graph_api;
mod handlers;

use std::{fmt, sync::Arc, time::Instant};

use axum::{
    Json, Router,
    body::to_bytes,
    extract::{Path, Query, Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use graph::{
    BindingCounts, Envelope, Keyed, Table, ValidationReport, binding_counts, display_predicate,
    internal_to_reasoner, publications, render_table, sentences, to_current_trapi,
    validate_message,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use url::Url;

use crate::{
    config::ServiceConfig,
    error::{ErrorPayload, ErrorResponse, ExploreError, UpstreamError},
    explore::{DrugDiseasePage, DrugDiseaseStore, parse_filters, parse_pagination},
    logging::{category_access, category_explore, method_label, status_label},
    metrics::ServiceMetrics,
    robokache::RobokacheClient,
    samples::{SampleCache, SampleError},
    upstream::UpstreamClient,
};

use graph_api::{convert_handler, results_summary_handler, results_table_handler, validate_handler};
use handlers::{
    access_log_middleware, answer_handler, biolink_handler, drug_disease_handler, healthz_handler,
    metrics_handler, name_resolver_handler, node_norm_handler, quick_answer_handler,
    robokache_handler,
};

/// Status of a failed proxy call on routes that report errors in the body.
const PROXY_ERROR_STATUS: StatusCode = StatusCode::OK;
/// `/api/biolink` has always failed loudly.
const BIOLINK_ERROR_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;
const MAX_FORWARD_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub upstream: UpstreamClient,
    pub robokache: RobokacheClient,
    pub samples: Arc<SampleCache>,
    pub explore: Option<DrugDiseaseStore>,
    pub metrics: Arc<ServiceMetrics>,
}

#[derive(Debug)]
pub enum StartupError {
    Client(reqwest::Error),
    Samples(SampleError),
    Explore(ExploreError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Client(err) => write!(f, "failed to build http client: {err}"),
            StartupError::Samples(err) => write!(f, "{err}"),
            StartupError::Explore(err) => write!(f, "failed to open explore database: {err}"),
        }
    }
}

impl std::error::Error for StartupError {}

impl AppState {
    pub fn new(config: ServiceConfig) -> Result<Self, StartupError> {
        let metrics = Arc::new(ServiceMetrics::default());
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .build()
            .map_err(StartupError::Client)?;
        let upstream = UpstreamClient::new(client, Arc::clone(&metrics));

        let samples = match &config.samples_path {
            Some(path) => SampleCache::from_path(path),
            None => SampleCache::embedded(),
        }
        .map_err(StartupError::Samples)?;
        let explore = config
            .explore_db
            .as_deref()
            .map(DrugDiseaseStore::open)
            .transpose()
            .map_err(StartupError::Explore)?;
        let robokache = RobokacheClient::new(&config.robokache_url, upstream.clone());

        info!(
            samples = samples.len(),
            aras = config.aras.len(),
            explore = explore.is_some(),
            robokache = robokache.base_url(),
            "service state ready"
        );
        Ok(Self {
            config: Arc::new(config),
            upstream,
            robokache,
            samples: Arc::new(samples),
            explore,
            metrics,
        })
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/node_norm", post(node_norm_handler))
        .route("/api/name_resolver", post(name_resolver_handler))
        .route("/api/biolink", get(biolink_handler))
        .route("/api/quick_answer", post(quick_answer_handler))
        .route("/api/answer", post(answer_handler))
        .route("/api/explore/drug-disease", post(drug_disease_handler))
        .route("/api/robokache/{*path}", any(robokache_handler))
        .route("/api/query_graph/validate", post(validate_handler))
        .route("/api/query_graph/convert", post(convert_handler))
        .route("/api/results/table", post(results_table_handler))
        .route("/api/results/summary", post(results_summary_handler))
        .layer(middleware::from_fn(access_log_middleware))
        .with_state(state)
}

#[derive(Clone, Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn proxy_response(result: Result<Value, UpstreamError>, error_status: StatusCode) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(err) => (error_status, Json(err.payload())).into_response(),
    }
}
