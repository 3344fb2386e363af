mod config;
mod error;
mod explore;
mod logging;
mod metrics;
mod robokache;
mod samples;
mod server;
mod upstream;

pub use config::{
    ConfigError, DEFAULT_ARA_ENDPOINTS, DEFAULT_BIOLINK_URL, DEFAULT_NAME_RESOLVER_URL,
    DEFAULT_NODE_NORM_URL, DEFAULT_ROBOKACHE_URL, DEFAULT_UPSTREAM_TIMEOUT_MS, ServiceConfig,
};
pub use error::{ErrorPayload, ErrorResponse, ExploreError, UpstreamError};
pub use explore::{
    DrugDiseasePage, DrugDiseaseStore, FILTER_COLUMNS, MAX_PAGE_SIZE, Page, parse_filters,
    parse_pagination,
};
pub use logging::init as init_logging;
pub use metrics::{MetricsSnapshot, ServiceMetrics};
pub use robokache::{ANSWER_VISIBILITY, RobokacheClient};
pub use samples::{Sample, SampleCache, SampleError};
pub use server::{AppState, StartupError, build_app};
pub use upstream::UpstreamClient;
