use super::*;

pub(super) async fn access_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_millis();

    info!(
        "{} {} {} {} {}ms",
        category_access(),
        method_label(method.as_str()),
        status_label(response.status().as_u16()),
        uri,
        elapsed_ms
    );
    response
}

pub(super) async fn healthz_handler() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

pub(super) async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(super) async fn node_norm_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Response {
    let url = format!("{}/get_normalized_nodes", state.config.node_norm_url);
    let request = state.upstream.client().post(url).json(&body);
    proxy_response(
        state.upstream.fetch_json("node_norm", request).await,
        PROXY_ERROR_STATUS,
    )
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct NameResolverQuery {
    string: Option<String>,
    #[serde(rename = "type")]
    biolink_type: Option<String>,
    limit: Option<String>,
}

pub(super) async fn name_resolver_handler(
    State(state): State<AppState>,
    Query(query): Query<NameResolverQuery>,
) -> Response {
    let params = [
        ("string", query.string),
        ("biolink_type", query.biolink_type),
        ("limit", query.limit),
    ];
    let params = params
        .iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (*name, value)));
    let url = match Url::parse_with_params(
        &format!("{}/lookup", state.config.name_resolver_url),
        params,
    ) {
        Ok(url) => url,
        Err(err) => {
            let payload = ErrorPayload::new(format!("invalid name resolver url: {err}"));
            return (PROXY_ERROR_STATUS, Json(payload)).into_response();
        }
    };
    let request = state
        .upstream
        .client()
        .post(url)
        .header(CONTENT_TYPE, "text/plain")
        .body("{}");
    proxy_response(
        state.upstream.fetch_json("name_resolver", request).await,
        PROXY_ERROR_STATUS,
    )
}

/// Fetches the Biolink model YAML and returns it as JSON.
pub(super) async fn biolink_handler(State(state): State<AppState>) -> Response {
    let request = state.upstream.client().get(&state.config.biolink_url);
    let result = match state.upstream.fetch("biolink", request).await {
        Ok(body) => serde_yaml::from_slice::<Value>(&body).map_err(|err| {
            warn!("biolink model is not valid YAML: {err}");
            UpstreamError::UnparseableYaml(err)
        }),
        Err(err) => Err(err),
    };
    proxy_response(result, BIOLINK_ERROR_STATUS)
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AraQuery {
    ara: Option<String>,
}

pub(super) async fn quick_answer_handler(
    State(state): State<AppState>,
    Query(query): Query<AraQuery>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(response) = state.samples.lookup(&body) {
        state.metrics.record_sample_cache_hit();
        info!("quick answer served from sample cache");
        return Json(response.clone()).into_response();
    }
    proxy_response(
        ask_ara(&state, query.ara.as_deref(), &body).await,
        PROXY_ERROR_STATUS,
    )
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AnswerQuery {
    #[serde(rename = "questionId")]
    question_id: Option<String>,
    ara: Option<String>,
}

/// Answers a stored question and saves the answer as its child document.
pub(super) async fn answer_handler(
    State(state): State<AppState>,
    Query(query): Query<AnswerQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(question_id) = query.question_id.filter(|id| !id.trim().is_empty()) else {
        let payload = ErrorPayload::new("questionId is required");
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    };
    let authorization = headers.get(AUTHORIZATION);

    match answer_question(&state, &question_id, query.ara.as_deref(), authorization).await {
        Ok(answer_id) => {
            state.metrics.record_answer_created();
            Json(json!({ "id": answer_id })).into_response()
        }
        Err(err) => (answer_error_status(&err), Json(err.payload())).into_response(),
    }
}

async fn answer_question(
    state: &AppState,
    question_id: &str,
    ara: Option<&str>,
    authorization: Option<&HeaderValue>,
) -> Result<String, UpstreamError> {
    let question = state
        .robokache
        .question_data(question_id, authorization)
        .await?;
    // A failed ARA call still produces an answer document holding the error.
    let answer = ask_ara(state, ara, &question)
        .await
        .unwrap_or_else(|err| err.payload().to_value());
    let answer_id = state
        .robokache
        .create_answer(question_id, authorization)
        .await?;
    state
        .robokache
        .set_answer_data(&answer_id, &answer, authorization)
        .await?;
    info!(question_id, answer_id = %answer_id, "answer stored");
    Ok(answer_id)
}

fn answer_error_status(err: &UpstreamError) -> StatusCode {
    match err {
        UpstreamError::MissingField { .. } | UpstreamError::Build(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => PROXY_ERROR_STATUS,
    }
}

async fn ask_ara(state: &AppState, ara: Option<&str>, body: &Value) -> Result<Value, UpstreamError> {
    let ara = ara.unwrap_or_default();
    let url = state
        .config
        .ara_url(ara)
        .ok_or_else(|| UpstreamError::UnknownService(ara.to_string()))?;
    let request = state.upstream.client().post(url).json(body);
    state.upstream.fetch_json(ara, request).await
}

pub(super) async fn drug_disease_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<DrugDiseasePage>, (StatusCode, Json<ErrorResponse>)> {
    let page = parse_pagination(&body).map_err(explore_error)?;
    let filters = parse_filters(&body).map_err(explore_error)?;
    let store = state
        .explore
        .as_ref()
        .ok_or(ExploreError::Unavailable)
        .map_err(explore_error)?;

    state.metrics.record_explore_query();
    let result = store.page(filters, page).await.map_err(explore_error)?;
    info!(
        "{} drug-disease page limit={} offset={} rows={}",
        category_explore(),
        result.limit,
        result.offset,
        result.rows.len()
    );
    Ok(Json(result))
}

fn explore_error(err: ExploreError) -> (StatusCode, Json<ErrorResponse>) {
    let status = err.status_code();
    if status.is_server_error() {
        warn!("{} {err}", category_explore());
    }
    (
        status,
        Json(ErrorResponse {
            error: err.public_message(),
        }),
    )
}

pub(super) async fn robokache_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_FORWARD_BODY_BYTES).await {
        Ok(body) => body,
        Err(_) => {
            let error = ErrorResponse {
                error: "request body too large".to_string(),
            };
            return (StatusCode::PAYLOAD_TOO_LARGE, Json(error)).into_response();
        }
    };
    state
        .robokache
        .forward(parts.method, &path, parts.uri.query(), &parts.headers, body)
        .await
}
