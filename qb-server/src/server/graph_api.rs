use super::*;

pub(super) async fn validate_handler(Json(document): Json<Value>) -> Json<ValidationReport> {
    Json(ValidationReport::new(validate_message(&document)))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ConvertQuery {
    to: Option<String>,
}

/// Accepts a query graph in any supported shape, bare or inside a message
/// envelope, and returns it in the requested one.
pub(super) async fn convert_handler(
    Query(query): Query<ConvertQuery>,
    Json(body): Json<Value>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let source = body
        .pointer("/message/query_graph")
        .or_else(|| body.get("query_graph"))
        .unwrap_or(&body);
    let graph = to_current_trapi(source).map_err(|err| bad_request(&err.to_string()))?;

    match query.to.as_deref().unwrap_or("internal") {
        "internal" => Ok(Json(graph).into_response()),
        "reasoner" => Ok(Json(internal_to_reasoner(&graph)).into_response()),
        other => Err(bad_request(&format!("unknown target format `{other}`"))),
    }
}

pub(super) async fn results_table_handler(Json(envelope): Json<Envelope>) -> Json<Table> {
    Json(render_table(&envelope.message))
}

#[derive(Clone, Debug, Serialize)]
pub(super) struct ResultSummary {
    binding_counts: BindingCounts,
    edges: Keyed<EdgeEvidence>,
}

#[derive(Clone, Debug, Serialize)]
pub(super) struct EdgeEvidence {
    subject: String,
    object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    predicate: Option<String>,
    publications: Vec<String>,
    sentences: Vec<Value>,
}

/// Per-node binding counts and per-edge supporting evidence.
pub(super) async fn results_summary_handler(
    Json(envelope): Json<Envelope>,
) -> Json<ResultSummary> {
    let message = &envelope.message;
    let edges = message.knowledge_graph.edges.map_values(|edge| EdgeEvidence {
        subject: edge.subject.clone(),
        object: edge.object.clone(),
        predicate: edge.predicate.as_deref().map(display_predicate),
        publications: publications(&edge.attributes),
        sentences: sentences(&edge.attributes),
    });
    Json(ResultSummary {
        binding_counts: binding_counts(message),
        edges,
    })
}
