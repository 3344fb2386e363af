//! Structural checks for uploaded or edited messages.
//!
//! Shapes and types are checked against the embedded message schema; ids
//! and edge endpoints are cross-checked by hand. Validation never fails and
//! never touches its input; it returns every violation found so an editor
//! can list them next to the document.

use std::{collections::HashSet, fmt, sync::OnceLock};

use jsonschema::{
    JSONSchema,
    error::{TypeKind, ValidationError, ValidationErrorKind},
    primitive_type::PrimitiveType,
};
use serde::Serialize;
use serde_json::{Value, json};

pub const MESSAGE_SCHEMA_VERSION: &str = "1.4";

const MESSAGE_SCHEMA_SOURCE: &str = include_str!("../schema/message-1.4.json");

static SCHEMAS: OnceLock<Result<Schemas, String>> = OnceLock::new();

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    Missing { field: String },
    WrongType { expected: String },
    Invalid { reason: String },
    DuplicateId { id: String },
    UnknownNode { id: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Missing { field } => {
                write!(f, "{}: a \"{field}\" property is required", self.path)
            }
            ViolationKind::WrongType { expected } => {
                write!(f, "{}: should be {expected}", self.path)
            }
            ViolationKind::Invalid { reason } => write!(f, "{}: {reason}", self.path),
            ViolationKind::DuplicateId { id } => {
                write!(f, "{}: there are multiple entries with the id \"{id}\"", self.path)
            }
            ViolationKind::UnknownNode { id } => {
                write!(f, "{}: refers to \"{id}\", which is not a node", self.path)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub schema_version: &'static str,
    pub valid: bool,
    pub violations: Vec<ViolationView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ViolationView {
    #[serde(flatten)]
    pub violation: Violation,
    pub message: String,
}

impl ValidationReport {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self {
            schema_version: MESSAGE_SCHEMA_VERSION,
            valid: violations.is_empty(),
            violations: violations
                .into_iter()
                .map(|violation| ViolationView {
                    message: violation.to_string(),
                    violation,
                })
                .collect(),
        }
    }
}

struct Schemas {
    message: JSONSchema,
    query_graph: JSONSchema,
}

fn schemas() -> Result<&'static Schemas, &'static str> {
    SCHEMAS
        .get_or_init(compile_schemas)
        .as_ref()
        .map_err(String::as_str)
}

fn compile_schemas() -> Result<Schemas, String> {
    let message: Value = serde_json::from_str(MESSAGE_SCHEMA_SOURCE)
        .map_err(|err| format!("message schema is not JSON: {err}"))?;
    let query_graph = json!({
        "definitions": message.get("definitions").cloned().unwrap_or(Value::Null),
        "$ref": "#/definitions/query_graph",
    });
    Ok(Schemas {
        message: compile(&message)?,
        query_graph: compile(&query_graph)?,
    })
}

fn compile(schema: &Value) -> Result<JSONSchema, String> {
    JSONSchema::compile(schema).map_err(|err| format!("message schema does not compile: {err}"))
}

/// Checks a `{ "message": { ... } }` envelope.
pub fn validate_message(document: &Value) -> Vec<Violation> {
    let mut violations = match schemas() {
        Ok(schemas) => schema_violations(&schemas.message, document, "$"),
        Err(reason) => vec![unavailable(reason)],
    };
    if let Some(query_graph) = document.pointer("/message/query_graph") {
        check_references(query_graph, "$.message.query_graph", &mut violations);
    }
    violations
}

/// Checks a bare query graph, reporting paths under `path`. A list-shaped
/// graph is reported as such but still checked for duplicate ids and edge
/// endpoints.
pub fn validate_query_graph(graph: &Value, path: &str) -> Vec<Violation> {
    let mut violations = match schemas() {
        Ok(schemas) => schema_violations(&schemas.query_graph, graph, path),
        Err(reason) => vec![unavailable(reason)],
    };
    check_references(graph, path, &mut violations);
    violations
}

fn schema_violations(schema: &JSONSchema, document: &Value, root: &str) -> Vec<Violation> {
    match schema.validate(document) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|error| schema_violation(document, root, error))
            .collect(),
    }
}

fn schema_violation(document: &Value, root: &str, error: ValidationError<'_>) -> Violation {
    let reason = error.to_string();
    let path = display_path(root, document, error.instance_path.into_vec());
    let kind = match error.kind {
        ValidationErrorKind::Required { property } => ViolationKind::Missing {
            field: property
                .as_str()
                .map_or_else(|| property.to_string(), str::to_string),
        },
        ValidationErrorKind::Type {
            kind: TypeKind::Single(primitive),
        } => ViolationKind::WrongType {
            expected: type_label(primitive).to_string(),
        },
        _ => ViolationKind::Invalid { reason },
    };
    Violation { path, kind }
}

fn type_label(primitive: PrimitiveType) -> &'static str {
    match primitive {
        PrimitiveType::Array => "a list",
        PrimitiveType::Boolean => "a boolean",
        PrimitiveType::Integer => "an integer",
        PrimitiveType::Null => "null",
        PrimitiveType::Number => "a number",
        PrimitiveType::Object => "an object",
        PrimitiveType::String => "a string",
    }
}

/// `$.message.results[0].score` style path for a schema instance location.
fn display_path(root: &str, document: &Value, segments: Vec<String>) -> String {
    let mut path = root.to_string();
    let mut current = Some(document);
    for segment in segments {
        match current {
            Some(Value::Array(items)) => {
                current = segment.parse::<usize>().ok().and_then(|index| items.get(index));
                path.push_str(&format!("[{segment}]"));
            }
            _ => {
                current = current.and_then(|value| value.get(segment.as_str()));
                path.push('.');
                path.push_str(&segment);
            }
        }
    }
    path
}

fn unavailable(reason: &str) -> Violation {
    Violation {
        path: "$".to_string(),
        kind: ViolationKind::Invalid {
            reason: reason.to_string(),
        },
    }
}

/// Duplicate ids and edge endpoints that name no declared node.
fn check_references(graph: &Value, path: &str, violations: &mut Vec<Violation>) {
    let node_ids = graph
        .get("nodes")
        .map(|nodes| unique_ids(nodes, &format!("{path}.nodes"), violations));
    let Some(edges) = graph.get("edges") else {
        return;
    };
    let edges_path = format!("{path}.edges");
    unique_ids(edges, &edges_path, violations);
    let Some(node_ids) = node_ids else {
        return;
    };
    for (_, edge, entry_path) in entries(edges, &edges_path, &mut Vec::new()) {
        for field in ["subject", "object"] {
            let Some(endpoint) = edge.get(field).and_then(Value::as_str) else {
                continue;
            };
            if !node_ids.contains(endpoint) {
                violations.push(Violation {
                    path: format!("{entry_path}.{field}"),
                    kind: ViolationKind::UnknownNode {
                        id: endpoint.to_string(),
                    },
                });
            }
        }
    }
}

fn unique_ids(collection: &Value, path: &str, violations: &mut Vec<Violation>) -> HashSet<String> {
    let mut ids = HashSet::new();
    for (id, _, _) in entries(collection, path, violations) {
        if !ids.insert(id.clone()) {
            violations.push(Violation {
                path: path.to_string(),
                kind: ViolationKind::DuplicateId { id },
            });
        }
    }
    ids
}

/// `(id, entry, path)` for map-form or list-form collections. List entries
/// without a string `id` are reported and skipped.
fn entries<'a>(
    collection: &'a Value,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Vec<(String, &'a Value, String)> {
    match collection {
        Value::Object(map) => map
            .iter()
            .map(|(id, entry)| (id.clone(), entry, format!("{path}.{id}")))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let entry_path = format!("{path}[{index}]");
                match entry.get("id").and_then(Value::as_str) {
                    Some(id) => Some((id.to_string(), entry, entry_path)),
                    None => {
                        violations.push(Violation {
                            path: entry_path,
                            kind: ViolationKind::Missing {
                                field: "id".to_string(),
                            },
                        });
                        None
                    }
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}
