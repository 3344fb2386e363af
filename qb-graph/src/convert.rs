//! Conversions between the query-graph shapes in circulation:
//! the map form used on the wire and internally, the older list form used by
//! reasoners, and pre-1.0 documents that still carry legacy field names.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{Keyed, QEdge, QNode, QueryGraph};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasonerGraph {
    #[serde(default)]
    pub nodes: Vec<ReasonerNode>,
    #[serde(default)]
    pub edges: Vec<ReasonerEdge>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasonerNode {
    pub id: String,
    #[serde(flatten)]
    pub node: QNode,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasonerEdge {
    pub id: String,
    #[serde(flatten)]
    pub edge: QEdge,
}

#[derive(Debug)]
pub enum ConvertError {
    DuplicateNode(String),
    DuplicateEdge(String),
    Shape(&'static str),
    Decode(serde_json::Error),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::DuplicateNode(id) => write!(f, "duplicate node id `{id}`"),
            ConvertError::DuplicateEdge(id) => write!(f, "duplicate edge id `{id}`"),
            ConvertError::Shape(message) => write!(f, "invalid query graph: {message}"),
            ConvertError::Decode(err) => write!(f, "invalid query graph: {err}"),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<serde_json::Error> for ConvertError {
    fn from(value: serde_json::Error) -> Self {
        ConvertError::Decode(value)
    }
}

pub fn reasoner_to_internal(graph: &ReasonerGraph) -> Result<QueryGraph, ConvertError> {
    let mut nodes = Keyed::new();
    for entry in &graph.nodes {
        if nodes.insert(entry.id.clone(), entry.node.clone()).is_some() {
            return Err(ConvertError::DuplicateNode(entry.id.clone()));
        }
    }
    let mut edges = Keyed::new();
    for entry in &graph.edges {
        if edges.insert(entry.id.clone(), entry.edge.clone()).is_some() {
            return Err(ConvertError::DuplicateEdge(entry.id.clone()));
        }
    }
    Ok(QueryGraph { nodes, edges })
}

/// List form of `graph` with empty optional lists dropped.
pub fn internal_to_reasoner(graph: &QueryGraph) -> ReasonerGraph {
    let pruned = prune(graph);
    ReasonerGraph {
        nodes: pruned
            .nodes
            .into_iter()
            .map(|(id, node)| ReasonerNode { id, node })
            .collect(),
        edges: pruned
            .edges
            .into_iter()
            .map(|(id, edge)| ReasonerEdge { id, edge })
            .collect(),
    }
}

/// Copy of `graph` without empty `ids`, `categories` and `predicates` lists.
pub fn prune(graph: &QueryGraph) -> QueryGraph {
    QueryGraph {
        nodes: graph.nodes.map_values(|node| QNode {
            ids: non_empty(&node.ids),
            categories: non_empty(&node.categories),
            ..node.clone()
        }),
        edges: graph.edges.map_values(|edge| QEdge {
            predicates: non_empty(&edge.predicates),
            ..edge.clone()
        }),
    }
}

/// Reads a query graph in any supported shape and returns the current map form.
///
/// List-shaped `nodes`/`edges` are keyed by their `id`. Legacy keys are renamed
/// unless the current key is already present: `curie` to `ids`, `category` or
/// `type` to `categories` on nodes, `predicate` or `type` to `predicates` and
/// `source_id`/`target_id` to `subject`/`object` on edges.
pub fn to_current_trapi(value: &Value) -> Result<QueryGraph, ConvertError> {
    let Some(object) = value.as_object() else {
        return Err(ConvertError::Shape("query graph must be an object"));
    };
    let nodes = upgrade_collection(
        object.get("nodes"),
        &[("curie", "ids"), ("category", "categories"), ("type", "categories")],
        ConvertError::DuplicateNode,
    )?;
    let edges = upgrade_collection(
        object.get("edges"),
        &[
            ("source_id", "subject"),
            ("target_id", "object"),
            ("predicate", "predicates"),
            ("type", "predicates"),
        ],
        ConvertError::DuplicateEdge,
    )?;

    let mut upgraded = Map::new();
    upgraded.insert("nodes".to_string(), Value::Object(nodes));
    upgraded.insert("edges".to_string(), Value::Object(edges));
    Ok(serde_json::from_value(Value::Object(upgraded))?)
}

fn upgrade_collection(
    value: Option<&Value>,
    renames: &[(&str, &str)],
    duplicate: fn(String) -> ConvertError,
) -> Result<Map<String, Value>, ConvertError> {
    let mut out = Map::new();
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (id, entry) in entries {
                out.insert(id.clone(), upgrade_entry(id, entry, renames)?);
            }
        }
        Some(Value::Array(entries)) => {
            for entry in entries {
                let Some(id) = entry.get("id").and_then(Value::as_str) else {
                    return Err(ConvertError::Shape("list entries need a string `id`"));
                };
                let mut upgraded = upgrade_entry(id, entry, renames)?;
                if let Value::Object(fields) = &mut upgraded {
                    fields.remove("id");
                }
                if out.insert(id.to_string(), upgraded).is_some() {
                    return Err(duplicate(id.to_string()));
                }
            }
        }
        Some(_) => return Err(ConvertError::Shape("nodes and edges must be objects or lists")),
    }
    Ok(out)
}

fn upgrade_entry(id: &str, entry: &Value, renames: &[(&str, &str)]) -> Result<Value, ConvertError> {
    let Some(fields) = entry.as_object() else {
        return Err(ConvertError::Shape("query graph entries must be objects"));
    };
    let mut upgraded = fields.clone();
    for (legacy, current) in renames {
        if upgraded.contains_key(*current) {
            continue;
        }
        if let Some(value) = upgraded.remove(*legacy) {
            debug!("upgrading legacy field `{legacy}` to `{current}` on `{id}`");
            upgraded.insert((*current).to_string(), value);
        }
    }
    Ok(Value::Object(upgraded))
}

fn non_empty(values: &Option<Vec<String>>) -> Option<Vec<String>> {
    values.as_ref().filter(|values| !values.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reasoner_fixture() -> ReasonerGraph {
        serde_json::from_value(json!({
            "nodes": [
                {"id": "n0", "ids": ["MONDO:0005737"], "categories": ["biolink:Disease"], "name": "Ebola"},
                {"id": "n1", "categories": "biolink:ChemicalEntity", "ids": []}
            ],
            "edges": [
                {"id": "e0", "subject": "n1", "object": "n0", "predicates": ["biolink:treats"], "knowledge_type": "inferred"}
            ]
        }))
        .expect("reasoner graph should decode")
    }

    #[test]
    fn reasoner_round_trip_is_stable_up_to_pruning() {
        let reasoner = reasoner_fixture();
        let internal = reasoner_to_internal(&reasoner).expect("conversion should succeed");
        assert_eq!(internal.nodes.keys().collect::<Vec<_>>(), vec!["n0", "n1"]);
        assert_eq!(
            internal.node("n1").map(|node| node.categories().to_vec()),
            Some(vec!["biolink:ChemicalEntity".to_string()])
        );

        let back = internal_to_reasoner(&internal);
        let mut expected = reasoner.clone();
        expected.nodes[1].node.ids = None;
        assert_eq!(back, expected);
        assert_eq!(
            reasoner_to_internal(&back).expect("second conversion should succeed"),
            prune(&internal)
        );
    }

    #[test]
    fn duplicate_list_ids_are_rejected() {
        let mut reasoner = reasoner_fixture();
        reasoner.nodes.push(ReasonerNode {
            id: "n0".to_string(),
            node: QNode::default(),
        });
        let err = reasoner_to_internal(&reasoner).expect_err("duplicate ids should fail");
        assert!(matches!(err, ConvertError::DuplicateNode(id) if id == "n0"));
    }

    #[test]
    fn legacy_fields_are_upgraded() {
        let legacy = json!({
            "nodes": [
                {"id": "n0", "curie": "MONDO:0005737", "type": "disease"},
                {"id": "n1", "category": ["biolink:Gene"]}
            ],
            "edges": [
                {"id": "e0", "source_id": "n1", "target_id": "n0", "predicate": "biolink:related_to"}
            ]
        });
        let graph = to_current_trapi(&legacy).expect("legacy graph should upgrade");
        let n0 = graph.node("n0").expect("n0 should exist");
        assert_eq!(n0.ids(), ["MONDO:0005737".to_string()]);
        assert_eq!(n0.categories(), ["disease".to_string()]);
        let edge = graph.edges.get("e0").expect("e0 should exist");
        assert_eq!((edge.subject.as_str(), edge.object.as_str()), ("n1", "n0"));
        assert_eq!(edge.predicates(), ["biolink:related_to".to_string()]);
        assert!(edge.extra.is_empty());
    }

    #[test]
    fn current_map_form_passes_through() {
        let current = json!({
            "nodes": {"n0": {"ids": ["X:1"]}, "n1": {}},
            "edges": {"e0": {"subject": "n0", "object": "n1"}}
        });
        let graph = to_current_trapi(&current).expect("graph should decode");
        assert_eq!(serde_json::to_value(&graph).expect("graph should encode"), current);
    }

    #[test]
    fn non_object_graph_is_a_shape_error() {
        let err = to_current_trapi(&json!([1, 2])).expect_err("arrays are not graphs");
        assert!(matches!(err, ConvertError::Shape(_)));
    }
}
