use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::Keyed;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryGraph {
    #[serde(default)]
    pub nodes: Keyed<QNode>,
    #[serde(default)]
    pub edges: Keyed<QEdge>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QNode {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "one_or_many"
    )]
    pub ids: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "one_or_many"
    )]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_set: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QEdge {
    pub subject: String,
    pub object: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "one_or_many"
    )]
    pub predicates: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QNode {
    /// A node is pinned when it is bound to at least one identifier.
    pub fn is_pinned(&self) -> bool {
        self.ids.as_ref().is_some_and(|ids| !ids.is_empty())
    }

    pub fn ids(&self) -> &[String] {
        self.ids.as_deref().unwrap_or_default()
    }

    pub fn categories(&self) -> &[String] {
        self.categories.as_deref().unwrap_or_default()
    }
}

impl QEdge {
    pub fn new(subject: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            ..Self::default()
        }
    }

    pub fn predicates(&self) -> &[String] {
        self.predicates.as_deref().unwrap_or_default()
    }
}

impl QueryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&QNode> {
        self.nodes.get(id)
    }

    pub fn with_node(mut self, id: impl Into<String>, node: QNode) -> Self {
        self.nodes.insert(id, node);
        self
    }

    pub fn with_edge(mut self, id: impl Into<String>, edge: QEdge) -> Self {
        self.edges.insert(id, edge);
        self
    }
}

/// Accepts either a single string or a list of strings; `null` reads as absent.
pub(crate) fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => None,
        Some(OneOrMany::One(value)) => Some(vec![value]),
        Some(OneOrMany::Many(values)) => Some(values),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_identifiers_are_standardized_to_lists() {
        let node: QNode = serde_json::from_str(
            r#"{"ids":"MONDO:0005737","categories":"biolink:Disease","color":"red"}"#,
        )
        .expect("node should decode");
        assert_eq!(node.ids(), ["MONDO:0005737".to_string()]);
        assert_eq!(node.categories(), ["biolink:Disease".to_string()]);
        assert_eq!(node.extra.get("color"), Some(&Value::from("red")));
        assert!(node.is_pinned());
    }

    #[test]
    fn empty_ids_do_not_pin_a_node() {
        let node: QNode = serde_json::from_str(r#"{"ids":[]}"#).expect("node should decode");
        assert!(!node.is_pinned());
        let node: QNode = serde_json::from_str(r#"{"ids":null}"#).expect("node should decode");
        assert!(node.ids.is_none());
    }
}
