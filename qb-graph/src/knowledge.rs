use serde::Serialize;
use serde_json::Value;

use crate::{Attribute, Keyed, Message};

pub const PUBMED_URL: &str = "https://www.ncbi.nlm.nih.gov/pubmed/";

const PUBLICATION_TYPE_IDS: [&str; 3] = ["biolink:publications", "biolink:Publication", "publications"];
const LEGACY_PUBLICATION_TYPE: &str = "EDAM:data_0971";

fn is_publication(attribute: &Attribute) -> bool {
    attribute
        .attribute_type_id
        .as_deref()
        .is_some_and(|type_id| PUBLICATION_TYPE_IDS.contains(&type_id))
        || attribute.legacy_type.as_deref() == Some(LEGACY_PUBLICATION_TYPE)
}

/// Publication links found on a knowledge-graph node or edge.
///
/// An attribute's `value_url` is used as is; otherwise `PMID:` and `PMC:`
/// values are turned into PubMed links and anything else is ignored.
pub fn publications(attributes: &[Attribute]) -> Vec<String> {
    let mut links = Vec::new();
    for attribute in attributes.iter().filter(|attribute| is_publication(attribute)) {
        if let Some(url) = &attribute.value_url {
            links.push(url.clone());
            continue;
        }
        for value in string_values(attribute.value.as_ref()) {
            if value.starts_with("PMID:") || value.starts_with("PMC:") {
                if let Some((_, accession)) = value.split_once(':') {
                    links.push(format!("{PUBMED_URL}{accession}"));
                }
            }
        }
    }
    links
}

/// Supporting sentences carried as generic `sentences` attributes.
pub fn sentences(attributes: &[Attribute]) -> Vec<Value> {
    attributes
        .iter()
        .filter(|attribute| {
            attribute.attribute_type_id.as_deref() == Some("biolink:Attribute")
                && attribute.original_attribute_name.as_deref() == Some("sentences")
        })
        .filter_map(|attribute| attribute.value.clone())
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BindingCounts {
    pub per_node: Keyed<usize>,
    pub total: usize,
}

/// How often each knowledge-graph node is bound across all results.
pub fn binding_counts(message: &Message) -> BindingCounts {
    let mut counts = BindingCounts::default();
    for answer in &message.results {
        for bindings in answer.node_bindings.values() {
            for binding in bindings {
                let current = counts.per_node.get(&binding.id).copied().unwrap_or(0);
                counts.per_node.insert(binding.id.clone(), current + 1);
                counts.total += 1;
            }
        }
    }
    counts
}

fn string_values(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(single)) => vec![single.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Answer, Binding};
    use serde_json::json;

    fn attributes(value: Value) -> Vec<Attribute> {
        serde_json::from_value(value).expect("attributes should decode")
    }

    #[test]
    fn publications_prefer_value_url_and_expand_pubmed_ids() {
        let attrs = attributes(json!([
            {"attribute_type_id": "biolink:publications", "value": ["PMID:123", "DOI:10.1/x", "PMC:77"]},
            {"attribute_type_id": "biolink:Publication", "value": "PMID:9", "value_url": "https://example.org/paper"},
            {"type": "EDAM:data_0971", "value": "PMID:5"},
            {"attribute_type_id": "biolink:score", "value": "PMID:404"}
        ]));
        assert_eq!(
            publications(&attrs),
            vec![
                "https://www.ncbi.nlm.nih.gov/pubmed/123",
                "https://www.ncbi.nlm.nih.gov/pubmed/77",
                "https://example.org/paper",
                "https://www.ncbi.nlm.nih.gov/pubmed/5",
            ]
        );
    }

    #[test]
    fn sentences_are_collected_from_generic_attributes() {
        let attrs = attributes(json!([
            {"attribute_type_id": "biolink:Attribute", "original_attribute_name": "sentences", "value": "X treats Y."},
            {"attribute_type_id": "biolink:Attribute", "original_attribute_name": "other", "value": "no"}
        ]));
        assert_eq!(sentences(&attrs), vec![Value::from("X treats Y.")]);
    }

    #[test]
    fn binding_counts_track_every_binding() {
        let mut message = Message::default();
        for ids in [vec!["A", "B"], vec!["A"]] {
            let mut answer = Answer::default();
            answer
                .node_bindings
                .insert("n0", ids.into_iter().map(Binding::new).collect());
            message.results.push(answer);
        }
        let counts = binding_counts(&message);
        assert_eq!(counts.per_node.get("A"), Some(&2));
        assert_eq!(counts.per_node.get("B"), Some(&1));
        assert_eq!(counts.total, 3);
    }
}
