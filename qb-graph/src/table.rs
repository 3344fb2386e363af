use serde::{Deserialize, Serialize};

use crate::{
    Answer, Message, QNode,
    ordering::ordered_nodes,
    strings::{display_category, id_label},
};

pub const MAX_COLUMN_WIDTH: usize = 400;
pub const SCORE_COLUMN_WIDTH: usize = 30;
pub const PLACEHOLDER_HEADER: &str = "Something";
const CHAR_WIDTH: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub header: String,
    pub width: usize,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    Node { categories: Vec<String> },
    Score,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

/// Header text for a query node: name, then bound ids, then categories.
pub fn header_text(node: &QNode) -> String {
    [
        node.name.clone().unwrap_or_default(),
        id_label(node.ids()),
        display_category(node.categories()),
    ]
    .into_iter()
    .find(|text| !text.is_empty())
    .unwrap_or_else(|| PLACEHOLDER_HEADER.to_string())
}

/// One column per query node in traversal order, plus a trailing score column
/// when the results are scored. A query graph without nodes yields no columns.
pub fn table_columns(message: &Message) -> Vec<Column> {
    let query_graph = &message.query_graph;
    let mut columns = ordered_nodes(query_graph)
        .into_iter()
        .filter_map(|id| query_graph.node(id).map(|node| (id, node)))
        .map(|(id, node)| {
            let text = header_text(node);
            Column {
                id: id.to_string(),
                width: column_width(message, id, &text),
                header: format!("{text} ({id})"),
                kind: ColumnKind::Node {
                    categories: node.categories().to_vec(),
                },
            }
        })
        .collect::<Vec<_>>();

    if columns.is_empty() {
        return columns;
    }
    if message
        .results
        .first()
        .is_some_and(|answer| answer.score.is_some())
    {
        columns.push(Column {
            id: "score".to_string(),
            header: "Score".to_string(),
            width: SCORE_COLUMN_WIDTH,
            kind: ColumnKind::Score,
        });
    }
    columns
}

impl Column {
    pub fn render_cell(&self, message: &Message, answer: &Answer) -> String {
        match &self.kind {
            ColumnKind::Score => answer
                .score
                .map(|score| ((score * 1000.0).round() / 1000.0).to_string())
                .unwrap_or_default(),
            ColumnKind::Node { categories } => {
                let bindings = answer.bindings(&self.id);
                match bindings {
                    [] => String::new(),
                    [single] => message
                        .knowledge_graph
                        .node_name(&single.id)
                        .filter(|name| !name.is_empty())
                        .unwrap_or(&single.id)
                        .to_string(),
                    many => format!("Set of {} [{}]", display_category(categories), many.len()),
                }
            }
        }
    }
}

pub fn render_table(message: &Message) -> Table {
    let columns = table_columns(message);
    let rows = message
        .results
        .iter()
        .map(|answer| {
            columns
                .iter()
                .map(|column| column.render_cell(message, answer))
                .collect()
        })
        .collect();
    Table { columns, rows }
}

fn column_width(message: &Message, qg_id: &str, header_text: &str) -> usize {
    let longest_cell = message
        .results
        .iter()
        .filter_map(|answer| answer.bindings(qg_id).first())
        .map(|binding| {
            message
                .knowledge_graph
                .node_name(&binding.id)
                .map(|name| name.chars().count())
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0);
    let length = longest_cell.max(header_text.chars().count());
    (length * CHAR_WIDTH).min(MAX_COLUMN_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Binding, KgNode, QEdge, QueryGraph};

    fn named(name: &str) -> KgNode {
        KgNode {
            name: Some(name.to_string()),
            ..KgNode::default()
        }
    }

    fn answer(bindings: &[(&str, &[&str])], score: Option<f64>) -> Answer {
        let mut answer = Answer {
            score,
            ..Answer::default()
        };
        for (qg_id, ids) in bindings {
            answer
                .node_bindings
                .insert(*qg_id, ids.iter().map(|id| Binding::new(*id)).collect());
        }
        answer
    }

    fn treats_message() -> Message {
        let mut message = Message::default();
        message.query_graph = QueryGraph::new()
            .with_node(
                "n0",
                QNode {
                    categories: Some(vec!["biolink:ChemicalEntity".to_string()]),
                    ..QNode::default()
                },
            )
            .with_node(
                "n1",
                QNode {
                    ids: Some(vec!["MONDO:0005737".to_string()]),
                    name: Some("Ebola".to_string()),
                    ..QNode::default()
                },
            )
            .with_edge("e0", QEdge::new("n0", "n1"));
        message
            .knowledge_graph
            .nodes
            .insert("MONDO:0005737", named("Ebola hemorrhagic fever"));
        message
            .knowledge_graph
            .nodes
            .insert("CHEBI:145994", named("remdesivir"));
        message
    }

    #[test]
    fn empty_query_graph_yields_no_columns() {
        let mut message = Message::default();
        message.results.push(answer(&[], Some(1.0)));
        assert!(table_columns(&message).is_empty());
    }

    #[test]
    fn edgeless_graph_yields_one_column_per_node() {
        let mut message = Message::default();
        message.query_graph = QueryGraph::new()
            .with_node("a", QNode::default())
            .with_node("b", QNode::default())
            .with_node("c", QNode::default());
        let columns = table_columns(&message);
        assert_eq!(
            columns.iter().map(|column| column.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert_eq!(columns[0].header, "Something (a)");

        message.results.push(answer(&[], Some(0.5)));
        assert_eq!(table_columns(&message).len(), 4);
    }

    #[test]
    fn columns_start_at_pinned_node_and_render_cells() {
        let mut message = treats_message();
        message.results.push(answer(
            &[("n0", &["CHEBI:145994"]), ("n1", &["MONDO:0005737"])],
            Some(0.98765),
        ));
        message.results.push(answer(
            &[("n0", &["CHEBI:1", "CHEBI:2"]), ("n1", &["MONDO:0005737"])],
            Some(0.5),
        ));

        let table = render_table(&message);
        let headers = table
            .columns
            .iter()
            .map(|column| column.header.as_str())
            .collect::<Vec<_>>();
        assert_eq!(headers, vec!["Ebola (n1)", "Chemical Entity (n0)", "Score"]);

        assert_eq!(table.rows[0], vec!["Ebola hemorrhagic fever", "remdesivir", "0.988"]);
        assert_eq!(table.rows[1][1], "Set of Chemical Entity [2]");
        assert_eq!(table.columns[0].width, 230);
        assert_eq!(table.columns[2].width, SCORE_COLUMN_WIDTH);
    }

    #[test]
    fn unnamed_knowledge_node_renders_raw_id_and_width_is_capped() {
        let mut message = treats_message();
        message.knowledge_graph.nodes.insert("CHEBI:9", named(&"x".repeat(80)));
        message
            .results
            .push(answer(&[("n0", &["CHEBI:404"]), ("n1", &["CHEBI:9"])], None));
        let table = render_table(&message);
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.rows[0][1], "CHEBI:404");
        assert_eq!(table.columns[0].width, MAX_COLUMN_WIDTH);
    }

    #[test]
    fn header_falls_back_through_ids_and_categories() {
        let node = QNode {
            ids: Some(vec!["NCBIGene:1080".to_string()]),
            categories: Some(vec!["biolink:Gene".to_string()]),
            ..QNode::default()
        };
        assert_eq!(header_text(&node), "NCBIGene:1080");
        let node = QNode {
            categories: Some(vec!["biolink:Gene".to_string()]),
            ..QNode::default()
        };
        assert_eq!(header_text(&node), "Gene");
    }
}
