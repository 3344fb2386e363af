mod convert;
mod keyed;
mod knowledge;
mod message;
mod model;
mod ordering;
mod strings;
mod table;
mod validate;

pub use convert::{
    ConvertError, ReasonerEdge, ReasonerGraph, ReasonerNode, internal_to_reasoner, prune,
    reasoner_to_internal, to_current_trapi,
};
pub use keyed::Keyed;
pub use knowledge::{BindingCounts, PUBMED_URL, binding_counts, publications, sentences};
pub use message::{
    Answer, Attribute, Binding, Envelope, KgEdge, KgNode, KnowledgeGraph, Message,
};
pub use model::{QEdge, QNode, QueryGraph};
pub use ordering::{find_starting_node, incident_edge_counts, ordered_nodes, sort_nodes};
pub use strings::{display_category, display_predicate, id_label};
pub use table::{
    Column, ColumnKind, MAX_COLUMN_WIDTH, PLACEHOLDER_HEADER, SCORE_COLUMN_WIDTH, Table,
    header_text, render_table, table_columns,
};
pub use validate::{
    MESSAGE_SCHEMA_VERSION, ValidationReport, Violation, ViolationKind, ViolationView,
    validate_message, validate_query_graph,
};
