//! Built-in query templates

use harvest_sparql::QueryStore;

/// Template names
pub mod names {
    #![allow(missing_docs)]
    pub const IS_TASK: &str = "is_task";
    pub const LOAD_TASK: &str = "load_task";
    pub const UPDATE_TASK_STATUS: &str = "update_task_status";
    pub const SELECT_INPUT_CONTAINERS: &str = "select_input_containers";
    pub const HAS_FILE_SOURCE: &str = "has_file_source";
    pub const COUNT_INPUT_FILES: &str = "count_input_files";
    pub const FETCH_INPUT_FILES: &str = "fetch_input_files";
    pub const COUNT_GRAPH_TRIPLES: &str = "count_graph_triples";
    pub const FETCH_GRAPH_TRIPLES: &str = "fetch_graph_triples";
    pub const APPEND_RESULT_FILE: &str = "append_result_file";
    pub const APPEND_RESULT_GRAPH: &str = "append_result_graph";
    pub const APPEND_TASK_ERROR: &str = "append_task_error";
    pub const REGISTER_FILE: &str = "register_file";
}

const TEMPLATES: &[(&str, &str)] = &[
    (names::IS_TASK, include_str!("../queries/is_task.sparql")),
    (names::LOAD_TASK, include_str!("../queries/load_task.sparql")),
    (names::UPDATE_TASK_STATUS, include_str!("../queries/update_task_status.sparql")),
    (names::SELECT_INPUT_CONTAINERS, include_str!("../queries/select_input_containers.sparql")),
    (names::HAS_FILE_SOURCE, include_str!("../queries/has_file_source.sparql")),
    (names::COUNT_INPUT_FILES, include_str!("../queries/count_input_files.sparql")),
    (names::FETCH_INPUT_FILES, include_str!("../queries/fetch_input_files.sparql")),
    (names::COUNT_GRAPH_TRIPLES, include_str!("../queries/count_graph_triples.sparql")),
    (names::FETCH_GRAPH_TRIPLES, include_str!("../queries/fetch_graph_triples.sparql")),
    (names::APPEND_RESULT_FILE, include_str!("../queries/append_result_file.sparql")),
    (names::APPEND_RESULT_GRAPH, include_str!("../queries/append_result_graph.sparql")),
    (names::APPEND_TASK_ERROR, include_str!("../queries/append_task_error.sparql")),
    (names::REGISTER_FILE, include_str!("../queries/register_file.sparql")),
];

/// Template table shipped with the worker
#[must_use]
pub fn default_queries() -> QueryStore {
    QueryStore::from_templates(TEMPLATES.iter().copied())
}
