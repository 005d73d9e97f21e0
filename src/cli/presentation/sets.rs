//! Variable-set formatters.

use std::collections::BTreeMap;

use comfy_table::{ContentArrangement, Table};

use crate::cli::presentation::to_pretty_json;
use crate::error::HostError;
use crate::store::{StoredVariableSet, VariableSet};

pub fn format_sets_text(sets: &BTreeMap<String, VariableSet>) -> String {
    if sets.is_empty() {
        return "No variable sets.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Name", "Keys"]);
    for (id, set) in sets {
        let keys = set
            .variables
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![id.as_str(), set.name.as_str(), keys.as_str()]);
    }
    table.to_string()
}

pub fn format_sets_json(sets: &BTreeMap<String, VariableSet>) -> Result<String, HostError> {
    to_pretty_json(sets)
}

pub fn format_set_detail(id: &str, set: &VariableSet) -> Result<String, HostError> {
    to_pretty_json(&StoredVariableSet {
        id: id.to_string(),
        variable_set: set.clone(),
    })
}

pub fn format_stored_set(verb: &str, stored: &StoredVariableSet) -> String {
    format!(
        "{} variable set {} ({})",
        verb, stored.id, stored.variable_set.name
    )
}
