//! Page catalog formatters.

use comfy_table::Table;

use crate::cli::presentation::to_pretty_json;
use crate::error::HostError;
use crate::pages::PageCatalog;

pub fn format_pages_text(catalog: &PageCatalog) -> String {
    if catalog.is_empty() {
        return "No content pages found.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Name", "Id", "URL"]);
    for page in catalog.iter() {
        table.add_row(vec![&page.name, &page.directory, &page.url]);
    }
    table.to_string()
}

pub fn format_pages_json(catalog: &PageCatalog) -> Result<String, HostError> {
    let pages: Vec<_> = catalog.iter().collect();
    to_pretty_json(&pages)
}
