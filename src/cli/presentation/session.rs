//! Simulation report formatters: the event log as a table, then notices.

use comfy_table::{ContentArrangement, Table};
use owo_colors::OwoColorize;

use crate::cli::presentation::to_pretty_json;
use crate::cli::script::SimulationReport;
use crate::coordinator::Notice;
use crate::error::HostError;
use crate::event_log::{Direction, Event};

pub fn format_session_text(report: &SimulationReport) -> String {
    let mut out = String::new();
    if report.events.is_empty() {
        out.push_str("Event log is empty.");
    } else {
        let mut table = Table::new();
        table.load_preset(comfy_table::presets::UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["#", "Time", "Dir", "Event", "Page", "Variables"]);
        for (index, event) in report.events.iter().enumerate() {
            table.add_row(vec![
                (index + 1).to_string(),
                event.timestamp.format("%H:%M:%S%.3f").to_string(),
                direction_label(event),
                event.name.clone(),
                event.page_id.clone().unwrap_or_else(|| "-".to_string()),
                variables_cell(event),
            ]);
        }
        out.push_str(&table.to_string());
    }

    let state = &report.state;
    out.push_str(&format!(
        "\n\nMode: {}  Page: {}  Variables: {}",
        state.display_mode,
        state.selected_page_id.as_deref().unwrap_or("-"),
        if state.current_variables.is_some() { "set" } else { "none" },
    ));

    if !report.notices.is_empty() {
        out.push_str(&format!("\n\n{}", "Notices:".yellow().bold()));
        for notice in &report.notices {
            out.push_str(&format!("\n  - {}", describe(notice)));
        }
    }
    out
}

pub fn format_session_json(report: &SimulationReport) -> Result<String, HostError> {
    to_pretty_json(&report.events)
}

fn direction_label(event: &Event) -> String {
    match event.direction {
        Direction::Inbound => format!("{}", "in".cyan()),
        Direction::Outbound => format!("{}", "out".green()),
    }
}

fn variables_cell(event: &Event) -> String {
    if let Some(raw) = &event.raw {
        return raw.to_string();
    }
    event
        .variables
        .as_ref()
        .map(|vars| serde_json::Value::Object(vars.clone()).to_string())
        .unwrap_or_default()
}

fn describe(notice: &Notice) -> String {
    match notice {
        Notice::TabClosed(reason) => format!("detached tab closed ({:?})", reason),
        Notice::HandshakeTimeout { attempts } => {
            format!("detached tab never answered after {} attempts", attempts)
        }
        Notice::MalformedPayload(detail) => format!("malformed payload: {}", detail),
        Notice::TransportUnavailable => "broadcast channels unavailable".to_string(),
        Notice::Failed(detail) => detail.red().to_string(),
    }
}
