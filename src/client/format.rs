//! Output formatting for CLI client commands.
//!
//! History rows are truncated the same way the panel truncates them, and
//! labelled with the digit that quick-selects them.

use crate::panel::display_text;
use crate::trigger::QUICK_SELECT_SLOTS;

use super::daemon_client::{HistoryListing, PanelUpdate};

/// Print history as a table to stdout.
pub fn print_history(listing: &HistoryListing) {
    print!("{}", format_history(listing));
}

pub fn print_selected(index: u32, text: Option<&str>) {
    match text {
        Some(text) => println!("Restored entry {index}: {}", display_text(text)),
        None => println!("No entry at index {index}"),
    }
}

pub fn print_visibility(visible: bool) {
    println!("Panel {}", if visible { "shown" } else { "hidden" });
}

pub fn print_capture(outcome: &str) {
    println!("Capture: {}", outcome.replace('_', " "));
}

/// Print one panel push (for `watch`).
pub fn print_panel(update: &PanelUpdate) {
    if !update.visible {
        println!("[panel hidden]");
        return;
    }
    println!("[panel shown, {} entries]", update.rows.len());
    for (index, row) in update.rows.iter().enumerate() {
        println!("  {} {row}", slot_label(index));
    }
}

fn format_history(listing: &HistoryListing) -> String {
    if listing.entries.is_empty() {
        return "History is empty\n".to_string();
    }

    let mut out = format!("{:<5} {:<5} ENTRY\n", "INDEX", "KEY");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    for (index, entry) in listing.entries.iter().enumerate() {
        out.push_str(&format!(
            "{index:<5} {:<5} {}\n",
            slot_label(index),
            display_text(&single_line(entry))
        ));
    }
    out
}

/// Quick-select digit for `index`: 1–9 then 0, `-` past the last slot.
fn slot_label(index: usize) -> String {
    match index {
        i if i >= QUICK_SELECT_SLOTS => "-".to_string(),
        9 => "0".to_string(),
        i => (i + 1).to_string(),
    }
}

/// Newlines and tabs would break the table layout.
fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect()
}
