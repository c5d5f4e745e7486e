use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_PRIMARY, DEFAULT_TOGGLE};

#[derive(Parser)]
#[command(name = "clipstack", about = "Keyboard-driven clipboard history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the clipboard-history daemon
    Daemon {
        /// Maximum number of history entries kept
        #[arg(long, default_value_t = 10)]
        max_entries: usize,

        /// Chord that shows/hides the history panel
        #[arg(long, default_value = DEFAULT_TOGGLE)]
        toggle_key: String,

        /// Primary modifier for copy/cut/paste and quick-select (Control, Super, ...)
        #[arg(long, default_value = DEFAULT_PRIMARY)]
        primary: String,

        /// Delay between a copy/cut key and the clipboard read, in milliseconds
        #[arg(long, default_value_t = 100)]
        capture_delay_ms: u64,

        /// Restore entries to the clipboard without replaying paste
        #[arg(long)]
        no_paste: bool,
    },

    /// Talk to a running daemon
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },
}

#[derive(Subcommand)]
pub enum ClientAction {
    /// Print history, most recent first
    List,

    /// Restore the entry at INDEX (0 = most recent)
    Select { index: u32 },

    /// Show or hide the panel
    Toggle,

    /// Hide the panel
    Dismiss,

    /// Read the clipboard into history now
    Capture,

    /// Print panel updates as they happen
    Watch,
}
