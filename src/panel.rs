//! Presentation model — visibility state and the presenter seam.
//!
//! The engine owns the [`Visibility`] flag and pushes [`PanelView`]s to a
//! [`Presenter`] whenever what the user would see changes. Rendering,
//! hit-testing and focus handling belong to the presenter; clicks come back
//! through the same selection entry point as quick-select.

/// Maximum characters shown per row before the ellipsis.
pub const DISPLAY_MAX_CHARS: usize = 45;

/// Marker appended to truncated rows.
pub const ELLIPSIS: &str = "…";

/// Panel visibility. Initial state is `Hidden`; there is no terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Hidden,
    Visible,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }

    /// The state after a toggle trigger.
    pub fn toggled(self) -> Visibility {
        match self {
            Visibility::Hidden => Visibility::Visible,
            Visibility::Visible => Visibility::Hidden,
        }
    }
}

/// What a presenter should currently show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub visibility: Visibility,
    /// Display rows (already truncated), most recent first.
    pub rows: Vec<String>,
}

impl PanelView {
    /// Build a view from full history texts.
    pub fn from_entries(visibility: Visibility, entries: &[String]) -> Self {
        Self {
            visibility,
            rows: entries.iter().map(|e| display_text(e)).collect(),
        }
    }
}

/// Renders panel views. Implementations must not block the engine loop.
pub trait Presenter: Send {
    fn render(&mut self, view: &PanelView);
}

/// Truncate a snippet for display: the first 45 characters plus an
/// ellipsis if the text is longer, otherwise unchanged.
///
/// Counts Unicode scalar values, not bytes.
pub fn display_text(text: &str) -> String {
    match text.char_indices().nth(DISPLAY_MAX_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
