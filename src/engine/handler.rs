//! IPC request handling.
//!
//! Pure logic over [`EngineState`]; no socket I/O. Each request yields a
//! response plus an optional [`SubscribeAction`] the loop completes,
//! since only the loop holds the per-connection push channels.

use crate::ipc::protocol::{MAX_PAYLOAD_SIZE, Message, PROTOCOL_VERSION, Status};
use crate::panel::Presenter;

use super::connection::ConnectionId;
use super::selection::Selection;
use super::state::EngineState;

/// Frame space kept for the non-text fields of a response.
const REPLY_HEADROOM: usize = 4 * 1024;

/// Worst-case MessagePack header of one string (str32).
const STR_OVERHEAD: usize = 5;

/// Byte budget shared by all entry texts in one response.
const REPLY_TEXT_BUDGET: usize = MAX_PAYLOAD_SIZE - REPLY_HEADROOM;

/// Register a connection for `panel` pushes.
#[derive(Debug, PartialEq, Eq)]
pub struct SubscribeAction {
    pub connection_id: ConnectionId,
}

/// Dispatch one request.
///
/// Server-originated variants (`hello_ack`, `panel`, `response`) sent by a
/// client are answered with `unknown_type`.
pub fn handle_message<P: Presenter>(
    engine: &mut EngineState<P>,
    request: Message,
    connection_id: ConnectionId,
) -> (Message, Option<SubscribeAction>) {
    match request {
        Message::Hello { id, version } => (handle_hello(id, version), None),
        Message::ListHistory { id } => (handle_list_history(engine, id), None),
        Message::Select { id, index } => (handle_select(engine, id, index), None),
        Message::Capture { id } => (handle_capture(engine, id), None),
        Message::Toggle { id } => {
            engine.toggle();
            (visibility_response(engine, id), None)
        }
        Message::Dismiss { id } => {
            engine.dismiss();
            (visibility_response(engine, id), None)
        }
        Message::Subscribe { id } => (
            visibility_response(engine, id),
            Some(SubscribeAction { connection_id }),
        ),
        Message::HelloAck { id, .. } | Message::Panel { id, .. } | Message::Response { id, .. } => {
            (error_response(id, "unknown_type"), None)
        }
    }
}

fn handle_hello(id: u32, version: u32) -> Message {
    // hello and hello_ack always carry id 0.
    let error = if id != 0 {
        Some("invalid_hello_id")
    } else if version != PROTOCOL_VERSION {
        Some("version_mismatch")
    } else {
        None
    };
    Message::HelloAck {
        id: 0,
        status: if error.is_some() {
            Status::Error
        } else {
            Status::Ok
        },
        error: error.map(str::to_string),
    }
}

fn handle_list_history<P: Presenter>(engine: &EngineState<P>, id: u32) -> Message {
    Message::Response {
        id,
        status: Status::Ok,
        error: None,
        entries: Some(fit_in_frame(engine.snapshot())),
        visible: Some(engine.visibility().is_visible()),
        text: None,
        outcome: None,
    }
}

fn handle_select<P: Presenter>(engine: &mut EngineState<P>, id: u32, index: u32) -> Message {
    // A stale index is not an error: the caller's view was just out of date.
    let text = match engine.select(index as usize) {
        Selection::Restored { text, .. } => Some(clip_to(text, REPLY_TEXT_BUDGET)),
        Selection::Stale => None,
    };
    Message::Response {
        id,
        status: Status::Ok,
        error: None,
        entries: None,
        visible: Some(engine.visibility().is_visible()),
        text,
        outcome: None,
    }
}

fn handle_capture<P: Presenter>(engine: &mut EngineState<P>, id: u32) -> Message {
    let outcome = engine
        .capture_clipboard()
        .map_or("no_text", |outcome| outcome.as_str());
    Message::Response {
        id,
        status: Status::Ok,
        error: None,
        entries: None,
        visible: None,
        text: None,
        outcome: Some(outcome.to_string()),
    }
}

fn visibility_response<P: Presenter>(engine: &EngineState<P>, id: u32) -> Message {
    Message::Response {
        id,
        status: Status::Ok,
        error: None,
        entries: None,
        visible: Some(engine.visibility().is_visible()),
        text: None,
        outcome: None,
    }
}

/// Clip `texts` so together they fit in one response frame.
///
/// Short entries are sent whole; the longest ones share what is left of
/// the budget. History and the clipboard keep the full text.
fn fit_in_frame(texts: Vec<String>) -> Vec<String> {
    let total: usize = texts.iter().map(|t| t.len() + STR_OVERHEAD).sum();
    if total <= REPLY_TEXT_BUDGET {
        return texts;
    }

    let mut lens: Vec<usize> = texts.iter().map(String::len).collect();
    lens.sort_unstable();
    let mut remaining = REPLY_TEXT_BUDGET;
    let mut cap = 0;
    for (i, len) in lens.iter().enumerate() {
        let share = remaining / (lens.len() - i);
        if len + STR_OVERHEAD > share {
            cap = share.saturating_sub(STR_OVERHEAD);
            break;
        }
        remaining -= len + STR_OVERHEAD;
    }

    tracing::debug!(cap, entries = texts.len(), "clipping history reply");
    texts.into_iter().map(|t| clip_to(t, cap)).collect()
}

/// Truncate to at most `max_bytes`, on a char boundary.
fn clip_to(mut text: String, max_bytes: usize) -> String {
    if text.len() > max_bytes {
        let mut end = max_bytes;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

pub(super) fn error_response(id: u32, reason: &str) -> Message {
    Message::Response {
        id,
        status: Status::Error,
        error: Some(reason.to_string()),
        entries: None,
        visible: None,
        text: None,
        outcome: None,
    }
}
