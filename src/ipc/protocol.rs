//! Wire protocol message types for daemon IPC.
//!
//! All messages are MessagePack-encoded maps with at minimum `type` and `id`
//! fields.

use serde::{Deserialize, Serialize};

/// All wire protocol messages.
///
/// Serialized as a tagged union on the `type` field via MessagePack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Message {
    // -- Handshake --
    #[serde(rename = "hello")]
    Hello { id: u32, version: u32 },

    #[serde(rename = "hello_ack")]
    HelloAck {
        id: u32,
        status: Status,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    // -- History --
    #[serde(rename = "list_history")]
    ListHistory { id: u32 },

    /// Restore entry `index` (0 = most recent), as quick-select would.
    #[serde(rename = "select")]
    Select { id: u32, index: u32 },

    /// Read the clipboard now, bypassing the copy-key debounce.
    #[serde(rename = "capture")]
    Capture { id: u32 },

    // -- Panel --
    #[serde(rename = "toggle")]
    Toggle { id: u32 },

    #[serde(rename = "dismiss")]
    Dismiss { id: u32 },

    /// Receive `panel` pushes on this connection from now on.
    #[serde(rename = "subscribe")]
    Subscribe { id: u32 },

    // -- Unsolicited (daemon → subscriber) --
    #[serde(rename = "panel")]
    Panel {
        id: u32,
        visible: bool,
        /// Display rows, already truncated, most recent first.
        rows: Vec<String>,
    },

    // -- Generic response --
    #[serde(rename = "response")]
    Response {
        id: u32,
        status: Status,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Full entry texts, most recent first.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entries: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        visible: Option<bool>,
        /// Restored text for `select`; absent when the index was stale.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// `inserted`, `suppressed_empty`, `suppressed_duplicate` or
        /// `no_text` for `capture`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outcome: Option<String>,
    },
}

impl Message {
    /// Request/response correlation id.
    pub fn id(&self) -> u32 {
        match self {
            Message::Hello { id, .. }
            | Message::HelloAck { id, .. }
            | Message::ListHistory { id }
            | Message::Select { id, .. }
            | Message::Capture { id }
            | Message::Toggle { id }
            | Message::Dismiss { id }
            | Message::Subscribe { id }
            | Message::Panel { id, .. }
            | Message::Response { id, .. } => *id,
        }
    }
}

/// Response status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum payload size (1 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Minimal envelope for extracting `{type, id}` from unknown messages.
///
/// Used by the daemon as a fallback when [`Message`] deserialization
/// fails (e.g., unknown `type` tag), so the error response can echo the
/// request `id`.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(msg: &Message) -> Message {
        let encoded = rmp_serde::to_vec_named(msg).unwrap();
        rmp_serde::from_slice(&encoded).unwrap()
    }

    #[test]
    fn hello_ack_error_round_trip() {
        let msg = Message::HelloAck {
            id: 0,
            status: Status::Error,
            error: Some("version_mismatch".into()),
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn select_round_trip() {
        let msg = Message::Select { id: 4, index: 9 };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn panel_preserves_unicode_rows() {
        let msg = Message::Panel {
            id: 0,
            visible: true,
            rows: vec!["héllo wörld".into(), "日本語".into()],
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn response_with_entries_round_trip() {
        let msg = Message::Response {
            id: 7,
            status: Status::Ok,
            error: None,
            entries: Some(vec!["world".into(), "hello".into()]),
            visible: Some(false),
            text: None,
            outcome: None,
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn response_optional_fields_are_omitted() {
        #[derive(serde::Deserialize)]
        struct Keys {
            #[serde(rename = "type")]
            msg_type: String,
            id: u32,
            status: Status,
            entries: Option<Vec<String>>,
            text: Option<String>,
        }

        let msg = Message::Response {
            id: 2,
            status: Status::Ok,
            error: None,
            entries: None,
            visible: None,
            text: None,
            outcome: None,
        };
        let encoded = rmp_serde::to_vec_named(&msg).unwrap();
        let keys: Keys = rmp_serde::from_slice(&encoded).unwrap();
        assert_eq!(keys.msg_type, "response");
        assert_eq!(keys.id, 2);
        assert_eq!(keys.status, Status::Ok);
        assert!(keys.entries.is_none());
        assert!(keys.text.is_none());
    }

    #[test]
    fn missing_optional_fields_default() {
        // A minimal response from an older daemon omits every optional key.
        #[derive(serde::Serialize)]
        struct Minimal {
            #[serde(rename = "type")]
            msg_type: &'static str,
            id: u32,
            status: Status,
        }
        let encoded = rmp_serde::to_vec_named(&Minimal {
            msg_type: "response",
            id: 3,
            status: Status::Ok,
        })
        .unwrap();
        let decoded: Message = rmp_serde::from_slice(&encoded).unwrap();
        assert_eq!(
            decoded,
            Message::Response {
                id: 3,
                status: Status::Ok,
                error: None,
                entries: None,
                visible: None,
                text: None,
                outcome: None,
            }
        );
    }

    #[test]
    fn raw_envelope_reads_unknown_type() {
        #[derive(serde::Serialize)]
        struct Unknown {
            #[serde(rename = "type")]
            msg_type: &'static str,
            id: u32,
            extra: bool,
        }
        let encoded = rmp_serde::to_vec_named(&Unknown {
            msg_type: "frobnicate",
            id: 42,
            extra: true,
        })
        .unwrap();
        assert!(rmp_serde::from_slice::<Message>(&encoded).is_err());
        let envelope: RawEnvelope = rmp_serde::from_slice(&encoded).unwrap();
        assert_eq!(envelope.msg_type, "frobnicate");
        assert_eq!(envelope.id, 42);
    }

    #[test]
    fn id_accessor_covers_requests() {
        assert_eq!(Message::Toggle { id: 5 }.id(), 5);
        assert_eq!(Message::Select { id: 6, index: 0 }.id(), 6);
    }
}
