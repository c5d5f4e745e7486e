//! Daemon client for the CLI.
//!
//! Connects to the daemon socket, performs the handshake, and wraps each
//! request in a typed method.

use std::path::Path;

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use crate::ipc::codec::LengthPrefixedCodec;
use crate::ipc::protocol::{Message, PROTOCOL_VERSION, Status};

use super::ClientError;

/// Result of `list_history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryListing {
    /// Full entry texts, most recent first.
    pub entries: Vec<String>,
    pub visible: bool,
}

/// One `panel` push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelUpdate {
    pub visible: bool,
    pub rows: Vec<String>,
}

/// Optional response fields, flattened out of [`Message::Response`].
struct Reply {
    entries: Option<Vec<String>>,
    visible: Option<bool>,
    text: Option<String>,
    outcome: Option<String>,
}

pub struct DaemonClient {
    framed: Framed<UnixStream, LengthPrefixedCodec>,
    next_id: u32,
}

impl DaemonClient {
    /// Connect to the daemon at `socket_path` and perform the handshake.
    pub async fn connect_to(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path).await.map_err(|e| {
            ClientError::Daemon(format!(
                "connect to {} failed: {e} (is `clipstack daemon` running?)",
                socket_path.display()
            ))
        })?;
        let mut framed = Framed::new(stream, LengthPrefixedCodec::new());

        framed
            .send(Message::Hello {
                id: 0,
                version: PROTOCOL_VERSION,
            })
            .await
            .map_err(|e| ClientError::Daemon(format!("send hello: {e}")))?;

        match framed.next().await {
            Some(Ok(Message::HelloAck {
                status: Status::Ok, ..
            })) => {}
            Some(Ok(Message::HelloAck {
                status: Status::Error,
                error,
                ..
            })) => {
                return Err(ClientError::Daemon(format!(
                    "handshake rejected: {}",
                    error.unwrap_or_default()
                )));
            }
            other => {
                return Err(ClientError::Daemon(format!(
                    "unexpected handshake response: {other:?}"
                )));
            }
        }

        Ok(Self { framed, next_id: 1 })
    }

    pub async fn list_history(&mut self) -> Result<HistoryListing, ClientError> {
        let id = self.next_id();
        let reply = self.request("list_history", Message::ListHistory { id }).await?;
        Ok(HistoryListing {
            entries: reply.entries.unwrap_or_default(),
            visible: reply.visible.unwrap_or(false),
        })
    }

    /// Restore entry `index`. `None` if the index was stale.
    pub async fn select(&mut self, index: u32) -> Result<Option<String>, ClientError> {
        let id = self.next_id();
        let reply = self.request("select", Message::Select { id, index }).await?;
        Ok(reply.text)
    }

    /// Toggle the panel; returns the new visibility.
    pub async fn toggle(&mut self) -> Result<bool, ClientError> {
        let id = self.next_id();
        let reply = self.request("toggle", Message::Toggle { id }).await?;
        Ok(reply.visible.unwrap_or(false))
    }

    pub async fn dismiss(&mut self) -> Result<bool, ClientError> {
        let id = self.next_id();
        let reply = self.request("dismiss", Message::Dismiss { id }).await?;
        Ok(reply.visible.unwrap_or(false))
    }

    /// Capture the clipboard now; returns the outcome name.
    pub async fn capture(&mut self) -> Result<String, ClientError> {
        let id = self.next_id();
        let reply = self.request("capture", Message::Capture { id }).await?;
        Ok(reply.outcome.unwrap_or_default())
    }

    /// Start receiving panel pushes; read them with [`Self::next_panel`].
    pub async fn subscribe(&mut self) -> Result<(), ClientError> {
        let id = self.next_id();
        self.request("subscribe", Message::Subscribe { id }).await?;
        Ok(())
    }

    /// Wait for the next `panel` push. `None` once the daemon hangs up.
    pub async fn next_panel(&mut self) -> Result<Option<PanelUpdate>, ClientError> {
        loop {
            match self.framed.next().await {
                Some(Ok(Message::Panel { visible, rows, .. })) => {
                    return Ok(Some(PanelUpdate { visible, rows }));
                }
                Some(Ok(other)) => {
                    tracing::debug!(?other, "ignoring non-panel message");
                }
                Some(Err(e)) => return Err(ClientError::Daemon(format!("read panel: {e}"))),
                None => return Ok(None),
            }
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    async fn request(&mut self, op: &str, msg: Message) -> Result<Reply, ClientError> {
        let id = msg.id();
        self.framed
            .send(msg)
            .await
            .map_err(|e| ClientError::Daemon(format!("send {op}: {e}")))?;

        match self.framed.next().await {
            Some(Ok(Message::Response {
                id: resp_id,
                status: Status::Ok,
                entries,
                visible,
                text,
                outcome,
                ..
            })) if resp_id == id => Ok(Reply {
                entries,
                visible,
                text,
                outcome,
            }),
            Some(Ok(Message::Response {
                status: Status::Error,
                error,
                ..
            })) => Err(ClientError::Daemon(format!(
                "{op} failed: {}",
                error.unwrap_or_default()
            ))),
            other => Err(ClientError::Daemon(format!(
                "unexpected {op} response: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    /// Accept one connection, ack the handshake, then answer each request
    /// with the next scripted message.
    async fn scripted_daemon(listener: UnixListener, script: Vec<Message>) {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, LengthPrefixedCodec::new());
        let hello = framed.next().await.unwrap().unwrap();
        assert!(matches!(hello, Message::Hello { id: 0, .. }));
        framed
            .send(Message::HelloAck {
                id: 0,
                status: Status::Ok,
                error: None,
            })
            .await
            .unwrap();
        for reply in script {
            framed.next().await.unwrap().unwrap();
            framed.send(reply).await.unwrap();
        }
    }

    fn ok(id: u32) -> Message {
        Message::Response {
            id,
            status: Status::Ok,
            error: None,
            entries: None,
            visible: None,
            text: None,
            outcome: None,
        }
    }

    #[tokio::test]
    async fn list_and_select() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&sock).unwrap();
        let server = tokio::spawn(scripted_daemon(
            listener,
            vec![
                Message::Response {
                    id: 1,
                    status: Status::Ok,
                    error: None,
                    entries: Some(vec!["world".into(), "hello".into()]),
                    visible: Some(false),
                    text: None,
                    outcome: None,
                },
                Message::Response {
                    id: 2,
                    status: Status::Ok,
                    error: None,
                    entries: None,
                    visible: Some(false),
                    text: Some("hello".into()),
                    outcome: None,
                },
                ok(3),
            ],
        ));

        let mut client = DaemonClient::connect_to(&sock).await.unwrap();
        let listing = client.list_history().await.unwrap();
        assert_eq!(listing.entries, vec!["world", "hello"]);
        assert!(!listing.visible);
        assert_eq!(client.select(1).await.unwrap().as_deref(), Some("hello"));
        // Stale select: ok without text.
        assert_eq!(client.select(9).await.unwrap(), None);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn error_response_surfaces_reason() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&sock).unwrap();
        let server = tokio::spawn(scripted_daemon(
            listener,
            vec![Message::Response {
                id: 1,
                status: Status::Error,
                error: Some("unknown_type".into()),
                entries: None,
                visible: None,
                text: None,
                outcome: None,
            }],
        ));

        let mut client = DaemonClient::connect_to(&sock).await.unwrap();
        let err = client.toggle().await.unwrap_err();
        assert!(err.to_string().contains("toggle failed: unknown_type"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn subscribe_then_read_panels() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&sock).unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, LengthPrefixedCodec::new());
            framed.next().await.unwrap().unwrap();
            framed
                .send(Message::HelloAck {
                    id: 0,
                    status: Status::Ok,
                    error: None,
                })
                .await
                .unwrap();
            framed.next().await.unwrap().unwrap();
            framed.send(ok(1)).await.unwrap();
            framed
                .send(Message::Panel {
                    id: 0,
                    visible: true,
                    rows: vec!["a".into()],
                })
                .await
                .unwrap();
        });

        let mut client = DaemonClient::connect_to(&sock).await.unwrap();
        client.subscribe().await.unwrap();
        assert_eq!(
            client.next_panel().await.unwrap(),
            Some(PanelUpdate {
                visible: true,
                rows: vec!["a".into()]
            })
        );
        server.await.unwrap();
        assert_eq!(client.next_panel().await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_daemon_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = DaemonClient::connect_to(&dir.path().join("absent.sock"))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("clipstack daemon"));
    }
}
