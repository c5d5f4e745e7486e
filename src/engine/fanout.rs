//! Presenter that pushes panel views to subscribed IPC connections.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;

use crate::ipc::protocol::Message;
use crate::panel::{PanelView, Presenter};

use super::connection::ConnectionId;

/// Fans each rendered [`PanelView`] out as an unsolicited `panel` message.
///
/// A subscriber whose connection has gone away is dropped on the next
/// render.
#[derive(Debug, Default)]
pub struct FanoutPresenter {
    subscribers: HashMap<ConnectionId, UnboundedSender<Message>>,
}

impl FanoutPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber and send it `current` so it starts in sync.
    pub fn subscribe(
        &mut self,
        conn_id: ConnectionId,
        tx: UnboundedSender<Message>,
        current: &PanelView,
    ) {
        if tx.send(panel_message(current)).is_ok() {
            self.subscribers.insert(conn_id, tx);
            tracing::debug!(
                ?conn_id,
                subscribers = self.subscriber_count(),
                "panel subscriber added"
            );
        }
    }

    pub fn unsubscribe(&mut self, conn_id: ConnectionId) {
        if self.subscribers.remove(&conn_id).is_some() {
            tracing::debug!(?conn_id, "panel subscriber removed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Presenter for FanoutPresenter {
    fn render(&mut self, view: &PanelView) {
        tracing::debug!(
            visible = view.visibility.is_visible(),
            rows = view.rows.len(),
            subscribers = self.subscribers.len(),
            "render panel"
        );
        let msg = panel_message(view);
        self.subscribers
            .retain(|_, tx| tx.send(msg.clone()).is_ok());
    }
}

fn panel_message(view: &PanelView) -> Message {
    Message::Panel {
        id: 0,
        visible: view.visibility.is_visible(),
        rows: view.rows.clone(),
    }
}
