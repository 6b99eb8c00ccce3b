use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures_util::future::join_all;
use minesync_protocol::Notification;

use crate::{ConnectionId, Unreachable};

/// Delivers notifications to live connections.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn send(
        &self,
        connection: &ConnectionId,
        notification: &Notification,
    ) -> Result<(), Unreachable>;
}

#[async_trait]
impl<T: Broadcaster + ?Sized> Broadcaster for Arc<T> {
    async fn send(
        &self,
        connection: &ConnectionId,
        notification: &Notification,
    ) -> Result<(), Unreachable> {
        (**self).send(connection, notification).await
    }
}

/// Sends `notification` to every connection at once and returns the ones
/// that could not be reached. A failed delivery never stops the others, and
/// a delivery still pending after `limit` counts as failed.
pub async fn fan_out<'a, B>(
    broadcaster: &B,
    connections: impl IntoIterator<Item = &'a ConnectionId>,
    notification: &Notification,
    limit: Duration,
) -> Vec<ConnectionId>
where
    B: Broadcaster + ?Sized,
{
    let deliveries = connections.into_iter().map(|connection| async move {
        tokio::time::timeout(limit, broadcaster.send(connection, notification))
            .await
            .unwrap_or_else(|_| {
                log::warn!("Delivery to {connection} still pending after {limit:?}");
                Err(Unreachable(connection.clone()))
            })
    });

    join_all(deliveries)
        .await
        .into_iter()
        .filter_map(Result::err)
        .map(|Unreachable(connection)| {
            log::warn!("Dropping notification for unreachable connection {connection}");
            connection
        })
        .collect()
}

/// In-process broadcaster with one unbounded queue per connection. A
/// connection becomes unreachable once its receiver is dropped.
#[derive(Debug, Default)]
pub struct ChannelBroadcaster {
    outboxes: DashMap<ConnectionId, UnboundedSender<Notification>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh queue for `connection`, replacing any previous one.
    pub fn register(&self, connection: ConnectionId) -> UnboundedReceiver<Notification> {
        let (sender, receiver) = unbounded();
        self.outboxes.insert(connection, sender);
        receiver
    }

    pub fn unregister(&self, connection: &ConnectionId) {
        self.outboxes.remove(connection);
    }

    pub fn is_registered(&self, connection: &ConnectionId) -> bool {
        self.outboxes.contains_key(connection)
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn send(
        &self,
        connection: &ConnectionId,
        notification: &Notification,
    ) -> Result<(), Unreachable> {
        let sender = self
            .outboxes
            .get(connection)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Unreachable(connection.clone()))?;

        if sender.unbounded_send(notification.clone()).is_err() {
            self.outboxes.remove(connection);
            return Err(Unreachable(connection.clone()));
        }
        Ok(())
    }
}
