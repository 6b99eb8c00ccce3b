use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_channel::mpsc::UnboundedReceiver;
use futures_util::{FutureExt, StreamExt};
use minesync_core::{BoardValues, FixedBoardGenerator};
use minesync_protocol::{Coordinates, Notification};

use crate::*;

pub type TestController<S> = SessionController<S, Arc<ChannelBroadcaster>, FixedBoardGenerator>;

/// 3x3 board with its only mine in the top-left corner.
pub fn corner_layout() -> BoardValues {
    BoardValues::from_mine_coords(3, &[(0, 0)]).unwrap()
}

pub fn controller<S: SessionStore + 'static>(
    store: S,
    config: ServiceConfig,
) -> (TestController<S>, Arc<ChannelBroadcaster>) {
    let broadcaster = Arc::new(ChannelBroadcaster::new());
    let controller = SessionController::with_generator(
        store,
        Arc::clone(&broadcaster),
        FixedBoardGenerator::new(corner_layout()),
        config,
    );
    (controller, broadcaster)
}

pub fn game() -> GameId {
    GameId::parse("abcde").unwrap()
}

pub fn at(x: i64, y: i64) -> Coordinates {
    Coordinates { x, y }
}

/// Everything already queued for a connection.
pub fn drain(inbox: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut received = Vec::new();
    while let Some(Some(notification)) = inbox.next().now_or_never() {
        received.push(notification);
    }
    received
}

/// Memory store with switchable faults.
#[derive(Debug, Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub fail_writes: AtomicBool,
    pub conflicts_left: AtomicU32,
    pub slow_reads: AtomicBool,
}

#[async_trait]
impl SessionStore for FaultyStore {
    async fn get(&self, id: &GameId) -> Result<Session, StoreError> {
        if self.slow_reads.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        self.inner.get(id).await
    }

    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        self.inner.insert(session).await
    }

    async fn put(&self, session: Session) -> Result<(), StoreError> {
        self.inner.put(session).await
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        session: Session,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk on fire".into()));
        }
        let pending = self.conflicts_left.load(Ordering::SeqCst);
        if pending > 0 {
            self.conflicts_left.store(pending - 1, Ordering::SeqCst);
            return Err(StoreError::Conflict {
                id: session.id().clone(),
                expected: expected_version,
                actual: expected_version + 1,
            });
        }
        self.inner.compare_and_swap(expected_version, session).await
    }

    async fn sessions_with_connection(
        &self,
        connection: &ConnectionId,
    ) -> Result<Vec<GameId>, StoreError> {
        self.inner.sessions_with_connection(connection).await
    }
}

/// Channel broadcaster whose deliveries to one connection never complete.
#[derive(Debug)]
pub struct StuckBroadcaster {
    pub inner: ChannelBroadcaster,
    stuck: ConnectionId,
}

impl StuckBroadcaster {
    pub fn new(stuck: ConnectionId) -> Self {
        Self {
            inner: ChannelBroadcaster::new(),
            stuck,
        }
    }
}

#[async_trait]
impl Broadcaster for StuckBroadcaster {
    async fn send(
        &self,
        connection: &ConnectionId,
        notification: &Notification,
    ) -> Result<(), Unreachable> {
        if *connection == self.stuck {
            std::future::pending::<()>().await;
        }
        self.inner.send(connection, notification).await
    }
}
