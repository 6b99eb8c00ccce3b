use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{ConnectionId, GameId, Session, StoreError};

/// Durable home of sessions.
///
/// Implementations keep a reverse index from connection to sessions up to
/// date in the same write that changes a session's connection set.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &GameId) -> Result<Session, StoreError>;

    /// Stores a brand new session. Fails with [`StoreError::AlreadyExists`]
    /// carrying the stored session when the id is taken.
    async fn insert(&self, session: Session) -> Result<(), StoreError>;

    /// Unconditional write.
    async fn put(&self, session: Session) -> Result<(), StoreError>;

    /// Writes `session` only if the stored version is still `expected_version`.
    async fn compare_and_swap(
        &self,
        expected_version: u64,
        session: Session,
    ) -> Result<(), StoreError>;

    async fn sessions_with_connection(
        &self,
        connection: &ConnectionId,
    ) -> Result<Vec<GameId>, StoreError>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get(&self, id: &GameId) -> Result<Session, StoreError> {
        (**self).get(id).await
    }

    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        (**self).insert(session).await
    }

    async fn put(&self, session: Session) -> Result<(), StoreError> {
        (**self).put(session).await
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        session: Session,
    ) -> Result<(), StoreError> {
        (**self).compare_and_swap(expected_version, session).await
    }

    async fn sessions_with_connection(
        &self,
        connection: &ConnectionId,
    ) -> Result<Vec<GameId>, StoreError> {
        (**self).sessions_with_connection(connection).await
    }
}

/// Process-local store for single-server deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<GameId, Session>,
    by_connection: HashMap<ConnectionId, BTreeSet<GameId>>,
}

impl Tables {
    fn write(&mut self, session: Session) {
        let id = session.id().clone();
        let previous = self
            .sessions
            .get(&id)
            .map(|stored| stored.connections().clone())
            .unwrap_or_default();

        for gone in previous.difference(session.connections()) {
            if let Some(ids) = self.by_connection.get_mut(gone) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.by_connection.remove(gone);
                }
            }
        }
        for added in session.connections().difference(&previous) {
            self.by_connection
                .entry(added.clone())
                .or_default()
                .insert(id.clone());
        }

        self.sessions.insert(id, session);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, id: &GameId) -> Result<Session, StoreError> {
        self.tables
            .lock()
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if let Some(existing) = tables.sessions.get(session.id()) {
            return Err(StoreError::AlreadyExists(Box::new(existing.clone())));
        }
        tables.write(session);
        Ok(())
    }

    async fn put(&self, session: Session) -> Result<(), StoreError> {
        self.tables.lock().write(session);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        session: Session,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let actual = tables
            .sessions
            .get(session.id())
            .map(Session::version)
            .ok_or_else(|| StoreError::NotFound(session.id().clone()))?;
        if actual != expected_version {
            return Err(StoreError::Conflict {
                id: session.id().clone(),
                expected: expected_version,
                actual,
            });
        }
        tables.write(session);
        Ok(())
    }

    async fn sessions_with_connection(
        &self,
        connection: &ConnectionId,
    ) -> Result<Vec<GameId>, StoreError> {
        Ok(self
            .tables
            .lock()
            .by_connection
            .get(connection)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minesync_core::BoardValues;

    fn session(id: &str) -> Session {
        let values = BoardValues::from_mine_coords(3, &[(0, 0)]).unwrap();
        Session::new(GameId::parse(id).unwrap(), values)
    }

    fn game(id: &str) -> GameId {
        GameId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn insert_refuses_existing_ids() {
        let store = MemoryStore::new();
        let first = session("aaaaa");
        store.insert(first.clone()).await.unwrap();

        let err = store.insert(session("aaaaa")).await.unwrap_err();

        match err {
            StoreError::AlreadyExists(existing) => assert_eq!(*existing, first),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn stale_version_conflicts() {
        let store = MemoryStore::new();
        let stored = session("aaaaa");
        store.insert(stored.clone()).await.unwrap();

        let mut first = stored.clone();
        first.bump_version();
        store.compare_and_swap(1, first).await.unwrap();

        let mut second = stored;
        second.bump_version();
        let err = store.compare_and_swap(1, second).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let store = MemoryStore::new();

        assert!(matches!(
            store.get(&game("nobody")).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.compare_and_swap(1, session("nobody")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reverse_index_follows_membership() {
        let store = MemoryStore::new();
        let conn = ConnectionId::new("c1");
        let mut a = session("aaaaa");
        let mut b = session("bbbbb");
        a.add_connection(conn.clone());
        b.add_connection(conn.clone());
        store.insert(a.clone()).await.unwrap();
        store.insert(b).await.unwrap();

        assert_eq!(
            store.sessions_with_connection(&conn).await.unwrap(),
            [game("aaaaa"), game("bbbbb")]
        );

        a.remove_connection(&conn);
        store.put(a).await.unwrap();

        assert_eq!(
            store.sessions_with_connection(&conn).await.unwrap(),
            [game("bbbbb")]
        );
        assert!(
            store
                .sessions_with_connection(&ConnectionId::new("c2"))
                .await
                .unwrap()
                .is_empty()
        );
    }
}
