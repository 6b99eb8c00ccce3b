use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use minesync_core::{
    BoardConfig, BoardGenerator, Outcome, RandomBoardGenerator, RevealReport, RevealedTile,
};
use minesync_protocol::{Coordinates, Notification, TileUpdate};
use parking_lot::Mutex;
use tokio::sync::{Mutex as SessionLock, OwnedMutexGuard};

use crate::*;

/// Runs every player action against the store and tells all attached
/// connections what changed.
///
/// Actions on one session are serialized twice over: a per-session async lock
/// inside this process, and a version check on every write so that other
/// processes sharing the store cannot be overwritten. A lost version check
/// re-runs the whole read-compute-write cycle.
pub struct SessionController<S, B, G = RandomBoardGenerator> {
    inner: Arc<Inner<S, B, G>>,
}

struct Inner<S, B, G> {
    store: S,
    broadcaster: B,
    generator: Mutex<G>,
    config: ServiceConfig,
    locks: DashMap<GameId, Arc<SessionLock<()>>>,
}

impl<S, B, G> Clone for SessionController<S, B, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, B> SessionController<S, B, RandomBoardGenerator>
where
    S: SessionStore + 'static,
    B: Broadcaster + 'static,
{
    pub fn new(store: S, broadcaster: B, config: ServiceConfig) -> Self {
        let seed = config.board.seed.unwrap_or_else(rand::random);
        Self::with_generator(
            store,
            broadcaster,
            RandomBoardGenerator::from_seed(seed),
            config,
        )
    }
}

impl<S, B, G> SessionController<S, B, G>
where
    S: SessionStore + 'static,
    B: Broadcaster + 'static,
    G: BoardGenerator + Send + 'static,
{
    pub fn with_generator(store: S, broadcaster: B, generator: G, config: ServiceConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                broadcaster,
                generator: Mutex::new(generator),
                config,
                locks: DashMap::new(),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn broadcaster(&self) -> &B {
        &self.inner.broadcaster
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Returns the session stored under `id`, creating it first if needed.
    /// An existing session is returned untouched whatever `board` asks for.
    pub async fn create_session(
        &self,
        id: &GameId,
        board: Option<BoardConfig>,
    ) -> Result<Session, SessionError> {
        if id.as_str().chars().count() < self.inner.config.session.min_game_id_len {
            return Err(SessionError::InvalidGameId(id.to_string()));
        }

        let _guard = self.lock(id).await;
        match self.bounded(self.inner.store.get(id)).await {
            Ok(existing) => {
                log::debug!("Game {id} already exists, reusing it");
                return Ok(existing);
            }
            Err(StoreError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let config = match board {
            Some(config) => config,
            None => self.inner.config.board.config().map_err(|err| match err {
                ConfigError::Board(err) => SessionError::Board(err),
                err => SessionError::Protocol(err.to_string()),
            })?,
        };
        let values = self.inner.generator.lock().generate(config);
        let session = Session::new(id.clone(), values);

        match self.bounded(self.inner.store.insert(session.clone())).await {
            Ok(()) => {
                log::info!(
                    "Created game {id}: {size}x{size} with {bombs} bombs",
                    size = config.size(),
                    bombs = config.bombs()
                );
                Ok(session)
            }
            Err(StoreError::AlreadyExists(existing)) => {
                log::debug!("Game {id} was created concurrently, reusing it");
                Ok(*existing)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Attaches `connection` to the game and announces it to everyone,
    /// the newcomer included. The newcomer then receives the current board.
    pub async fn join(
        &self,
        id: &GameId,
        connection: &ConnectionId,
    ) -> Result<Session, SessionError> {
        let result = self.join_session(id, connection).await;
        self.report(connection, result).await
    }

    async fn join_session(
        &self,
        id: &GameId,
        connection: &ConnectionId,
    ) -> Result<Session, SessionError> {
        let _guard = self.lock(id).await;
        let (session, added) = self
            .update(id, |session| Ok(session.add_connection(connection.clone())))
            .await?;
        if added {
            log::debug!("Connection {connection} joined game {id}");
        }

        let joined = Notification::PlayerJoined {
            details: format!("A new player has joined game {id}."),
        };
        self.broadcast(&session, &joined).await;

        for notification in catch_up(&session) {
            self.notify(id, connection, &notification).await;
        }
        Ok(session)
    }

    /// Detaches `connection` from every game it joined. Nobody is notified.
    /// Every game is attempted; the first failure is returned afterwards.
    pub async fn leave(&self, connection: &ConnectionId) -> Result<Vec<GameId>, SessionError> {
        let ids = self
            .bounded(self.inner.store.sessions_with_connection(connection))
            .await?;

        let mut left = Vec::with_capacity(ids.len());
        let mut first_error = None;
        for id in ids {
            match self.detach(&id, connection).await {
                Ok(true) => left.push(id),
                Ok(false) | Err(SessionError::NotFound(_)) => {}
                Err(err) => {
                    log::warn!("Connection {connection} could not leave game {id}: {err}");
                    first_error.get_or_insert(err);
                }
            }
        }
        log::debug!("Connection {connection} left {} games", left.len());
        match first_error {
            Some(err) => Err(err),
            None => Ok(left),
        }
    }

    /// Removes a connection that could not be delivered to.
    pub async fn handle_unreachable(
        &self,
        id: &GameId,
        connection: &ConnectionId,
    ) -> Result<bool, SessionError> {
        let removed = self.detach(id, connection).await?;
        if removed {
            log::info!("Removed unreachable connection {connection} from game {id}");
        }
        Ok(removed)
    }

    async fn detach(&self, id: &GameId, connection: &ConnectionId) -> Result<bool, SessionError> {
        let _guard = self.lock(id).await;
        let session = self.bounded(self.inner.store.get(id)).await?;
        if !session.has_connection(connection) {
            return Ok(false);
        }
        let (_, removed) = self
            .update(id, |session| Ok(session.remove_connection(connection)))
            .await?;
        Ok(removed)
    }

    pub async fn reveal_at(
        &self,
        origin: &ConnectionId,
        id: &GameId,
        coordinates: Coordinates,
    ) -> Result<RevealReport, SessionError> {
        let result = self.reveal_tiles(id, coordinates).await;
        self.report(origin, result).await
    }

    async fn reveal_tiles(
        &self,
        id: &GameId,
        Coordinates { x, y }: Coordinates,
    ) -> Result<RevealReport, SessionError> {
        let _guard = self.lock(id).await;
        let (session, report) = self
            .update(id, |session| Ok(session.board_mut().reveal_at(x, y)?))
            .await?;
        log::debug!(
            "Revealed {} tiles in game {id}, {} left",
            report.tiles.len(),
            session.board().remaining_tiles()
        );

        let tiles = Notification::UpdateTiles {
            tiles: report.tiles.iter().map(tile_update).collect(),
        };
        self.broadcast(&session, &tiles).await;

        match report.outcome {
            Some(Outcome::Lost) => {
                log::info!("Game {id} lost at ({x}, {y})");
                self.broadcast(&session, &Notification::message(format!("Game {id} over!")))
                    .await;
            }
            Some(Outcome::Won) => {
                log::info!("Game {id} won");
                let message = format!("Game {id} won! Every safe tile is revealed.");
                self.broadcast(&session, &Notification::message(message))
                    .await;
            }
            None => {}
        }
        Ok(report)
    }

    pub async fn toggle_flag_at(
        &self,
        origin: &ConnectionId,
        id: &GameId,
        coordinates: Coordinates,
    ) -> Result<bool, SessionError> {
        let result = self.toggle_flag(id, coordinates).await;
        self.report(origin, result).await
    }

    async fn toggle_flag(
        &self,
        id: &GameId,
        coordinates: Coordinates,
    ) -> Result<bool, SessionError> {
        let _guard = self.lock(id).await;
        let (session, flagged) = self
            .update(id, |session| {
                Ok(session
                    .board_mut()
                    .toggle_flag_at(coordinates.x, coordinates.y)?)
            })
            .await?;
        log::debug!(
            "Flag at ({}, {}) in game {id} is now {flagged}",
            coordinates.x,
            coordinates.y
        );

        let notification = Notification::SetFlagState {
            coordinates,
            flagged,
        };
        self.broadcast(&session, &notification).await;
        Ok(flagged)
    }

    pub async fn view(&self, id: &GameId) -> Result<BoardView, SessionError> {
        Ok(self.bounded(self.inner.store.get(id)).await?.view())
    }

    /// Sends a single notification, dropping the connection if it is gone.
    pub async fn notify(&self, id: &GameId, connection: &ConnectionId, notification: &Notification) {
        let limit = self.inner.config.broadcast.send_timeout();
        let failed = fan_out(&self.inner.broadcaster, [connection], notification, limit).await;
        self.drop_unreachable(id, failed);
    }

    /// Tells `origin` why its action failed.
    pub(crate) async fn report<T>(
        &self,
        origin: &ConnectionId,
        result: Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        if let Err(err) = &result {
            let message = if err.is_validation() {
                err.to_string()
            } else {
                log::warn!("Action from {origin} failed: {err}");
                "The game could not be updated, please try again.".to_string()
            };
            let limit = self.inner.config.broadcast.send_timeout();
            let notification = Notification::message(message);
            if !fan_out(&self.inner.broadcaster, [origin], &notification, limit)
                .await
                .is_empty()
            {
                log::warn!("Could not report failure to {origin}");
            }
        }
        result
    }

    async fn broadcast(&self, session: &Session, notification: &Notification) {
        let limit = self.inner.config.broadcast.send_timeout();
        let failed = fan_out(
            &self.inner.broadcaster,
            session.connections(),
            notification,
            limit,
        )
        .await;
        self.drop_unreachable(session.id(), failed);
    }

    /// Detaches dead connections in the background so the current action
    /// never waits on it.
    fn drop_unreachable(&self, id: &GameId, failed: Vec<ConnectionId>) {
        if failed.is_empty() {
            return;
        }
        let controller = self.clone();
        let id = id.clone();
        tokio::spawn(async move {
            for connection in failed {
                if let Err(err) = controller.handle_unreachable(&id, &connection).await {
                    log::warn!("Could not remove {connection} from game {id}: {err}");
                }
            }
        });
    }

    /// Read, apply, conditionally write; retried on version conflicts only.
    /// Nothing is written when `apply` fails.
    async fn update<T, F>(&self, id: &GameId, mut apply: F) -> Result<(Session, T), SessionError>
    where
        F: FnMut(&mut Session) -> Result<T, SessionError> + Send,
        T: Send,
    {
        let attempts = self.inner.config.store.max_conflict_retries + 1;
        for attempt in 1..=attempts {
            let mut session = self.bounded(self.inner.store.get(id)).await?;
            let expected = session.version();
            let value = apply(&mut session)?;
            session.bump_version();

            match self
                .bounded(self.inner.store.compare_and_swap(expected, session.clone()))
                .await
            {
                Ok(()) => return Ok((session, value)),
                Err(StoreError::Conflict { actual, .. }) => {
                    log::warn!(
                        "Game {id} moved from version {expected} to {actual}, retrying ({attempt}/{attempts})"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(SessionError::Conflict(id.clone(), attempts))
    }

    /// Bounds a store call by the configured timeout.
    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let limit = self.inner.config.store.timeout();
        tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| {
                log::warn!("Store call timed out after {limit:?}");
                StoreError::Timeout(limit)
            })?
    }

    async fn lock(&self, id: &GameId) -> SessionGuard<'_> {
        let release = LockRelease {
            locks: &self.inner.locks,
            id: id.clone(),
        };
        let lock = Arc::clone(self.inner.locks.entry(id.clone()).or_default().value());
        SessionGuard {
            _guard: lock.lock_owned().await,
            _release: release,
        }
    }
}

/// Held for the duration of one action on a session. Fields drop in order,
/// so the mutex is released before the table entry is reconsidered.
struct SessionGuard<'a> {
    _guard: OwnedMutexGuard<()>,
    _release: LockRelease<'a>,
}

/// Drops a session's lock table entry once nobody holds or awaits it.
struct LockRelease<'a> {
    locks: &'a DashMap<GameId, Arc<SessionLock<()>>>,
    id: GameId,
}

impl Drop for LockRelease<'_> {
    fn drop(&mut self) {
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn tile_update(tile: &RevealedTile) -> TileUpdate {
    TileUpdate {
        x: tile.x.into(),
        y: tile.y.into(),
        value: tile.value,
    }
}

/// Notifications that bring a newcomer up to date with the board.
fn catch_up(session: &Session) -> Vec<Notification> {
    let board = session.board();
    let mut notifications = Vec::new();

    let revealed = board.revealed_tiles();
    if !revealed.is_empty() {
        notifications.push(Notification::UpdateTiles {
            tiles: revealed.iter().map(tile_update).collect(),
        });
    }
    notifications.extend(
        board
            .flagged_coords()
            .into_iter()
            .map(|(x, y)| Notification::SetFlagState {
                coordinates: Coordinates {
                    x: x.into(),
                    y: y.into(),
                },
                flagged: true,
            }),
    );
    if session.is_concluded() {
        notifications.push(Notification::message(format!(
            "Game {} has already concluded.",
            session.id()
        )));
    }
    notifications
}
