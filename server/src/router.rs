use minesync_core::BoardConfig;
use minesync_protocol::{ClientAction, Notification};

use crate::*;

/// Decodes raw client messages and hands them to the controller.
pub struct Router<S, B, G> {
    controller: SessionController<S, B, G>,
}

/// What an accepted action did, for the transport to act on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatched {
    Created(GameId),
    Joined(GameId),
    Revealed { tiles: usize, concluded: bool },
    Flagged(bool),
    Left(Vec<GameId>),
}

impl<S, B, G> Router<S, B, G>
where
    S: SessionStore + 'static,
    B: Broadcaster + 'static,
    G: minesync_core::BoardGenerator + Send + 'static,
{
    pub fn new(controller: SessionController<S, B, G>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &SessionController<S, B, G> {
        &self.controller
    }

    pub async fn dispatch(
        &self,
        origin: &ConnectionId,
        raw: &str,
    ) -> Result<Dispatched, SessionError> {
        let action = match ClientAction::from_json(raw) {
            Ok(action) => action,
            Err(err) => {
                log::debug!("Rejected message from {origin}: {err}");
                let err = SessionError::Protocol(err.to_string());
                return self.controller.report(origin, Err(err)).await;
            }
        };
        log::debug!(
            "Dispatching action from {origin} for game {}",
            action.game_id().unwrap_or("<all>")
        );

        match action {
            ClientAction::CreateBoard {
                game_id,
                board_size,
                bomb_count,
            } => {
                let result = self.create(origin, game_id, board_size, bomb_count).await;
                self.controller.report(origin, result).await
            }
            ClientAction::JoinGame { game_id } => {
                let id = self.parse_id(origin, game_id).await?;
                self.controller.join(&id, origin).await?;
                Ok(Dispatched::Joined(id))
            }
            ClientAction::RevealTile {
                game_id,
                coordinates,
            } => {
                let id = self.parse_id(origin, game_id).await?;
                let report = self.controller.reveal_at(origin, &id, coordinates).await?;
                Ok(Dispatched::Revealed {
                    tiles: report.tiles.len(),
                    concluded: report.outcome.is_some(),
                })
            }
            ClientAction::ToggleFlagOnTile {
                game_id,
                coordinates,
            } => {
                let id = self.parse_id(origin, game_id).await?;
                let flagged = self
                    .controller
                    .toggle_flag_at(origin, &id, coordinates)
                    .await?;
                Ok(Dispatched::Flagged(flagged))
            }
            ClientAction::LeaveGame => Ok(Dispatched::Left(self.controller.leave(origin).await?)),
        }
    }

    async fn create(
        &self,
        origin: &ConnectionId,
        game_id: String,
        board_size: Option<u32>,
        bomb_count: Option<u32>,
    ) -> Result<Dispatched, SessionError> {
        let id = GameId::parse(game_id)?;
        let board = match (board_size, bomb_count) {
            (None, None) => None,
            (size, bombs) => {
                let defaults = &self.controller.config().board;
                Some(BoardConfig::new(
                    size.unwrap_or(defaults.size),
                    bombs.unwrap_or(defaults.bombs),
                )?)
            }
        };

        let session = self.controller.create_session(&id, board).await?;
        let ready = Notification::GameReady {
            game_id: id.to_string(),
            board_size: session.board().size().into(),
            bomb_count: session.board().bomb_count().into(),
        };
        self.controller.notify(&id, origin, &ready).await;
        Ok(Dispatched::Created(id))
    }

    async fn parse_id(&self, origin: &ConnectionId, raw: String) -> Result<GameId, SessionError> {
        match GameId::parse(raw) {
            Ok(id) => Ok(id),
            Err(err) => self.controller.report(origin, Err(err)).await,
        }
    }
}
