//! The single running game.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::ActiveGameError;

const EXIT_CAPACITY: usize = 16;

/// The game process currently running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGame {
    /// Local library id.
    pub game_id: i64,
    pub name: String,
    pub command: String,
    pub pid: Option<u32>,
}

/// Broadcast when the active game exits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameExited {
    pub game_id: i64,
    pub name: String,
    pub exit_code: Option<i32>,
}

/// Holds at most one running game and announces its exit.
pub struct ActiveGameRegistry {
    slot: Mutex<Option<ActiveGame>>,
    exits: broadcast::Sender<GameExited>,
}

impl Default for ActiveGameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveGameRegistry {
    pub fn new() -> Self {
        let (exits, _) = broadcast::channel(EXIT_CAPACITY);
        Self {
            slot: Mutex::new(None),
            exits,
        }
    }

    /// Records `game` as running. Fails if another game is held.
    pub fn set(&self, game: ActiveGame) -> Result<(), ActiveGameError> {
        let mut slot = self.lock();
        if let Some(current) = slot.as_ref() {
            return Err(ActiveGameError::AlreadyRunning {
                name: current.name.clone(),
            });
        }
        info!(game_id = game.game_id, name = %game.name, pid = ?game.pid, "game started");
        *slot = Some(game);
        Ok(())
    }

    /// Empties the slot without announcing an exit.
    pub fn clear(&self) -> Option<ActiveGame> {
        self.lock().take()
    }

    pub fn get(&self) -> Option<ActiveGame> {
        self.lock().clone()
    }

    /// Returns true if the running game is local game `game_id`.
    pub fn is_playing(&self, game_id: i64) -> bool {
        self.lock().as_ref().is_some_and(|g| g.game_id == game_id)
    }

    /// Empties the slot, then broadcasts [`GameExited`].
    ///
    /// Observers reacting to the broadcast already see the slot empty.
    /// Returns the game that exited, `None` if nothing was running.
    pub fn notify_exit(&self, exit_code: Option<i32>) -> Option<ActiveGame> {
        let game = self.lock().take()?;
        info!(game_id = game.game_id, name = %game.name, exit_code = ?exit_code, "game exited");
        let _ = self.exits.send(GameExited {
            game_id: game.game_id,
            name: game.name.clone(),
            exit_code,
        });
        Some(game)
    }

    pub fn subscribe_exits(&self) -> broadcast::Receiver<GameExited> {
        self.exits.subscribe()
    }

    /// Number of live exit subscribers.
    pub fn exit_subscriber_count(&self) -> usize {
        self.exits.receiver_count()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveGame>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: i64, name: &str) -> ActiveGame {
        ActiveGame {
            game_id: id,
            name: name.into(),
            command: "true".into(),
            pid: None,
        }
    }

    #[test]
    fn second_set_fails_until_exit() {
        let registry = ActiveGameRegistry::new();
        registry.set(game(1, "Ico")).unwrap();

        let err = registry.set(game(2, "Okami")).unwrap_err();
        assert_eq!(err.to_string(), "Ico currently running");
        assert_eq!(registry.get().unwrap().game_id, 1);

        registry.notify_exit(Some(0));
        registry.set(game(2, "Okami")).unwrap();
        assert!(registry.is_playing(2));
        assert!(!registry.is_playing(1));
    }

    #[tokio::test]
    async fn exit_is_broadcast_after_slot_is_cleared() {
        let registry = ActiveGameRegistry::new();
        let mut rx = registry.subscribe_exits();
        assert_eq!(registry.exit_subscriber_count(), 1);

        registry.set(game(42, "Ico")).unwrap();
        let exited = registry.notify_exit(Some(3)).unwrap();
        assert_eq!(exited.game_id, 42);

        let ev = rx.recv().await.unwrap();
        assert_eq!(
            ev,
            GameExited {
                game_id: 42,
                name: "Ico".into(),
                exit_code: Some(3)
            }
        );
        assert!(registry.get().is_none());
    }

    #[test]
    fn notify_exit_without_game_is_noop() {
        let registry = ActiveGameRegistry::new();
        let mut rx = registry.subscribe_exits();
        assert!(registry.notify_exit(None).is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clear_does_not_broadcast() {
        let registry = ActiveGameRegistry::new();
        let mut rx = registry.subscribe_exits();
        registry.set(game(1, "Ico")).unwrap();
        assert!(registry.clear().is_some());
        assert!(rx.try_recv().is_err());
        assert!(registry.get().is_none());
    }
}
