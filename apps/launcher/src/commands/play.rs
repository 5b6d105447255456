use gameshelf_launch::{ActiveGameError, PlayError, ResolvedLaunch, run_game};
use gameshelf_protocol::GameRef;

use super::CommandError;
use crate::state::AppState;

/// Resolves and runs `game` until its process exits.
pub async fn play(state: &AppState, game: &GameRef) -> Result<ResolvedLaunch, CommandError> {
    let launch = state
        .resolver
        .resolve(game)
        .await?
        .ok_or_else(|| CommandError::NotInstalled(game.to_string()))?;

    if let Some(current) = state.active.get() {
        let err = ActiveGameError::AlreadyRunning { name: current.name };
        return Err(CommandError::Conflict(err.to_string()));
    }

    tracing::info!(game = %game, label = %launch.label, "launching game");
    match run_game(&state.active, &launch).await {
        Ok(()) => Ok(launch),
        Err(PlayError::Active(e)) => Err(CommandError::Conflict(e.to_string())),
        Err(e) => Err(e.into()),
    }
}
