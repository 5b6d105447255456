use gameshelf_protocol::{GameRef, StatusUpdate};
use gameshelf_status::{StatusStream, derive_status};

use crate::state::AppState;

/// Current status of `game`.
pub async fn status(state: &AppState, game: &GameRef) -> StatusUpdate {
    derive_status(&state.status_sources(), game).await
}

/// Opens a live status feed for `game`.
pub async fn follow(state: &AppState, game: &GameRef) -> StatusStream {
    StatusStream::open(state.status_sources(), game.clone()).await
}
