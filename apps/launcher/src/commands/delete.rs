use std::path::{Component, Path};
use std::sync::Arc;

use gameshelf_library::LocalGame;
use gameshelf_protocol::GameRef;

use super::CommandError;
use crate::state::AppState;

/// Removes `game` from the library and deletes its files.
pub async fn delete(state: &AppState, game: &GameRef) -> Result<LocalGame, CommandError> {
    let library = Arc::clone(&state.library);
    let target = game.clone();
    let removed = tokio::task::spawn_blocking(move || library.delete_game(&target))
        .await
        .map_err(|e| CommandError::Task(e.to_string()))??
        .ok_or_else(|| CommandError::NotInstalled(game.to_string()))?;

    if let Some(path_fs) = removed.path_fs.as_deref() {
        remove_game_files(&state.config.download_path, path_fs).await?;
    }
    tracing::info!(game = %game, game_id = removed.id, "game deleted");
    Ok(removed)
}

async fn remove_game_files(root: &Path, path_fs: &str) -> std::io::Result<()> {
    let relative = Path::new(path_fs);
    let contained = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if path_fs.is_empty() || !contained {
        tracing::warn!(path = path_fs, "refusing to remove files outside the download directory");
        return Ok(());
    }

    let path = root.join(relative);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&path).await,
        Ok(_) => tokio::fs::remove_file(&path).await,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "game files already gone");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{install_ps2, state};

    #[tokio::test]
    async fn delete_removes_row_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), None);
        install_ps2(&state, 42, "Ico");
        let game = GameRef::new("romm", 42).unwrap();

        let removed = delete(&state, &game).await.unwrap();
        assert_eq!(removed.name.as_deref(), Some("Ico"));
        assert!(!dir.path().join("ps2/Ico").exists());
        assert!(dir.path().join("ps2").exists());
        assert_eq!(state.library.game_count().unwrap(), 0);

        let err = delete(&state, &game).await.unwrap_err();
        assert!(matches!(err, CommandError::NotInstalled(_)));
    }

    #[tokio::test]
    async fn escaping_paths_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"x").unwrap();
        let root = dir.path().join("games");

        remove_game_files(&root, "../keep.txt").await.unwrap();
        remove_game_files(&root, "").await.unwrap();
        assert!(outside.exists());
    }
}
