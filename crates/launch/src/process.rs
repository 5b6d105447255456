//! Game process spawning.

use tokio::process::Command;
use tracing::{debug, warn};

use crate::active::{ActiveGame, ActiveGameRegistry};
use crate::error::{ActiveGameError, PlayError};
use crate::resolver::ResolvedLaunch;

/// Splits a command line on whitespace. Double quotes group words.
pub fn split_command(command: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in command.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    parts.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        parts.push(current);
    }
    parts
}

/// Runs a resolved launch command until the process exits.
///
/// The game is registered as active while it runs; on exit the registry
/// announces it. A non-zero exit code is reported as an error.
pub async fn run_game(
    registry: &ActiveGameRegistry,
    launch: &ResolvedLaunch,
) -> Result<(), PlayError> {
    if let Some(current) = registry.get() {
        return Err(ActiveGameError::AlreadyRunning { name: current.name }.into());
    }

    let parts = split_command(&launch.command);
    let (program, args) = parts.split_first().ok_or(PlayError::EmptyCommand)?;
    debug!(program = %program, args = ?args, "spawning game");

    let mut child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| PlayError::Spawn {
            program: program.clone(),
            source,
        })?;

    let active = ActiveGame {
        game_id: launch.game_id,
        name: launch.name.clone(),
        command: launch.command.clone(),
        pid: child.id(),
    };
    if let Err(e) = registry.set(active) {
        // Lost a race with another launch.
        let _ = child.kill().await;
        return Err(e.into());
    }

    let status = child.wait().await;
    let code = status.as_ref().ok().and_then(|s| s.code());
    registry.notify_exit(code);

    let status = status?;
    if status.success() {
        Ok(())
    } else {
        warn!(game_id = launch.game_id, code = ?code, "game exited with failure");
        Err(PlayError::ExitCode(code.unwrap_or(-1)))
    }
}
