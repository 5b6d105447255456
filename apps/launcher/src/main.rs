//! `gameshelf`: installs games from a RomM catalog and launches them.

mod commands;
mod config;
mod state;

use std::io::Write;

use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use gameshelf_install::InstallOptions;
use gameshelf_protocol::{GameRef, StatusEvent, StatusFrame};
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use state::AppState;

#[derive(Parser)]
#[command(name = "gameshelf", version, about = "Install and launch games from a RomM catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GameArgs {
    /// Game source, `romm` or `local`.
    source: String,
    /// Game id within the source.
    id: String,
}

impl GameArgs {
    fn game(&self) -> anyhow::Result<GameRef> {
        Ok(GameRef::parse(&self.source, &self.id)?)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Install a game and print its status feed until the job ends.
    Install {
        #[command(flatten)]
        game: GameArgs,
        /// Report the first step only.
        #[arg(long)]
        dry_run: bool,
        /// Record the game without downloading it.
        #[arg(long)]
        dry_download: bool,
    },
    /// Print the status of a game.
    Status {
        #[command(flatten)]
        game: GameArgs,
        /// Keep printing status frames until interrupted.
        #[arg(long)]
        follow: bool,
    },
    /// Launch an installed game and wait for it to exit.
    Play {
        #[command(flatten)]
        game: GameArgs,
    },
    /// Remove a game from the library and delete its files.
    Delete {
        #[command(flatten)]
        game: GameArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gameshelf=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let state = AppState::init(AppConfig::load()?)?;
    let result = run(&state, cli.command).await;
    state.shutdown().await;
    result
}

async fn run(state: &AppState, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Install {
            game,
            dry_run,
            dry_download,
        } => {
            let game = game.game()?;
            // Opened before the job starts so no frame is missed.
            let mut feed = commands::status::follow(state, &game).await;
            let options = InstallOptions {
                dry_run,
                dry_download,
            };
            let handle = commands::install::install(state, &game, options)?;

            let mut failure = None;
            loop {
                tokio::select! {
                    frame = feed.next() => {
                        let Some(frame) = frame else { break };
                        print_frame(&frame)?;
                        match frame.event {
                            Some(StatusEvent::Error) => {
                                failure = frame.update.error;
                                break;
                            }
                            Some(StatusEvent::Refresh) => break,
                            None => {}
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!(job = %handle.id(), "interrupted, aborting install");
                        handle.abort(Some("interrupted"));
                    }
                }
            }
            handle.finished().await;
            if let Some(error) = failure {
                anyhow::bail!("install failed: {error}");
            }
        }
        Command::Status { game, follow } => {
            let game = game.game()?;
            if follow {
                let mut feed = commands::status::follow(state, &game).await;
                loop {
                    tokio::select! {
                        frame = feed.next() => match frame {
                            Some(frame) => print_frame(&frame)?,
                            None => break,
                        },
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
            } else {
                let update = commands::status::status(state, &game).await;
                print_frame(&StatusFrame::update(update))?;
            }
        }
        Command::Play { game } => {
            let game = game.game()?;
            let launch = commands::play::play(state, &game).await?;
            println!("{} exited", launch.name);
        }
        Command::Delete { game } => {
            let game = game.game()?;
            let removed = commands::delete::delete(state, &game).await?;
            println!(
                "deleted {}",
                removed.name.as_deref().unwrap_or("game")
            );
        }
    }
    Ok(())
}

fn print_frame(frame: &StatusFrame) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(frame.to_sse().as_bytes())?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn install_flags_parse() {
        let cli = Cli::try_parse_from(["gameshelf", "install", "romm", "42", "--dry-download"])
            .unwrap();
        match cli.command {
            Command::Install {
                game,
                dry_run,
                dry_download,
            } => {
                assert_eq!(game.game().unwrap(), GameRef::new("romm", 42).unwrap());
                assert!(!dry_run);
                assert!(dry_download);
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn bad_game_id_is_rejected() {
        let cli = Cli::try_parse_from(["gameshelf", "play", "romm", "abc"]).unwrap();
        let Command::Play { game } = cli.command else {
            panic!("expected play");
        };
        assert!(game.game().is_err());
    }
}
