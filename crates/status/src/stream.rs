//! Per-game live status stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use gameshelf_jobs::JobEvent;
use gameshelf_launch::GameExited;
use gameshelf_protocol::{GameRef, GameStatus, StatusFrame, StatusUpdate};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::derive::{StatusSources, derive_status};

/// Frames buffered for a slow consumer before the relay waits.
const FRAME_CAPACITY: usize = 32;

/// Live status feed for one game.
///
/// Dropping the stream or calling [`close`](Self::close) stops the relay
/// task and releases its job and exit subscriptions.
pub struct StatusStream {
    game: GameRef,
    frames: mpsc::Receiver<StatusFrame>,
    cancel: CancellationToken,
}

impl StatusStream {
    /// Subscribes to job and exit events, then computes the initial status.
    ///
    /// Subscribing first means no event emitted during the initial
    /// derivation is lost.
    pub async fn open(sources: StatusSources, game: GameRef) -> Self {
        let jobs = sources.queue.subscribe();
        let exits = sources.active.subscribe_exits();
        Self::start(sources, game, jobs, exits).await
    }

    async fn start(
        sources: StatusSources,
        game: GameRef,
        jobs: broadcast::Receiver<JobEvent>,
        exits: broadcast::Receiver<GameExited>,
    ) -> Self {
        let initial = derive_status(&sources, &game).await;
        let floor = initial.progress.is_some().then(|| initial.clone());

        let (tx, frames) = mpsc::channel(FRAME_CAPACITY);
        // The channel is empty and has capacity.
        let _ = tx.try_send(StatusFrame::update(initial));

        let cancel = CancellationToken::new();
        let relay = Relay {
            sources,
            game: game.clone(),
            jobs,
            exits,
            tx,
            cancel: cancel.clone(),
            floor,
        };
        tokio::spawn(relay.run());
        debug!(game = %game, "status stream opened");

        Self {
            game,
            frames,
            cancel,
        }
    }

    pub fn game(&self) -> &GameRef {
        &self.game
    }

    /// Stops the relay. Frames already buffered can still be read.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for StatusStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Stream for StatusStream {
    type Item = StatusFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StatusFrame>> {
        self.frames.poll_recv(cx)
    }
}

struct Relay {
    sources: StatusSources,
    game: GameRef,
    jobs: broadcast::Receiver<JobEvent>,
    exits: broadcast::Receiver<GameExited>,
    tx: mpsc::Sender<StatusFrame>,
    cancel: CancellationToken,
    /// Last derived progress. Job events queued before it was derived may
    /// still be waiting in `jobs`; lower progress in the same phase is
    /// dropped until a newer event goes through.
    floor: Option<StatusUpdate>,
}

impl Relay {
    async fn run(mut self) {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = self.tx.closed() => break,
                event = self.jobs.recv() => match event {
                    Ok(event) => match self.job_frame(event) {
                        Some(frame) => frame,
                        None => continue,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(game = %self.game, skipped, "status stream lagged behind job events");
                        self.recompute().await
                    }
                    Err(RecvError::Closed) => break,
                },
                exit = self.exits.recv() => match exit {
                    Ok(exited) => {
                        debug!(game = %self.game, exited = exited.game_id, "game exited, recomputing");
                        self.recompute().await
                    }
                    Err(RecvError::Lagged(_)) => self.recompute().await,
                    Err(RecvError::Closed) => break,
                },
            };

            // Waits for capacity, but gives up as soon as the stream is closed.
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                sent = self.tx.send(frame) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        debug!(game = %self.game, "status stream closed");
    }

    fn job_frame(&mut self, event: JobEvent) -> Option<StatusFrame> {
        if !self.game.matches_job(event.id()) {
            return None;
        }
        match event {
            JobEvent::Progress {
                progress, state, ..
            } => {
                let status = state.as_deref().and_then(GameStatus::from_phase);
                if self
                    .floor
                    .as_ref()
                    .is_some_and(|floor| is_stale(floor, progress, status))
                {
                    debug!(game = %self.game, progress, "dropping stale progress");
                    return None;
                }
                self.floor = None;
                Some(StatusFrame::update(StatusUpdate::progress(progress, status)))
            }
            JobEvent::Completed { .. } => {
                self.floor = None;
                Some(StatusFrame::refresh())
            }
            JobEvent::Error { error, .. } => {
                self.floor = None;
                Some(StatusFrame::error(error))
            }
            JobEvent::Abort { .. } | JobEvent::Ended { .. } => None,
        }
    }

    async fn recompute(&mut self) -> StatusFrame {
        let update = derive_status(&self.sources, &self.game).await;
        self.floor = update.progress.is_some().then(|| update.clone());
        StatusFrame::update(update)
    }
}

fn is_stale(floor: &StatusUpdate, progress: f64, status: Option<GameStatus>) -> bool {
    floor.status == status && floor.progress.is_some_and(|p| progress < p)
}
