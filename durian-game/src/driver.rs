//! Async cultivation driver.
//!
//! One task owns the [`CultivationSession`]; commands arrive over an
//! unbounded channel and every state change is published on a `watch`
//! channel, so observers only ever see whole snapshots.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::character::ProfileError;
use crate::clock::Clock;
use crate::export::ImportError;
use crate::inventory::InventoryError;
use crate::persistence::SnapshotStore;
use crate::save_codec::CodecError;
use crate::session::CultivationSession;
use crate::snapshot::PlayerSnapshot;

/// Observable driver state.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverState {
    pub snapshot: Arc<PlayerSnapshot>,
    pub cultivating: bool,
    /// Accrual ticks executed since the driver started.
    pub ticks: u64,
}

#[derive(Debug)]
pub enum DriverCommand {
    Start { skill_id: Option<String> },
    Stop,
    AttemptBreakthrough(oneshot::Sender<bool>),
    UseItem {
        item_id: String,
        reply: oneshot::Sender<Result<(), InventoryError>>,
    },
    SellItem {
        item_id: String,
        reply: oneshot::Sender<Result<(), InventoryError>>,
    },
    Rename {
        name: String,
        reply: oneshot::Sender<Result<(), ProfileError>>,
    },
    Export(oneshot::Sender<Result<String, CodecError>>),
    Import {
        blob: String,
        reply: oneshot::Sender<Result<(), ImportError>>,
    },
    Reset,
    Shutdown(oneshot::Sender<Arc<PlayerSnapshot>>),
}

#[derive(Clone, Debug)]
pub struct DriverHandle {
    tx: mpsc::UnboundedSender<DriverCommand>,
    state: watch::Receiver<DriverState>,
}

impl DriverHandle {
    /// Begin cultivating. Returns `false` once the driver has shut down.
    pub fn start(&self, skill_id: Option<String>) -> bool {
        self.tx.send(DriverCommand::Start { skill_id }).is_ok()
    }

    /// Stop cultivating and cancel any pending tick.
    pub fn stop(&self) -> bool {
        self.tx.send(DriverCommand::Stop).is_ok()
    }

    pub fn reset(&self) -> bool {
        self.tx.send(DriverCommand::Reset).is_ok()
    }

    /// Attempt a breakthrough; `None` if the driver is gone.
    pub async fn attempt_breakthrough(&self) -> Option<bool> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(DriverCommand::AttemptBreakthrough(tx)).ok()?;
        rx.await.ok()
    }

    pub async fn use_item(&self, item_id: impl Into<String>) -> Option<Result<(), InventoryError>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(DriverCommand::UseItem {
                item_id: item_id.into(),
                reply,
            })
            .ok()?;
        rx.await.ok()
    }

    pub async fn sell_item(
        &self,
        item_id: impl Into<String>,
    ) -> Option<Result<(), InventoryError>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(DriverCommand::SellItem {
                item_id: item_id.into(),
                reply,
            })
            .ok()?;
        rx.await.ok()
    }

    pub async fn rename(&self, name: impl Into<String>) -> Option<Result<(), ProfileError>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(DriverCommand::Rename {
                name: name.into(),
                reply,
            })
            .ok()?;
        rx.await.ok()
    }

    pub async fn export(&self) -> Option<Result<String, CodecError>> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(DriverCommand::Export(tx)).ok()?;
        rx.await.ok()
    }

    pub async fn import(&self, blob: impl Into<String>) -> Option<Result<(), ImportError>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(DriverCommand::Import {
                blob: blob.into(),
                reply,
            })
            .ok()?;
        rx.await.ok()
    }

    /// Stop the driver task, returning the final snapshot.
    pub async fn shutdown(&self) -> Option<Arc<PlayerSnapshot>> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(DriverCommand::Shutdown(tx)).ok()?;
        rx.await.ok()
    }

    /// Latest published state.
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state.borrow().clone()
    }

    /// Independent receiver for change notifications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DriverState> {
        self.state.clone()
    }
}

/// Spawn the driver task onto the current tokio runtime.
pub fn spawn_driver<S, C>(session: CultivationSession<S, C>) -> DriverHandle
where
    S: SnapshotStore + Send + 'static,
    C: Clock + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<DriverCommand>();
    let (state_tx, state_rx) = watch::channel(DriverState {
        snapshot: session.snapshot(),
        cultivating: session.is_cultivating(),
        ticks: 0,
    });
    let handle = DriverHandle {
        tx,
        state: state_rx,
    };

    tokio::spawn(async move {
        let mut session = session;
        let mut ticks: u64 = 0;
        let mut deadline: Option<Instant> = None;
        loop {
            if session.is_cultivating() && deadline.is_none() {
                deadline = Some(Instant::now() + session.next_tick_delay());
            }
            tokio::select! {
                biased;
                cmd = rx.recv() => {
                    match cmd {
                        Some(DriverCommand::Shutdown(done)) => {
                            let _ = done.send(session.snapshot());
                            break;
                        }
                        Some(cmd) => apply_command(&mut session, cmd),
                        None => break,
                    }
                }
                () = wait_for(deadline) => {
                    deadline = None;
                    if let Some(report) = session.tick() {
                        ticks = ticks.saturating_add(1);
                        if report.halted {
                            log::info!("driver paused after {ticks} ticks: ready for breakthrough");
                        }
                    }
                }
            }
            if !session.is_cultivating() {
                deadline = None;
            }
            state_tx.send_replace(DriverState {
                snapshot: session.snapshot(),
                cultivating: session.is_cultivating(),
                ticks,
            });
        }
        log::debug!("cultivation driver stopped after {ticks} ticks");
    });

    handle
}

fn apply_command<S: SnapshotStore, C: Clock>(
    session: &mut CultivationSession<S, C>,
    cmd: DriverCommand,
) {
    match cmd {
        DriverCommand::Start { skill_id } => {
            session.start_cultivating(skill_id);
        }
        DriverCommand::Stop => {
            session.stop_cultivating();
        }
        DriverCommand::AttemptBreakthrough(reply) => {
            let _ = reply.send(session.attempt_breakthrough());
        }
        DriverCommand::UseItem { item_id, reply } => {
            let _ = reply.send(session.use_item(&item_id));
        }
        DriverCommand::SellItem { item_id, reply } => {
            let _ = reply.send(session.sell_item(&item_id));
        }
        DriverCommand::Rename { name, reply } => {
            let _ = reply.send(session.rename_character(&name));
        }
        DriverCommand::Export(reply) => {
            let _ = reply.send(session.export());
        }
        DriverCommand::Import { blob, reply } => {
            let _ = reply.send(session.import(&blob));
        }
        DriverCommand::Reset => session.reset(),
        DriverCommand::Shutdown(done) => {
            let _ = done.send(session.snapshot());
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
