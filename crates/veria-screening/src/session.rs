//! Per-wallet screening session.
//!
//! [`SessionMachine`] is the synchronous state machine:
//!
//! ```text
//! Idle --address--> Loading --verdict--> Resolved
//!                      |   --error----> Failed
//!                      +--new address--> Loading (new generation)
//! any --address cleared--> Idle
//! ```
//!
//! Every request is issued under a [`Ticket`] carrying the generation and
//! address it was issued for. A completion whose ticket is not the current
//! generation is dropped, so a slow response can never overwrite the state of
//! a newer address.
//!
//! [`ScreeningSession`] drives the machine on a background task: wallet
//! changes arrive as messages, completions arrive from a `JoinSet`, and every
//! transition is published on a `watch` channel for presentation layers.
//! Starting a new generation aborts the request of the previous one; a
//! completion that races the abort is still discarded by its ticket.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, warn};

use crate::error::ScreeningError;
use crate::gate::{GateDecision, GatePolicy};
use crate::screener::Screener;
use crate::types::{Address, ScreeningVerdict};

/// Wallet-connection input, as reported by the wallet layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletState {
    pub address: Option<Address>,
    pub is_connected: bool,
}

impl WalletState {
    pub fn connected(address: Address) -> Self {
        Self {
            address: Some(address),
            is_connected: true,
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    /// The address to screen, if any.
    pub fn active_address(&self) -> Option<&Address> {
        if self.is_connected {
            self.address.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading {
        address: Address,
    },
    Resolved {
        address: Address,
        verdict: ScreeningVerdict,
    },
    Failed {
        address: Address,
        error: ScreeningError,
    },
}

impl SessionState {
    pub fn address(&self) -> Option<&Address> {
        match self {
            SessionState::Idle => None,
            SessionState::Loading { address }
            | SessionState::Resolved { address, .. }
            | SessionState::Failed { address, .. } => Some(address),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading { .. })
    }

    pub fn verdict(&self) -> Option<&ScreeningVerdict> {
        match self {
            SessionState::Resolved { verdict, .. } => Some(verdict),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ScreeningError> {
        match self {
            SessionState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn decide(&self, policy: &GatePolicy) -> GateDecision {
        policy.decide(self.verdict(), self.error(), self.is_loading())
    }
}

/// Identifies one issued screening request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub state: SessionState,
    /// Completions dropped because their address was no longer tracked.
    pub stale_discarded: u64,
}

impl SessionSnapshot {
    pub fn decide(&self, policy: &GatePolicy) -> GateDecision {
        self.state.decide(policy)
    }
}

#[derive(Debug)]
pub struct SessionMachine {
    generation: u64,
    state: SessionState,
    stale_discarded: u64,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            generation: 0,
            state: SessionState::Idle,
            stale_discarded: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            state: self.state.clone(),
            stale_discarded: self.stale_discarded,
        }
    }

    /// Applies a wallet update. Returns the request to issue, if any.
    ///
    /// Re-observing the address already tracked is a no-op: it neither
    /// restarts a pending request nor re-screens a settled one.
    pub fn observe(&mut self, wallet: &WalletState) -> Option<Ticket> {
        let target = wallet.active_address().cloned();
        if target.as_ref() == self.state.address() {
            return None;
        }
        match target {
            None => {
                self.generation += 1;
                self.state = SessionState::Idle;
                None
            }
            Some(address) => Some(self.start(address)),
        }
    }

    /// Restarts screening of the tracked address after a verdict or error.
    pub fn retry(&mut self) -> Option<Ticket> {
        match &self.state {
            SessionState::Resolved { address, .. } | SessionState::Failed { address, .. } => {
                let address = address.clone();
                Some(self.start(address))
            }
            SessionState::Idle | SessionState::Loading { .. } => None,
        }
    }

    fn start(&mut self, address: Address) -> Ticket {
        self.generation += 1;
        self.state = SessionState::Loading {
            address: address.clone(),
        };
        Ticket {
            generation: self.generation,
            address,
        }
    }

    /// Applies a completed request. Returns `false` if it was stale.
    pub fn complete(&mut self, ticket: Ticket, outcome: Result<ScreeningVerdict, ScreeningError>) -> bool {
        let current = ticket.generation == self.generation
            && matches!(&self.state, SessionState::Loading { address } if *address == ticket.address);
        if !current {
            self.stale_discarded += 1;
            debug!(
                generation = ticket.generation,
                current_generation = self.generation,
                address = %ticket.address.fingerprint(),
                "Discarding stale screening response"
            );
            return false;
        }

        self.state = match outcome {
            Ok(verdict) => SessionState::Resolved {
                address: ticket.address,
                verdict,
            },
            Err(error) => SessionState::Failed {
                address: ticket.address,
                error,
            },
        };
        true
    }
}

enum Command {
    Wallet(WalletState),
    Retry,
}

/// Handle to a running screening session.
///
/// Dropping the handle stops the session and aborts any request it still has
/// in flight.
pub struct ScreeningSession {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl ScreeningSession {
    /// Starts a session in the `Idle` state. Must be called within a Tokio
    /// runtime.
    pub fn spawn<S>(screener: S) -> Self
    where
        S: Screener + Send + Sync + 'static,
    {
        let machine = SessionMachine::new();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(machine.snapshot());
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(drive(
            Arc::new(screener),
            machine,
            command_rx,
            snapshot_tx,
            shutdown.clone(),
        ));

        Self {
            commands,
            snapshots,
            _guard: shutdown.clone().drop_guard(),
            shutdown,
            task,
        }
    }

    pub fn observe(&self, wallet: WalletState) {
        self.send(Command::Wallet(wallet));
    }

    /// Shorthand for a connected wallet (`Some`) or a disconnect (`None`).
    pub fn set_address(&self, address: Option<Address>) {
        let wallet = match address {
            Some(address) => WalletState::connected(address),
            None => WalletState::disconnected(),
        };
        self.observe(wallet);
    }

    /// Screens the tracked address again. Ignored while idle or loading.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Forwards every change of `wallet` into the session until it stops.
    pub fn follow_wallet(&self, mut wallet: watch::Receiver<WalletState>) {
        let commands = self.commands.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let initial = wallet.borrow_and_update().clone();
            if commands.send(Command::Wallet(initial)).is_err() {
                return;
            }
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = wallet.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = wallet.borrow_and_update().clone();
                        if commands.send(Command::Wallet(next)).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stops the session and waits for its driver to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Screening session driver ended abnormally");
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("Screening session is no longer running");
        }
    }
}

type Completion = (Ticket, Result<ScreeningVerdict, ScreeningError>);

async fn drive<S>(
    screener: Arc<S>,
    mut machine: SessionMachine,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
    shutdown: CancellationToken,
) where
    S: Screener + Send + Sync + 'static,
{
    let mut in_flight: JoinSet<Completion> = JoinSet::new();
    // Request issued for the current generation, if still running.
    let mut current: Option<AbortHandle> = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            command = commands.recv() => {
                let Some(command) = command else { break };
                let generation = machine.generation();
                let ticket = match command {
                    Command::Wallet(wallet) => machine.observe(&wallet),
                    Command::Retry => machine.retry(),
                };
                if machine.generation() != generation {
                    if let Some(previous) = current.take() {
                        previous.abort();
                    }
                }
                if let Some(ticket) = ticket {
                    debug!(
                        generation = ticket.generation,
                        address = %ticket.address.fingerprint(),
                        "Screening address"
                    );
                    current = Some(in_flight.spawn(run(Arc::clone(&screener), ticket)));
                }
                snapshots.send_replace(machine.snapshot());
            }
            Some(joined) = in_flight.join_next() => {
                match joined {
                    Ok((ticket, outcome)) => {
                        machine.complete(ticket, outcome);
                        snapshots.send_replace(machine.snapshot());
                    }
                    Err(e) if e.is_cancelled() => debug!("Superseded screening request released"),
                    Err(e) => warn!(error = %e, "Screening request task failed to join"),
                }
            }
        }
    }

    in_flight.abort_all();
}

/// Runs one screening call on its own task so that a panicking screener
/// still produces a completion for its ticket.
async fn run<S>(screener: Arc<S>, ticket: Ticket) -> Completion
where
    S: Screener + Send + Sync + 'static,
{
    let address = ticket.address.clone();
    let call = AbortOnDropHandle::new(tokio::spawn(async move { screener.screen(&address).await }));
    let outcome = match call.await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "Screening call did not complete");
            Err(ScreeningError::Protocol("screening call did not complete".into()))
        }
    };
    (ticket, outcome)
}
