//! Cloneable handle used to interact with a running session.

use crate::state::ConnectionState;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Commands accepted by the session service.
#[derive(Clone, Debug)]
pub(crate) enum SessionCommand {
    /// User-initiated connection attempt.
    Connect,
    /// Stop the service.
    Shutdown,
}

/// Cloneable API handle of a spawned session.
///
/// All interaction is asynchronous: commands are queued to the service task
/// and their outcome lands in the published [`ConnectionState`].
#[derive(Clone, Debug)]
pub struct Session {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<ConnectionState>,
}

// === impl Session ===

impl Session {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        state: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self { commands, state }
    }

    /// Requests a wallet connection.
    ///
    /// Safe to call repeatedly; the service ignores the request while a
    /// previous attempt is still outstanding.
    pub async fn connect(&self) {
        if self.commands.send(SessionCommand::Connect).await.is_err() {
            debug!(target: "session", "service stopped, dropping connect request");
        }
    }

    /// Returns the current state snapshot.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Returns a watch receiver that follows every published state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Stops the session service.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
    }
}
