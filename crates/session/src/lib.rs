//! # Wallet Session Reconciliation
//!
//! Keeps a wallet session's `(account, balance, error)` triple consistent
//! with two asynchronous inputs: explicit user intent to connect, and
//! notifications the wallet pushes when the user switches account or chain
//! outside this process (e.g. through the extension's own UI).
//!
//! The session runs as a single spawned service task owning all state.
//! [`spawn`] returns a cloneable [`Session`] API handle used to issue
//! connection attempts and observe state, and a [`SessionHandle`] resolving
//! when the service exits:
//!
//! ```no_run
//! # use sextant_session::{spawn, SessionConfig};
//! # async fn demo() {
//! let (session, handle) = spawn(None, SessionConfig::default());
//!
//! session.connect().await;
//! println!("{}", session.state());
//!
//! session.shutdown().await;
//! handle.await.unwrap();
//! # }
//! ```

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::{
    sync::{mpsc, watch},
    task::{JoinError, JoinHandle},
};

use sextant_provider::WalletProvider;

mod api;
mod config;
mod error;
mod service;
mod state;

pub use api::Session;
pub use config::{DEFAULT_COMMAND_CAPACITY, SessionConfig};
pub use error::SessionError;
pub use state::{ConnectionState, format_balance};

use service::SessionService;

/// Spawns the session service for `provider`.
///
/// Passing `None` models a machine without an installed wallet: the session
/// still runs, and a connection attempt surfaces the provider-missing
/// message.
pub fn spawn(
    provider: Option<Arc<dyn WalletProvider>>,
    config: SessionConfig,
) -> (Session, SessionHandle) {
    // tokio's channel panics on zero capacity
    let (commands_tx, commands_rx) = mpsc::channel(config.command_capacity.max(1));
    let (state_tx, state_rx) = watch::channel(ConnectionState::default());

    let mut service = SessionService::new(provider, config, state_tx, commands_rx);
    let inner = tokio::spawn(async move {
        service.init().await;
        service.await
    });

    (Session::new(commands_tx, state_rx), SessionHandle { inner })
}

/// Handle to the spawned session service task.
pub struct SessionHandle {
    inner: JoinHandle<()>,
}

// === impl SessionHandle ===

impl SessionHandle {
    /// Aborts the service task without a shutdown command.
    pub fn abort(&self) {
        self.inner.abort();
    }
}

impl Future for SessionHandle {
    type Output = Result<(), JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let pin = self.get_mut();
        Pin::new(&mut pin.inner).poll(cx)
    }
}
