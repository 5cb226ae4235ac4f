//! # HTTP Wallet Relay
//!
//! This crate bridges a native wallet session and a browser wallet page over a
//! loopback HTTP server, following
//! [EIP-1193](https://eips.ethereum.org/EIPS/eip-1193): Ethereum Provider
//! JavaScript API.
//!
//! ## Architecture
//!
//! The page cannot be dialed, so the relay serves its own wallet page at `/`
//! and turns every wallet call into a queued request the page polls for:
//! 1. The session queues a call and awaits its completion channel
//! 2. The page collects calls from `GET /api/request` and executes them
//!    against `window.ethereum`
//! 3. The page posts each outcome to `POST /api/response`, completing the
//!    matching call
//! 4. Wallet notifications (`accountsChanged`, `chainChanged`) arrive on
//!    `POST /api/event` and feed the session's event stream
//!
//! Every `/api` call carries the relay's session token in `X-Session-Token`.
//! The page receives the token through the `token` query parameter of the
//! URL it is opened with.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use sextant_provider::{EventStream, ProviderError, WalletProvider};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{debug, error, info, trace};

mod app;
mod config;
mod error;
mod handlers;
mod router;
mod state;
mod types;

pub use config::{BridgeConfig, DEFAULT_CALL_TIMEOUT};
pub use error::BridgeError;

use crate::{
    router::build_router,
    state::{BridgeState, CallGuard},
    types::WalletCall,
};

/// The running server task and the channel that stops it.
#[derive(Debug)]
struct ServerTask {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Loopback HTTP relay the wallet page polls.
///
/// The server half answers the page's HTTP calls, the [`WalletProvider`] half
/// is handed to a session. Clones share the same queue and listener.
#[derive(Debug, Clone)]
pub struct BridgeServer {
    config: BridgeConfig,
    state: BridgeState,
    addr: Arc<Mutex<Option<SocketAddr>>>,
    server: Arc<Mutex<Option<ServerTask>>>,
}

// === impl BridgeServer ===

impl BridgeServer {
    /// Create a relay that has not been started yet.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            state: BridgeState::new(),
            addr: Arc::new(Mutex::new(None)),
            server: Arc::new(Mutex::new(None)),
        }
    }

    /// Bind the loopback listener and serve the relay API in the background.
    ///
    /// Returns the bound address, with the real port when the configured port
    /// was `0`.
    pub async fn start(&mut self) -> Result<SocketAddr, BridgeError> {
        if self.server.lock().is_some() {
            return Err(BridgeError::AlreadyRunning);
        }

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, self.config.port))
            .await
            .map_err(BridgeError::Bind)?;
        let addr = listener.local_addr().map_err(BridgeError::Bind)?;

        let router = build_router(self.state.clone());
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = server.await {
                error!(target: "relay", %err, "relay server exited with an error");
            }
        });

        {
            let mut server = self.server.lock();
            // A clone may have started the relay while this call was binding.
            if server.is_some() {
                let _ = shutdown.send(());
                return Err(BridgeError::AlreadyRunning);
            }
            *server = Some(ServerTask { shutdown, task });
        }
        *self.addr.lock() = Some(addr);
        info!(target: "relay", %addr, "relay listening");
        Ok(addr)
    }

    /// Stop the server and wait for it to wind down.
    pub async fn stop(&mut self) -> Result<(), BridgeError> {
        let Some(ServerTask { shutdown, task }) = self.server.lock().take() else {
            return Err(BridgeError::NotRunning);
        };
        *self.addr.lock() = None;

        let _ = shutdown.send(());
        let _ = task.await;
        debug!(target: "relay", "relay stopped");
        Ok(())
    }

    /// The port the relay is listening on, `0` when it is not running.
    pub fn port(&self) -> u16 {
        self.addr.lock().map_or(0, |addr| addr.port())
    }

    /// The token the wallet page must present on every `/api` call.
    ///
    /// The served page picks it up from the `token` query parameter of the
    /// URL it was opened with.
    pub fn session_token(&self) -> Arc<String> {
        self.state.session_token()
    }

    /// Queue a wallet call for the page and wait for its response.
    ///
    /// The queued call is removed however the wait ends; dropping the
    /// returned future before completion abandons it as well.
    async fn call(&self, call: WalletCall) -> Result<serde_json::Value, ProviderError> {
        if self.server.lock().is_none() {
            return Err(ProviderError::Transport("relay server is not running".to_string()));
        }

        let method = call.method();
        let (id, rx) = self.state.enqueue(call);
        let _guard = CallGuard::new(self.state.clone(), id);
        trace!(target: "relay", %id, method, "queued wallet call");

        let response = match tokio::time::timeout(self.config.call_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(ProviderError::Transport("relay dropped the call".to_string()));
            }
            Err(_) => {
                debug!(target: "relay", %id, method, "wallet call timed out");
                return Err(ProviderError::Timeout);
            }
        };

        if let Some(error) = response.error {
            return Err(ProviderError::from_code(error.code, error.message));
        }
        response.result.ok_or_else(|| {
            ProviderError::InvalidResponse("response carried neither result nor error".to_string())
        })
    }
}

#[async_trait]
impl WalletProvider for BridgeServer {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let value = self.call(WalletCall::RequestAccounts).await?;
        serde_json::from_value(value).map_err(|err| ProviderError::InvalidResponse(err.to_string()))
    }

    async fn get_balance(
        &self,
        address: Address,
        block: BlockNumberOrTag,
    ) -> Result<U256, ProviderError> {
        let value = self.call(WalletCall::GetBalance(address, block)).await?;
        serde_json::from_value(value).map_err(|err| ProviderError::InvalidResponse(err.to_string()))
    }

    async fn subscribe(&self) -> Result<EventStream, ProviderError> {
        let events = self
            .state
            .take_events()
            .ok_or_else(|| ProviderError::Subscribe("event stream already taken".to_string()))?;
        Ok(events.boxed())
    }
}
