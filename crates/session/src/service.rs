//! The service driving a wallet session.

use crate::{
    api::SessionCommand,
    config::SessionConfig,
    error::SessionError,
    state::{ConnectionState, format_balance},
};
use alloy_primitives::{Address, U256};
use futures::{StreamExt, future::BoxFuture, stream::FuturesUnordered};
use sextant_provider::{EventStream, ProviderError, ProviderEvent, WalletProvider};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

/// Completion of a provider call issued by the service.
enum CallOutcome {
    /// An account authorization request finished.
    Accounts(Result<Vec<Address>, ProviderError>),
    /// A balance fetch finished.
    Balance {
        /// Ticket the fetch was issued under.
        ticket: u64,
        /// Account the fetch was issued for.
        address: Address,
        result: Result<U256, ProviderError>,
    },
}

/// The type that reconciles a wallet session.
///
/// This service is an endless future that multiplexes user commands, wallet
/// notifications and provider call completions into the single published
/// [`ConnectionState`]. All state lives on this task; observers only ever see
/// it through watch snapshots.
///
/// Balance fetches are issued under a monotonically increasing ticket and a
/// completion is applied only if its ticket is still the newest one, so a
/// fetch that resolves after a newer account adoption, chain switch or
/// disconnect can never overwrite the newer state.
pub(crate) struct SessionService {
    /// The wallet backing this session. `None` when no wallet is installed.
    provider: Option<Arc<dyn WalletProvider>>,
    config: SessionConfig,
    /// Current reconciled state, mirrored into `publisher` after every change.
    state: ConnectionState,
    publisher: watch::Sender<ConnectionState>,
    commands: mpsc::Receiver<SessionCommand>,
    /// Wallet notifications. `None` until initialized and after the provider
    /// closed the stream.
    events: Option<EventStream>,
    /// In-flight provider calls.
    calls: FuturesUnordered<BoxFuture<'static, CallOutcome>>,
    /// Ticket of the newest balance fetch.
    ticket: u64,
    /// Whether an account authorization request is outstanding.
    connecting: bool,
}

// === impl SessionService ===

impl SessionService {
    pub(crate) fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        config: SessionConfig,
        publisher: watch::Sender<ConnectionState>,
        commands: mpsc::Receiver<SessionCommand>,
    ) -> Self {
        Self {
            provider,
            config,
            state: ConnectionState::default(),
            publisher,
            commands,
            events: None,
            calls: FuturesUnordered::new(),
            ticket: 0,
            connecting: false,
        }
    }

    /// Takes the wallet's event subscription.
    ///
    /// Runs once before the service is polled. Without an installed wallet
    /// this is a no-op; absence is only surfaced when the user connects.
    pub(crate) async fn init(&mut self) {
        let Some(provider) = self.provider.clone() else {
            trace!(target: "session", "no wallet installed, session starts detached");
            return;
        };
        match provider.subscribe().await {
            Ok(events) => self.events = Some(events),
            Err(err) => {
                warn!(target: "session", %err, "failed to subscribe to wallet events");
            }
        }
    }

    /// Handles a user-initiated connection attempt.
    fn start_connect(&mut self) {
        if self.connecting {
            debug!(target: "session", "account request already in flight, ignoring connect");
            return;
        }
        let Some(provider) = self.provider.clone() else {
            debug!(target: "session", "connect attempted without an installed wallet");
            self.fail(SessionError::ProviderAbsent);
            return;
        };
        self.connecting = true;
        trace!(target: "session", "requesting account authorization");
        self.calls
            .push(Box::pin(async move { CallOutcome::Accounts(provider.request_accounts().await) }));
    }

    /// Applies a wallet notification.
    fn apply_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                Some(address) => self.adopt_account(address),
                None => {
                    trace!(target: "session", "wallet reported no authorized accounts");
                    self.reset();
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                trace!(target: "session", chain_id, "chain switched, invalidating session");
                self.reset();
            }
        }
    }

    /// Adopts `address` as the active account and issues a balance fetch.
    ///
    /// The account becomes visible immediately; the balance follows once the
    /// fetch resolves and its ticket is still the newest.
    fn adopt_account(&mut self, address: Address) {
        self.state.account = Some(address);
        self.state.error = None;
        self.publish();

        let Some(provider) = self.provider.clone() else { return };
        let ticket = self.next_ticket();
        let block = self.config.block;
        trace!(target: "session", %address, ticket, "issuing balance fetch");
        self.calls.push(Box::pin(async move {
            let result = provider.get_balance(address, block).await;
            CallOutcome::Balance { ticket, address, result }
        }));
    }

    /// Applies the completion of a provider call.
    fn apply_outcome(&mut self, outcome: CallOutcome) {
        match outcome {
            CallOutcome::Accounts(result) => {
                self.connecting = false;
                match result {
                    Ok(accounts) => match accounts.first().copied() {
                        Some(address) => {
                            trace!(target: "session", %address, "wallet authorized account");
                            self.adopt_account(address);
                        }
                        None => {
                            trace!(target: "session", "wallet authorized no accounts");
                            self.reset();
                        }
                    },
                    Err(err) => {
                        warn!(
                            target: "session",
                            %err,
                            user_rejected = err.is_user_rejection(),
                            "account request failed"
                        );
                        self.fail(SessionError::ConnectionFailed(err));
                    }
                }
            }
            CallOutcome::Balance { ticket, address, result } => {
                if ticket != self.ticket {
                    debug!(
                        target: "session",
                        %address,
                        ticket,
                        newest = self.ticket,
                        "discarding stale balance completion"
                    );
                    return;
                }
                match result {
                    Ok(raw) => {
                        let balance = format_balance(raw);
                        trace!(target: "session", %address, %balance, "balance updated");
                        self.state.balance = Some(balance);
                        self.state.error = None;
                        self.publish();
                    }
                    Err(err) => {
                        warn!(target: "session", %address, %err, "balance fetch failed");
                        self.fail(SessionError::BalanceFetchFailed(err));
                    }
                }
            }
        }
    }

    /// Surfaces a failure, leaving account and balance untouched.
    fn fail(&mut self, err: SessionError) {
        self.state.error = Some(err.user_message().to_string());
        self.publish();
    }

    /// Resets the session to the disconnected state and invalidates every
    /// outstanding balance fetch.
    fn reset(&mut self) {
        self.ticket += 1;
        self.state = ConnectionState::default();
        self.publish();
    }

    fn next_ticket(&mut self) -> u64 {
        self.ticket += 1;
        self.ticket
    }

    fn publish(&mut self) {
        debug_assert!(self.state.balance.is_none() || self.state.account.is_some());
        self.publisher.send_replace(self.state.clone());
    }
}

impl Future for SessionService {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let pin = self.get_mut();

        // user commands
        while let Poll::Ready(command) = pin.commands.poll_recv(cx) {
            match command {
                Some(SessionCommand::Connect) => pin.start_connect(),
                Some(SessionCommand::Shutdown) | None => {
                    trace!(target: "session", "session service stopped");
                    return Poll::Ready(());
                }
            }
        }

        // wallet notifications
        while let Some(events) = pin.events.as_mut() {
            match events.poll_next_unpin(cx) {
                Poll::Ready(Some(event)) => pin.apply_event(event),
                Poll::Ready(None) => {
                    debug!(target: "session", "wallet event stream closed");
                    pin.events = None;
                }
                Poll::Pending => break,
            }
        }

        // provider call completions; calls pushed while draining are polled
        // in the same pass
        while let Poll::Ready(Some(outcome)) = pin.calls.poll_next_unpin(cx) {
            pin.apply_outcome(outcome);
        }

        Poll::Pending
    }
}
