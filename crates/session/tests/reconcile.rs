//! End-to-end tests of the session reconciliation service against a scripted
//! wallet double.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, U256, address};
use async_trait::async_trait;
use futures::{StreamExt, channel::mpsc::unbounded};
use parking_lot::Mutex;
use sextant_provider::{EventStream, ProviderError, ProviderEvent, WalletProvider};
use sextant_session::{ConnectionState, Session, SessionConfig, SessionHandle, spawn};
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot};

const ALICE: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const BOB: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
const CAROL: Address = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

const WALLET_MISSING: &str = "no browser wallet detected";
const CONNECT_PROBLEM: &str = "there was a problem connecting to the wallet";

const ONE_ETH: u128 = 1_000_000_000_000_000_000;

/// An account authorization prompt waiting for the test to answer it.
struct AccountsRequest {
    respond: oneshot::Sender<Result<Vec<Address>, ProviderError>>,
}

/// A balance query waiting for the test to answer it.
struct BalanceRequest {
    address: Address,
    block: BlockNumberOrTag,
    respond: oneshot::Sender<Result<U256, ProviderError>>,
}

/// Wallet double that forwards every call to the test for scripting.
struct MockProvider {
    accounts: mpsc::UnboundedSender<AccountsRequest>,
    balances: mpsc::UnboundedSender<BalanceRequest>,
    events: Mutex<Option<EventStream>>,
}

#[async_trait]
impl WalletProvider for MockProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let (respond, rx) = oneshot::channel();
        if self.accounts.send(AccountsRequest { respond }).is_err() {
            return Err(ProviderError::Transport("harness gone".to_string()));
        }
        rx.await.unwrap_or_else(|_| Err(ProviderError::Transport("harness gone".to_string())))
    }

    async fn get_balance(
        &self,
        address: Address,
        block: BlockNumberOrTag,
    ) -> Result<U256, ProviderError> {
        let (respond, rx) = oneshot::channel();
        if self.balances.send(BalanceRequest { address, block, respond }).is_err() {
            return Err(ProviderError::Transport("harness gone".to_string()));
        }
        rx.await.unwrap_or_else(|_| Err(ProviderError::Transport("harness gone".to_string())))
    }

    async fn subscribe(&self) -> Result<EventStream, ProviderError> {
        self.events
            .lock()
            .take()
            .ok_or_else(|| ProviderError::Subscribe("event stream already taken".to_string()))
    }
}

/// A spawned session wired to a [`MockProvider`].
struct TestSession {
    session: Session,
    handle: SessionHandle,
    accounts: mpsc::UnboundedReceiver<AccountsRequest>,
    balances: mpsc::UnboundedReceiver<BalanceRequest>,
    events: futures::channel::mpsc::UnboundedSender<ProviderEvent>,
}

impl TestSession {
    fn spawn() -> Self {
        let (accounts_tx, accounts_rx) = mpsc::unbounded_channel();
        let (balances_tx, balances_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = unbounded();

        let provider = Arc::new(MockProvider {
            accounts: accounts_tx,
            balances: balances_tx,
            events: Mutex::new(Some(events_rx.boxed())),
        });
        let (session, handle) = spawn(Some(provider), SessionConfig::default());

        Self {
            session,
            handle,
            accounts: accounts_rx,
            balances: balances_rx,
            events: events_tx,
        }
    }

    /// Pushes a wallet notification into the session.
    fn emit(&self, event: ProviderEvent) {
        self.events.unbounded_send(event).expect("session dropped the event stream");
    }

    async fn next_accounts_request(&mut self) -> AccountsRequest {
        tokio::time::timeout(Duration::from_secs(5), self.accounts.recv())
            .await
            .expect("timed out waiting for an account request")
            .expect("provider dropped")
    }

    async fn next_balance_request(&mut self) -> BalanceRequest {
        tokio::time::timeout(Duration::from_secs(5), self.balances.recv())
            .await
            .expect("timed out waiting for a balance request")
            .expect("provider dropped")
    }

    /// Waits until the published state satisfies `pred`, checking the
    /// balance-implies-account invariant on every observed state.
    async fn wait_for(&self, pred: impl Fn(&ConnectionState) -> bool) -> ConnectionState {
        let mut states = self.session.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async move {
            loop {
                let state = states.borrow_and_update().clone();
                assert!(
                    state.balance.is_none() || state.account.is_some(),
                    "balance without account: {state:?}"
                );
                if pred(&state) {
                    return state;
                }
                states.changed().await.expect("session service stopped");
            }
        })
        .await
        .expect("timed out waiting for state")
    }

    /// Gives the service a beat to process anything outstanding.
    async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    /// Drives a full connect flow: authorize `account`, answer its balance
    /// query with `raw` wei.
    async fn connect_as(&mut self, account: Address, raw: u128) {
        self.session.connect().await;
        let request = self.next_accounts_request().await;
        request.respond.send(Ok(vec![account])).unwrap();

        let fetch = self.next_balance_request().await;
        assert_eq!(fetch.address, account);
        fetch.respond.send(Ok(U256::from(raw))).unwrap();

        self.wait_for(|s| s.account == Some(account) && s.balance.is_some()).await;
    }
}

#[tokio::test]
async fn connect_without_wallet_reports_missing_provider() {
    let (session, _handle) = spawn(None, SessionConfig::default());

    session.connect().await;

    let mut states = session.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = states.borrow_and_update().clone();
            if state.error.is_some() {
                return state;
            }
            states.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    assert_eq!(state.account, None);
    assert_eq!(state.balance, None);
    assert_eq!(state.error.as_deref(), Some(WALLET_MISSING));
}

#[tokio::test]
async fn connect_adopts_account_then_balance() {
    let mut ts = TestSession::spawn();

    ts.session.connect().await;
    let request = ts.next_accounts_request().await;
    request.respond.send(Ok(vec![ALICE, BOB])).unwrap();

    // The account is visible before its balance resolved.
    let state = ts.wait_for(|s| s.account.is_some()).await;
    assert_eq!(state.account, Some(ALICE));
    assert_eq!(state.balance, None);
    assert_eq!(state.error, None);

    let fetch = ts.next_balance_request().await;
    assert_eq!(fetch.address, ALICE);
    assert_eq!(fetch.block, BlockNumberOrTag::Latest);
    fetch.respond.send(Ok(U256::from(2_500_000_000_000_000_000u128))).unwrap();

    let state = ts.wait_for(|s| s.balance.is_some()).await;
    assert_eq!(
        state,
        ConnectionState {
            account: Some(ALICE),
            balance: Some("2.5".to_string()),
            error: None,
        }
    );
}

#[tokio::test]
async fn chain_change_resets_session() {
    let mut ts = TestSession::spawn();
    ts.connect_as(ALICE, 5 * ONE_ETH).await;

    ts.emit(ProviderEvent::ChainChanged(137));

    let state = ts.wait_for(|s| s.account.is_none()).await;
    assert_eq!(state, ConnectionState::default());
}

#[tokio::test]
async fn balance_failure_keeps_account_and_surfaces_error() {
    let mut ts = TestSession::spawn();

    ts.session.connect().await;
    let request = ts.next_accounts_request().await;
    request.respond.send(Ok(vec![CAROL])).unwrap();

    let fetch = ts.next_balance_request().await;
    fetch.respond.send(Err(ProviderError::Transport("node unreachable".to_string()))).unwrap();

    let state = ts.wait_for(|s| s.error.is_some()).await;
    assert_eq!(state.account, Some(CAROL));
    assert_eq!(state.balance, None);
    assert_eq!(state.error.as_deref(), Some(CONNECT_PROBLEM));
}

#[tokio::test]
async fn balance_results_apply_newest_wins() {
    let mut ts = TestSession::spawn();

    ts.emit(ProviderEvent::AccountsChanged(vec![ALICE]));
    ts.emit(ProviderEvent::AccountsChanged(vec![BOB]));

    let first = ts.next_balance_request().await;
    let second = ts.next_balance_request().await;
    let (for_alice, for_bob) =
        if first.address == ALICE { (first, second) } else { (second, first) };
    assert_eq!(for_alice.address, ALICE);
    assert_eq!(for_bob.address, BOB);

    // Bob's fetch resolves first even though Alice's was issued first.
    for_bob.respond.send(Ok(U256::from(ONE_ETH))).unwrap();
    let state = ts.wait_for(|s| s.balance.is_some()).await;
    assert_eq!(state.account, Some(BOB));
    assert_eq!(state.balance.as_deref(), Some("1.0"));

    // Alice's late result must not land on Bob's session.
    for_alice.respond.send(Ok(U256::from(5 * ONE_ETH))).unwrap();
    ts.settle().await;
    let state = ts.session.state();
    assert_eq!(state.account, Some(BOB));
    assert_eq!(state.balance.as_deref(), Some("1.0"));
}

#[tokio::test]
async fn stale_fetch_discarded_across_reset() {
    let mut ts = TestSession::spawn();

    ts.emit(ProviderEvent::AccountsChanged(vec![ALICE]));
    let stale = ts.next_balance_request().await;

    // Chain switch invalidates the fetch, then the same account comes back.
    ts.emit(ProviderEvent::ChainChanged(1));
    ts.wait_for(|s| s.account.is_none()).await;
    ts.emit(ProviderEvent::AccountsChanged(vec![ALICE]));
    let fresh = ts.next_balance_request().await;

    // The pre-reset result is for the same address but must be discarded.
    stale.respond.send(Ok(U256::from(999 * ONE_ETH))).unwrap();
    ts.settle().await;
    let state = ts.session.state();
    assert_eq!(state.account, Some(ALICE));
    assert_eq!(state.balance, None);

    fresh.respond.send(Ok(U256::from(ONE_ETH))).unwrap();
    let state = ts.wait_for(|s| s.balance.is_some()).await;
    assert_eq!(state.balance.as_deref(), Some("1.0"));
}

#[tokio::test]
async fn concurrent_connects_deduplicated() {
    let mut ts = TestSession::spawn();

    ts.session.connect().await;
    ts.session.connect().await;
    ts.session.connect().await;

    let request = ts.next_accounts_request().await;
    ts.settle().await;
    assert!(ts.accounts.try_recv().is_err(), "only one account request may be in flight");

    request.respond.send(Ok(vec![ALICE])).unwrap();
    let fetch = ts.next_balance_request().await;
    fetch.respond.send(Ok(U256::from(ONE_ETH))).unwrap();
    ts.wait_for(|s| s.balance.is_some()).await;

    // Once the attempt settled, a new connect goes through again.
    ts.session.connect().await;
    let request = ts.next_accounts_request().await;
    request.respond.send(Ok(vec![ALICE])).unwrap();
}

#[tokio::test]
async fn reconnect_refetches_balance() {
    let mut ts = TestSession::spawn();
    ts.connect_as(ALICE, 5 * ONE_ETH / 2).await;

    ts.session.connect().await;
    let request = ts.next_accounts_request().await;
    request.respond.send(Ok(vec![ALICE])).unwrap();

    // Same account, fresh fetch.
    let fetch = ts.next_balance_request().await;
    assert_eq!(fetch.address, ALICE);
    fetch.respond.send(Ok(U256::from(5 * ONE_ETH / 2))).unwrap();

    ts.settle().await;
    let state = ts.session.state();
    assert_eq!(state.account, Some(ALICE));
    assert_eq!(state.balance.as_deref(), Some("2.5"));
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn rejected_connect_preserves_prior_session() {
    let mut ts = TestSession::spawn();
    ts.connect_as(ALICE, 5 * ONE_ETH / 2).await;

    ts.session.connect().await;
    let request = ts.next_accounts_request().await;
    request
        .respond
        .send(Err(ProviderError::UserRejected {
            code: 4001,
            message: "user denied account authorization".to_string(),
        }))
        .unwrap();

    let state = ts.wait_for(|s| s.error.is_some()).await;
    assert_eq!(state.account, Some(ALICE), "prior account survives a failed reconnect");
    assert_eq!(state.balance.as_deref(), Some("2.5"));
    assert_eq!(state.error.as_deref(), Some(CONNECT_PROBLEM));
}

#[tokio::test]
async fn empty_accounts_event_disconnects() {
    let mut ts = TestSession::spawn();
    ts.connect_as(ALICE, ONE_ETH).await;

    ts.emit(ProviderEvent::AccountsChanged(vec![]));

    let state = ts.wait_for(|s| s.account.is_none()).await;
    assert_eq!(state, ConnectionState::default());
}

#[tokio::test]
async fn empty_authorization_resets() {
    let mut ts = TestSession::spawn();
    ts.connect_as(ALICE, ONE_ETH).await;

    ts.session.connect().await;
    let request = ts.next_accounts_request().await;
    request.respond.send(Ok(vec![])).unwrap();

    let state = ts.wait_for(|s| s.account.is_none()).await;
    assert_eq!(state, ConnectionState::default());
}

#[tokio::test]
async fn adoption_clears_previous_error() {
    let mut ts = TestSession::spawn();

    ts.session.connect().await;
    let request = ts.next_accounts_request().await;
    request.respond.send(Ok(vec![CAROL])).unwrap();
    let fetch = ts.next_balance_request().await;
    fetch.respond.send(Err(ProviderError::Timeout)).unwrap();
    ts.wait_for(|s| s.error.is_some()).await;

    // A wallet-side account switch clears the error before its balance
    // resolves.
    ts.emit(ProviderEvent::AccountsChanged(vec![BOB]));
    let state = ts.wait_for(|s| s.account == Some(BOB)).await;
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn shutdown_stops_service() {
    let ts = TestSession::spawn();

    ts.session.shutdown().await;
    ts.handle.await.unwrap();

    // Commands after shutdown are dropped without panicking.
    ts.session.connect().await;
}

#[tokio::test]
async fn abort_stops_service_without_shutdown() {
    let ts = TestSession::spawn();

    ts.handle.abort();
    let err = ts.handle.await.unwrap_err();
    assert!(err.is_cancelled());

    // Commands after an abort are dropped without panicking.
    ts.session.connect().await;
}

#[tokio::test]
async fn zero_command_capacity_still_accepts_commands() {
    let config = SessionConfig { command_capacity: 0, ..Default::default() };
    let (session, _handle) = spawn(None, config);

    session.connect().await;

    let mut states = session.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = states.borrow_and_update().clone();
            if state.error.is_some() {
                return state;
            }
            states.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    assert_eq!(state.error.as_deref(), Some(WALLET_MISSING));
}
