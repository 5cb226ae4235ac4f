use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use parking_lot::Mutex;
use sextant_provider::ProviderEvent;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::types::{WalletCall, WireRequest, WireResponse};

/// Request/response queue between the session side and the wallet page.
///
/// Calls wait on a oneshot channel keyed by request id. The wallet page drains
/// `pending` through the HTTP handlers and completes calls by posting a
/// response carrying the same id.
#[derive(Debug, Default)]
pub(crate) struct RelayQueue {
    /// Requests not yet collected by the wallet page, oldest first.
    pending: VecDeque<WireRequest>,
    /// Completion channels keyed by request id.
    waiting: HashMap<Uuid, oneshot::Sender<WireResponse>>,
}

impl RelayQueue {
    /// Add a request and its completion channel.
    fn add(&mut self, request: WireRequest, tx: oneshot::Sender<WireResponse>) {
        self.waiting.insert(request.id, tx);
        self.pending.push_back(request);
    }

    /// Take the oldest request not yet handed to the wallet page.
    fn next(&mut self) -> Option<WireRequest> {
        self.pending.pop_front()
    }

    /// Complete the call waiting on `response.id`.
    ///
    /// Returns `false` when no call with that id is waiting.
    fn complete(&mut self, response: WireResponse) -> bool {
        let Some(tx) = self.waiting.remove(&response.id) else {
            return false;
        };
        self.pending.retain(|request| request.id != response.id);
        // The caller may have timed out in the meantime.
        let _ = tx.send(response);
        true
    }

    /// Drop a call from the queue without completing it.
    fn remove(&mut self, id: &Uuid) {
        self.waiting.remove(id);
        self.pending.retain(|request| request.id != *id);
    }
}

/// Shared state between the HTTP handlers and the relay handle.
#[derive(Debug, Clone)]
pub(crate) struct BridgeState {
    /// Wallet calls in flight.
    queue: Arc<Mutex<RelayQueue>>,
    /// Token the wallet page must present on every `/api` call.
    session_token: Arc<String>,
    /// Feed of wallet events posted by the page.
    events_tx: UnboundedSender<ProviderEvent>,
    /// Receiving half of the event feed, taken by the first subscriber.
    events_rx: Arc<Mutex<Option<UnboundedReceiver<ProviderEvent>>>>,
}

impl Default for BridgeState {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeState {
    /// Create a new bridge state with an empty queue and a fresh token.
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded();
        Self {
            queue: Arc::new(Mutex::new(RelayQueue::default())),
            session_token: Arc::new(Uuid::new_v4().to_string()),
            events_tx,
            events_rx: Arc::new(Mutex::new(Some(events_rx))),
        }
    }

    /// Get the session token of this relay.
    pub fn session_token(&self) -> Arc<String> {
        self.session_token.clone()
    }

    /// Queue a wallet call and return its id and completion channel.
    pub fn enqueue(&self, call: WalletCall) -> (Uuid, oneshot::Receiver<WireResponse>) {
        let request = WireRequest { id: Uuid::new_v4(), call };
        let id = request.id;
        let (tx, rx) = oneshot::channel();
        self.queue.lock().add(request, tx);
        (id, rx)
    }

    /// Read the next request for the wallet page.
    pub fn next_request(&self) -> Option<WireRequest> {
        self.queue.lock().next()
    }

    /// Complete the call a response belongs to.
    pub fn resolve(&self, response: WireResponse) -> bool {
        self.queue.lock().complete(response)
    }

    /// Drop a call whose caller gave up waiting.
    pub fn abandon(&self, id: &Uuid) {
        self.queue.lock().remove(id);
    }

    /// Forward a wallet event to the subscriber, if any.
    pub fn push_event(&self, event: ProviderEvent) {
        let _ = self.events_tx.unbounded_send(event);
    }

    /// Take the event feed. Returns `None` after the first call.
    pub fn take_events(&self) -> Option<UnboundedReceiver<ProviderEvent>> {
        self.events_rx.lock().take()
    }
}

/// Abandons a queued call when the waiting side goes away.
///
/// Held across the wait for a wallet response: a timed out or cancelled call
/// is removed from the queue instead of lingering for the page to execute.
/// Completed ids are already gone, making the drop a no-op.
pub(crate) struct CallGuard {
    state: BridgeState,
    id: Uuid,
}

impl CallGuard {
    pub fn new(state: BridgeState, id: Uuid) -> Self {
        Self { state, id }
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.state.abandon(&self.id);
    }
}
