//! # Wallet Provider Boundary
//!
//! The capability set a browser wallet exposes to a session, modeled after
//! [EIP-1193](https://eips.ethereum.org/EIPS/eip-1193): Ethereum Provider JavaScript API.
//!
//! A session consumes this interface, it never implements it. Concrete
//! implementations live elsewhere (the HTTP relay bridge, test doubles) and
//! cover three capabilities:
//! 1. Prompting the wallet for account authorization
//! 2. Querying an account's balance at a block tag
//! 3. Pushing `accountsChanged` / `chainChanged` notifications

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, ChainId, U256};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Stream of notifications pushed by a wallet provider.
///
/// Dropping the stream tears the subscription down.
pub type EventStream = BoxStream<'static, ProviderEvent>;

/// EIP-1193 error code a wallet emits when the user dismisses a prompt.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Notifications a wallet pushes while a session is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ProviderEvent {
    /// The set of authorized accounts changed. The first address is the newly
    /// active account; an empty list means the wallet disconnected.
    AccountsChanged(Vec<Address>),
    /// The wallet switched to another chain.
    ChainChanged(ChainId),
}

/// Errors surfaced by a wallet provider implementation.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The user dismissed the wallet's prompt.
    #[error("user rejected the request ({code}): {message}")]
    UserRejected { code: i64, message: String },
    /// The wallet answered with an error object other than a rejection.
    #[error("wallet returned error ({code}): {message}")]
    Rpc { code: i64, message: String },
    /// The wallet did not answer within the provider's deadline.
    #[error("timed out waiting for the wallet to respond")]
    Timeout,
    /// The transport carrying the call failed.
    #[error("wallet transport error: {0}")]
    Transport(String),
    /// The wallet's answer could not be decoded.
    #[error("invalid wallet response: {0}")]
    InvalidResponse(String),
    /// Taking the event subscription failed.
    #[error("unable to subscribe to wallet events: {0}")]
    Subscribe(String),
}

// === impl ProviderError ===

impl ProviderError {
    /// Builds the error matching a wallet error object, mapping the EIP-1193
    /// rejection code onto [`Self::UserRejected`].
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == USER_REJECTED_CODE {
            Self::UserRejected { code, message }
        } else {
            Self::Rpc { code, message }
        }
    }

    /// Whether the failure was the user dismissing a wallet prompt.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected { .. })
    }
}

/// Capability set of a browser wallet.
///
/// Mirrors the slice of the EIP-1193 surface a session needs: one
/// authorization request, one balance query, and the event subscription.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Prompts the wallet to authorize accounts for this session.
    ///
    /// The first returned address is the active account. An empty list means
    /// the wallet granted access to no account.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Returns the raw wei balance of `address` at `block`.
    async fn get_balance(
        &self,
        address: Address,
        block: BlockNumberOrTag,
    ) -> Result<U256, ProviderError>;

    /// Takes the provider's event stream.
    ///
    /// A provider hands out a single stream per session; asking twice is an
    /// error.
    async fn subscribe(&self) -> Result<EventStream, ProviderError>;
}
