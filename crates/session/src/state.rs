//! The reconciled view of a wallet session.

use alloy_primitives::{Address, U256, utils::format_ether};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of a wallet session as seen by the user.
///
/// All three fields start out empty. `balance` is only ever populated while
/// `account` is populated; `error` holds the message of the last failure and
/// is cleared by any successful transition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// The active account, if the wallet authorized one.
    pub account: Option<Address>,
    /// Formatted ether balance of `account`.
    pub balance: Option<String>,
    /// User-facing message of the last failure.
    pub error: Option<String>,
}

// === impl ConnectionState ===

impl ConnectionState {
    /// Whether an account is currently active.
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.account, &self.balance) {
            (Some(account), Some(balance)) => write!(f, "{account} ({balance} ETH)")?,
            (Some(account), None) => write!(f, "{account} (balance pending)")?,
            (None, _) => f.write_str("disconnected")?,
        }
        if let Some(error) = &self.error {
            write!(f, " [{error}]")?;
        }
        Ok(())
    }
}

/// Renders a raw wei amount as a decimal ether string.
///
/// Trailing fractional zeros are trimmed, keeping at least one digit after
/// the point: `2500000000000000000` wei renders as `"2.5"`, one ether as
/// `"1.0"`.
pub fn format_balance(raw: U256) -> String {
    let formatted = format_ether(raw);
    match formatted.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() { format!("{int}.0") } else { format!("{int}.{frac}") }
        }
        None => formatted,
    }
}
