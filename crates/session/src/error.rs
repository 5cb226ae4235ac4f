//! Session error taxonomy.

use sextant_provider::ProviderError;

/// Failures surfaced by the session reconciler.
///
/// Every variant maps onto a fixed user-facing message via
/// [`user_message`](Self::user_message); the underlying provider detail only
/// travels through `Display`/`source` for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No wallet was installed when the user tried to connect.
    #[error("no browser wallet detected")]
    ProviderAbsent,
    /// The account authorization request failed or was rejected.
    #[error("account request failed: {0}")]
    ConnectionFailed(#[source] ProviderError),
    /// The balance query for an adopted account failed.
    #[error("balance fetch failed: {0}")]
    BalanceFetchFailed(#[source] ProviderError),
}

// === impl SessionError ===

impl SessionError {
    /// The fixed message shown to the user for this failure.
    ///
    /// Rejections, provider faults and balance failures all collapse onto the
    /// same generic message; the distinction is logged, not displayed.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ProviderAbsent => "no browser wallet detected",
            Self::ConnectionFailed(_) | Self::BalanceFetchFailed(_) => {
                "there was a problem connecting to the wallet"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_fixed() {
        let rejected = SessionError::ConnectionFailed(ProviderError::UserRejected {
            code: 4001,
            message: "user denied account authorization".to_string(),
        });
        let transport = SessionError::BalanceFetchFailed(ProviderError::Transport(
            "connection refused".to_string(),
        ));

        // Both failure kinds share one generic user string.
        assert_eq!(rejected.user_message(), transport.user_message());
        assert_eq!(SessionError::ProviderAbsent.user_message(), "no browser wallet detected");

        // The diagnostic rendering keeps the provider detail.
        assert!(rejected.to_string().contains("user denied"));
        assert!(transport.to_string().contains("connection refused"));
    }
}
