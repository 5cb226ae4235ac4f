//! Relay server configuration.

use std::time::Duration;

/// Default deadline for a wallet call relayed through the bridge.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Configures the relay server.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Port the loopback listener binds to. `0` picks a free port.
    pub port: u16,
    /// How long a relayed wallet call may wait for the page to respond.
    pub call_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { port: 0, call_timeout: DEFAULT_CALL_TIMEOUT }
    }
}

// === impl BridgeConfig ===

impl BridgeConfig {
    /// Sets the port the listener binds to.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the deadline for relayed wallet calls.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}
