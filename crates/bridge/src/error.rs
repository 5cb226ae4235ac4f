use std::io;

/// Errors from managing the relay server lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The loopback listener could not be bound.
    #[error("failed to bind relay listener: {0}")]
    Bind(#[source] io::Error),
    /// An operation required a running server.
    #[error("relay server is not running")]
    NotRunning,
    /// The server was started twice.
    #[error("relay server is already running")]
    AlreadyRunning,
}
