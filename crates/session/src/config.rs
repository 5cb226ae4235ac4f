//! Session configuration.

use alloy_eips::BlockNumberOrTag;

/// Default capacity of the session command channel.
pub const DEFAULT_COMMAND_CAPACITY: usize = 16;

/// Configures the behavior of a wallet session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Block tag balance queries are issued at.
    pub block: BlockNumberOrTag,
    /// Capacity of the command channel between API handles and the service.
    pub command_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { block: BlockNumberOrTag::Latest, command_capacity: DEFAULT_COMMAND_CAPACITY }
    }
}

// === impl SessionConfig ===

impl SessionConfig {
    /// Sets the block tag balance queries are issued at.
    #[must_use]
    pub fn with_block(mut self, block: BlockNumberOrTag) -> Self {
        self.block = block;
        self
    }

    /// Sets the capacity of the session command channel.
    #[must_use]
    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }
}
