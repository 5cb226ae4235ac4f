use std::time::Duration;

use alloy_eips::BlockNumberOrTag;
use clap::Parser;
use sextant_bridge::BridgeConfig;
use sextant_session::SessionConfig;

/// Run a browser wallet session from the terminal.
///
/// Starts a loopback relay the wallet page polls, asks the wallet to
/// authorize an account, and prints the session state as it changes.
#[derive(Debug, Parser)]
#[command(name = "sextant", version, next_display_order = None)]
pub struct SextantArgs {
    /// Port for the wallet relay server.
    ///
    /// `0` picks a free port.
    #[arg(long, value_name = "PORT", default_value = "0")]
    pub port: u16,

    /// Seconds a relayed wallet call may wait for the page to answer.
    #[arg(long, value_name = "SECONDS", default_value = "30")]
    pub timeout: u64,

    /// Block tag balance queries are issued at.
    #[arg(long, value_name = "BLOCK", default_value = "latest")]
    pub block: BlockNumberOrTag,

    /// Run without the wallet relay, as when no wallet is installed.
    #[arg(long)]
    pub no_bridge: bool,
}

// === impl SextantArgs ===

impl SextantArgs {
    /// The relay configuration these arguments describe.
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig::default()
            .with_port(self.port)
            .with_call_timeout(Duration::from_secs(self.timeout))
    }

    /// The session configuration these arguments describe.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default().with_block(self.block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        SextantArgs::command().debug_assert();
    }

    #[test]
    fn can_parse_defaults() {
        let args = SextantArgs::parse_from(["sextant"]);
        assert_eq!(args.port, 0);
        assert_eq!(args.timeout, 30);
        assert_eq!(args.block, BlockNumberOrTag::Latest);
        assert!(!args.no_bridge);
    }

    #[test]
    fn can_parse_block_tag() {
        let args = SextantArgs::parse_from(["sextant", "--port", "7878", "--block", "finalized"]);
        assert_eq!(args.port, 7878);
        assert_eq!(args.block, BlockNumberOrTag::Finalized);
    }

    #[test]
    fn can_parse_no_bridge() {
        let args = SextantArgs::parse_from(["sextant", "--no-bridge"]);
        assert!(args.no_bridge);
    }
}
