//! The `sextant` binary: a browser wallet session driven from the terminal.

use std::sync::Arc;

use clap::Parser;
use eyre::Result;
use sextant_bridge::BridgeServer;
use sextant_provider::WalletProvider;
use tracing::{error, info};

mod args;

use args::SextantArgs;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = SextantArgs::parse();
    run(args).await
}

fn init_tracing() {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

async fn run(args: SextantArgs) -> Result<()> {
    let mut bridge = None;
    let provider: Option<Arc<dyn WalletProvider>> = if args.no_bridge {
        None
    } else {
        let mut server = BridgeServer::new(args.bridge_config());
        let addr = server.start().await?;
        println!("Wallet page: http://{addr}/?token={}", server.session_token());
        println!("Open it in the wallet's browser and approve the connection prompt.");
        bridge = Some(server.clone());
        Some(Arc::new(server))
    };

    let (session, mut handle) = sextant_session::spawn(provider, args.session_config());
    session.connect().await;

    let mut states = session.subscribe();
    println!("session: {}", *states.borrow_and_update());

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("session: {}", *states.borrow_and_update());
            }
            res = &mut handle => {
                if let Err(err) = res {
                    error!(target: "sextant", %err, "session task failed");
                }
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!(target: "sextant", "shutting down");
                break;
            }
        }
    }

    session.shutdown().await;
    if let Some(mut bridge) = bridge {
        let _ = bridge.stop().await;
    }
    Ok(())
}
