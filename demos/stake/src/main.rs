//! Delegation demo against an in-memory wallet.
//!
//! Connects, lists the wallet's assets and submits one delegation, logging
//! every notification along the way. Failure flags script the mock wallet:
//!
//!   cargo run -p penstake-demo-stake -- --validator penumbravalid1abc --amount 1000000
//!   cargo run -p penstake-demo-stake -- --validator penumbravalid1abc --amount 5 --no-plan
//!   cargo run -p penstake-demo-stake -- --validator penumbravalid1abc --amount 5 \
//!       --fail-broadcast "network down"

use clap::Parser;
use penstake_client::mock::{MockProvider, sample_metadata, sample_validator};
use penstake_client::{Config, Outcome, Session, TracingNotifier};
use penstake_core::{Amount, AssetsResponse, Failure, IdentityKey};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "penstake-stake", about = "Submit a delegation through a mock wallet")]
struct Args {
    /// Validator address (penumbravalid1...).
    #[arg(long)]
    validator: IdentityKey,

    /// Amount in base units.
    #[arg(long)]
    amount: Amount,

    /// Source account index.
    #[arg(long, default_value_t = 0)]
    account: u32,

    /// TOML config file.
    #[arg(long, env = "PENSTAKE_CONFIG")]
    config: Option<PathBuf>,

    /// Make the wallet refuse the connection.
    #[arg(long)]
    fail_connect: bool,

    /// Make the planner return no plan.
    #[arg(long)]
    no_plan: bool,

    /// Make broadcast fail with this message.
    #[arg(long)]
    fail_broadcast: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("penstake=info".parse()?))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let session = Session::new(Arc::new(wallet(&args)), TracingNotifier, config);

    if let Err(e) = session.broker.request_connection().await {
        tracing::error!("Could not connect: {}", e);
        tracing::info!("Connection state: {:?}", session.broker.state());
        return Ok(());
    }

    let assets = session.assets.assets().await?;
    for metadata in assets.values() {
        tracing::info!("Asset {} ({})", metadata.symbol, metadata.penumbra_asset_id);
    }

    let workflow = session.stake_workflow();
    match workflow.submit(args.amount, args.account, &args.validator).await? {
        Outcome::Submitted(id) => tracing::info!("Submitted {}", id),
        Outcome::Failed(e) => tracing::warn!("Delegation failed: {}", e),
    }
    tracing::info!("Workflow state: {:?}", workflow.state());

    Ok(())
}

fn wallet(args: &Args) -> MockProvider {
    let mut wallet = MockProvider::new()
        .with_validator(sample_validator(&args.validator))
        .with_assets(vec![
            AssetsResponse { denom_metadata: Some(sample_metadata(1, "UM")) },
            AssetsResponse { denom_metadata: Some(sample_metadata(2, "GM")) },
        ]);
    if args.fail_connect {
        wallet = wallet.fail_connect(Failure::message("Prax wallet is locked"));
    }
    if args.no_plan {
        wallet = wallet.without_plan();
    }
    if let Some(msg) = &args.fail_broadcast {
        wallet = wallet.fail_broadcast(Failure::message(msg.as_str()));
    }
    wallet
}
