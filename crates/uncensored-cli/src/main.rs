//! `uncensored`: send L2 transactions directly or force them in through L1.

mod config;

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use alloy_primitives::Address;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uncensored_explorer::{encode_call, writable_functions, ExplorerClient};
use uncensored_ops::{
    ForceInclusionClient, Inclusion, Stage, SubmitOutcome, TrackerEvent, TracingNotifier,
};
use uncensored_sdk::{ArbitrumInbox, InclusionRouter, OpStackPortal};
use uncensored_types::{chains, L2Chain, Network, Result, TransactionDraft, UncensoredError};
use uncensored_wallet::JsonRpcWallet;

use crate::config::{explorer_api_key, parse_named_arg, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "uncensored", version, about = "L2 force-inclusion client")]
struct Cli {
    /// JSON settings file.
    #[arg(long, global = true, env = "UNCENSORED_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the configured network.
    #[arg(long, global = true)]
    network: Option<Network>,

    /// Overrides the configured wallet endpoint.
    #[arg(long, global = true)]
    wallet_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a transaction directly on its L2.
    Send(DraftArgs),
    /// Send a transaction through the L1 inbox of its L2 and track it.
    Force {
        #[command(flatten)]
        draft: DraftArgs,
        /// Broadcast the L1 transaction and exit without tracking it.
        #[arg(long)]
        no_wait: bool,
    },
    /// Build calldata for a verified contract.
    Compose {
        #[arg(long, default_value = "optimism")]
        target: L2Chain,
        #[arg(long)]
        address: Address,
        /// Omit to list the contract's writable functions.
        #[arg(long)]
        function: Option<String>,
        /// Function argument as `name=value`; unnamed inputs use their position.
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Use this implementation's ABI instead of detecting a proxy.
        #[arg(long)]
        implementation: Option<Address>,
    },
    /// Print the explorer page of a transaction hash or an address.
    Explorer {
        hash_or_address: String,
        #[arg(long)]
        chain_id: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct DraftArgs {
    #[arg(long, default_value = "optimism")]
    target: L2Chain,
    #[arg(long)]
    to: String,
    /// Amount in ether.
    #[arg(long, default_value = "")]
    value: String,
    /// Hex calldata.
    #[arg(long, default_value = "")]
    data: String,
    #[arg(long)]
    gas_limit: String,
}

impl DraftArgs {
    fn into_draft(self) -> TransactionDraft {
        TransactionDraft {
            recipient: self.to,
            value: self.value,
            data: self.data,
            gas_limit: self.gas_limit,
            target: self.target,
        }
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(network) = cli.network {
        cfg.client.network = network;
    }
    if let Some(url) = cli.wallet_url {
        cfg.rpc.wallet_url = url;
    }

    match cli.command {
        Command::Send(args) => send(&cfg, args.into_draft()).await,
        Command::Force { draft, no_wait } => force(&cfg, draft.into_draft(), no_wait).await,
        Command::Compose { target, address, function, args, implementation } => {
            compose(&cfg, target, address, function, args, implementation).await
        }
        Command::Explorer { hash_or_address, chain_id } => {
            // 32-byte hashes are 66 characters with the prefix
            let url = if hash_or_address.len() == 66 {
                chains::tx_url(chain_id, &hash_or_address)
            } else {
                chains::address_url(chain_id, &hash_or_address)
            };
            println!("{url}");
            Ok(())
        }
    }
}

fn client(cfg: &AppConfig) -> ForceInclusionClient {
    let network = cfg.client.network;
    let sdk = InclusionRouter::new(
        OpStackPortal::for_network(network),
        ArbitrumInbox::for_network(network, cfg.arbitrum.clone()),
    );
    ForceInclusionClient::new(
        cfg.client.clone(),
        Arc::new(JsonRpcWallet::new(cfg.rpc.clone())),
        Arc::new(sdk),
        Arc::new(TracingNotifier),
        Some(Box::new(|event: TrackerEvent| tracing::debug!(?event, "tracker event"))),
    )
}

fn print_switch(from: u64, to: u64) {
    println!(
        "wallet is on chain {from}; switch to chain {to} was requested, \
         run the command again once it completes"
    );
}

async fn send(cfg: &AppConfig, draft: TransactionDraft) -> Result<()> {
    let client = client(cfg);
    match client.send_direct(&draft).await? {
        SubmitOutcome::SwitchRequested { from, to } => print_switch(from, to),
        SubmitOutcome::Broadcast { chain_id, tx_hash } => {
            println!("sent {tx_hash}");
            let receipt = client.confirm_direct(chain_id, tx_hash).await?;
            println!(
                "confirmed in block {} {}",
                receipt.block_number,
                chains::tx_url(Some(chain_id), &tx_hash.to_string())
            );
        }
    }
    Ok(())
}

async fn force(cfg: &AppConfig, draft: TransactionDraft, no_wait: bool) -> Result<()> {
    let client = client(cfg);
    if no_wait {
        match client.force_submit(&draft).await? {
            SubmitOutcome::SwitchRequested { from, to } => print_switch(from, to),
            SubmitOutcome::Broadcast { chain_id, tx_hash } => {
                println!("{}", chains::tx_url(Some(chain_id), &tx_hash.to_string()));
            }
        }
        return Ok(());
    }

    match client.force_include(&draft).await? {
        Inclusion::SwitchRequested { from, to } => print_switch(from, to),
        Inclusion::Tracked(attempt) => {
            let l1 = attempt
                .l1_tx_hash
                .map(|h| chains::tx_url(Some(attempt.l1_chain_id), &h.to_string()));
            let l2 = attempt
                .l2_tx_hash
                .map(|h| chains::tx_url(Some(attempt.l2_chain_id), &h.to_string()));
            println!("stage: {}", attempt.stage);
            if let Some(url) = l1 {
                println!("l1: {url}");
            }
            if let Some(url) = l2 {
                println!("l2: {url}");
            }
            if attempt.stage == Stage::Failed {
                let reason = attempt.error.unwrap_or_else(|| "inclusion failed".into());
                return Err(UncensoredError::Other(reason));
            }
        }
    }
    Ok(())
}

async fn compose(
    cfg: &AppConfig,
    target: L2Chain,
    address: Address,
    function: Option<String>,
    raw_args: Vec<String>,
    implementation: Option<Address>,
) -> Result<()> {
    let explorer = ExplorerClient::for_chain(target, cfg.client.network, &explorer_api_key(target));
    let abi = explorer.resolve_abi(address, implementation).await?;

    let Some(function) = function else {
        for f in writable_functions(&abi) {
            println!("{}", f.signature());
        }
        return Ok(());
    };

    let args = raw_args
        .iter()
        .map(|raw| parse_named_arg(raw))
        .collect::<Result<HashMap<_, _>>>()?;
    let data = encode_call(&abi, &function, &args)?;
    println!("{data}");
    Ok(())
}
