#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

use std::{path::PathBuf, time::Duration};

use alloy::providers::RootProvider;
use alloy_primitives::{Address, TxHash};
use anyhow::{Context, Result};
use apus_market_core::{
    render_all, AddressBook, ClientConfig, MarketClient, Role, RoleResolver, Settings,
};
use apus_rpc::{configure_provider, TransactionSubmitter};
use apus_utils::time_now_centis;
use clap::{Args, Parser, Subcommand};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

/// The CLI application that defines all available commands.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The environment file to read settings from.
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the account and key availability of each role.
    Roles,
    /// Call `Market.get()`.
    Get,
    /// Point the prover contract at a proof task contract.
    SetProofTask {
        /// The proof task contract. Defaults to the deployed `ApusProofTask`.
        #[arg(long)]
        address: Option<Address>,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Register a prover client on the market.
    JoinMarket {
        /// The account owning the client.
        #[arg(long)]
        owner: Address,
        /// The endpoint the client serves on.
        #[arg(long)]
        url: String,
        /// The client id. Defaults to the current time in hundredths of a second.
        #[arg(long)]
        id: Option<u64>,
        /// The minimum fee the client accepts.
        #[arg(long)]
        min_fee: u64,
        /// The maximum number of zkEVM instances.
        #[arg(long)]
        max_instances: u64,
        /// The number of instances currently running.
        #[arg(long, default_value_t = 0)]
        cur_instance: u64,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Call `Market.getLowestN()`.
    LowestN,
    /// Read the configuration of a registered client.
    ProverConfig(ClientArgs),
    /// Dispatch a task to a registered client.
    Dispatch {
        #[command(flatten)]
        client: ClientArgs,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Release a task held by a registered client.
    Release {
        #[command(flatten)]
        client: ClientArgs,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

/// Identifies a registered client.
#[derive(Debug, Clone, Args)]
struct ClientArgs {
    /// The account owning the client.
    #[arg(long)]
    owner: Address,
    /// The client id.
    #[arg(long)]
    id: u64,
}

#[derive(Debug, Clone, Args)]
struct WaitArgs {
    /// Wait for the transaction to be mined, for at most SECS seconds.
    #[arg(long, value_name = "SECS", num_args = 0..=1, default_missing_value = "120")]
    wait: Option<u64>,
}

#[derive(Tabled)]
struct RoleRow {
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Signing Key")]
    signer: &'static str,
}

/// The main entry point for the CLI.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load the settings and initialize logging.
    let settings = Settings::load(&cli.env_file)
        .with_context(|| format!("failed to load settings from {}", cli.env_file.display()))?;
    apus_utils::init_logger(settings.log_format);
    let roles = settings.role_resolver()?;

    if let Command::Roles = cli.command {
        print_roles(&roles);
        return Ok(());
    }

    // Connect to the node and make sure it serves the configured chain.
    let provider = configure_provider(&settings.rpc_url)?;
    let submitter =
        TransactionSubmitter::new(settings.chain_id, settings.gas_limit, settings.rpc_timeout());
    submitter.verify_chain_id(&provider).await?;

    let contracts = AddressBook::load(&settings)?;
    info!(
        rpc = %settings.rpc_url,
        chain_id = settings.chain_id,
        market = %contracts.market.address,
        prover = %contracts.prover.address,
        "connected to market"
    );
    let client = MarketClient::new(provider.clone(), &contracts, roles, submitter);

    // Run the command.
    let sent = match cli.command {
        Command::Roles => None,
        Command::Get => {
            println!("{}", render_all(&client.get().await?));
            None
        }
        Command::LowestN => {
            println!("{}", render_all(&client.get_lowest_n().await?));
            None
        }
        Command::ProverConfig(args) => {
            println!("{}", render_all(&client.get_prover_config(args.owner, args.id).await?));
            None
        }
        Command::SetProofTask { address, wait } => {
            let address = address.unwrap_or_else(|| client.proof_task_address());
            Some((client.set_proof_task_contract(address).await?, wait))
        }
        Command::JoinMarket { owner, url, id, min_fee, max_instances, cur_instance, wait } => {
            let config = ClientConfig {
                owner,
                id: id.unwrap_or_else(time_now_centis),
                url,
                min_fee,
                max_zk_evm_instance: max_instances,
                cur_instance,
            };
            println!("client id: {}", config.id);
            Some((client.join_market(&config).await?, wait))
        }
        Command::Dispatch { client: args, wait } => {
            Some((client.dispatch_task_to_client(args.owner, args.id).await?, wait))
        }
        Command::Release { client: args, wait } => {
            Some((client.release_task_to_client(args.owner, args.id).await?, wait))
        }
    };

    if let Some((hash, wait)) = sent {
        println!("{hash}");
        if let Some(secs) = wait.wait {
            confirm(&client, &provider, hash, Duration::from_secs(secs)).await?;
        }
    }

    Ok(())
}

async fn confirm(
    client: &MarketClient<RootProvider>,
    provider: &RootProvider,
    hash: TxHash,
    wait: Duration,
) -> Result<()> {
    let receipt = client.submitter().wait_for_receipt(provider, hash, wait).await?;
    println!(
        "mined in block {}",
        receipt.block_number.map_or_else(|| "?".to_string(), |block| block.to_string())
    );
    Ok(())
}

fn print_roles(roles: &RoleResolver) {
    let rows = Role::ALL
        .into_iter()
        .map(|role| {
            let identity = roles.resolve(role);
            RoleRow {
                role: role.to_string(),
                address: identity.address.to_checksum(None),
                signer: if identity.signer.is_some() { "yes" } else { "no" },
            }
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("{table}");
}
