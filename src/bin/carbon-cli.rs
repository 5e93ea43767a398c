use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use carbon_market::config::loader::load_from_env;
use carbon_market::ledger::{explorer_url, LedgerClient, UnsignedEnvelope};
use carbon_market::network::{resolve_network, NetworkSelector};
use carbon_market::signing::{LocalKeySigner, SigningAgent, SigningBridge};
use carbon_market::wallet::{LocalStore, WalletConnector, WalletKind};

#[derive(Parser)]
#[command(name = "carbon-cli")]
#[command(about = "Operator CLI for the carbon market transaction pipeline", long_about = None)]
struct Cli {
    /// Base URL of the carbon-market API.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Network to operate on (testnet or mainnet).
    #[arg(short, long, default_value = "testnet")]
    network: NetworkSelector,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved network profile
    Network,
    /// Fetch stablecoin and native balances of an account
    Balance { public_key: String },
    /// Build an unsigned purchase transaction through the API
    Build {
        #[arg(long)]
        project: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        wallet: String,
        /// Correlation key for the memo; a fresh UUID when omitted.
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Sign base64 XDR with the connected local wallet (CARBON_SIGNER_SECRET)
    Sign { xdr: String },
    /// Submit signed base64 XDR through the API
    Submit { xdr: String },
    /// Print the explorer URL of a transaction
    Explorer { hash: String },
    /// Manage the local wallet session
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Connect the local key signer and persist the session
    Connect,
    /// Show the persisted session with fresh balances
    Status,
    /// Move the session to --network
    Switch,
    /// Forget the persisted session
    Disconnect,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (config, _) = load_from_env()?;
    let network = cli.network;
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Network => print_json(&serde_json::to_value(resolve_network(network))?)?,
        Commands::Balance { public_key } => {
            let ledger = LedgerClient::new(config.ledger.clone())?;
            let balances = ledger.fetch_balances(&public_key, network).await?;
            print_json(&serde_json::to_value(balances)?)?;
        }
        Commands::Build {
            project,
            quantity,
            price,
            wallet,
            idempotency_key,
        } => {
            let idempotency_key =
                idempotency_key.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
            let body = json!({
                "selection": {
                    "projectId": project,
                    "quantity": quantity,
                    "calculatedPrice": price,
                },
                "walletPublicKey": wallet,
                "network": network,
                "idempotencyKey": idempotency_key,
            });
            let res = client
                .post(format!("{}/transaction/build", cli.url))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Sign { xdr } => {
            let wallet = local_wallet(&config.ledger, config.wallet.session_path.as_deref())?;
            if wallet.load_persisted().await?.is_none() {
                wallet.connect(WalletKind::Local, network).await?;
            }
            let envelope = UnsignedEnvelope {
                transaction_xdr: xdr,
                network_passphrase: resolve_network(network).protocol_passphrase.to_string(),
            };
            let signed = wallet.sign(&envelope).await?;
            println!("{}", signed.transaction_xdr);
        }
        Commands::Submit { xdr } => {
            let body = json!({ "signedTransactionEnvelope": xdr, "network": network });
            let res = client
                .post(format!("{}/transaction/submit", cli.url))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Explorer { hash } => println!("{}", explorer_url(&hash, network)),
        Commands::Wallet { action } => {
            let wallet = local_wallet(&config.ledger, config.wallet.session_path.as_deref())?;
            match action {
                WalletAction::Connect => {
                    let session = wallet.connect(WalletKind::Local, network).await?;
                    print_json(&serde_json::to_value(session)?)?;
                }
                WalletAction::Status => match wallet.load_persisted().await? {
                    Some(session) => print_json(&serde_json::to_value(session)?)?,
                    None => println!("No wallet connected"),
                },
                WalletAction::Switch => {
                    if wallet.load_persisted().await?.is_none() {
                        println!("No wallet connected");
                        return Ok(());
                    }
                    let session = wallet.switch_network(network).await?;
                    print_json(&serde_json::to_value(session)?)?;
                }
                WalletAction::Disconnect => {
                    wallet.disconnect()?;
                    println!("Wallet disconnected");
                }
            }
        }
    }

    Ok(())
}

fn local_wallet(
    ledger: &carbon_market::config::LedgerConfig,
    session_path: Option<&str>,
) -> Result<WalletConnector, Box<dyn std::error::Error>> {
    let signer = LocalKeySigner::from_env()?;
    let bridge = SigningBridge::new().with_agent(SigningAgent::Local(signer));
    let ledger = LedgerClient::new(ledger.clone())?;
    let store = match session_path {
        Some(path) => LocalStore::load_from_file(PathBuf::from(path))?,
        None => LocalStore::new(None),
    };
    Ok(WalletConnector::new(Arc::new(bridge), Arc::new(ledger), store))
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    print_json(&json)
}
