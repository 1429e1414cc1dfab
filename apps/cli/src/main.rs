mod config;
mod surfaces;

use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use contribution::{
    ContributionControl, ContributionController, ControlCapabilities, FailureDisplay, FlowOutcome,
    ReceiptPoller, StaticInputs, UiStateMachine, WalletSessionProvider,
};
use indexer::{ContributionRecord, ContributionScanner};
use shared::domain::{Address, AssetKind};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;
use wallet::JsonRpcWallet;

use crate::{config::Settings, surfaces::TerminalSurfaces};

const CONTROL_ID: &str = "contribute";
const AMOUNT_INPUT: &str = "amount";

#[derive(Parser, Debug)]
#[command(name = "homeshare", about = "Contribute to and index crowdfund campaigns")]
struct Args {
    /// TOML settings file (defaults to ./homeshare.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one contribution through the wallet and wait for it to be mined
    Contribute {
        #[arg(long)]
        campaign: Option<Address>,
        #[arg(long)]
        amount: String,
        /// Asset symbol; the native coin when omitted
        #[arg(long)]
        asset: Option<String>,
        #[arg(long)]
        failure_display: Option<FailureDisplay>,
    },
    /// List the assets the contribute control accepts
    Assets,
    /// Record contribution events up to the current tip
    Scan {
        #[arg(long)]
        campaign: Option<Address>,
        #[arg(long)]
        from: Option<u64>,
        #[arg(long)]
        reset: bool,
        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Watch for new contributions until interrupted
    Follow {
        #[arg(long = "campaign")]
        campaigns: Vec<Address>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let settings = config::load_settings(args.config.as_deref())?;

    match args.command {
        Command::Contribute {
            campaign,
            amount,
            asset,
            failure_display,
        } => {
            let campaign = campaign_or_configured(campaign, &settings)?;
            contribute(&settings, campaign, amount, asset, failure_display).await
        }
        Command::Assets => {
            for asset in settings.accepted_assets() {
                match asset.kind {
                    AssetKind::Native => println!("{}\tnative\t{}", asset.symbol, asset.decimals),
                    AssetKind::Erc20 { token } => {
                        println!("{}\terc20 {token}\t{}", asset.symbol, asset.decimals)
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Scan {
            campaign,
            from,
            reset,
            json,
        } => {
            let campaign = campaign_or_configured(campaign, &settings)?;
            let mut scan = settings.scan.clone();
            scan.reset |= reset || from.is_some();
            if let Some(from) = from {
                scan.start_block = from;
            }
            let scanner = ContributionScanner::new(Arc::new(rpc_wallet(&settings)?), scan)
                .with_tokens(settings.tokens.clone());
            let report = scanner.scan_campaign(campaign).await?;
            for record in scanner.ledger().await.records_for(campaign) {
                print_record(record, &settings.native_symbol, json)?;
            }
            println!(
                "scanned blocks {}..={}: {} recorded, {} skipped",
                report.from,
                report.to,
                report.recorded,
                report.skipped_blocks.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Follow { mut campaigns } => {
            if campaigns.is_empty() {
                campaigns.push(campaign_or_configured(None, &settings)?);
            }
            let scanner = Arc::new(
                ContributionScanner::new(Arc::new(rpc_wallet(&settings)?), settings.scan.clone())
                    .with_tokens(settings.tokens.clone()),
            );
            let mut records = scanner.subscribe();
            let native_symbol = settings.native_symbol.clone();
            tokio::spawn(async move {
                loop {
                    match records.recv().await {
                        Ok(record) => {
                            let _ = print_record(&record, &native_symbol, false);
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            });
            scanner
                .follow(&campaigns, async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn contribute(
    settings: &Settings,
    campaign: Address,
    amount: String,
    asset: Option<String>,
    failure_display: Option<FailureDisplay>,
) -> Result<ExitCode> {
    let abi = config::load_abi(&settings.abi_path)?;
    let sessions = match &settings.rpc_url {
        Some(url) => WalletSessionProvider::new(Arc::new(JsonRpcWallet::new(url.clone())?)),
        None => WalletSessionProvider::missing(),
    };
    let control = ContributionControl {
        id: CONTROL_ID.to_string(),
        campaign,
        abi: Arc::new(abi),
        input_id: AMOUNT_INPUT.to_string(),
        capabilities: ControlCapabilities::with_assets(settings.accepted_assets()),
    };
    let ui = UiStateMachine::new(CONTROL_ID, TerminalSurfaces::shared())
        .with_failure_display(failure_display.unwrap_or(settings.failure_display))
        .with_reload_delay(settings.reload_delay);
    let controller = ContributionController::new(
        control,
        Arc::new(StaticInputs::new().with(AMOUNT_INPUT, amount)),
        Arc::new(sessions),
        Arc::new(ReceiptPoller::new(
            Duration::from_secs(1),
            settings.confirmation_timeout,
        )),
        ui,
    );

    match controller.on_click(asset.as_deref()).await {
        FlowOutcome::Confirmed(hash) => {
            println!("confirmed {hash}");
            Ok(ExitCode::SUCCESS)
        }
        FlowOutcome::Ignored | FlowOutcome::Rejected(_) | FlowOutcome::Failed(_) => {
            Ok(ExitCode::FAILURE)
        }
    }
}

fn campaign_or_configured(campaign: Option<Address>, settings: &Settings) -> Result<Address> {
    match campaign.or(settings.campaign) {
        Some(campaign) => Ok(campaign),
        None => bail!("no campaign given; pass --campaign or set APP__CAMPAIGN"),
    }
}

fn rpc_wallet(settings: &Settings) -> Result<JsonRpcWallet> {
    let url = settings
        .rpc_url
        .clone()
        .context("MONAD_RPC_URL is not set")?;
    Ok(JsonRpcWallet::new(url)?)
}

fn print_record(record: &ContributionRecord, native_symbol: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(record)?);
        return Ok(());
    }
    println!(
        "block {}\t{}\t{} {}\tby {}",
        record.block,
        record.tx_hash,
        record.display_amount(),
        record.asset.label(native_symbol),
        record.investor
    );
    Ok(())
}
