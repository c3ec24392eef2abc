//! Surge Bridge CLI
//!
//! - `status`   - show configuration, signers and relay liveness
//! - `transfer` - run one BSC <-> Sui transfer end to end
//! - `unlock`   - fetch the VAA for a BSC transfer and redeem it on Sui
//! - `relay`    - hand a source transaction to the relay backend
//! - `health`   - probe the relay backend

use clap::{Parser, Subcommand};
use eyre::{eyre, Result, WrapErr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use surge_bridge::chain::{EvmBridgeChain, MoveBridgeChain};
use surge_bridge::config::{CompletionMode, Config};
use surge_bridge::evm::EvmBridgeClient;
use surge_bridge::relay::{spawn_health_monitor, RelayBackend};
use surge_bridge::sui::{SuiRpcClient, SuiSigner};
use surge_bridge::units::to_native_units;
use surge_bridge::{
    AttestationPoller, Chain, ClientPolling, CompletionStrategy, DestinationCompleter,
    EvmCommitter, EvmCompleter, MoveCommitter, MoveCompleter, RelayClient, RemoteRelay,
    TransferOrchestrator, TransferOutcome, TransferRequest, WormholescanClient,
};

#[derive(Parser)]
#[command(name = "surge-bridge")]
#[command(about = "Move Surge tokens between BSC and Sui over Wormhole", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env file
    #[arg(long, global = true, default_value = ".env")]
    env_file: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration, signer addresses and relay liveness
    Status,

    /// Bridge tokens from one chain to the other
    Transfer {
        /// Source chain (bsc or sui); the destination is the other one
        #[arg(long)]
        from: Chain,

        /// Human-readable amount, e.g. 10 or 0.5
        #[arg(long)]
        amount: String,

        /// Destination address (defaults to this process' destination signer)
        #[arg(long)]
        recipient: Option<String>,

        /// Seconds between allowance checks while an approval confirms
        #[arg(long, default_value_t = 3)]
        approval_poll_secs: u64,
    },

    /// Fetch the VAA for a BSC source transaction and redeem it on Sui
    Unlock {
        /// Source transaction hash
        tx_hash: String,

        /// Build and print the unlock transaction without executing it
        #[arg(long)]
        prepare_only: bool,
    },

    /// Ask the relay backend to complete a committed transfer
    Relay {
        /// Source transaction hash
        tx_hash: String,
    },

    /// Probe the relay backend
    Health,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = Config::load_from_file(&cli.env_file)?;
    tracing::debug!(?config, "Configuration loaded");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            cancel.cancel();
        });
    }

    match cli.command {
        Commands::Status => status(&config).await,
        Commands::Transfer {
            from,
            amount,
            recipient,
            approval_poll_secs,
        } => {
            transfer(
                &config,
                from,
                amount,
                recipient,
                Duration::from_secs(approval_poll_secs),
                &cancel,
            )
            .await
        }
        Commands::Unlock {
            tx_hash,
            prepare_only,
        } => unlock(&config, &tx_hash, prepare_only, &cancel).await,
        Commands::Relay { tx_hash } => {
            let receipt = relay_client(&config)?.bridge(&tx_hash).await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }
        Commands::Health => {
            let relay = relay_client(&config)?;
            let healthy = relay.health().await;
            tracing::info!(relay = %relay.base_url(), healthy, "Relay health");
            if healthy {
                Ok(())
            } else {
                Err(eyre!("relay backend at {} is offline", relay.base_url()))
            }
        }
    }
}

fn relay_client(config: &Config) -> Result<RelayClient> {
    let url = config
        .relay
        .backend_url
        .as_deref()
        .ok_or_else(|| eyre!("BACKEND_URL is not set"))?;
    Ok(RelayClient::new(url))
}

fn sui_client(config: &Config) -> Result<SuiRpcClient> {
    let mut client = SuiRpcClient::new(&config.sui.rpc_url).with_gas_budget(config.sui.gas_budget);
    if let Some(key) = &config.sui.private_key {
        let signer = SuiSigner::from_private_key(key.expose()).wrap_err("Invalid SUI_PRIVATE_KEY")?;
        client = client.with_signer(signer);
    }
    Ok(client)
}

async fn status(config: &Config) -> Result<()> {
    let evm = EvmBridgeClient::new(&config.evm)?;
    let sui = sui_client(config)?;

    tracing::info!(
        chain_id = config.evm.chain_id,
        bridge = %evm.bridge_address(),
        token = %evm.token_address(),
        signer = ?evm.signer_address(),
        "BSC"
    );
    tracing::info!(
        package = %config.sui.package.package_id,
        coin_type = %config.sui.package.coin_type(),
        signer = ?sui.sender(),
        "Sui"
    );
    tracing::info!(
        wormholescan = %config.attestation.wormholescan_url,
        mode = %config.completion_mode,
        "Attestation"
    );

    if let Err(e) = evm.verify_chain_id().await {
        tracing::warn!(error = %e, "BSC RPC check failed");
    }

    if let Ok(relay) = relay_client(config) {
        tracing::info!(relay = %relay.base_url(), healthy = relay.health().await, "Relay");
    }
    Ok(())
}

async fn transfer(
    config: &Config,
    from: Chain,
    amount: String,
    recipient: Option<String>,
    approval_poll: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    let evm = Arc::new(EvmBridgeClient::new(&config.evm)?);
    let sui = Arc::new(sui_client(config)?);
    let package = config.sui.package.clone();

    let evm_address = evm.signer_address().map(|a| a.to_string());
    let sui_address = sui.sender();
    let (sender, default_recipient) = match from {
        Chain::Bsc => (evm_address, sui_address),
        Chain::Sui => (sui_address, evm_address),
    };

    let mut orchestrator = TransferOrchestrator::new()
        .with_committer(Arc::new(EvmCommitter::new(evm.clone())))
        .with_committer(Arc::new(
            MoveCommitter::new(sui.clone(), package.clone())
                .with_fee(config.sui.lock_fee_mist)
                .with_gas_budget(config.sui.gas_budget),
        ));

    match config.completion_mode {
        CompletionMode::Client => {
            let index = Arc::new(WormholescanClient::new(&config.attestation.wormholescan_url));
            let completers: [Arc<dyn DestinationCompleter>; 2] = [
                Arc::new(EvmCompleter::new(evm.clone())),
                Arc::new(
                    MoveCompleter::new(sui.clone(), package).with_gas_budget(config.sui.gas_budget),
                ),
            ];
            for completer in completers {
                let poller = AttestationPoller::new(index.clone(), config.attestation.poll.clone());
                let dest = completer.chain();
                let strategy: Arc<dyn CompletionStrategy> =
                    Arc::new(ClientPolling::new(poller, completer));
                orchestrator = orchestrator.with_strategy(dest, strategy);
            }
        }
        CompletionMode::Relay => {
            let relay: Arc<dyn RelayBackend> = Arc::new(relay_client(config)?);
            let mut health = spawn_health_monitor(
                relay.clone(),
                config.relay.health_interval,
                cancel.child_token(),
            );
            // The flag starts offline; give the first probe a chance to answer
            let _ = tokio::time::timeout(Duration::from_secs(10), health.changed()).await;

            let strategy: Arc<dyn CompletionStrategy> = Arc::new(RemoteRelay::new(relay));
            orchestrator = orchestrator
                .with_strategy(Chain::Bsc, strategy.clone())
                .with_strategy(Chain::Sui, strategy)
                .with_relay_health(health);
        }
    }

    let request = TransferRequest {
        source_chain: from,
        dest_chain: from.counterpart(),
        amount: amount.clone(),
        sender,
        recipient: recipient.or(default_recipient),
    };

    loop {
        match orchestrator.start(request.clone(), cancel).await? {
            TransferOutcome::ApprovalPending { approval_tx_hash } => {
                tracing::info!(
                    tx_hash = %approval_tx_hash,
                    "Approval submitted, continuing once the allowance covers the amount"
                );
                wait_for_allowance(evm.as_ref(), &amount, approval_poll, cancel).await?;
            }
            TransferOutcome::Completed {
                source_tx_hash,
                dest_tx_hash,
            } => {
                tracing::info!(%source_tx_hash, %dest_tx_hash, "Transfer complete");
                return Ok(());
            }
            TransferOutcome::Failed(failure) => {
                if let Some(hash) = orchestrator.current().and_then(|a| a.source_tx_hash().map(String::from)) {
                    tracing::warn!(
                        source_tx_hash = %hash,
                        "Source commit exists; finish it with `surge-bridge unlock` or `surge-bridge relay`"
                    );
                }
                return Err(eyre!("{} (retry: {:?})", failure, failure.retry));
            }
        }
    }
}

/// Poll the bridge allowance until it covers `amount`
async fn wait_for_allowance(
    evm: &EvmBridgeClient,
    amount: &str,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    let owner = evm
        .signer_address()
        .ok_or_else(|| eyre!("EVM_PRIVATE_KEY is not set"))?;
    let required = to_native_units(amount, evm.token_decimals().await?)?;

    loop {
        let allowance = evm.allowance(owner).await?;
        if allowance >= required {
            tracing::info!(%allowance, "Allowance confirmed");
            return Ok(());
        }
        tracing::debug!(%allowance, %required, "Waiting for approval");

        tokio::select! {
            _ = cancel.cancelled() => return Err(eyre!("cancelled while waiting for approval")),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

async fn unlock(
    config: &Config,
    tx_hash: &str,
    prepare_only: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let sui = Arc::new(sui_client(config)?);
    let package = config.sui.package.clone();

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<surge_bridge::AttestationResult>();
    let reporter = tokio::spawn(async move {
        while let Some(result) = progress_rx.recv().await {
            tracing::info!(attempt = result.attempt, status = result.status.label(), "VAA query");
        }
    });

    let index = Arc::new(WormholescanClient::new(&config.attestation.wormholescan_url));
    let attestation = AttestationPoller::new(index, config.attestation.poll.clone())
        .with_progress(progress_tx)
        .poll_until_ready(tx_hash, cancel)
        .await
        .into_attestation(tx_hash)?;
    let _ = reporter.await;

    tracing::info!(vaa_len = attestation.len(), duplicated = attestation.is_duplicated, "VAA ready");

    if prepare_only {
        let call = package.unlock_call(attestation.bytes.clone(), config.sui.gas_budget);
        let tx_bytes = sui.build(&call).await?;
        tracing::info!(target = %call.target(), "Unlock transaction prepared, not executed");
        println!("{}", tx_bytes);
        return Ok(());
    }

    let digest = MoveCompleter::new(sui, package)
        .with_gas_budget(config.sui.gas_budget)
        .complete(&attestation.bytes)
        .await?;
    tracing::info!(%digest, "Unlock executed");
    Ok(())
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,surge_bridge=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, cancelling");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, cancelling");
        }
    }
}
