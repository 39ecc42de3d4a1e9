use anyhow::{bail, Context, Result};
use dsprobe_attack::{AttackOrchestrator, OrchestratorConfig};
use dsprobe_cli::{attack_table, check_network, execute_interruptible, Cli, Commands, RunArgs, Shell};
use dsprobe_client::{
    AmountConverter, Backend, CoinGeckoPriceSource, EndpointMap, HttpBackend, PriceSource,
    UtxoResolver, WalletProvisioner,
};
use dsprobe_core::{OrchestratorState, ResponseBody, ResultView, SessionUpdate};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(&cli);

    let timeout = cli.call_timeout();
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::with_timeout(
        EndpointMap::new(&cli.api_base),
        timeout,
    ));
    let prices: Arc<dyn PriceSource> =
        Arc::new(CoinGeckoPriceSource::with_url(&cli.price_url, timeout));
    let config = OrchestratorConfig {
        call_timeout: timeout,
    };

    match cli.command {
        Commands::Attacks => {
            print!("{}", attack_table());
        }
        Commands::Wallet { network } => {
            let wallet = WalletProvisioner::new(backend).generate(network).await?;
            println!("WIF:     {}", wallet.signing_key);
            println!("Address: {}", wallet.recommended_address);
        }
        Commands::Utxo { address, network } => {
            let utxo = UtxoResolver::new(backend).resolve(&address, network).await?;
            println!("{}", serde_json::to_string_pretty(&utxo)?);
        }
        Commands::Convert { usd } => {
            let conversion = AmountConverter::new(prices).convert(&usd).await?;
            println!(
                "{} sats (at {} USD/BTC)",
                conversion.sats, conversion.rate
            );
        }
        Commands::Run(args) => {
            let orchestrator = AttackOrchestrator::with_config(backend, prices, config);
            run(args, &orchestrator).await?;
        }
        Commands::Shell {
            network,
            allow_mainnet,
        } => {
            check_network(network, allow_mainnet).map_err(anyhow::Error::msg)?;
            let orchestrator = AttackOrchestrator::with_config(backend, prices, config);
            orchestrator.configure(SessionUpdate::new().network(network))?;

            Shell::new(Arc::new(orchestrator), allow_mainnet)
                .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await?;
        }
    }

    Ok(())
}

/// One-shot workflow: configure, optional wallet/UTXO/conversion steps, execute
async fn run(args: RunArgs, orchestrator: &AttackOrchestrator) -> Result<()> {
    check_network(args.network, args.allow_mainnet).map_err(anyhow::Error::msg)?;

    let mut update = args.session_update();
    if let Some(path) = &args.prior_result {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prior result {}", path.display()))?;
        update.last_result = Some(ResponseBody::parse(&text));
    }
    orchestrator.configure(update)?;

    if args.generate_wallet {
        let wallet = orchestrator.generate_wallet().await?;
        info!(address = %wallet.recommended_address, "Using generated wallet");
    }
    if args.fetch_utxo {
        let utxo = orchestrator.fetch_utxo().await?;
        info!(utxo = %utxo, "Using fetched UTXO");
    }
    if let Some(usd) = &args.usd {
        let conversion = orchestrator.convert_amount(usd).await?;
        info!(sats = conversion.sats, rate = conversion.rate, "Send amount converted");
    }

    if orchestrator.configure(SessionUpdate::new())? != OrchestratorState::Configured {
        bail!("An attacker address is required: pass --address or --generate-wallet");
    }
    if orchestrator.session().network.is_mainnet() {
        warn!("Executing against mainnet");
    }

    match execute_interruptible(orchestrator).await {
        Ok(outcome) => {
            println!("{}", outcome.body.render());
            if let Some(path) = &args.save_result {
                tokio::fs::write(path, outcome.body.render())
                    .await
                    .with_context(|| format!("Failed to write result {}", path.display()))?;
                info!(path = %path.display(), "Result saved");
            }
            Ok(())
        }
        Err(err) => {
            if let Some(ResultView::Result(body)) = orchestrator.view() {
                println!("{}", body.render());
            }
            Err(err.into())
        }
    }
}
