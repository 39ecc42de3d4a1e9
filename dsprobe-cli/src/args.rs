//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use dsprobe_client::COINGECKO_PRICE_URL;
use dsprobe_core::{AttackKind, Network, SessionUpdate};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

#[derive(Parser, Debug)]
#[command(name = "dsprobe")]
#[command(
    version,
    about = "Zero-confirmation double-spend test harness for merchant payment flows",
    long_about = None
)]
pub struct Cli {
    /// Base URL of the attack backend
    #[arg(
        long,
        global = true,
        env = "DSPROBE_API_BASE",
        value_name = "URL",
        default_value = DEFAULT_API_BASE
    )]
    pub api_base: String,

    /// Timeout for every outbound call in seconds
    #[arg(short = 't', long, global = true, value_name = "SECONDS", default_value = "30")]
    pub timeout: u64,

    /// BTC/USD price endpoint
    #[arg(long, global = true, value_name = "URL", default_value = COINGECKO_PRICE_URL)]
    pub price_url: String,

    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List attack variants and their endpoints
    Attacks,

    /// Generate a key pair through the backend
    Wallet {
        #[arg(short, long, default_value = "testnet")]
        network: Network,
    },

    /// Show the first spendable output of an address
    Utxo {
        #[arg(short, long)]
        address: String,

        #[arg(short, long, default_value = "testnet")]
        network: Network,
    },

    /// Convert a USD amount to satoshis at the live rate
    Convert {
        #[arg(value_name = "USD")]
        usd: String,
    },

    /// Run one attack over a fresh session
    Run(RunArgs),

    /// Interactive session
    Shell {
        #[arg(short, long, default_value = "testnet")]
        network: Network,

        /// Permit switching the session to mainnet
        #[arg(long)]
        allow_mainnet: bool,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Attack to run (see `dsprobe attacks`)
    #[arg(short, long, default_value = "final-sequence")]
    pub attack: AttackKind,

    #[arg(short, long, default_value = "testnet")]
    pub network: Network,

    /// Permit running against mainnet
    #[arg(long)]
    pub allow_mainnet: bool,

    /// Generate a wallet before configuring
    #[arg(long, conflicts_with_all = ["wif", "address"])]
    pub generate_wallet: bool,

    /// Look up the UTXO of the attacker address before configuring
    #[arg(long, conflicts_with_all = ["txid", "vout", "value"])]
    pub fetch_utxo: bool,

    /// Signing key in WIF
    #[arg(long, env = "DSPROBE_WIF", hide_env_values = true)]
    pub wif: Option<String>,

    /// Attacker address
    #[arg(long, value_name = "ADDRESS")]
    pub address: Option<String>,

    #[arg(long)]
    pub txid: Option<String>,

    #[arg(long)]
    pub vout: Option<u32>,

    /// UTXO value in satoshis
    #[arg(long, value_name = "SATS")]
    pub value: Option<u64>,

    /// Merchant address, or webhook URL for webhook-scanner
    #[arg(short, long, value_name = "ADDRESS")]
    pub merchant: Option<String>,

    #[arg(long, value_name = "URL")]
    pub webhook_url: Option<String>,

    /// Fee rate in sat/vB
    #[arg(long)]
    pub fee_rate: Option<f64>,

    /// Send amount in satoshis
    #[arg(long, value_name = "SATS", conflicts_with = "usd")]
    pub amount: Option<u64>,

    /// Send amount in USD, converted at the live rate
    #[arg(long)]
    pub usd: Option<String>,

    /// Merchant node broadcast URL (repeatable)
    #[arg(long = "node", value_name = "URL")]
    pub nodes: Vec<String>,

    /// Merchant payment window in minutes
    #[arg(long, value_name = "MINUTES")]
    pub window: Option<u32>,

    /// JSON result of an earlier run, used for chaining
    #[arg(long, value_name = "FILE")]
    pub prior_result: Option<PathBuf>,

    /// Write the completed result body here
    #[arg(long, value_name = "FILE")]
    pub save_result: Option<PathBuf>,
}

impl RunArgs {
    /// Session fields given on the command line
    pub fn session_update(&self) -> SessionUpdate {
        let mut update = SessionUpdate::new().network(self.network).attack(self.attack);
        update.signing_key = self.wif.clone();
        update.attacker_address = self.address.clone();
        update.utxo_txid = self.txid.clone();
        update.utxo_vout = self.vout;
        update.utxo_value = self.value;
        update.merchant_address = self.merchant.clone();
        update.webhook_url = self.webhook_url.clone();
        update.fee_rate = self.fee_rate;
        update.send_amount = self.amount;
        update.payment_window_minutes = self.window;
        if !self.nodes.is_empty() {
            update = update.merchant_nodes(self.nodes.iter().cloned());
        }
        update
    }
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    /// Default log filter for the verbosity count
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Refuse mainnet unless explicitly allowed
pub fn check_network(network: Network, allow_mainnet: bool) -> Result<(), String> {
    if network.is_mainnet() && !allow_mainnet {
        Err("Refusing to run against mainnet without --allow-mainnet".to_string())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dsprobe").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_global_defaults() {
        let cli = parse(&["attacks"]);
        assert_eq!(cli.timeout, 30);
        assert_eq!(cli.price_url, COINGECKO_PRICE_URL);
        assert_eq!(cli.log_filter(), "warn");
        assert!(matches!(cli.command, Commands::Attacks));
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["-v", "attacks"]).log_filter(), "info");
        assert_eq!(parse(&["-vv", "attacks"]).log_filter(), "debug");
        assert_eq!(parse(&["attacks", "-vvvv"]).log_filter(), "trace");
    }

    #[test]
    fn test_run_args() {
        let cli = parse(&[
            "--api-base",
            "http://backend:9000",
            "run",
            "--attack",
            "delayed-doublespend",
            "--address",
            "tb1qmine",
            "--merchant",
            "tb1qshop",
            "--fee-rate",
            "22.5",
            "--node",
            "https://a.example/tx",
            "--node",
            "https://b.example/tx",
            "--prior-result",
            "last.json",
        ]);
        assert_eq!(cli.api_base, "http://backend:9000");

        let Commands::Run(run) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(run.attack, AttackKind::DelayedDoubleSpend);
        assert_eq!(run.prior_result, Some(PathBuf::from("last.json")));

        let update = run.session_update();
        assert_eq!(update.attacker_address.as_deref(), Some("tb1qmine"));
        assert_eq!(update.merchant_address.as_deref(), Some("tb1qshop"));
        assert_eq!(update.fee_rate, Some(22.5));
        assert_eq!(update.selected_attack, Some(AttackKind::DelayedDoubleSpend));
        assert_eq!(
            update.merchant_nodes,
            Some(vec![
                "https://a.example/tx".to_string(),
                "https://b.example/tx".to_string()
            ])
        );
        assert_eq!(update.send_amount, None);
    }

    #[test]
    fn test_run_rejects_unknown_attack() {
        assert!(Cli::try_parse_from(["dsprobe", "run", "--attack", "rbf-magic"]).is_err());
    }

    #[test]
    fn test_amount_conflicts_with_usd() {
        assert!(Cli::try_parse_from([
            "dsprobe", "run", "--amount", "1000", "--usd", "5"
        ])
        .is_err());
    }

    #[test]
    fn test_generated_wallet_conflicts_with_manual_key() {
        assert!(Cli::try_parse_from([
            "dsprobe", "run", "--generate-wallet", "--address", "tb1qmine"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["dsprobe", "run", "--fetch-utxo", "--vout", "1"]).is_err());
    }

    #[test]
    fn test_mainnet_guard() {
        assert!(check_network(Network::Testnet, false).is_ok());
        assert!(check_network(Network::Mainnet, false).is_err());
        assert!(check_network(Network::Mainnet, true).is_ok());
    }
}
