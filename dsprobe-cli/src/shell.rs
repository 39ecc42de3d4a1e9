//! Interactive shell
//!
//! Line commands driving one [`AttackOrchestrator`]. The parser follows the
//! usual `command [args...]` form; `help` lists everything.

use crate::args::check_network;
use dsprobe_attack::{AttackOrchestrator, AttackOutcome};
use dsprobe_core::{descriptors, AttackKind, Network, Result as CoreResult, SessionUpdate};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Session field addressable by `set`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Network,
    Wif,
    Address,
    Txid,
    Vout,
    Value,
    Merchant,
    Webhook,
    FeeRate,
    Amount,
    Window,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        let field = match name.to_lowercase().as_str() {
            "network" | "net" => Field::Network,
            "wif" | "key" => Field::Wif,
            "address" | "addr" => Field::Address,
            "txid" => Field::Txid,
            "vout" => Field::Vout,
            "value" => Field::Value,
            "merchant" => Field::Merchant,
            "webhook" => Field::Webhook,
            "fee" | "fee-rate" => Field::FeeRate,
            "amount" => Field::Amount,
            "window" => Field::Window,
            _ => return None,
        };
        Some(field)
    }

    /// Turn a raw value into the session update it stands for
    pub fn update(self, value: &str) -> Result<SessionUpdate, String> {
        let value = value.trim();
        let mut update = SessionUpdate::new();
        match self {
            Field::Network => {
                update.network = Some(value.parse::<Network>().map_err(|e| e.to_string())?)
            }
            Field::Wif => update.signing_key = Some(value.to_string()),
            Field::Address => update.attacker_address = Some(value.to_string()),
            Field::Txid => update.utxo_txid = Some(value.to_string()),
            Field::Vout => update.utxo_vout = Some(parse_number(value, "vout")?),
            Field::Value => update.utxo_value = Some(parse_number(value, "value")?),
            Field::Merchant => update.merchant_address = Some(value.to_string()),
            Field::Webhook => update.webhook_url = Some(value.to_string()),
            Field::FeeRate => update.fee_rate = Some(parse_number(value, "fee")?),
            Field::Amount => update.send_amount = Some(parse_number(value, "amount")?),
            Field::Window => update.payment_window_minutes = Some(parse_number(value, "window")?),
        }
        Ok(update)
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {}: {}", name, value))
}

/// Shell command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    /// Print the session
    Show,
    Set { field: Field, value: String },
    /// Replace the merchant node list
    Nodes { urls: Vec<String> },
    Wallet,
    Utxo,
    Convert { usd: String },
    Attack { kind: AttackKind },
    Execute,
    Clear,
    Result,
    Reset,
    Attacks,
    Exit,
}

/// Command parser
pub struct CommandParser;

impl CommandParser {
    /// Parse a command line
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        if line.is_empty() {
            return Err("Empty command".to_string());
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "help" | "?" => Ok(Command::Help),
            "show" | "status" => Ok(Command::Show),
            "set" => Self::parse_set(&parts[1..]),
            "nodes" => Ok(Command::Nodes {
                urls: parts[1..].iter().map(|s| s.to_string()).collect(),
            }),
            "wallet" => Ok(Command::Wallet),
            "utxo" => Ok(Command::Utxo),
            "convert" => {
                if parts.len() < 2 {
                    Err("Usage: convert <usd>".to_string())
                } else {
                    Ok(Command::Convert {
                        usd: parts[1].to_string(),
                    })
                }
            }
            "attack" | "use" => {
                if parts.len() < 2 {
                    Err("Usage: attack <name>".to_string())
                } else {
                    let kind = parts[1]
                        .parse::<AttackKind>()
                        .map_err(|_| format!("Unknown attack: {}. Type 'attacks' to list them.", parts[1]))?;
                    Ok(Command::Attack { kind })
                }
            }
            "execute" | "run" => Ok(Command::Execute),
            "clear" => Ok(Command::Clear),
            "result" => Ok(Command::Result),
            "reset" => Ok(Command::Reset),
            "attacks" | "list" => Ok(Command::Attacks),
            "exit" | "quit" | "q" => Ok(Command::Exit),
            _ => Err(format!("Unknown command: {}. Type 'help' for available commands.", cmd)),
        }
    }

    fn parse_set(parts: &[&str]) -> Result<Command, String> {
        // set <field> <value>
        let Some(name) = parts.first() else {
            return Err("Usage: set <field> <value>".to_string());
        };
        let field = Field::parse(name).ok_or_else(|| format!("Unknown field: {}", name))?;
        let value = parts[1..].join(" ");
        if value.is_empty() && field != Field::Webhook {
            return Err(format!("Usage: set {} <value>", name));
        }
        Ok(Command::Set { field, value })
    }

    /// Get help text
    pub fn help_text() -> &'static str {
        r#"
Available Commands:
==================

Session:
  show                                - Show the session and workflow state
  set <field> <value>                 - Edit a field
                                        Fields: network wif address txid vout value
                                                merchant webhook fee amount window
                                        Example: set fee 22.5
  nodes <url> [url ...]               - Replace the merchant node list
  attack <name>                       - Select the attack
  attacks                             - List attacks

Workflow:
  wallet                              - Generate a wallet and adopt its address
  utxo                                - Fetch the first UTXO of the attacker address
  convert <usd>                       - Set the send amount from a USD value
  execute, run                        - Dispatch the selected attack (Ctrl-C cancels)

Results:
  result                              - Show the last result or error
  clear                               - Clear the displayed result
  reset                               - Start a new session

General:
  help, ?                             - Show this help message
  exit, quit, q                       - Leave the shell
"#
    }
}

/// Table of attack variants
pub fn attack_table() -> String {
    let mut out = String::new();
    for d in descriptors() {
        out.push_str(&format!("{:<22} {}\n", d.slug, d.name));
        out.push_str(&format!("{:<22} {}\n", "", d.description));
        out.push_str(&format!("{:<22} POST {}\n\n", "", d.path));
    }
    out
}

/// Execute the selected attack; Ctrl-C cancels it
pub async fn execute_interruptible(orchestrator: &AttackOrchestrator) -> CoreResult<AttackOutcome> {
    let execution = orchestrator.execute();
    tokio::pin!(execution);

    tokio::select! {
        result = &mut execution => result,
        _ = tokio::signal::ctrl_c() => {
            orchestrator.cancel();
            execution.await
        }
    }
}

/// What the loop should do after a command
#[derive(Debug, PartialEq)]
pub enum Reply {
    Output(String),
    Exit,
}

/// Interactive session over one orchestrator
pub struct Shell {
    orchestrator: Arc<AttackOrchestrator>,
    allow_mainnet: bool,
}

impl Shell {
    pub fn new(orchestrator: Arc<AttackOrchestrator>, allow_mainnet: bool) -> Self {
        Self {
            orchestrator,
            allow_mainnet,
        }
    }

    /// Read commands until EOF or `exit`
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        writer
            .write_all(b"dsprobe shell. Type 'help' for available commands.\n")
            .await?;

        loop {
            writer.write_all(b"dsprobe> ").await?;
            writer.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!(command = line, "Shell command");

            let output = match CommandParser::parse(line) {
                Ok(command) => match self.execute_command(command).await {
                    Ok(Reply::Exit) => break,
                    Ok(Reply::Output(text)) => text,
                    Err(e) => format!("Error: {}", e),
                },
                Err(e) => format!("Error: {}", e),
            };
            writer.write_all(output.as_bytes()).await?;
            if !output.ends_with('\n') {
                writer.write_all(b"\n").await?;
            }
        }

        writer.write_all(b"Goodbye!\n").await?;
        writer.flush().await
    }

    /// Execute one parsed command
    pub async fn execute_command(&self, command: Command) -> anyhow::Result<Reply> {
        let orch = &self.orchestrator;
        let output = match command {
            Command::Help => CommandParser::help_text().trim_start().to_string(),
            Command::Show => self.show(),
            Command::Set { field, value } => {
                let update = field.update(&value).map_err(anyhow::Error::msg)?;
                if let Some(network) = update.network {
                    check_network(network, self.allow_mainnet).map_err(anyhow::Error::msg)?;
                }
                let state = orch.configure(update)?;
                format!("OK ({})", state)
            }
            Command::Nodes { urls } => {
                let count = urls.len();
                orch.configure(SessionUpdate::new().merchant_nodes(urls))?;
                format!("{} merchant node(s) set", count)
            }
            Command::Wallet => {
                let wallet = orch.generate_wallet().await?;
                format!("Attacker address: {}", wallet.recommended_address)
            }
            Command::Utxo => {
                let utxo = orch.fetch_utxo().await?;
                format!("UTXO: {}", utxo)
            }
            Command::Convert { usd } => {
                let conversion = orch.convert_amount(&usd).await?;
                format!(
                    "{} USD = {} sats at {} USD/BTC",
                    usd.trim(),
                    conversion.sats,
                    conversion.rate
                )
            }
            Command::Attack { kind } => {
                let state = orch.configure(SessionUpdate::new().attack(kind))?;
                format!("Selected {} ({})", kind.name(), state)
            }
            Command::Execute => {
                execute_interruptible(orch).await?;
                self.result()
            }
            Command::Clear => {
                orch.clear_result();
                "Result cleared".to_string()
            }
            Command::Result => self.result(),
            Command::Reset => {
                orch.reset()?;
                "Session reset".to_string()
            }
            Command::Attacks => attack_table(),
            Command::Exit => return Ok(Reply::Exit),
        };
        Ok(Reply::Output(output))
    }

    fn result(&self) -> String {
        self.orchestrator
            .view()
            .map(|view| view.render())
            .unwrap_or_else(|| "No result".to_string())
    }

    fn show(&self) -> String {
        let session = self.orchestrator.session();
        let or_unset = |s: &str| {
            if s.is_empty() {
                "(unset)".to_string()
            } else {
                s.to_string()
            }
        };

        let mut out = String::new();
        out.push_str(&format!("State:     {}\n", self.orchestrator.state()));
        out.push_str(&format!(
            "Attack:    {} ({})\n",
            session.selected_attack.slug(),
            session.selected_attack.name()
        ));
        out.push_str(&format!("Network:   {}\n", session.network));
        out.push_str(&format!(
            "Key:       {}\n",
            if session.signing_key.is_empty() { "(unset)" } else { "(set)" }
        ));
        out.push_str(&format!("Address:   {}\n", or_unset(&session.attacker_address)));
        out.push_str(&format!("UTXO:      {}\n", session.utxo));
        out.push_str(&format!("Merchant:  {}\n", or_unset(&session.merchant_address)));
        out.push_str(&format!(
            "Webhook:   {}\n",
            session.webhook_url.as_deref().unwrap_or("(merchant address)")
        ));
        out.push_str(&format!("Fee rate:  {} sat/vB\n", session.fee_rate_sat_per_vbyte));
        out.push_str(&format!("Amount:    {} sats\n", session.send_amount_sats));
        if let Some(rate) = session.btc_usd_rate {
            out.push_str(&format!("Rate:      1 BTC = ${}\n", rate));
        }
        out.push_str(&format!("Window:    {} min\n", session.payment_window_minutes));
        out.push_str(&format!("Nodes:     {}\n", session.merchant_nodes.join(", ")));
        out.push_str(&format!(
            "Prior tx:  {}\n",
            if session.prior_tx_hex.is_some() { "available" } else { "none" }
        ));
        out
    }
}
