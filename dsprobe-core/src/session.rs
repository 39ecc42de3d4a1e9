//! Per-attempt session state and orchestrator states

use crate::{AttackKind, Error, Network, ResponseBody, Result, Sats, Utxo};
use std::fmt;

pub const DEFAULT_FEE_RATE: f64 = 15.0;
pub const DEFAULT_SEND_AMOUNT: Sats = 50_000;
pub const DEFAULT_PAYMENT_WINDOW_MINUTES: u32 = 15;

/// Everything one attack attempt needs, mutated as each step completes
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub network: Network,
    /// WIF private key, passed through to the backend unvalidated
    pub signing_key: String,
    pub attacker_address: String,
    pub utxo: Utxo,
    pub merchant_address: String,
    /// Explicit webhook target for the scanner; falls back to `merchant_address`
    pub webhook_url: Option<String>,
    pub fee_rate_sat_per_vbyte: f64,
    pub send_amount_sats: Sats,
    pub merchant_nodes: Vec<String>,
    pub payment_window_minutes: u32,
    pub selected_attack: AttackKind,
    /// Body of the last completed attack response
    pub last_result: Option<ResponseBody>,
    /// `tx_attacker.hex` from `last_result`, kept as a typed chaining input
    pub prior_tx_hex: Option<String>,
    /// Rate used by the last fiat conversion
    pub btc_usd_rate: Option<f64>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            network: Network::default(),
            signing_key: String::new(),
            attacker_address: String::new(),
            utxo: Utxo::default(),
            merchant_address: String::new(),
            webhook_url: None,
            fee_rate_sat_per_vbyte: DEFAULT_FEE_RATE,
            send_amount_sats: DEFAULT_SEND_AMOUNT,
            merchant_nodes: Vec::new(),
            payment_window_minutes: DEFAULT_PAYMENT_WINDOW_MINUTES,
            selected_attack: AttackKind::default(),
            last_result: None,
            prior_tx_hex: None,
            btc_usd_rate: None,
        }
    }
}

impl Session {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    pub fn has_attacker_address(&self) -> bool {
        !self.attacker_address.trim().is_empty()
    }

    /// Record a completed response and refresh the chaining input from it
    pub fn record_result(&mut self, body: ResponseBody) {
        self.prior_tx_hex = body.attacker_tx_hex();
        self.last_result = Some(body);
    }

    /// Apply the fields present in `update`, validating them first
    pub fn apply(&mut self, update: SessionUpdate) -> Result<()> {
        update.validate()?;

        let SessionUpdate {
            network,
            signing_key,
            attacker_address,
            utxo,
            utxo_txid,
            utxo_vout,
            utxo_value,
            merchant_address,
            webhook_url,
            fee_rate,
            send_amount,
            merchant_nodes,
            payment_window_minutes,
            selected_attack,
            last_result,
        } = update;

        if let Some(v) = network {
            self.network = v;
        }
        if let Some(v) = signing_key {
            self.signing_key = v;
        }
        if let Some(v) = attacker_address {
            self.attacker_address = v.trim().to_string();
        }
        if let Some(v) = utxo {
            self.utxo = v;
        }
        if let Some(v) = utxo_txid {
            self.utxo.txid = v.trim().to_string();
        }
        if let Some(v) = utxo_vout {
            self.utxo.vout = v;
        }
        if let Some(v) = utxo_value {
            self.utxo.value = v;
        }
        if let Some(v) = merchant_address {
            self.merchant_address = v.trim().to_string();
        }
        if let Some(v) = webhook_url {
            let v = v.trim().to_string();
            self.webhook_url = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = fee_rate {
            self.fee_rate_sat_per_vbyte = v;
        }
        if let Some(v) = send_amount {
            self.send_amount_sats = v;
        }
        if let Some(v) = merchant_nodes {
            self.merchant_nodes = v;
        }
        if let Some(v) = payment_window_minutes {
            self.payment_window_minutes = v;
        }
        if let Some(v) = selected_attack {
            self.selected_attack = v;
        }
        if let Some(v) = last_result {
            self.record_result(v);
        }

        Ok(())
    }
}

/// Split a newline-separated node list the way the operator types it
pub fn parse_node_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Partial update of the user-editable session fields
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub network: Option<Network>,
    pub signing_key: Option<String>,
    pub attacker_address: Option<String>,
    pub utxo: Option<Utxo>,
    pub utxo_txid: Option<String>,
    pub utxo_vout: Option<u32>,
    pub utxo_value: Option<Sats>,
    pub merchant_address: Option<String>,
    pub webhook_url: Option<String>,
    pub fee_rate: Option<f64>,
    pub send_amount: Option<Sats>,
    pub merchant_nodes: Option<Vec<String>>,
    pub payment_window_minutes: Option<u32>,
    pub selected_attack: Option<AttackKind>,
    /// A result saved from an earlier attempt, for chaining
    pub last_result: Option<ResponseBody>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    pub fn signing_key<S: Into<String>>(mut self, key: S) -> Self {
        self.signing_key = Some(key.into());
        self
    }

    pub fn attacker_address<S: Into<String>>(mut self, address: S) -> Self {
        self.attacker_address = Some(address.into());
        self
    }

    pub fn utxo(mut self, utxo: Utxo) -> Self {
        self.utxo = Some(utxo);
        self
    }

    pub fn merchant_address<S: Into<String>>(mut self, address: S) -> Self {
        self.merchant_address = Some(address.into());
        self
    }

    pub fn webhook_url<S: Into<String>>(mut self, url: S) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn fee_rate(mut self, rate: f64) -> Self {
        self.fee_rate = Some(rate);
        self
    }

    pub fn send_amount(mut self, sats: Sats) -> Self {
        self.send_amount = Some(sats);
        self
    }

    pub fn merchant_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merchant_nodes = Some(nodes.into_iter().map(Into::into).collect());
        self
    }

    /// Node list from newline-separated text
    pub fn merchant_nodes_text(mut self, text: &str) -> Self {
        self.merchant_nodes = Some(parse_node_list(text));
        self
    }

    pub fn payment_window_minutes(mut self, minutes: u32) -> Self {
        self.payment_window_minutes = Some(minutes);
        self
    }

    pub fn attack(mut self, kind: AttackKind) -> Self {
        self.selected_attack = Some(kind);
        self
    }

    pub fn last_result(mut self, body: ResponseBody) -> Self {
        self.last_result = Some(body);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(rate) = self.fee_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::invalid_parameter(
                    "fee_rate".to_string(),
                    format!("must be a positive number, got {}", rate),
                ));
            }
        }
        if self.payment_window_minutes == Some(0) {
            return Err(Error::invalid_parameter(
                "payment_window_minutes",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// States of the attack orchestration state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrchestratorState {
    #[default]
    Idle,
    WalletPending,
    WalletReady,
    UtxoPending,
    UtxoReady,
    Configured,
    Executing,
    Completed,
    Failed,
}

impl OrchestratorState {
    /// A network call is outstanding
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            OrchestratorState::WalletPending
                | OrchestratorState::UtxoPending
                | OrchestratorState::Executing
        )
    }

    /// `execute` may be invoked from here
    pub fn can_execute(&self) -> bool {
        matches!(
            self,
            OrchestratorState::Configured
                | OrchestratorState::Completed
                | OrchestratorState::Failed
        )
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::WalletPending => "generating wallet",
            OrchestratorState::WalletReady => "wallet ready",
            OrchestratorState::UtxoPending => "fetching utxo",
            OrchestratorState::UtxoReady => "utxo ready",
            OrchestratorState::Configured => "configured",
            OrchestratorState::Executing => "executing",
            OrchestratorState::Completed => "completed",
            OrchestratorState::Failed => "failed",
        };
        f.write_str(s)
    }
}
