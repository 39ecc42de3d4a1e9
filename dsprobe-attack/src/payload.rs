//! Attack request construction
//!
//! `PayloadBuilder` projects a [`Session`] onto the request body of one
//! attack variant. It is a pure function of its inputs: the session is only
//! borrowed, and equal sessions always produce equal bodies.

use dsprobe_core::{AttackKind, Error, Network, Result, Sats, Session, Utxo};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Fields shared by every variant that spends the session's UTXO
#[derive(Clone, PartialEq, Serialize)]
pub struct SpendParams {
    #[serde(rename = "wif")]
    pub signing_key: String,
    pub utxo: Utxo,
    pub merchant_address: String,
    pub attacker_address: String,
    pub network: Network,
    pub fee_rate: f64,
    pub send_amount: Sats,
    pub merchant_nodes: Vec<String>,
    #[serde(rename = "merchant_payment_window_minutes")]
    pub payment_window_minutes: u32,
}

impl fmt::Debug for SpendParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpendParams")
            .field("signing_key", &"<redacted>")
            .field("utxo", &self.utxo)
            .field("merchant_address", &self.merchant_address)
            .field("attacker_address", &self.attacker_address)
            .field("network", &self.network)
            .field("fee_rate", &self.fee_rate)
            .field("send_amount", &self.send_amount)
            .field("merchant_nodes", &self.merchant_nodes)
            .field("payment_window_minutes", &self.payment_window_minutes)
            .finish()
    }
}

/// Spend parameters plus the transaction a previous attempt built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayedSpend {
    #[serde(flatten)]
    pub spend: SpendParams,
    /// Raw transaction hex, empty when no prior attempt produced one
    #[serde(rename = "hex")]
    pub prior_tx_hex: String,
}

/// Request body for one attack variant, carrying only the fields it uses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttackRequest {
    FinalSequence(SpendParams),
    SmartFee(SpendParams),
    MerchantBroadcast(SpendParams),
    DelayedDoubleSpend(DelayedSpend),
    IdenticalInputs(SpendParams),
    TimeWindow(SpendParams),
    WebhookScan { webhook_url: String },
    FullAttack(SpendParams),
}

impl AttackRequest {
    pub fn kind(&self) -> AttackKind {
        match self {
            AttackRequest::FinalSequence(_) => AttackKind::FinalSequence,
            AttackRequest::SmartFee(_) => AttackKind::SmartFee,
            AttackRequest::MerchantBroadcast(_) => AttackKind::MerchantBroadcast,
            AttackRequest::DelayedDoubleSpend(_) => AttackKind::DelayedDoubleSpend,
            AttackRequest::IdenticalInputs(_) => AttackKind::IdenticalInputs,
            AttackRequest::TimeWindow(_) => AttackKind::TimeWindow,
            AttackRequest::WebhookScan { .. } => AttackKind::WebhookScanner,
            AttackRequest::FullAttack(_) => AttackKind::FullAttack,
        }
    }

    pub fn spend(&self) -> Option<&SpendParams> {
        match self {
            AttackRequest::FinalSequence(p)
            | AttackRequest::SmartFee(p)
            | AttackRequest::MerchantBroadcast(p)
            | AttackRequest::IdenticalInputs(p)
            | AttackRequest::TimeWindow(p)
            | AttackRequest::FullAttack(p) => Some(p),
            AttackRequest::DelayedDoubleSpend(d) => Some(&d.spend),
            AttackRequest::WebhookScan { .. } => None,
        }
    }

    /// JSON body as sent on the wire
    pub fn to_body(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| {
            Error::invalid_parameter("request".to_string(), format!("cannot encode: {}", e))
        })
    }
}

/// Builds attack requests from session state
pub struct PayloadBuilder;

impl PayloadBuilder {
    pub fn build(kind: AttackKind, session: &Session) -> AttackRequest {
        match kind {
            AttackKind::FinalSequence => AttackRequest::FinalSequence(Self::spend(session)),
            AttackKind::SmartFee => AttackRequest::SmartFee(Self::spend(session)),
            AttackKind::MerchantBroadcast => AttackRequest::MerchantBroadcast(Self::spend(session)),
            AttackKind::DelayedDoubleSpend => AttackRequest::DelayedDoubleSpend(DelayedSpend {
                spend: Self::spend(session),
                prior_tx_hex: Self::prior_tx_hex(session),
            }),
            AttackKind::IdenticalInputs => AttackRequest::IdenticalInputs(Self::spend(session)),
            AttackKind::TimeWindow => AttackRequest::TimeWindow(Self::spend(session)),
            AttackKind::WebhookScanner => AttackRequest::WebhookScan {
                webhook_url: session
                    .webhook_url
                    .clone()
                    .unwrap_or_else(|| session.merchant_address.clone()),
            },
            AttackKind::FullAttack => AttackRequest::FullAttack(Self::spend(session)),
        }
    }

    /// Build for the session's selected attack
    pub fn build_selected(session: &Session) -> AttackRequest {
        Self::build(session.selected_attack, session)
    }

    fn spend(session: &Session) -> SpendParams {
        SpendParams {
            signing_key: session.signing_key.clone(),
            utxo: session.utxo.clone(),
            merchant_address: session.merchant_address.clone(),
            attacker_address: session.attacker_address.clone(),
            network: session.network,
            fee_rate: session.fee_rate_sat_per_vbyte,
            send_amount: session.send_amount_sats,
            merchant_nodes: session
                .merchant_nodes
                .iter()
                .map(|node| node.trim())
                .filter(|node| !node.is_empty())
                .map(str::to_string)
                .collect(),
            payment_window_minutes: session.payment_window_minutes,
        }
    }

    fn prior_tx_hex(session: &Session) -> String {
        session
            .prior_tx_hex
            .clone()
            .or_else(|| {
                session
                    .last_result
                    .as_ref()
                    .and_then(|body| body.attacker_tx_hex())
            })
            .unwrap_or_default()
    }
}
