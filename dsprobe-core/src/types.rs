//! Common types used throughout dsprobe

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Satoshi amount
pub type Sats = u64;

/// Satoshis per bitcoin
pub const SATS_PER_BTC: f64 = 1e8;

/// Bitcoin network the backend should operate on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    pub const fn is_mainnet(&self) -> bool {
        matches!(self, Network::Mainnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" | "test" => Ok(Network::Testnet),
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            other => Err(crate::Error::invalid_parameter(
                "network".to_string(),
                format!("unknown network '{}'", other),
            )),
        }
    }
}

/// Spendable transaction output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: Sats,
}

impl Utxo {
    pub fn new<S: Into<String>>(txid: S, vout: u32, value: Sats) -> Self {
        Self {
            txid: txid.into(),
            vout,
            value,
        }
    }

    /// Outpoint in `txid:vout` form
    pub fn outpoint(&self) -> String {
        format!("{}:{}", self.txid, self.vout)
    }
}

impl fmt::Display for Utxo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} sats)", self.outpoint(), self.value)
    }
}
