//! Backend endpoint mapping
//!
//! The attack-to-path table is configuration: every path can be overridden,
//! and the base URL selects the backend.

use dsprobe_core::AttackKind;
use std::collections::HashMap;

pub const GENERATE_WALLET_PATH: &str = "/api/generate-wallet";
pub const LIST_UTXOS_PATH: &str = "/api/wallet/utxos";

/// Resolves logical operations to backend URLs
#[derive(Debug, Clone, Default)]
pub struct EndpointMap {
    base: String,
    overrides: HashMap<AttackKind, String>,
}

impl EndpointMap {
    /// Create a map rooted at `base`. An empty base yields relative paths.
    pub fn new<S: AsRef<str>>(base: S) -> Self {
        let base = base.as_ref().trim();
        let base = base.strip_suffix('/').unwrap_or(base);
        Self {
            base: base.to_string(),
            overrides: HashMap::new(),
        }
    }

    /// Bind an attack to a non-default path
    pub fn with_override<S: Into<String>>(mut self, kind: AttackKind, path: S) -> Self {
        self.overrides.insert(kind, path.into());
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn attack_path(&self, kind: AttackKind) -> &str {
        self.overrides
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_path())
    }

    pub fn attack_url(&self, kind: AttackKind) -> String {
        self.join(self.attack_path(kind))
    }

    pub fn wallet_url(&self) -> String {
        self.join(GENERATE_WALLET_PATH)
    }

    pub fn utxos_url(&self) -> String {
        self.join(LIST_UTXOS_PATH)
    }

    fn join(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}
