//! Attack variants and their metadata

use std::fmt;
use std::str::FromStr;

/// The eight attack strategies the backend exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttackKind {
    #[default]
    FinalSequence,
    SmartFee,
    MerchantBroadcast,
    DelayedDoubleSpend,
    IdenticalInputs,
    TimeWindow,
    WebhookScanner,
    FullAttack,
}

/// Shape of the request body a variant sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Key, UTXO, addresses, fee and window parameters
    Spend,
    /// Spend shape plus the raw hex of a previously built transaction
    SpendWithPriorTx,
    /// Only the webhook URL
    Webhook,
}

/// Attack descriptor (metadata about an attack)
#[derive(Debug, Clone)]
pub struct AttackDescriptor {
    pub kind: AttackKind,
    /// CLI slug, e.g. `final-sequence`
    pub slug: &'static str,
    /// Human-readable name
    pub name: &'static str,
    /// Description of what the attack does
    pub description: &'static str,
    /// Default backend path
    pub path: &'static str,
    pub shape: PayloadShape,
}

const DESCRIPTORS: [AttackDescriptor; 8] = [
    AttackDescriptor {
        kind: AttackKind::FinalSequence,
        slug: "final-sequence",
        name: "Final Sequence Attack",
        description: "Pays the merchant with a final nSequence, then races a conflicting spend",
        path: "/api/final-sequence-attack",
        shape: PayloadShape::Spend,
    },
    AttackDescriptor {
        kind: AttackKind::SmartFee,
        slug: "smart-fee",
        name: "Smart Fee Booster",
        description: "Replaces the merchant payment with a higher-fee conflicting transaction",
        path: "/api/smart-fee-booster",
        shape: PayloadShape::Spend,
    },
    AttackDescriptor {
        kind: AttackKind::MerchantBroadcast,
        slug: "merchant-broadcast",
        name: "Merchant Targeted Broadcast",
        description: "Sends the payment only to merchant nodes and the conflict everywhere else",
        path: "/api/merchant-targeted-broadcast",
        shape: PayloadShape::Spend,
    },
    AttackDescriptor {
        kind: AttackKind::DelayedDoubleSpend,
        slug: "delayed-doublespend",
        name: "Delayed Double-Spend",
        description: "Broadcasts a transaction built by a previous attempt after a delay",
        path: "/api/delayed-doublespend",
        shape: PayloadShape::SpendWithPriorTx,
    },
    AttackDescriptor {
        kind: AttackKind::IdenticalInputs,
        slug: "identical-inputs",
        name: "Identical Inputs Exploit",
        description: "Spends the same inputs in two transactions with different outputs",
        path: "/api/identical-inputs-exploit",
        shape: PayloadShape::Spend,
    },
    AttackDescriptor {
        kind: AttackKind::TimeWindow,
        slug: "time-window",
        name: "Time Window Exploit",
        description: "Times the conflicting spend against the merchant payment window",
        path: "/api/time-window-exploit",
        shape: PayloadShape::Spend,
    },
    AttackDescriptor {
        kind: AttackKind::WebhookScanner,
        slug: "webhook-scanner",
        name: "Webhook Vulnerability Scanner",
        description: "Probes a merchant payment webhook for zero-conf acceptance",
        path: "/api/webhook-vulnerability-scanner",
        shape: PayloadShape::Webhook,
    },
    AttackDescriptor {
        kind: AttackKind::FullAttack,
        slug: "full-attack",
        name: "Execute Full Attack",
        description: "Runs the backend's combined attack sequence",
        path: "/api/execute-full-attack",
        shape: PayloadShape::Spend,
    },
];

impl AttackKind {
    /// All variants in menu order
    pub const ALL: [AttackKind; 8] = [
        AttackKind::FinalSequence,
        AttackKind::SmartFee,
        AttackKind::MerchantBroadcast,
        AttackKind::DelayedDoubleSpend,
        AttackKind::IdenticalInputs,
        AttackKind::TimeWindow,
        AttackKind::WebhookScanner,
        AttackKind::FullAttack,
    ];

    pub fn descriptor(&self) -> &'static AttackDescriptor {
        let idx = Self::ALL
            .iter()
            .position(|k| k == self)
            .unwrap_or_default();
        &DESCRIPTORS[idx]
    }

    pub fn slug(&self) -> &'static str {
        self.descriptor().slug
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn default_path(&self) -> &'static str {
        self.descriptor().path
    }

    pub fn shape(&self) -> PayloadShape {
        self.descriptor().shape
    }

    /// Attacks that need a wallet and UTXO before they can run
    pub fn needs_wallet(&self) -> bool {
        self.shape() != PayloadShape::Webhook
    }
}

/// Every attack descriptor, in menu order
pub fn descriptors() -> &'static [AttackDescriptor] {
    &DESCRIPTORS
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for AttackKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        DESCRIPTORS
            .iter()
            .find(|d| d.slug == needle)
            .map(|d| d.kind)
            .ok_or_else(|| {
                crate::Error::invalid_parameter(
                    "attack".to_string(),
                    format!("unknown attack '{}'", s.trim()),
                )
            })
    }
}
