//! Scripted in-memory [`Backend`] and [`PriceSource`] for tests

use crate::backend::{Backend, PriceSource};
use async_trait::async_trait;
use dsprobe_core::{AttackKind, Network, RawResponse, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A call the mock received
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    GenerateWallet(Network),
    ListUtxos { address: String, network: Network },
    Dispatch { kind: AttackKind, body: Value },
}

/// Backend that replays scripted responses and records every call
pub struct MockBackend {
    wallet: Mutex<Result<RawResponse>>,
    utxos: Mutex<Result<RawResponse>>,
    dispatches: Mutex<VecDeque<Result<RawResponse>>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            wallet: Mutex::new(Ok(RawResponse::new(
                200,
                r#"{"wif":"cTestKey","recommended_address":"tb1qmockattacker"}"#,
            ))),
            utxos: Mutex::new(Ok(RawResponse::new(200, r#"{"utxos":[]}"#))),
            dispatches: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_wallet(self, response: Result<RawResponse>) -> Self {
        *self.wallet.lock() = response;
        self
    }

    pub fn with_utxos(self, response: Result<RawResponse>) -> Self {
        *self.utxos.lock() = response;
        self
    }

    /// Queue a dispatch response. An empty queue answers `200 {}`.
    pub fn push_dispatch(&self, response: Result<RawResponse>) {
        self.dispatches.lock().push_back(response);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Bodies of every dispatch, in order
    pub fn dispatched(&self) -> Vec<(AttackKind, Value)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                MockCall::Dispatch { kind, body } => Some((*kind, body.clone())),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn generate_wallet(&self, network: Network) -> Result<RawResponse> {
        self.calls.lock().push(MockCall::GenerateWallet(network));
        self.wallet.lock().clone()
    }

    async fn list_utxos(&self, address: &str, network: Network) -> Result<RawResponse> {
        self.calls.lock().push(MockCall::ListUtxos {
            address: address.to_string(),
            network,
        });
        self.utxos.lock().clone()
    }

    async fn dispatch(&self, kind: AttackKind, body: &Value) -> Result<RawResponse> {
        self.calls.lock().push(MockCall::Dispatch {
            kind,
            body: body.clone(),
        });
        self.dispatches
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(RawResponse::new(200, "{}")))
    }
}

/// Price source with a fixed answer
pub struct MockPriceSource {
    rate: Result<Option<f64>>,
    calls: AtomicUsize,
}

impl MockPriceSource {
    pub fn new(rate: Option<f64>) -> Self {
        Self::with_result(Ok(rate))
    }

    pub fn with_result(rate: Result<Option<f64>>) -> Self {
        Self {
            rate,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn btc_usd(&self) -> Result<Option<f64>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.rate.clone()
    }
}
