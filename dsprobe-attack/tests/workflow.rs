//! End-to-end orchestrator workflows against scripted backends

use async_trait::async_trait;
use dsprobe_attack::{AttackOrchestrator, OrchestratorConfig};
use dsprobe_client::mock::{MockBackend, MockCall, MockPriceSource};
use dsprobe_client::Backend;
use dsprobe_core::{
    AttackKind, Error, Network, OrchestratorState, RawResponse, Result, SessionUpdate, Utxo,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Holds every dispatch until the test releases it
struct GatedBackend {
    inner: MockBackend,
    entered: Notify,
    release: Notify,
}

impl GatedBackend {
    fn new() -> Self {
        Self {
            inner: MockBackend::new(),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl Backend for GatedBackend {
    async fn generate_wallet(&self, network: Network) -> Result<RawResponse> {
        self.inner.generate_wallet(network).await
    }

    async fn list_utxos(&self, address: &str, network: Network) -> Result<RawResponse> {
        self.inner.list_utxos(address, network).await
    }

    async fn dispatch(&self, kind: AttackKind, body: &Value) -> Result<RawResponse> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.dispatch(kind, body).await
    }
}

fn prices() -> Arc<MockPriceSource> {
    Arc::new(MockPriceSource::new(Some(50_000.0)))
}

fn funded_backend() -> MockBackend {
    MockBackend::new().with_utxos(Ok(RawResponse::new(
        200,
        r#"{"utxos":[{"txid":"9f1c","vout":1,"value":250000},{"txid":"77aa","vout":0,"value":900000}]}"#,
    )))
}

fn keys(body: &Value) -> BTreeSet<&str> {
    body.as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect()
}

#[tokio::test]
async fn test_final_sequence_end_to_end() {
    let backend = Arc::new(funded_backend());
    let orch = AttackOrchestrator::new(backend.clone(), prices());

    orch.generate_wallet().await.unwrap();
    let utxo = orch.fetch_utxo().await.unwrap();
    assert_eq!(utxo, Utxo::new("9f1c", 1, 250_000));

    let state = orch
        .configure(
            SessionUpdate::new()
                .merchant_address("tb1qmerchant")
                .merchant_nodes_text("https://mempool.space/testnet/api/tx\n\nhttps://node.example/tx"),
        )
        .unwrap();
    assert_eq!(state, OrchestratorState::Configured);

    let outcome = orch.execute().await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(orch.state(), OrchestratorState::Completed);

    let calls = backend.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], MockCall::GenerateWallet(Network::Testnet));
    assert_eq!(
        calls[1],
        MockCall::ListUtxos {
            address: "tb1qmockattacker".into(),
            network: Network::Testnet
        }
    );

    let (kind, body) = &backend.dispatched()[0];
    assert_eq!(*kind, AttackKind::FinalSequence);
    assert_eq!(
        keys(body),
        BTreeSet::from([
            "wif",
            "utxo",
            "merchant_address",
            "attacker_address",
            "network",
            "fee_rate",
            "send_amount",
            "merchant_nodes",
            "merchant_payment_window_minutes",
        ])
    );
    assert_eq!(body["wif"], "cTestKey");
    assert_eq!(body["fee_rate"], 15.0);
    assert_eq!(body["send_amount"], 50_000);
    assert_eq!(body["utxo"], json!({"txid": "9f1c", "vout": 1, "value": 250000}));
    assert_eq!(
        body["merchant_nodes"],
        json!(["https://mempool.space/testnet/api/tx", "https://node.example/tx"])
    );
    assert!(body.get("hex").is_none());
    assert!(body.get("webhook_url").is_none());
}

#[tokio::test]
async fn test_converted_amount_reaches_payload() {
    let backend = Arc::new(MockBackend::new());
    let orch = AttackOrchestrator::new(backend.clone(), prices());

    orch.configure(SessionUpdate::new().attacker_address("tb1qmine"))
        .unwrap();
    orch.convert_amount("10").await.unwrap();
    orch.execute().await.unwrap();

    assert_eq!(backend.dispatched()[0].1["send_amount"], 20_000);
}

#[tokio::test]
async fn test_delayed_doublespend_chains_previous_result() {
    let backend = Arc::new(MockBackend::new());
    backend.push_dispatch(Ok(RawResponse::new(
        200,
        r#"{"tx_attacker":{"hex":"0200000001ab"},"tx_merchant":{"hex":"0200000001cd"}}"#,
    )));
    backend.push_dispatch(Ok(RawResponse::new(500, "mempool conflict")));
    backend.push_dispatch(Ok(RawResponse::new(200, r#"{"status":"double-spent"}"#)));
    let orch = AttackOrchestrator::new(backend.clone(), prices());

    orch.configure(SessionUpdate::new().attacker_address("tb1qmine"))
        .unwrap();
    orch.execute().await.unwrap();

    orch.configure(SessionUpdate::new().attack(AttackKind::DelayedDoubleSpend))
        .unwrap();
    let err = orch.execute().await.unwrap_err();
    assert_eq!(err, Error::service(Some(500), "mempool conflict"));
    assert_eq!(orch.state(), OrchestratorState::Failed);
    assert_eq!(
        orch.session().prior_tx_hex.as_deref(),
        Some("0200000001ab")
    );

    orch.execute().await.unwrap();

    let dispatched = backend.dispatched();
    assert_eq!(dispatched.len(), 3);
    assert!(dispatched[0].1.get("hex").is_none());
    assert_eq!(dispatched[1].1["hex"], "0200000001ab");
    assert_eq!(dispatched[2].1["hex"], "0200000001ab");
}

#[tokio::test]
async fn test_delayed_doublespend_without_prior_sends_empty_hex() {
    let backend = Arc::new(MockBackend::new());
    let orch = AttackOrchestrator::new(backend.clone(), prices());

    orch.configure(
        SessionUpdate::new()
            .attacker_address("tb1qmine")
            .attack(AttackKind::DelayedDoubleSpend),
    )
    .unwrap();
    orch.execute().await.unwrap();

    assert_eq!(backend.dispatched()[0].1["hex"], "");
}

#[tokio::test]
async fn test_webhook_scan_without_wallet() {
    let backend = Arc::new(MockBackend::new());
    let orch = AttackOrchestrator::new(backend.clone(), prices());

    let state = orch
        .configure(
            SessionUpdate::new()
                .attack(AttackKind::WebhookScanner)
                .merchant_address("https://shop.example/btcpay/webhook"),
        )
        .unwrap();
    assert_eq!(state, OrchestratorState::Configured);

    orch.execute().await.unwrap();

    let dispatched = backend.dispatched();
    assert_eq!(dispatched[0].0, AttackKind::WebhookScanner);
    assert_eq!(
        dispatched[0].1,
        json!({"webhook_url": "https://shop.example/btcpay/webhook"})
    );
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_wallet_failure_then_retry() {
    let backend = Arc::new(
        MockBackend::new().with_wallet(Ok(RawResponse::new(503, "keygen offline"))),
    );
    let orch = AttackOrchestrator::new(backend.clone(), prices());

    let err = orch.generate_wallet().await.unwrap_err();
    assert_eq!(err, Error::service(Some(503), "keygen offline"));
    assert_eq!(orch.state(), OrchestratorState::Idle);
    assert!(orch.session().signing_key.is_empty());
    assert!(orch.view().unwrap().is_error());

    // the address can still be entered by hand
    let state = orch
        .configure(SessionUpdate::new().attacker_address("tb1qmanual"))
        .unwrap();
    assert_eq!(state, OrchestratorState::Configured);
}

#[tokio::test]
async fn test_empty_utxo_set() {
    let backend = Arc::new(MockBackend::new());
    let orch = AttackOrchestrator::new(backend.clone(), prices());

    orch.generate_wallet().await.unwrap();
    let err = orch.fetch_utxo().await.unwrap_err();

    assert_eq!(
        err,
        Error::NoUtxoFound {
            address: "tb1qmockattacker".into()
        }
    );
    assert_eq!(orch.state(), OrchestratorState::WalletReady);
}

#[tokio::test]
async fn test_fetch_utxo_without_address_makes_no_call() {
    let backend = Arc::new(funded_backend());
    let orch = AttackOrchestrator::new(backend.clone(), prices());

    assert_eq!(orch.fetch_utxo().await.unwrap_err(), Error::MissingAddress);
    assert_eq!(
        orch.view().unwrap().render(),
        "Error: Set attacker address first"
    );
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_second_execute_is_busy() {
    let backend = Arc::new(GatedBackend::new());
    backend.inner.push_dispatch(Ok(RawResponse::new(
        200,
        r#"{"tx_attacker":{"hex":"01"}}"#,
    )));
    let orch = Arc::new(AttackOrchestrator::new(backend.clone(), prices()));
    orch.configure(SessionUpdate::new().attacker_address("tb1qmine"))
        .unwrap();

    let first = tokio::spawn({
        let orch = orch.clone();
        async move { orch.execute().await }
    });
    backend.entered.notified().await;

    assert!(orch.is_busy());
    assert_eq!(orch.state(), OrchestratorState::Executing);
    assert_eq!(orch.execute().await.unwrap_err(), Error::Busy);
    assert!(orch.reset().is_err());

    backend.release.notify_one();
    first.await.unwrap().unwrap();

    assert!(!orch.is_busy());
    assert_eq!(orch.state(), OrchestratorState::Completed);
    assert_eq!(orch.session().prior_tx_hex.as_deref(), Some("01"));
    assert_eq!(backend.inner.dispatched().len(), 1);
}

#[tokio::test]
async fn test_cancel_in_flight_execute() {
    let backend = Arc::new(GatedBackend::new());
    let orch = Arc::new(AttackOrchestrator::new(backend.clone(), prices()));
    orch.configure(SessionUpdate::new().attacker_address("tb1qmine"))
        .unwrap();

    let running = tokio::spawn({
        let orch = orch.clone();
        async move { orch.execute().await }
    });
    backend.entered.notified().await;

    assert!(orch.cancel());
    assert_eq!(running.await.unwrap().unwrap_err(), Error::Cancelled);
    assert_eq!(orch.state(), OrchestratorState::Failed);
    assert_eq!(orch.view().unwrap().render(), "Error: Operation cancelled");
    assert!(orch.session().last_result.is_none());
    assert!(!orch.is_busy());
    assert!(!orch.cancel());
}

#[tokio::test]
async fn test_dropped_execute_releases_session() {
    let backend = Arc::new(GatedBackend::new());
    let orch = AttackOrchestrator::new(backend.clone(), prices());
    orch.configure(SessionUpdate::new().attacker_address("tb1qmine"))
        .unwrap();

    tokio::select! {
        biased;
        _ = orch.execute() => panic!("dispatch should still be gated"),
        _ = backend.entered.notified() => {}
    }

    assert_eq!(orch.state(), OrchestratorState::Failed);
    assert!(!orch.is_busy());

    backend.release.notify_one();
    orch.execute().await.unwrap();
    assert_eq!(orch.state(), OrchestratorState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_backend_times_out() {
    let backend = Arc::new(GatedBackend::new());
    let orch = AttackOrchestrator::with_config(
        backend.clone(),
        prices(),
        OrchestratorConfig {
            call_timeout: Duration::from_secs(30),
        },
    );
    orch.configure(SessionUpdate::new().attacker_address("tb1qmine"))
        .unwrap();

    let err = orch.execute().await.unwrap_err();

    assert_eq!(err, Error::transport("request timed out after 30s"));
    assert_eq!(orch.state(), OrchestratorState::Failed);
    assert!(!orch.is_busy());
}
