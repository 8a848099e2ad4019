//! End-to-end lookups through the gateway facade.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::harness::{scripted_config, Answer, Registries, RegistryMock, BUSINESS_ENDPOINT};
use registry_gateway::rpc::CallFailure;
use registry_gateway::{
    Error, GatewayBuilder, GatewayConfig, GatewayEvent, ProviderConfig, Reliability,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const CHECK: &str = "checkVatApprox";
const STATUS: &str = "getStatus";

fn acme() -> Answer {
    Answer::Payload(json!({"valid": true, "name": "Acme s.r.o.", "address": null}))
}

/// A valid identity is fetched once, then served from the cache.
#[tokio::test]
async fn test_valid_identity_is_cached() {
    let registries = Registries::default();
    registries.answer(CHECK, acme());
    let gateway = registries.gateway();

    let first = gateway.check_identity("CZ", "12345678").await.unwrap();
    assert!(first.valid);
    assert_eq!(first.name.as_deref(), Some("Acme s.r.o."));
    assert_eq!(first.address, None);
    assert_eq!(registries.calls_to(CHECK), 1);

    let second = gateway.check_vat("cz12345678").await.unwrap();
    assert_eq!(second, first);
    assert_eq!(registries.calls_to(CHECK), 1);

    assert_eq!(
        registries.args_of(CHECK),
        vec![json!({"countryCode": "CZ", "vatNumber": "12345678"})]
    );
}

/// Many concurrent lookups of one identity make exactly one registry call.
#[tokio::test]
async fn test_concurrent_lookups_share_one_call() {
    let registries = Registries::default();
    registries.answer(CHECK, acme());
    registries.set_latency(Duration::from_millis(40));
    let gateway = Arc::new(registries.gateway());

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let gateway = Arc::clone(&gateway);
            let vat = if i % 2 == 0 { "CZ12345678" } else { " cz12345678 " };
            tokio::spawn(async move { gateway.check_vat(vat).await })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.expect("task").unwrap());
    }

    assert_eq!(registries.calls_to(CHECK), 1);
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}

/// Different identities are not serialized behind each other's lock.
#[tokio::test]
async fn test_distinct_identities_each_call_once() {
    let registries = Registries::default();
    registries.answer(CHECK, Answer::Payload(json!({"valid": false})));
    let gateway = registries.gateway();

    let (a, b) = tokio::join!(gateway.check_vat("CZ11111111"), gateway.check_vat("DE222222222"));
    assert!(!a.unwrap().valid);
    assert!(!b.unwrap().valid);
    assert_eq!(registries.calls_to(CHECK), 2);
}

/// A failed lookup caches nothing; the next caller retries and succeeds.
#[tokio::test]
async fn test_failure_is_not_cached() {
    let registries = Registries::default();
    registries.answer(
        CHECK,
        Answer::Fail(CallFailure::Fault {
            message: "Server error".to_string(),
            detail: Some(json!({"fault": {"faultstring": "MS_MAX_CONCURRENT_REQ"}})),
        }),
    );
    let gateway = registries.gateway();

    let err = gateway.check_vat("CZ12345678").await.unwrap_err();
    assert!(matches!(err, Error::RemoteFault { ref message } if message == "MS_MAX_CONCURRENT_REQ"));
    assert!(err.is_retryable());

    registries.answer(CHECK, acme());
    assert!(gateway.check_vat("CZ12345678").await.unwrap().valid);
    assert_eq!(registries.calls_to(CHECK), 2);
    assert_eq!(gateway.stats().remote_failures, 1);
}

/// Malformed identities are rejected without touching the registry.
#[tokio::test]
async fn test_malformed_identity_makes_no_call() {
    let registries = Registries::default();
    registries.answer(CHECK, acme());
    let gateway = registries.gateway();

    for vat in ["", "12345678", "C", "CZ!2345678"] {
        let err = gateway.check_vat(vat).await.unwrap_err();
        assert!(matches!(err, Error::InputValidation(_)), "{vat}");
    }
    assert_eq!(registries.connects(), 0);
    assert_eq!(registries.calls_to(CHECK), 0);
}

/// A refused connection is not memoized; the next lookup reconnects.
#[tokio::test]
async fn test_connection_recovers_after_failed_initialization() {
    let registries = Registries::default();
    registries.answer(CHECK, acme());
    let mut gateway = registries.gateway();
    let mut events = gateway.events().expect("first receiver");

    registries.refuse_connections(true);
    let err = gateway.check_vat("CZ12345678").await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(!gateway.connections().is_ready(BUSINESS_ENDPOINT));

    registries.refuse_connections(false);
    assert!(gateway.check_vat("CZ12345678").await.unwrap().valid);
    assert!(gateway.connections().is_ready(BUSINESS_ENDPOINT));
    assert_eq!(registries.connects(), 2);

    let mut failed = 0;
    let mut established = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            GatewayEvent::ConnectionFailed { .. } => failed += 1,
            GatewayEvent::ConnectionEstablished { .. } => established += 1,
            _ => {}
        }
    }
    assert_eq!((failed, established), (1, 1));
}

/// A stalled registry call is cut off by the configured timeout.
#[tokio::test(start_paused = true)]
async fn test_stalled_registry_times_out() {
    let registries = Registries::default();
    registries.answer(CHECK, Answer::Stall);
    let mut config = scripted_config();
    config.business.timeout_ms = 1_500;
    let gateway = registries.gateway_with(config).unwrap();

    let err = gateway.check_vat("CZ12345678").await.unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 1_500, .. }));

    // Lock was released: a second attempt reaches the registry again.
    let err = gateway.check_vat("CZ12345678").await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    assert_eq!(registries.calls_to(CHECK), 2);
}

/// Reliability lookups are validated and never cached.
#[tokio::test]
async fn test_reliability_status() {
    let registries = Registries::default();
    registries.answer(
        STATUS,
        Answer::Payload(json!({
            "status": {"code": 0, "text": "OK"},
            "payers": [{
                "localId": "12345678",
                "reliability": "UNRELIABLE",
                "unreliableSince": "2025-03-01",
                "bankAccounts": [{"number": "CZ6508000000192000145399"}]
            }]
        })),
    );
    let gateway = registries.gateway();

    let status = gateway.reliability_status("CZ12345678").await.unwrap();
    assert_eq!(status.reliability, Reliability::Unreliable);
    assert_eq!(status.bank_accounts.len(), 1);

    gateway.reliability_status("12345678").await.unwrap();
    assert_eq!(registries.calls_to(STATUS), 2);
    assert_eq!(registries.args_of(STATUS)[0], json!({"localIds": ["12345678"]}));
}

/// A reply listing only other taxpayers is not attributed to the requested one.
#[tokio::test]
async fn test_reliability_ignores_other_taxpayers() {
    let registries = Registries::default();
    registries.answer(
        STATUS,
        Answer::Payload(json!({
            "payers": [{"localId": "99999999", "reliability": "UNRELIABLE"}]
        })),
    );
    let gateway = registries.gateway();

    let status = gateway.reliability_status("12345678").await.unwrap();
    assert_eq!(status.local_id, "12345678");
    assert_eq!(status.reliability, Reliability::NotFound);
}

/// A missing payload is distinguished from a malformed one.
#[tokio::test]
async fn test_reliability_payload_classification() {
    let registries = Registries::default();
    let gateway = registries.gateway();

    registries.answer(STATUS, Answer::Payload(json!({"status": {"code": 0}})));
    let err = gateway.reliability_status("12345678").await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedState(_)));

    registries.answer(
        STATUS,
        Answer::Payload(json!({"payers": [{"localId": 12345678, "reliability": "RELIABLE"}]})),
    );
    let err = gateway.reliability_status("12345678").await.unwrap_err();
    assert!(matches!(err, Error::ResponseValidation { ref details } if details.contains("localId")));
}

/// Missing endpoints fail at construction, not at first request.
#[test]
fn test_missing_endpoint_is_rejected_at_build() {
    let registries = Registries::default();
    let mut config = scripted_config();
    config.reliability.endpoint = None;
    let err = registries.gateway_with(config).err().expect("build fails");
    assert!(matches!(err, Error::Configuration(ref m) if m.contains("reliability.endpoint")));
}

fn http_config(endpoint: &str) -> GatewayConfig {
    GatewayConfig {
        business: ProviderConfig::with_endpoint(endpoint),
        reliability: ProviderConfig::with_endpoint(endpoint),
        ..GatewayConfig::default()
    }
}

/// The real HTTP transport against a mocked JSON-RPC registry.
#[tokio::test]
async fn test_http_transport_end_to_end() {
    let mut registry = RegistryMock::start().await;
    let acme = registry
        .mock_result(
            CHECK,
            r#""vatNumber"\s*:\s*"12345678""#,
            json!({"valid": true, "traderName": "Acme s.r.o.", "requestDate": "2026-10-18"}),
            1,
        )
        .await;
    let invalid = registry
        .mock_error(
            CHECK,
            r#""vatNumber"\s*:\s*"99999999""#,
            500,
            json!({"code": -32000, "message": "Server error", "data": {"faultstring": "INVALID_INPUT"}}),
            1,
        )
        .await;
    let unknown = registry
        .mock_error(
            STATUS,
            "",
            200,
            json!({"code": -32601, "message": "Method not found"}),
            1,
        )
        .await;

    let gateway = GatewayBuilder::new(http_config(&registry.url())).build().unwrap();

    let result = gateway.check_vat("CZ12345678").await.unwrap();
    assert!(result.valid);
    assert_eq!(result.name.as_deref(), Some("Acme s.r.o."));
    assert_eq!(result.request_date.as_deref(), Some("2026-10-18"));

    // Served from the cache; the registry sees one request.
    gateway.check_vat("CZ12345678").await.unwrap();
    acme.assert_async().await;

    let err = gateway.check_vat("CZ99999999").await.unwrap_err();
    assert!(matches!(err, Error::RemoteFault { ref message } if message == "INVALID_INPUT"));
    invalid.assert_async().await;

    let err = gateway.reliability_status("12345678").await.unwrap_err();
    assert!(matches!(err, Error::RemoteFault { ref message } if message == "Method not found"));
    unknown.assert_async().await;
}

/// A registry that only accepts POST still passes the connect-time
/// reachability check.
#[tokio::test]
async fn test_http_endpoint_rejecting_get_is_usable() {
    let mut registry = RegistryMock::start().await;
    let get = registry.mock_get(405).await;
    let status = registry
        .mock_result(
            STATUS,
            r#""localIds"\s*:\s*\["12345678"\]"#,
            json!({
                "status": {"code": 0},
                "payers": [{"localId": "12345678", "reliability": "RELIABLE"}]
            }),
            1,
        )
        .await;

    let gateway = GatewayBuilder::new(http_config(&registry.url())).build().unwrap();

    let result = gateway.reliability_status("CZ12345678").await.unwrap();
    assert_eq!(result.reliability, Reliability::Reliable);
    assert!(gateway.connections().is_ready(&registry.url()));
    get.assert_async().await;
    status.assert_async().await;
}

/// An unreachable endpoint surfaces as a transport error.
#[tokio::test]
async fn test_http_unreachable_endpoint() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = GatewayBuilder::new(http_config(&format!("http://{addr}/rpc")))
        .build()
        .unwrap();

    let err = gateway.check_vat("CZ12345678").await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "{err}");
    assert!(gateway.connections().is_empty());
}
