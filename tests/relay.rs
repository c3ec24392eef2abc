//! Relay backend client against a mocked relay

use serde_json::json;
use surge_bridge::{BridgeError, RelayBackend, RelayClient};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TX: &str = "0x5c6ff5c1f9b2a0f8ad2d6a6f1f4fbf36a4b2e23a97c68fb4eb5b3d0ba1fd35e2";

#[tokio::test]
async fn test_bridge_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/bridge"))
        .and(body_json(json!({ "txHash": TX })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Transfer completed",
            "data": {
                "sourceTxHash": TX,
                "sourceChain": "bsc",
                "targetChain": "sui",
                "targetTxHash": "8bXq2VhS1qJbVJm1eCr6JvZrV8fXv3Kc4WbZ9nTq4yPd",
                "vaaRaw": "AQID",
                "explorerUrl": "https://suiscan.xyz/testnet/tx/8bXq2VhS1qJbVJm1eCr6JvZrV8fXv3Kc4WbZ9nTq4yPd"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = tokio_test::assert_ok!(RelayClient::new(&server.uri()).bridge(TX).await);

    assert_eq!(receipt.target_tx_hash, "8bXq2VhS1qJbVJm1eCr6JvZrV8fXv3Kc4WbZ9nTq4yPd");
    assert_eq!(receipt.attestation().unwrap().bytes, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_bridge_error_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/bridge"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "error": "VAA not found after 60 attempts"
        })))
        .mount(&server)
        .await;

    let err = RelayClient::new(&server.uri()).bridge(TX).await.unwrap_err();
    assert_eq!(err, BridgeError::Relay("VAA not found after 60 attempts".into()));
}

#[tokio::test]
async fn test_bridge_success_without_destination_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/bridge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "sourceTxHash": TX, "targetTxHash": "" }
        })))
        .mount(&server)
        .await;

    let err = RelayClient::new(&server.uri()).bridge(TX).await.unwrap_err();
    assert!(matches!(err, BridgeError::Relay(_)));
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    let relay = RelayClient::new(&server.uri());

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    assert!(relay.health().await);

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;
    assert!(!relay.health().await);
}

#[tokio::test]
async fn test_unreachable_relay_is_offline() {
    let relay = RelayClient::new("http://127.0.0.1:9");
    assert!(!relay.health().await);
    let err = tokio_test::assert_err!(relay.bridge(TX).await);
    assert!(matches!(err, BridgeError::Relay(_)));
}
