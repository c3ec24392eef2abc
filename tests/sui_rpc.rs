//! Sui JSON-RPC client against a mocked full node

use std::sync::Arc;

use serde_json::{json, Value};
use surge_bridge::chain::MoveBridgeChain;
use surge_bridge::sui::{SuiRpcClient, SuiSigner, SurgePackage};
use surge_bridge::{BridgeError, Chain, DestinationCompleter, MoveCompleter};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIGEST: &str = "9ThJ3pTL3yZGf1d8WqYqXyAHwzSrbLNpRKCZZcV5kZ2E";

fn package() -> SurgePackage {
    SurgePackage {
        package_id: "0xa85bf1df86ac7eccb503f51a5b40f1fab94ef0788f6d9fe605a04c032ff07d78".into(),
        state_id: "0x31358d198147da50db32eda2562951d53973a0c0ad5ed738e9b17d88b213d790".into(),
        bridge_state_id: "0x73d5c13821558903002f37f4e267cb814f5a606a749d7dbb1ad7ec823b628b9b"
            .into(),
    }
}

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

async fn mount(server: &MockServer, rpc_method: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Node that builds, executes and reports `status` for every transaction
async fn node(status: Value) -> MockServer {
    let server = MockServer::start().await;
    mount(
        &server,
        "suix_getCoins",
        rpc_result(json!({
            "data": [{
                "coinType": "0x2::sui::SUI",
                "coinObjectId": "0x0b5c1d0e4f2a3b6c7d8e9f00112233445566778899aabbccddeeff0011223344",
                "version": "12",
                "digest": "3JxB9sDhQkZkFkbCRP3Yp7dZs1vJ1tQ2wKq6p5L1HdE4",
                "balance": "900000000"
            }],
            "nextCursor": null,
            "hasNextPage": false
        })),
    )
    .await;
    mount(&server, "unsafe_moveCall", rpc_result(json!({ "txBytes": "AAAA" }))).await;
    mount(
        &server,
        "sui_executeTransactionBlock",
        rpc_result(json!({ "digest": DIGEST })),
    )
    .await;
    mount(
        &server,
        "sui_getTransactionBlock",
        rpc_result(json!({ "digest": DIGEST, "effects": { "status": status } })),
    )
    .await;
    server
}

fn signed_client(server: &MockServer) -> SuiRpcClient {
    SuiRpcClient::new(&server.uri()).with_signer(SuiSigner::from_secret(&[7u8; 32]))
}

#[tokio::test]
async fn test_unlock_executes_and_confirms() {
    let server = node(json!({ "status": "success" })).await;
    let completer = MoveCompleter::new(Arc::new(signed_client(&server)), package());

    let digest = completer.complete(&[0xAB; 200]).await.unwrap();
    assert_eq!(digest, DIGEST);

    let requests = server.received_requests().await.unwrap();
    let execute = requests
        .iter()
        .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap())
        .find(|body| body["method"] == "sui_executeTransactionBlock")
        .unwrap();
    assert_eq!(execute["params"][0], "AAAA");
    assert_eq!(execute["params"][3], "WaitForLocalExecution");
    assert!(execute["params"][1][0].as_str().unwrap().len() > 100);
}

#[tokio::test]
async fn test_aborted_unlock_is_failure() {
    let server = node(json!({ "status": "failure", "error": "MoveAbort(surge::unlock, 2)" })).await;
    let completer = MoveCompleter::new(Arc::new(signed_client(&server)), package());

    let err = completer.complete(&[0xAB; 200]).await.unwrap_err();
    match err {
        BridgeError::ChainWrite { chain, message } => {
            assert_eq!(chain, Chain::Sui);
            assert!(message.contains("MoveAbort"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_reads() {
    let server = MockServer::start().await;
    mount(
        &server,
        "suix_getBalance",
        rpc_result(json!({
            "coinType": "0x2::sui::SUI",
            "coinObjectCount": 2,
            "totalBalance": "1500000000",
            "lockedBalance": {}
        })),
    )
    .await;
    mount(
        &server,
        "suix_getCoinMetadata",
        rpc_result(json!({ "decimals": 9, "name": "Surge", "symbol": "SURGE" })),
    )
    .await;

    let client = SuiRpcClient::new(&server.uri());
    let owner = "0x77b1fd81c2f9cc3a92574244c76a35f4e4bacdcac75619709d3f8729ad497161";
    assert_eq!(client.balance(owner, "0x2::sui::SUI").await.unwrap(), 1_500_000_000);
    assert_eq!(client.coin_decimals(&package().coin_type()).await.unwrap(), 9);
}

#[tokio::test]
async fn test_rpc_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "Invalid params" }
        })))
        .mount(&server)
        .await;

    let err = SuiRpcClient::new(&server.uri())
        .coin_decimals("0x2::sui::SUI")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid params"));
}

#[tokio::test]
async fn test_read_only_client_cannot_execute() {
    let server = MockServer::start().await;
    let client = SuiRpcClient::new(&server.uri());
    let err = client.execute(&package().unlock_call(vec![1], 1_000)).await.unwrap_err();
    assert!(err.to_string().contains("SUI_PRIVATE_KEY"));
}
