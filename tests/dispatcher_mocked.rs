/// Integration tests for the OmniDim client against a mocked API
use lead_dialer::dispatcher::{CallDispatcher, OmniDimClient};
use lead_dialer::errors::AppError;
use lead_dialer::models::{DispatchReceipt, Lead, LeadRow};
use lead_dialer::phone;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(base_url: String) -> OmniDimClient {
    OmniDimClient::new(base_url, "test-key".to_string(), 64073, Duration::from_secs(5)).unwrap()
}

fn lead() -> Lead {
    let headers: Vec<String> = ["lead_id", "Name", "Email", "Phone Number", "Budget"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let cells: Vec<String> = ["L-1", "Asha", "asha@example.com", "(555) 123-4567", "90L"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    Lead::from_row(LeadRow::from_cells(&headers, &cells))
}

#[tokio::test]
async fn test_dispatch_sends_expected_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calls/dispatch"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_json(serde_json::json!({
            "agent_id": 64073,
            "to_number": "+5551234567",
            "call_context": {
                "customer_name": "Asha",
                "email": "asha@example.com",
                "lead_id": "L-1"
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"call_id": "call-123"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let lead = lead();
    let phone = phone::normalize(&lead.raw_phone).unwrap();
    let receipt = client(mock_server.uri()).dispatch(&phone, &lead).await.unwrap();

    assert_eq!(receipt, DispatchReceipt::CallId("call-123".to_string()));
}

#[tokio::test]
async fn test_dispatch_falls_back_to_id_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calls/dispatch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 5511})))
        .mount(&mock_server)
        .await;

    let lead = lead();
    let phone = phone::normalize(&lead.raw_phone).unwrap();
    let receipt = client(mock_server.uri()).dispatch(&phone, &lead).await.unwrap();

    assert_eq!(receipt.call_id(), Some("5511"));
}

#[tokio::test]
async fn test_success_without_id_is_accepted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calls/dispatch"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "queued"})),
        )
        .mount(&mock_server)
        .await;

    let lead = lead();
    let phone = phone::normalize(&lead.raw_phone).unwrap();
    let receipt = client(mock_server.uri()).dispatch(&phone, &lead).await.unwrap();

    assert_eq!(receipt, DispatchReceipt::Accepted);
}

#[tokio::test]
async fn test_non_success_status_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calls/dispatch"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid number"))
        .mount(&mock_server)
        .await;

    let lead = lead();
    let phone = phone::normalize(&lead.raw_phone).unwrap();
    let err = client(mock_server.uri())
        .dispatch(&phone, &lead)
        .await
        .unwrap_err();

    match err {
        AppError::ExternalApiError(msg) => assert!(msg.contains("invalid number")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_api_hits_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calls/dispatch"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"call_id": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let slow_client = OmniDimClient::new(
        mock_server.uri(),
        "test-key".to_string(),
        1,
        Duration::from_millis(200),
    )
    .unwrap();

    let lead = lead();
    let phone = phone::normalize(&lead.raw_phone).unwrap();
    let result = slow_client.dispatch(&phone, &lead).await;

    assert!(matches!(result, Err(AppError::ExternalApiError(_))));
}

#[tokio::test]
async fn test_unreachable_api_is_error() {
    // Nothing listens on the mock server once it is dropped.
    let uri = {
        let mock_server = MockServer::start().await;
        mock_server.uri()
    };

    let lead = lead();
    let phone = phone::normalize(&lead.raw_phone).unwrap();
    let result = client(uri).dispatch(&phone, &lead).await;

    assert!(result.is_err());
}
