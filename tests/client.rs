use httpmock::prelude::*;
use postal_client::{
    Client, Error, MessageExpansion, SendMessageRequest, SendRawRequest,
};
use serde_json::json;
use std::time::Duration;

const API_KEY: &str = "test-api-key";

fn client_for(server: &MockServer) -> Client {
    Client::with_options(API_KEY, server.base_url(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn send_message_returns_id_and_token() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/send/message")
                .header("content-type", "application/json")
                .header("accept", "application/json")
                .header("x-server-api-key", API_KEY)
                .json_body(json!({"to": ["a@b.com"], "from": "c@d.com", "subject": ""}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"status": "success", "data": {"message_id": 123, "token": "t"}}));
        })
        .await;

    let request = SendMessageRequest {
        to: vec!["a@b.com".to_string()],
        from: "c@d.com".to_string(),
        ..Default::default()
    };
    let sent = client_for(&server).send_message(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(sent.message_id, 123);
    assert_eq!(sent.token, "t");
}

#[tokio::test]
async fn send_raw_posts_encoded_message() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/send/raw").json_body(json!({
                "mail_from": "sender@yourdomain.com",
                "rcpt_to": ["recipient@example.com"],
                "data": "U3ViamVjdDogSGkNCg0KSGVsbG8NCg=="
            }));
            then.status(200).json_body(json!({
                "status": "success",
                "time": 0.05,
                "flags": {},
                "data": {
                    "message_id": 77,
                    "token": "raw-token",
                    "messages": {"recipient@example.com": {"id": 77, "token": "raw-token"}}
                }
            }));
        })
        .await;

    let request = SendRawRequest::new(
        "sender@yourdomain.com",
        vec!["recipient@example.com".to_string()],
        "Subject: Hi\r\n\r\nHello\r\n",
    );
    let sent = client_for(&server).send_raw(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(sent.message_id, 77);
    assert_eq!(sent.messages["recipient@example.com"].token, "raw-token");
}

#[tokio::test]
async fn get_message_sends_id() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/messages/message")
                .json_body(json!({"id": 123}));
            then.status(200).json_body(json!({
                "status": "success",
                "time": 0.123,
                "flags": {},
                "data": {"id": 123, "token": "test-token"}
            }));
        })
        .await;

    let message = client_for(&server).get_message(123).await.unwrap();

    mock.assert_async().await;
    assert_eq!(message.id, 123);
    assert_eq!(message.token, "test-token");
    assert!(message.status.is_none());
}

#[tokio::test]
async fn get_message_with_expansions_requests_sections() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/messages/message")
                .json_body(json!({"id": 5, "_expansions": ["status", "plain_body"]}));
            then.status(200).json_body(json!({
                "status": "success",
                "data": {
                    "id": 5,
                    "token": "tok",
                    "status": {"status": "Sent", "held": false},
                    "plain_body": "hello"
                }
            }));
        })
        .await;

    let message = client_for(&server)
        .get_message_with_expansions(5, &[MessageExpansion::Status, MessageExpansion::PlainBody])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(message.plain_body.as_deref(), Some("hello"));
    assert_eq!(message.status.unwrap().get("held"), Some(&json!(false)));
}

#[tokio::test]
async fn get_message_deliveries_decodes_list() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/messages/deliveries")
                .json_body(json!({"id": 123}));
            then.status(200).json_body(json!({
                "status": "success",
                "time": 0.123,
                "flags": {},
                "data": [{
                    "id": 123,
                    "status": "delivered",
                    "details": "test details",
                    "output": "test output",
                    "sent_with_ssl": true,
                    "log_id": 456,
                    "time": 0.456,
                    "timestamp": "2023-01-01T00:00:00Z"
                }]
            }));
        })
        .await;

    let deliveries = client_for(&server).get_message_deliveries(123).await.unwrap();

    mock.assert_async().await;
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].id, 123);
    assert_eq!(deliveries[0].status, "delivered");
    assert!(deliveries[0].sent_with_ssl);
    assert_eq!(deliveries[0].timestamp.to_rfc3339(), "2023-01-01T00:00:00+00:00");
}

#[tokio::test]
async fn error_status_on_200_is_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/messages/message");
            then.status(200).json_body(json!({
                "status": "error",
                "time": 0.123,
                "flags": {},
                "data": {"error": "test error"},
                "error_code": "invalid_request",
                "message": "Invalid request"
            }));
        })
        .await;

    let err = client_for(&server).get_message(123).await.unwrap_err();

    let api = err.api_error().expect("api error");
    assert_eq!(api.http_status, 200);
    assert_eq!(api.status, "error");
    assert_eq!(api.code(), Some("invalid_request"));
    assert_eq!(api.message(), Some("Invalid request"));
    assert_eq!(err.to_string(), "postal API error: error - Invalid request");
}

#[tokio::test]
async fn non_2xx_is_api_error_with_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/messages/deliveries");
            then.status(500).json_body(json!({
                "status": "error",
                "time": 0.123,
                "flags": {},
                "data": {},
                "error_code": "server_error",
                "message": "Internal server error"
            }));
        })
        .await;

    let err = client_for(&server).get_message_deliveries(1).await.unwrap_err();

    let api = err.api_error().expect("api error");
    assert_eq!(api.http_status, 500);
    assert_eq!(api.message(), Some("Internal server error"));
}

#[tokio::test]
async fn parameter_error_reads_message_from_data() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/send/message");
            then.status(200).json_body(json!({
                "status": "parameter-error",
                "time": 0.01,
                "flags": {},
                "data": {"code": "NoRecipients", "message": "There are no recipients defined to receive this message"}
            }));
        })
        .await;

    let err = client_for(&server)
        .send_message(&SendMessageRequest::default())
        .await
        .unwrap_err();

    let api = err.api_error().expect("api error");
    assert_eq!(api.code(), Some("NoRecipients"));
    assert!(err.to_string().starts_with("postal API error: parameter-error - There are no recipients"));
}

#[tokio::test]
async fn non_json_error_body_keeps_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/send/message");
            then.status(503).body("Service Unavailable");
        })
        .await;

    let err = client_for(&server)
        .send_message(&SendMessageRequest::default())
        .await
        .unwrap_err();

    match err {
        Error::UnexpectedStatus { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "Service Unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_data_is_parse_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/messages/message");
            then.status(200)
                .body(r#"{"status":"success","time":0.123,"flags":{},"data":invalid-json}"#);
        })
        .await;

    let err = client_for(&server).get_message(123).await.unwrap_err();
    assert!(matches!(err, Error::ResponseParse(_)));
}

#[tokio::test]
async fn wrong_data_shape_is_parse_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/messages/deliveries");
            then.status(200)
                .json_body(json!({"status": "success", "data": {"id": 1}}));
        })
        .await;

    let err = client_for(&server).get_message_deliveries(1).await.unwrap_err();
    assert!(matches!(err, Error::ResponseParse(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/messages/message");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(json!({"status": "success", "data": {"id": 1, "token": "t"}}));
        })
        .await;

    let client = Client::builder(API_KEY)
        .base_url(server.base_url())
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let err = client.get_message(1).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(matches!(err, Error::Request(_)));
}

#[tokio::test]
async fn unreachable_server_is_request_error() {
    let client = Client::with_options(API_KEY, "http://127.0.0.1:9", Duration::from_secs(2)).unwrap();

    let err = client.get_message(1).await.unwrap_err();
    assert!(matches!(err, Error::Request(_)));
}

#[tokio::test]
async fn custom_http_client_still_sends_api_key() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/messages/message")
                .header("x-server-api-key", API_KEY);
            then.status(200)
                .json_body(json!({"status": "success", "data": {"id": 9, "token": "t"}}));
        })
        .await;

    let client = Client::builder(API_KEY)
        .base_url(server.base_url())
        .http_client(reqwest::Client::new())
        .build()
        .unwrap();

    let message = client.get_message(9).await.unwrap();

    mock.assert_async().await;
    assert_eq!(message.id, 9);
}

#[tokio::test]
async fn clones_share_configuration_across_tasks() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/messages/message");
            then.status(200)
                .json_body(json!({"status": "success", "data": {"id": 1, "token": "t"}}));
        })
        .await;

    let client = client_for(&server);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get_message(1).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().id, 1);
    }
    mock.assert_hits_async(4).await;
}

#[tokio::test]
async fn created_and_accepted_responses_decode() {
    for status in [201u16, 202] {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/send/message");
                then.status(status)
                    .json_body(json!({"status": "success", "data": {"message_id": 42, "token": "t"}}));
            })
            .await;

        let sent = client_for(&server)
            .send_message(&SendMessageRequest::default())
            .await
            .unwrap();
        assert_eq!(sent.message_id, 42);
    }
}

#[tokio::test]
async fn error_status_on_201_is_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/send/message");
            then.status(201)
                .json_body(json!({"status": "error", "error_code": "rejected", "message": "Rejected"}));
        })
        .await;

    let err = client_for(&server)
        .send_message(&SendMessageRequest::default())
        .await
        .unwrap_err();

    let api = err.api_error().expect("api error");
    assert_eq!(api.http_status, 201);
    assert_eq!(api.code(), Some("rejected"));
}

#[tokio::test]
async fn null_time_on_500_keeps_envelope_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/messages/message");
            then.status(500)
                .body(r#"{"status":"error","time":null,"message":"boom"}"#);
        })
        .await;

    let err = client_for(&server).get_message(1).await.unwrap_err();

    let api = err.api_error().expect("api error");
    assert_eq!(api.http_status, 500);
    assert_eq!(api.message(), Some("boom"));
}
