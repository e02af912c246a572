//! Tests for the SwitchBot HTTP client against a mock API server.

use std::time::Duration;

use serde_json::json;
use switchbot_client::{ClientError, Credentials, DeviceClient, DeviceType, SwitchBotClient};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> SwitchBotClient {
    SwitchBotClient::with_options(
        Credentials::new("open-token", "secret-key"),
        &server.uri(),
        Some(Duration::from_secs(5)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_list_devices_sends_signed_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.1/devices"))
        .and(header("Authorization", "open-token"))
        .and(header_exists("sign"))
        .and(header_exists("t"))
        .and(header_exists("nonce"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statusCode": 100,
            "message": "success",
            "body": {
                "deviceList": [
                    {
                        "deviceId": "C271111EC0AB",
                        "deviceName": "Bedroom Meter",
                        "deviceType": "MeterPlus",
                        "enableCloudService": true,
                        "hubDeviceId": "E2F6032048AB"
                    }
                ],
                "infraredRemoteList": [
                    {
                        "deviceId": "02-202008110034-13",
                        "deviceName": "Living Room TV",
                        "remoteType": "TV",
                        "hubDeviceId": "E2F6032048AB"
                    }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let list = client_for(&server).list_devices().await.unwrap();

    assert_eq!(list.devices.len(), 1);
    assert_eq!(list.devices[0].name, "Bedroom Meter");
    assert_eq!(list.devices[0].device_type, DeviceType::MeterPlus);
    assert_eq!(list.infrared.len(), 1);
    assert_eq!(list.infrared[0].id, "02-202008110034-13");
}

#[tokio::test]
async fn test_status_decodes_meter_reading() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.1/devices/C271111EC0AB/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statusCode": 100,
            "message": "success",
            "body": {
                "deviceId": "C271111EC0AB",
                "deviceType": "Meter",
                "hubDeviceId": "E2F6032048AB",
                "humidity": 52,
                "temperature": 21.7
            }
        })))
        .mount(&server)
        .await;

    let status = client_for(&server).status("C271111EC0AB").await.unwrap();

    assert_eq!(status.id, "C271111EC0AB");
    assert_eq!(status.device_type, DeviceType::Meter);
    assert_eq!(status.humidity, Some(52));
    assert_eq!(status.temperature, Some(21.7));
}

#[tokio::test]
async fn test_api_status_code_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.1/devices/MISSING/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statusCode": 152,
            "message": "device not found",
            "body": {}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).status("MISSING").await.unwrap_err();

    assert_eq!(err.api_code(), Some(152));
    assert!(err.to_string().contains("device not found"));
}

#[tokio::test]
async fn test_unauthorized_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.1/devices"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_devices().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
}

#[tokio::test]
async fn test_server_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.1/devices"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_devices().await.unwrap_err();
    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_devices().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_timeout_is_enforced_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.1/devices"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(json!({"statusCode": 100, "body": {}})),
        )
        .mount(&server)
        .await;

    let client = SwitchBotClient::with_options(
        Credentials::new("open-token", "secret-key"),
        &server.uri(),
        Some(Duration::from_millis(50)),
    )
    .unwrap();

    let err = client.list_devices().await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
}
