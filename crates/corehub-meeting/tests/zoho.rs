use chrono::{Duration, NaiveDate, TimeZone, Utc};
use corehub_meeting::{
    ManualClock, MeetingError, MeetingProvider, MeetingRequest, ZohoConfig, ZohoMeetingClient,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ZohoConfig {
    ZohoConfig {
        accounts_url: server.uri(),
        api_url: format!("{}/", server.uri()),
        client_id: "client-1".into(),
        client_secret: "secret-1".into(),
        refresh_token: "refresh-1".into(),
        org_id: "org-1".into(),
        presenter_id: Some("777".into()),
        timezone: "Asia/Kolkata".into(),
    }
}

fn request() -> MeetingRequest {
    MeetingRequest {
        topic: "Case review".into(),
        agenda: None,
        start: NaiveDate::from_ymd_opt(2026, 3, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
        duration_minutes: 30,
        participants: vec!["ops@example.com".into()],
    }
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(query_param("refresh_token", "refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 3600
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn creates_meeting_and_caches_token() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/org-1/sessions.json"))
        .and(header("Authorization", "Zoho-oauthtoken tok-1"))
        .and(body_partial_json(json!({
            "session": {
                "topic": "Case review",
                "startTime": "Mar 05, 2026 10:00 AM",
                "duration": 1_800_000,
                "presenter": "777"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session": { "meetingKey": 1044, "joinLink": "https://meeting.zoho.com/j/1044" }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = ZohoMeetingClient::new(config(&server));
    let first = client.create_meeting(&request()).await.unwrap();
    let second = client.create_meeting(&request()).await.unwrap();

    assert_eq!(first.meeting_key, "1044");
    assert_eq!(first.join_url, "https://meeting.zoho.com/j/1044");
    assert_eq!(first, second);
}

#[tokio::test]
async fn refreshes_token_after_expiry() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/org-1/sessions.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "joinUrl": "https://meeting.zoho.com/j/9",
            "key": "k-9"
        })))
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()));
    let client = ZohoMeetingClient::with_clock(config(&server), clock.clone());

    client.create_meeting(&request()).await.unwrap();
    clock.advance(Duration::hours(2));
    let link = client.create_meeting(&request()).await.unwrap();
    assert_eq!(link.meeting_key, "k-9");
}

#[tokio::test]
async fn surfaces_api_failure() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/org-1/sessions.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = ZohoMeetingClient::new(config(&server));
    let err = client.create_meeting(&request()).await.unwrap_err();
    assert!(matches!(err, MeetingError::Api { status: 500, .. }));
}

#[tokio::test]
async fn rejects_response_without_join_url() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/org-1/sessions.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let client = ZohoMeetingClient::new(config(&server));
    let err = client.create_meeting(&request()).await.unwrap_err();
    assert!(matches!(err, MeetingError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn token_error_payload_is_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "invalid_code" })))
        .mount(&server)
        .await;

    let client = ZohoMeetingClient::new(config(&server));
    let err = client.create_meeting(&request()).await.unwrap_err();
    match err {
        MeetingError::Auth(msg) => assert_eq!(msg, "invalid_code"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn deletes_meeting() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("DELETE"))
        .and(path("/api/v2/org-1/sessions/1044.json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = ZohoMeetingClient::new(config(&server));
    client.delete_meeting("1044").await.unwrap();
}
