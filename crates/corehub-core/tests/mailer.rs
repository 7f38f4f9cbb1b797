use corehub_core::notify::{EmailMessage, HttpMailer, Mailer};
use corehub_core::CoreError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn message() -> EmailMessage {
    EmailMessage {
        to: "student@example.com".into(),
        subject: "Welcome".into(),
        html: "<p>Hello</p>".into(),
        text: "Hello".into(),
    }
}

#[tokio::test]
async fn posts_message_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer key-1"))
        .and(body_partial_json(json!({
            "from": "noreply@core.test",
            "to": ["student@example.com"],
            "subject": "Welcome",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "m-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let mailer = HttpMailer::new(&format!("{}/emails/", server.uri()), "key-1", "noreply@core.test");
    mailer.send(&message()).await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_a_mail_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad recipient"))
        .mount(&server)
        .await;

    let mailer = HttpMailer::new(&format!("{}/emails", server.uri()), "key-1", "noreply@core.test");
    let err = mailer.send(&message()).await.unwrap_err();
    match err {
        CoreError::Mail(msg) => {
            assert!(msg.contains("422"));
            assert!(msg.contains("bad recipient"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
