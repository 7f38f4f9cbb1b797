//! Email bodies rendered with Tera.
//!
//! HTML bodies are autoescaped; plain-text bodies carry user input verbatim.

use super::EmailMessage;
use crate::error::CoreResult;
use serde::Serialize;
use tera::{Context, Tera};

const LAYOUT_OPEN: &str = r#"<div style="font-family: Arial, sans-serif; color: #1f2937; max-width: 560px">"#;
const LAYOUT_CLOSE: &str = r#"<p style="color: #6b7280; font-size: 12px">This is an automated message from CORE.</p></div>"#;

const DOCUMENT_REJECTED_HTML: &str = r#"
<p>Hi {{ student_name }},</p>
<p>Your document <strong>{{ document_name }}</strong> was reviewed and could not be approved.</p>
<p><strong>Reason:</strong></p>
<blockquote>{{ message }}</blockquote>
<p>Please upload a corrected version from your dashboard.</p>
"#;

const DOCUMENT_REJECTED_TEXT: &str = "Hi {{ student_name }},

Your document {{ document_name }} was reviewed and could not be approved.

Reason:
{{ message }}

Please upload a corrected version from your dashboard.
";

const CONVERSION_APPROVED_HTML: &str = r#"
<p>Hello {{ recipient_name }},</p>
<p>{{ admin_name }}{% if company_name %} ({{ company_name }}){% endif %} approved the conversion of lead
<strong>{{ lead_name }}</strong> into a student.</p>
<p>Student account: {{ student_email }}</p>
"#;

const CONVERSION_APPROVED_TEXT: &str = "Hello {{ recipient_name }},

{{ admin_name }}{% if company_name %} ({{ company_name }}){% endif %} approved the conversion of lead {{ lead_name }} into a student.
Student account: {{ student_email }}
";

const STUDENT_WELCOME_HTML: &str = r#"
<p>Welcome {{ student_name }},</p>
<p>Your student account{% if company_name %} with {{ company_name }}{% endif %} is ready.</p>
<p>Sign in with <strong>{{ student_email }}</strong> to complete your registration forms and upload documents.</p>
"#;

const STUDENT_WELCOME_TEXT: &str = "Welcome {{ student_name }},

Your student account{% if company_name %} with {{ company_name }}{% endif %} is ready.
Sign in with {{ student_email }} to complete your registration forms and upload documents.
";

const MEETING_INVITATION_HTML: &str = r#"
<p>Hi {{ invitee_name }},</p>
<p>{{ requester_name }} invited you to <strong>{{ subject }}</strong>.</p>
<ul>
  <li>Date: {{ date }}</li>
  <li>Time: {{ start_time }} ({{ duration_minutes }} minutes)</li>
  {% if join_url %}<li>Join: <a href="{{ join_url }}">{{ join_url }}</a></li>{% endif %}
  {% if location %}<li>Location: {{ location }}</li>{% endif %}
</ul>
{% if description %}<p>{{ description }}</p>{% endif %}
<p>Please accept or decline the request in CORE.</p>
"#;

const MEETING_INVITATION_TEXT: &str = "Hi {{ invitee_name }},

{{ requester_name }} invited you to {{ subject }}.
Date: {{ date }}
Time: {{ start_time }} ({{ duration_minutes }} minutes)
{% if join_url %}Join: {{ join_url }}
{% endif %}{% if location %}Location: {{ location }}
{% endif %}{% if description %}
{{ description }}
{% endif %}
Please accept or decline the request in CORE.
";

const MEETING_RESPONSE_HTML: &str = r#"
<p>Hi {{ requester_name }},</p>
<p>{{ responder_name }} <strong>{{ outcome }}</strong> your meeting request <strong>{{ subject }}</strong> on {{ date }} at {{ start_time }}.</p>
{% if message %}<p><strong>Message:</strong> {{ message }}</p>{% endif %}
"#;

const MEETING_RESPONSE_TEXT: &str = "Hi {{ requester_name }},

{{ responder_name }} {{ outcome }} your meeting request {{ subject }} on {{ date }} at {{ start_time }}.
{% if message %}Message: {{ message }}
{% endif %}";

fn render<T: Serialize>(to: &str, subject: String, html: &str, text: &str, data: &T) -> CoreResult<EmailMessage> {
    let context = Context::from_serialize(data)?;
    let body = Tera::one_off(html, &context, true)?;
    Ok(EmailMessage {
        to: to.to_string(),
        subject,
        html: format!("{}{}{}", LAYOUT_OPEN, body, LAYOUT_CLOSE),
        text: Tera::one_off(text, &context, false)?,
    })
}

#[derive(Serialize)]
pub struct DocumentRejected<'a> {
    pub student_name: &'a str,
    pub document_name: &'a str,
    pub message: &'a str,
}

pub fn document_rejected(to: &str, data: &DocumentRejected<'_>) -> CoreResult<EmailMessage> {
    render(
        to,
        format!("Document rejected: {}", data.document_name),
        DOCUMENT_REJECTED_HTML,
        DOCUMENT_REJECTED_TEXT,
        data,
    )
}

#[derive(Serialize)]
pub struct ConversionApproved<'a> {
    pub recipient_name: &'a str,
    pub admin_name: &'a str,
    pub company_name: Option<&'a str>,
    pub lead_name: &'a str,
    pub student_email: &'a str,
}

pub fn conversion_approved(to: &str, data: &ConversionApproved<'_>) -> CoreResult<EmailMessage> {
    render(
        to,
        format!("Lead converted: {}", data.lead_name),
        CONVERSION_APPROVED_HTML,
        CONVERSION_APPROVED_TEXT,
        data,
    )
}

#[derive(Serialize)]
pub struct StudentWelcome<'a> {
    pub student_name: &'a str,
    pub student_email: &'a str,
    pub company_name: Option<&'a str>,
}

pub fn student_welcome(to: &str, data: &StudentWelcome<'_>) -> CoreResult<EmailMessage> {
    render(
        to,
        "Welcome to CORE".to_string(),
        STUDENT_WELCOME_HTML,
        STUDENT_WELCOME_TEXT,
        data,
    )
}

#[derive(Serialize)]
pub struct MeetingInvitation<'a> {
    pub invitee_name: &'a str,
    pub requester_name: &'a str,
    pub subject: &'a str,
    pub description: Option<&'a str>,
    pub date: &'a str,
    pub start_time: &'a str,
    pub duration_minutes: u32,
    pub join_url: Option<&'a str>,
    pub location: Option<&'a str>,
}

pub fn meeting_invitation(to: &str, data: &MeetingInvitation<'_>) -> CoreResult<EmailMessage> {
    render(
        to,
        format!("Meeting request: {}", data.subject),
        MEETING_INVITATION_HTML,
        MEETING_INVITATION_TEXT,
        data,
    )
}

#[derive(Serialize)]
pub struct MeetingResponse<'a> {
    pub requester_name: &'a str,
    pub responder_name: &'a str,
    /// "accepted", "declined" or "cancelled".
    pub outcome: &'a str,
    pub subject: &'a str,
    pub date: &'a str,
    pub start_time: &'a str,
    pub message: Option<&'a str>,
}

pub fn meeting_response(to: &str, data: &MeetingResponse<'_>) -> CoreResult<EmailMessage> {
    render(
        to,
        format!("Meeting {}: {}", data.outcome, data.subject),
        MEETING_RESPONSE_HTML,
        MEETING_RESPONSE_TEXT,
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_email_carries_name_and_message() {
        let message = "The scan is blurry, please upload a clearer copy of pages 1-2.";
        let email = document_rejected(
            "asha@example.com",
            &DocumentRejected { student_name: "Asha", document_name: "Passport", message },
        )
        .unwrap();

        assert_eq!(email.to, "asha@example.com");
        assert!(email.subject.contains("Passport"));
        assert!(email.text.contains(message));
        assert!(email.html.contains(message));
    }

    #[test]
    fn test_html_escapes_but_text_keeps_input() {
        let email = document_rejected(
            "asha@example.com",
            &DocumentRejected { student_name: "Asha", document_name: "Marksheet", message: "Use <b>PDF</b> & sign" },
        )
        .unwrap();
        assert!(email.text.contains("Use <b>PDF</b> & sign"));
        assert!(!email.html.contains("<b>PDF</b>"));
    }

    #[test]
    fn test_invitation_lists_join_url_only_when_present() {
        let mut data = MeetingInvitation {
            invitee_name: "Ravi",
            requester_name: "Meera",
            subject: "Weekly sync",
            description: None,
            date: "2026-03-02",
            start_time: "10:00",
            duration_minutes: 30,
            join_url: Some("https://meet.example.com/j/1"),
            location: None,
        };
        let online = meeting_invitation("ravi@example.com", &data).unwrap();
        assert_eq!(online.subject, "Meeting request: Weekly sync");
        assert!(online.text.contains("Join: https://meet.example.com/j/1"));

        data.join_url = None;
        data.location = Some("Room 4");
        let offline = meeting_invitation("ravi@example.com", &data).unwrap();
        assert!(!offline.text.contains("Join:"));
        assert!(offline.text.contains("Location: Room 4"));
    }

    #[test]
    fn test_response_subject_names_outcome() {
        let email = meeting_response(
            "meera@example.com",
            &MeetingResponse {
                requester_name: "Meera",
                responder_name: "Ravi",
                outcome: "declined",
                subject: "Weekly sync",
                date: "2026-03-02",
                start_time: "10:00",
                message: Some("On leave"),
            },
        )
        .unwrap();
        assert_eq!(email.subject, "Meeting declined: Weekly sync");
        assert!(email.text.contains("Message: On leave"));
    }
}
