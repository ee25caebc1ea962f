//! Rendering tests for the outbound email templates.

use parcel_guardian::email_templates::{
    ExceptionEmailTemplate, ManualAlertEmailTemplate, SupportRequestEmailTemplate,
};

#[test]
fn exception_email_names_the_shipment_and_status() {
    let template = ExceptionEmailTemplate {
        tracking_code: "BR123".to_string(),
        status_raw: "AGUARDANDO RETIRADA".to_string(),
    };

    assert!(template.subject().contains("BR123"));
    let body = template.render_text();
    assert!(body.contains("BR123"));
    assert!(body.contains("AGUARDANDO RETIRADA"));
}

#[test]
fn manual_alert_includes_the_last_known_status() {
    let template = ManualAlertEmailTemplate {
        tracking_code: "BR900".to_string(),
        status_raw: Some("EM TRANSITO".to_string()),
    };

    assert!(template.subject().contains("BR900"));
    assert!(template.render_text().contains("EM TRANSITO"));
}

#[test]
fn manual_alert_without_status_still_renders() {
    let template = ManualAlertEmailTemplate {
        tracking_code: "BR901".to_string(),
        status_raw: None,
    };

    let body = template.render_text();
    assert!(body.contains("BR901"));
    assert!(body.contains("not reported yet"));
}

#[test]
fn support_request_carries_the_sender_details() {
    let template = SupportRequestEmailTemplate {
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        message: "My parcel is stuck".to_string(),
    };

    assert_eq!(template.subject(), "New support request - Parcel Guardian");
    let body = template.render_text();
    assert!(body.contains("Alice"));
    assert!(body.contains("alice@example.com"));
    assert!(body.contains("My parcel is stuck"));
}
