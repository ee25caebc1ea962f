//! Plain-text email templates for outbound notifications.

/// Automatic alert sent when the monitor detects a delivery exception.
pub struct ExceptionEmailTemplate {
    pub tracking_code: String,
    pub status_raw: String,
}

impl ExceptionEmailTemplate {
    pub fn subject(&self) -> String {
        format!("Delivery exception detected for {}", self.tracking_code)
    }

    pub fn render_text(&self) -> String {
        format!(
            r#"Hello,

We detected a problem with shipment {}.

Current carrier status: {}

We recommend contacting your customer before they notice the delay.

Best regards,
Parcel Guardian"#,
            self.tracking_code, self.status_raw
        )
    }
}

/// Manual alert triggered by staff from the admin panel.
pub struct ManualAlertEmailTemplate {
    pub tracking_code: String,
    pub status_raw: Option<String>,
}

impl ManualAlertEmailTemplate {
    pub fn subject(&self) -> String {
        format!("Attention: shipment {} requires action", self.tracking_code)
    }

    pub fn render_text(&self) -> String {
        format!(
            r#"Hello,

Shipment {} requires your attention.

Last known carrier status: {}

Best regards,
Parcel Guardian"#,
            self.tracking_code,
            self.status_raw.as_deref().unwrap_or("not reported yet")
        )
    }
}

/// Support request forwarded to the operations inbox.
pub struct SupportRequestEmailTemplate {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl SupportRequestEmailTemplate {
    pub fn subject(&self) -> String {
        "New support request - Parcel Guardian".to_string()
    }

    pub fn render_text(&self) -> String {
        format!(
            r#"Name: {}
Email: {}

Message:
{}"#,
            self.name, self.email, self.message
        )
    }
}
