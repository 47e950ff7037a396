//! Transactional email through a Resend-compatible HTTP API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Whether an API key is available. Optional emails are skipped otherwise.
    fn is_configured(&self) -> bool;

    /// Sends `email` and returns the provider's message id.
    async fn send(&self, email: Email) -> AppResult<String>;
}

pub struct ResendMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

impl ResendMailer {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.resend_api_url.clone(),
            api_key: config.resend_api_key.clone(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, email: Email) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::InternalServerError("Email service not configured".into()))?;

        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(api_key)
            .json(&email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalServiceError(format!(
                "Resend API error {status}: {body}"
            )));
        }

        let sent: SendResponse = response.json().await?;
        tracing::info!(id = %sent.id, subject = %email.subject, "Email sent");
        Ok(sent.id)
    }
}

/// Tells the moderators that `user_email` submitted an event.
pub fn new_submission_email(config: &Config, user_email: &str) -> Email {
    let admin_url = format!("{}/adminarea", config.site_url);
    let html = format!(
        "<h2>New Event Submitted</h2>\
         <p>A new progressive music event is waiting for review.</p>\
         <p>Submitted by: <strong>{}</strong></p>\
         <p><a href=\"{}\">Go to Admin Panel</a></p>\
         <p>The event stays pending and hidden until approved.</p>",
        escape_html(user_email),
        escape_html(&admin_url),
    );
    Email {
        from: config.notify_from.clone(),
        to: vec![config.notify_recipient.clone()],
        subject: "New Event on ProgDealer".to_string(),
        html,
    }
}

/// Confirms to a former user that their account is gone.
pub fn goodbye_email(config: &Config, user_email: &str) -> Email {
    let html = format!(
        "<h2>Goodbye from ProgDealer</h2>\
         <p>Your account has been permanently deleted from our system.</p>\
         <p>You are always welcome back: <a href=\"{}\">{}</a></p>",
        escape_html(&config.site_url),
        escape_html(&config.site_url),
    );
    Email {
        from: config.goodbye_from.clone(),
        to: vec![user_email.to_string()],
        subject: "Your ProgDealer account has been deleted".to_string(),
        html,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
