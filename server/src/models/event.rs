use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

/// Source tag stored on events submitted through the public form.
pub const USER_SUBMISSION_SOURCE: &str = "segnalazione";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(EventStatus::Pending),
            "approved" => Ok(EventStatus::Approved),
            "rejected" => Ok(EventStatus::Rejected),
            other => Err(AppError::ValidationError(format!(
                "Unknown event status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    Scraped,
    Manual,
}

impl FromStr for SubmissionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scraped" => Ok(SubmissionType::Scraped),
            "manual" => Ok(SubmissionType::Manual),
            other => Err(AppError::ValidationError(format!(
                "Unknown submission type '{other}'"
            ))),
        }
    }
}

/// A concert listing as stored in `eventi_prog`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub venue: String,
    pub city: String,
    pub country: Option<String>,
    pub subgenre: String,
    pub description: Option<String>,
    pub artists: Vec<String>,
    pub time_of_day: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub source: String,
    pub submission_type: SubmissionType,
    pub status: EventStatus,
    pub user_id: Option<Uuid>,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape shared by user submissions and imports.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub venue: String,
    pub city: String,
    pub country: Option<String>,
    pub subgenre: String,
    pub description: Option<String>,
    pub artists: Vec<String>,
    pub time_of_day: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub source: String,
    pub submission_type: SubmissionType,
    pub status: EventStatus,
    pub user_id: Option<Uuid>,
    pub external_id: Option<String>,
}

/// Body of `POST /api/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitEventRequest {
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub venue: String,
    pub city: String,
    pub country: Option<String>,
    pub subgenre: String,
    pub description: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    pub time_of_day: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
}

impl SubmitEventRequest {
    /// Validates the form and builds the pending submission owned by `user_id`.
    pub fn into_new_event(self, user_id: Uuid) -> Result<NewEvent, AppError> {
        let title = required("title", &self.title)?;
        let venue = required("venue", &self.venue)?;
        let city = required("city", &self.city)?;
        let subgenre = required("subgenre", &self.subgenre)?;

        Ok(NewEvent {
            title,
            starts_at: self.starts_at,
            venue,
            city,
            country: optional(self.country),
            subgenre,
            description: optional(self.description),
            artists: clean_artists(self.artists),
            time_of_day: optional(self.time_of_day),
            link: optional(self.link),
            image_url: optional(self.image_url),
            source: USER_SUBMISSION_SOURCE.to_string(),
            submission_type: SubmissionType::Manual,
            status: EventStatus::Pending,
            user_id: Some(user_id),
            external_id: None,
        })
    }
}

/// Admin edit of an existing event. Moderation fields are not editable here.
#[derive(Debug, Clone, Deserialize)]
pub struct EventUpdate {
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub venue: String,
    pub city: String,
    pub country: Option<String>,
    pub subgenre: String,
    pub description: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    pub time_of_day: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
}

impl EventUpdate {
    pub fn validated(self) -> Result<Self, AppError> {
        Ok(Self {
            title: required("title", &self.title)?,
            starts_at: self.starts_at,
            venue: required("venue", &self.venue)?,
            city: required("city", &self.city)?,
            country: optional(self.country),
            subgenre: required("subgenre", &self.subgenre)?,
            description: optional(self.description),
            artists: clean_artists(self.artists),
            time_of_day: optional(self.time_of_day),
            link: optional(self.link),
            image_url: optional(self.image_url),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: EventStatus,
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AppError::ValidationError(format!("{field} is required")))
    } else {
        Ok(value.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trims artist names and drops blank entries.
pub fn clean_artists(artists: Vec<String>) -> Vec<String> {
    artists
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}
