//! Persistence for events and accounts.
//!
//! Handlers only see the [`Store`] trait object held in [`crate::AppState`];
//! [`postgres::PgStore`] is the production implementation.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Event, EventStatus, EventUpdate, NewEvent, Profile, Role, Session, User};
use crate::utils::error::AppResult;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Inserted,
    Updated,
}

#[derive(Debug, Clone)]
pub struct Upserted {
    pub action: UpsertAction,
    pub event: Event,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Approved events ordered by start time.
    async fn approved_events(&self) -> AppResult<Vec<Event>>;

    /// Every event, newest submission first.
    async fn all_events(&self) -> AppResult<Vec<Event>>;

    /// Events submitted by `user_id`, newest first.
    async fn events_by_user(&self, user_id: Uuid) -> AppResult<Vec<Event>>;

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>>;

    async fn insert_event(&self, event: NewEvent) -> AppResult<Event>;

    async fn update_event(&self, id: Uuid, update: EventUpdate) -> AppResult<Option<Event>>;

    async fn set_status(&self, id: Uuid, status: EventStatus) -> AppResult<Option<Event>>;

    async fn delete_event(&self, id: Uuid) -> AppResult<bool>;

    /// Deletes `id` only if it was submitted by `user_id`.
    async fn delete_user_event(&self, id: Uuid, user_id: Uuid) -> AppResult<bool>;

    async fn delete_all_events(&self) -> AppResult<u64>;

    /// Inserts `event` or refreshes the stored copy of it.
    ///
    /// An event matches an existing row on `external_id` when it has one,
    /// otherwise on (title, start time, venue). Updates keep the stored
    /// moderation status and submitter, and the stored external id when the
    /// incoming entry has none.
    async fn upsert_event(&self, event: NewEvent) -> AppResult<Upserted>;

    async fn pending_count(&self) -> AppResult<i64>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_user(&self, email: &str, password_hash: &str) -> AppResult<User>;

    /// Case-insensitive lookup.
    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()>;

    /// Removes the user with their profile and sessions. Their events are kept
    /// without a submitter.
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;

    async fn profile(&self, id: Uuid) -> AppResult<Option<Profile>>;

    /// Creates the profile unless one exists; returns the stored profile.
    async fn create_profile(&self, id: Uuid, email: &str, role: Role) -> AppResult<Profile>;

    async fn profiles(&self) -> AppResult<Vec<Profile>>;

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Option<Profile>>;

    async fn create_session(&self, session: &Session) -> AppResult<()>;

    async fn session(&self, token: &str) -> AppResult<Option<Session>>;

    async fn delete_session(&self, token: &str) -> AppResult<()>;

    async fn delete_other_sessions(&self, user_id: Uuid, keep_token: &str) -> AppResult<()>;
}

pub trait Store: EventStore + AccountStore {}

impl<T: EventStore + AccountStore> Store for T {}
