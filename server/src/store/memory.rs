//! In-process store used by the router tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::{Event, EventStatus, EventUpdate, NewEvent, Profile, Role, Session, User};
use crate::store::{AccountStore, EventStore, UpsertAction, Upserted};
use crate::utils::error::{AppError, AppResult};

#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<Vec<Event>>,
    users: Mutex<HashMap<Uuid, User>>,
    profiles: Mutex<HashMap<Uuid, Profile>>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

fn materialize(event: NewEvent) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        title: event.title,
        starts_at: event.starts_at,
        venue: event.venue,
        city: event.city,
        country: event.country,
        subgenre: event.subgenre,
        description: event.description,
        artists: event.artists,
        time_of_day: event.time_of_day,
        link: event.link,
        image_url: event.image_url,
        source: event.source,
        submission_type: event.submission_type,
        status: event.status,
        user_id: event.user_id,
        external_id: event.external_id,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn approved_events(&self) -> AppResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .events
            .lock()
            .iter()
            .filter(|e| e.status == EventStatus::Approved)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.starts_at);
        Ok(events)
    }

    async fn all_events(&self) -> AppResult<Vec<Event>> {
        let mut events = self.events.lock().clone();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn events_by_user(&self, user_id: Uuid) -> AppResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .events
            .lock()
            .iter()
            .filter(|e| e.user_id == Some(user_id))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.events.lock().iter().find(|e| e.id == id).cloned())
    }

    async fn insert_event(&self, event: NewEvent) -> AppResult<Event> {
        let event = materialize(event);
        self.events.lock().push(event.clone());
        Ok(event)
    }

    async fn update_event(&self, id: Uuid, update: EventUpdate) -> AppResult<Option<Event>> {
        let mut events = self.events.lock();
        let Some(event) = events.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        event.title = update.title;
        event.starts_at = update.starts_at;
        event.venue = update.venue;
        event.city = update.city;
        event.country = update.country;
        event.subgenre = update.subgenre;
        event.description = update.description;
        event.artists = update.artists;
        event.time_of_day = update.time_of_day;
        event.link = update.link;
        event.image_url = update.image_url;
        event.updated_at = Utc::now();
        Ok(Some(event.clone()))
    }

    async fn set_status(&self, id: Uuid, status: EventStatus) -> AppResult<Option<Event>> {
        let mut events = self.events.lock();
        let Some(event) = events.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        event.status = status;
        event.updated_at = Utc::now();
        Ok(Some(event.clone()))
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<bool> {
        let mut events = self.events.lock();
        let before = events.len();
        events.retain(|e| e.id != id);
        Ok(events.len() != before)
    }

    async fn delete_user_event(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut events = self.events.lock();
        let before = events.len();
        events.retain(|e| !(e.id == id && e.user_id == Some(user_id)));
        Ok(events.len() != before)
    }

    async fn delete_all_events(&self) -> AppResult<u64> {
        let mut events = self.events.lock();
        let count = events.len() as u64;
        events.clear();
        Ok(count)
    }

    async fn upsert_event(&self, event: NewEvent) -> AppResult<Upserted> {
        let mut events = self.events.lock();
        let existing = events.iter_mut().find(|e| match &event.external_id {
            Some(external_id) => e.external_id.as_ref() == Some(external_id),
            None => {
                e.title == event.title && e.starts_at == event.starts_at && e.venue == event.venue
            }
        });

        match existing {
            Some(stored) => {
                stored.title = event.title;
                stored.starts_at = event.starts_at;
                stored.venue = event.venue;
                stored.city = event.city;
                stored.country = event.country;
                stored.subgenre = event.subgenre;
                stored.description = event.description;
                stored.artists = event.artists;
                stored.time_of_day = event.time_of_day;
                stored.link = event.link;
                stored.image_url = event.image_url;
                stored.source = event.source;
                stored.submission_type = event.submission_type;
                if event.external_id.is_some() {
                    stored.external_id = event.external_id;
                }
                stored.updated_at = Utc::now();
                Ok(Upserted {
                    action: UpsertAction::Updated,
                    event: stored.clone(),
                })
            }
            None => {
                let event = materialize(event);
                events.push(event.clone());
                Ok(Upserted {
                    action: UpsertAction::Inserted,
                    event,
                })
            }
        }
    }

    async fn pending_count(&self) -> AppResult<i64> {
        Ok(self
            .events
            .lock()
            .iter()
            .filter(|e| e.status == EventStatus::Pending)
            .count() as i64)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AppResult<User> {
        let mut users = self.users.lock();
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(AppError::Conflict(
                "A user with this email already exists".into(),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().get(&id).cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        if let Some(user) = self.users.lock().get_mut(&id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let removed = self.users.lock().remove(&id).is_some();
        if removed {
            self.profiles.lock().remove(&id);
            self.sessions.lock().retain(|_, s| s.user_id != id);
            for event in self.events.lock().iter_mut() {
                if event.user_id == Some(id) {
                    event.user_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.profiles.lock().get(&id).cloned())
    }

    async fn create_profile(&self, id: Uuid, email: &str, role: Role) -> AppResult<Profile> {
        let now = Utc::now();
        let profile = self
            .profiles
            .lock()
            .entry(id)
            .or_insert_with(|| Profile {
                id,
                email: email.to_string(),
                role,
                created_at: now,
                updated_at: now,
            })
            .clone();
        Ok(profile)
    }

    async fn profiles(&self) -> AppResult<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self.profiles.lock().values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Option<Profile>> {
        let mut profiles = self.profiles.lock();
        let Some(profile) = profiles.get_mut(&id) else {
            return Ok(None);
        };
        profile.role = role;
        profile.updated_at = Utc::now();
        Ok(Some(profile.clone()))
    }

    async fn create_session(&self, session: &Session) -> AppResult<()> {
        self.sessions
            .lock()
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn session(&self, token: &str) -> AppResult<Option<Session>> {
        Ok(self.sessions.lock().get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> AppResult<()> {
        self.sessions.lock().remove(token);
        Ok(())
    }

    async fn delete_other_sessions(&self, user_id: Uuid, keep_token: &str) -> AppResult<()> {
        self.sessions
            .lock()
            .retain(|token, s| s.user_id != user_id || token == keep_token);
        Ok(())
    }
}
