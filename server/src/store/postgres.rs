use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::models::{Event, EventStatus, EventUpdate, NewEvent, Profile, Role, Session, User};
use crate::store::{AccountStore, EventStore, UpsertAction, Upserted};
use crate::utils::error::{AppError, AppResult};

const EVENT_COLUMNS: &str = "id, title, starts_at, venue, city, country, subgenre, description, \
     artists, time_of_day, link, image_url, source, submission_type, status, user_id, \
     external_id, created_at, updated_at";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_duplicate(
        tx: &mut Transaction<'_, Postgres>,
        event: &NewEvent,
    ) -> sqlx::Result<Option<Event>> {
        match &event.external_id {
            Some(external_id) => {
                sqlx::query_as::<_, Event>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM eventi_prog WHERE external_id = $1 FOR UPDATE"
                ))
                .bind(external_id)
                .fetch_optional(&mut **tx)
                .await
            }
            None => {
                sqlx::query_as::<_, Event>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM eventi_prog \
                     WHERE title = $1 AND starts_at = $2 AND venue = $3 \
                     LIMIT 1 FOR UPDATE"
                ))
                .bind(&event.title)
                .bind(event.starts_at)
                .bind(&event.venue)
                .fetch_optional(&mut **tx)
                .await
            }
        }
    }
}

fn map_unique_violation(e: sqlx::Error, message: &str) -> AppError {
    let is_unique = e
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);
    if is_unique {
        AppError::Conflict(message.to_string())
    } else {
        AppError::DatabaseError(e)
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn approved_events(&self) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM eventi_prog WHERE status = $1 ORDER BY starts_at ASC"
        ))
        .bind(EventStatus::Approved)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn all_events(&self) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM eventi_prog ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn events_by_user(&self, user_id: Uuid) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM eventi_prog WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM eventi_prog WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn insert_event(&self, event: NewEvent) -> AppResult<Event> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert(&mut tx, event).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn update_event(&self, id: Uuid, update: EventUpdate) -> AppResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "UPDATE eventi_prog SET title = $2, starts_at = $3, venue = $4, city = $5, \
             country = $6, subgenre = $7, description = $8, artists = $9, time_of_day = $10, \
             link = $11, image_url = $12, updated_at = NOW() \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(update.title)
        .bind(update.starts_at)
        .bind(update.venue)
        .bind(update.city)
        .bind(update.country)
        .bind(update.subgenre)
        .bind(update.description)
        .bind(update.artists)
        .bind(update.time_of_day)
        .bind(update.link)
        .bind(update.image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn set_status(&self, id: Uuid, status: EventStatus) -> AppResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "UPDATE eventi_prog SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM eventi_prog WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_event(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM eventi_prog WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_events(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM eventi_prog")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn upsert_event(&self, event: NewEvent) -> AppResult<Upserted> {
        let mut tx = self.pool.begin().await?;

        let upserted = match Self::find_duplicate(&mut tx, &event).await? {
            Some(existing) => {
                let updated = sqlx::query_as::<_, Event>(&format!(
                    "UPDATE eventi_prog SET title = $2, starts_at = $3, venue = $4, city = $5, \
                     country = $6, subgenre = $7, description = $8, artists = $9, \
                     time_of_day = $10, link = $11, image_url = $12, source = $13, \
                     submission_type = $14, external_id = COALESCE($15, external_id), \
                     updated_at = NOW() \
                     WHERE id = $1 RETURNING {EVENT_COLUMNS}"
                ))
                .bind(existing.id)
                .bind(event.title)
                .bind(event.starts_at)
                .bind(event.venue)
                .bind(event.city)
                .bind(event.country)
                .bind(event.subgenre)
                .bind(event.description)
                .bind(event.artists)
                .bind(event.time_of_day)
                .bind(event.link)
                .bind(event.image_url)
                .bind(event.source)
                .bind(event.submission_type)
                .bind(event.external_id)
                .fetch_one(&mut *tx)
                .await?;
                Upserted {
                    action: UpsertAction::Updated,
                    event: updated,
                }
            }
            None => Upserted {
                action: UpsertAction::Inserted,
                event: insert(&mut tx, event).await?,
            },
        };

        tx.commit().await?;
        Ok(upserted)
    }

    async fn pending_count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM eventi_prog WHERE status = $1")
            .bind(EventStatus::Pending)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn insert(tx: &mut Transaction<'_, Postgres>, event: NewEvent) -> AppResult<Event> {
    let inserted = sqlx::query_as::<_, Event>(&format!(
        "INSERT INTO eventi_prog (id, title, starts_at, venue, city, country, subgenre, \
         description, artists, time_of_day, link, image_url, source, submission_type, status, \
         user_id, external_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
         RETURNING {EVENT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(event.title)
    .bind(event.starts_at)
    .bind(event.venue)
    .bind(event.city)
    .bind(event.country)
    .bind(event.subgenre)
    .bind(event.description)
    .bind(event.artists)
    .bind(event.time_of_day)
    .bind(event.link)
    .bind(event.image_url)
    .bind(event.source)
    .bind(event.submission_type)
    .bind(event.status)
    .bind(event.user_id)
    .bind(event.external_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_unique_violation(e, "An event with this external id already exists"))?;
    Ok(inserted)
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "A user with this email already exists"))
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, email, role, created_at, updated_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn create_profile(&self, id: Uuid, email: &str, role: Role) -> AppResult<Profile> {
        sqlx::query(
            "INSERT INTO profiles (id, email, role) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(email)
        .bind(role)
        .execute(&self.pool)
        .await?;

        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, email, role, created_at, updated_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn profiles(&self) -> AppResult<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            "SELECT id, email, role, created_at, updated_at FROM profiles ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(profiles)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET role = $2, updated_at = $3 WHERE id = $1 \
             RETURNING id, email, role, created_at, updated_at",
        )
        .bind(id)
        .bind(role)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn create_session(&self, session: &Session) -> AppResult<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.token)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn session(&self, token: &str) -> AppResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT token, user_id, expires_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_other_sessions(&self, user_id: Uuid, keep_token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token <> $2")
            .bind(user_id)
            .bind(keep_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
