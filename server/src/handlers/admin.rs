use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::filter::AdminFilter;
use crate::handlers::events::{status_filter, StatusCounts};
use crate::import::normalize_feed;
use crate::models::event::StatusUpdate;
use crate::models::user::RoleUpdate;
use crate::models::{Event, EventUpdate, Role};
use crate::store::UpsertAction;
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::{Json, Path, Query};
use crate::utils::response::{empty_success, success};
use crate::AppState;

fn event_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Event with id '{id}' was not found"))
}

#[derive(Serialize)]
struct ModerationList {
    events: Vec<Event>,
    pending_count: i64,
    counts: StatusCounts,
    filtered: usize,
}

pub async fn list_all_events(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<AdminFilter>,
) -> AppResult<Response> {
    let status = status_filter(filter.status.as_deref())?;
    let all = state.store.all_events().await?;
    let counts = StatusCounts::of(&all);
    let pending_count = state.store.pending_count().await?;
    let events = filter.apply(all, status);

    Ok(success(
        ModerationList {
            filtered: events.len(),
            events,
            pending_count,
            counts,
        },
        "Events retrieved",
    ))
}

#[derive(Serialize)]
struct StatusChanged {
    event: Event,
    pending_count: i64,
}

pub async fn set_event_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Response> {
    let event = state
        .store
        .set_status(id, update.status)
        .await?
        .ok_or_else(|| event_not_found(id))?;
    let pending_count = state.store.pending_count().await?;

    tracing::info!(event_id = %id, status = %event.status, admin_id = %admin.id(), "Event status changed");
    Ok(success(
        StatusChanged {
            event,
            pending_count,
        },
        "Event status updated",
    ))
}

pub async fn update_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(update): Json<EventUpdate>,
) -> AppResult<Response> {
    let event = state
        .store
        .update_event(id, update.validated()?)
        .await?
        .ok_or_else(|| event_not_found(id))?;

    tracing::info!(event_id = %id, admin_id = %admin.id(), "Event edited");
    Ok(success(event, "Event updated"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    if !state.store.delete_event(id).await? {
        return Err(event_not_found(id));
    }
    tracing::info!(event_id = %id, admin_id = %admin.id(), "Event deleted");
    Ok(empty_success("Event deleted"))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Serialize)]
struct Deleted {
    deleted: u64,
}

pub async fn delete_all_events(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<ConfirmQuery>,
) -> AppResult<Response> {
    if !query.confirm {
        return Err(AppError::ValidationError(
            "Deleting every event requires confirm=true".to_string(),
        ));
    }
    let deleted = state.store.delete_all_events().await?;
    tracing::warn!(deleted, admin_id = %admin.id(), "All events deleted");
    Ok(success(Deleted { deleted }, "All events deleted"))
}

/// Outcome of one feed entry.
#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub success: bool,
    /// Title of the entry, or its position when it has none.
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<UpsertAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

#[derive(Serialize)]
struct ImportReport {
    results: Vec<ImportResult>,
    summary: ImportSummary,
}

pub async fn import_events(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(feed): Json<Value>,
) -> AppResult<Response> {
    let entries = normalize_feed(&feed);
    let mut summary = ImportSummary {
        total: entries.len(),
        ..Default::default()
    };
    let mut results = Vec::with_capacity(entries.len());

    for entry in entries {
        let outcome = match entry.event {
            Ok(event) => state.store.upsert_event(event).await.map_err(|e| {
                tracing::error!(event = %entry.label, "Import upsert failed: {e}");
                e.to_string()
            }),
            Err(reason) => Err(reason),
        };

        let result = match outcome {
            Ok(upserted) => {
                match upserted.action {
                    UpsertAction::Inserted => summary.inserted += 1,
                    UpsertAction::Updated => summary.updated += 1,
                }
                ImportResult {
                    success: true,
                    event: entry.label,
                    id: Some(upserted.event.id),
                    action: Some(upserted.action),
                    error: None,
                }
            }
            Err(error) => {
                summary.failed += 1;
                ImportResult {
                    success: false,
                    event: entry.label,
                    id: None,
                    action: None,
                    error: Some(error),
                }
            }
        };
        results.push(result);
    }

    tracing::info!(
        total = summary.total,
        inserted = summary.inserted,
        updated = summary.updated,
        failed = summary.failed,
        admin_id = %admin.id(),
        "Event import finished"
    );
    Ok(success(ImportReport { results, summary }, "Import completed"))
}

/// Every event as a downloadable JSON array.
pub async fn export_events(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Response> {
    let events = state.store.all_events().await?;
    tracing::info!(count = events.len(), "Events exported");
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"eventi_prog.json\"",
        )],
        Json(events),
    )
        .into_response())
}

pub async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Response> {
    let profiles = state.store.profiles().await?;
    Ok(success(profiles, "Users retrieved"))
}

pub async fn set_user_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(update): Json<RoleUpdate>,
) -> AppResult<Response> {
    if id == admin.id() && update.role != Role::Admin {
        return Err(AppError::ValidationError(
            "You cannot remove your own admin role".to_string(),
        ));
    }

    let profile = state
        .store
        .set_role(id, update.role)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id '{id}' was not found")))?;

    tracing::info!(user_id = %id, role = ?profile.role, admin_id = %admin.id(), "User role changed");
    Ok(success(profile, "User role updated"))
}
