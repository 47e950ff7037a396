use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::filter::{self, EventFilter, PageQuery};
use crate::models::event::SubmitEventRequest;
use crate::models::{Event, EventStatus};
use crate::notify::new_submission_email;
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::{Json, Path, Query};
use crate::utils::response::{created, empty_success, paginated, success};
use crate::AppState;

pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
    Query(page): Query<PageQuery>,
) -> AppResult<Response> {
    let events = filter.apply(state.store.approved_events().await?);
    Ok(paginated(page.paginate(events), "Events retrieved"))
}

pub async fn event_facets(State(state): State<AppState>) -> AppResult<Response> {
    let events = state.store.approved_events().await?;
    Ok(success(filter::facets(&events), "Facets retrieved"))
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn event_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> AppResult<Response> {
    let events = state.store.approved_events().await?;
    Ok(success(
        filter::suggestions(&events, &query.q),
        "Suggestions retrieved",
    ))
}

pub async fn get_event(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let event = state
        .store
        .get_event(id)
        .await?
        .filter(|e| e.status == EventStatus::Approved)
        .ok_or_else(|| AppError::NotFound(format!("Event with id '{id}' was not found")))?;
    Ok(success(event, "Event retrieved"))
}

pub async fn submit_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SubmitEventRequest>,
) -> AppResult<Response> {
    let event = state
        .store
        .insert_event(request.into_new_event(user.id())?)
        .await?;
    tracing::info!(event_id = %event.id, user_id = %user.id(), "Event submitted for review");

    if state.mailer.is_configured() {
        let email = new_submission_email(&state.config, &user.user.email);
        if let Err(e) = state.mailer.send(email).await {
            tracing::warn!(event_id = %event.id, "Admin notification failed: {e}");
        }
    } else {
        tracing::debug!("Email not configured, skipping admin notification");
    }

    Ok(created(event, "Event submitted and awaiting approval"))
}

#[derive(Debug, Deserialize)]
pub struct MyEventsQuery {
    /// `all` or a status name.
    pub status: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn of(events: &[Event]) -> Self {
        let count = |status: EventStatus| events.iter().filter(|e| e.status == status).count();
        Self {
            total: events.len(),
            pending: count(EventStatus::Pending),
            approved: count(EventStatus::Approved),
            rejected: count(EventStatus::Rejected),
        }
    }
}

#[derive(Serialize)]
struct MyEvents {
    events: Vec<Event>,
    counts: StatusCounts,
}

/// Parses a `status` query value where `all` (or nothing) means no filter.
pub fn status_filter(raw: Option<&str>) -> AppResult<Option<EventStatus>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

pub async fn my_events(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<MyEventsQuery>,
) -> AppResult<Response> {
    let status = status_filter(query.status.as_deref())?;
    let events = state.store.events_by_user(user.id()).await?;
    let counts = StatusCounts::of(&events);
    let events = events
        .into_iter()
        .filter(|e| status.map_or(true, |s| e.status == s))
        .collect();

    Ok(success(MyEvents { events, counts }, "Your events retrieved"))
}

pub async fn delete_my_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    if !state.store.delete_user_event(id, user.id()).await? {
        return Err(AppError::NotFound(format!(
            "Event with id '{id}' was not found"
        )));
    }
    tracing::info!(event_id = %id, user_id = %user.id(), "User deleted own event");
    Ok(empty_success("Event deleted"))
}
