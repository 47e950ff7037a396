//! Listing filters, facets and search suggestions over a loaded event list.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{Event, EventStatus};

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;
const MIN_SUGGESTION_QUERY: usize = 2;
const MAX_SUGGESTIONS: usize = 8;

/// Public listing filter. Empty values disable the corresponding predicate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub q: Option<String>,
    pub city: Option<String>,
    pub subgenre: Option<String>,
    /// Comma-separated.
    pub countries: Option<String>,
    /// Comma-separated.
    pub excluded_subgenres: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date")]
    pub to: Option<NaiveDate>,
}

/// `YYYY-MM-DD`, with an empty value meaning no bound.
fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn split_list(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Case-insensitive substring match on every searchable field.
pub fn matches_query(event: &Event, needle: &str) -> bool {
    contains(&event.title, needle)
        || contains(&event.venue, needle)
        || contains(&event.city, needle)
        || contains(&event.subgenre, needle)
        || event.country.as_deref().is_some_and(|c| contains(c, needle))
        || event
            .description
            .as_deref()
            .is_some_and(|d| contains(d, needle))
        || event.artists.iter().any(|a| contains(a, needle))
}

impl EventFilter {
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        let query = non_empty(&self.q);
        let city = non_empty(&self.city);
        let subgenre = non_empty(&self.subgenre);
        let countries = split_list(&self.countries);
        let excluded = split_list(&self.excluded_subgenres);

        events
            .into_iter()
            .filter(|event| {
                if let Some(query) = &query {
                    if !matches_query(event, query) {
                        return false;
                    }
                }
                if let Some(city) = &city {
                    if event.city.to_lowercase() != *city {
                        return false;
                    }
                }
                if let Some(subgenre) = &subgenre {
                    if event.subgenre.to_lowercase() != *subgenre {
                        return false;
                    }
                }
                if !countries.is_empty() {
                    let country = event.country.as_deref().unwrap_or_default().to_lowercase();
                    if !countries.contains(&country) {
                        return false;
                    }
                }
                if excluded.contains(&event.subgenre.to_lowercase()) {
                    return false;
                }
                let day = event.starts_at.date_naive();
                if self.from.is_some_and(|from| day < from) {
                    return false;
                }
                if self.to.is_some_and(|to| day > to) {
                    return false;
                }
                true
            })
            .collect()
    }
}

/// Moderation list filter: substring on title/venue/city plus a status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminFilter {
    pub q: Option<String>,
    /// `all` or a status name.
    pub status: Option<String>,
}

impl AdminFilter {
    pub fn apply(&self, events: Vec<Event>, status: Option<EventStatus>) -> Vec<Event> {
        let query = non_empty(&self.q);
        events
            .into_iter()
            .filter(|event| {
                query.as_ref().map_or(true, |q| {
                    contains(&event.title, q) || contains(&event.venue, q) || contains(&event.city, q)
                })
            })
            .filter(|event| status.map_or(true, |s| event.status == s))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl PageQuery {
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = self.offset.unwrap_or(0);
        let total = items.len();
        Page {
            items: items.into_iter().skip(offset).take(limit).collect(),
            pagination: Pagination {
                limit,
                offset,
                total,
            },
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Facets {
    pub cities: Vec<String>,
    pub countries: Vec<String>,
    pub subgenres: Vec<String>,
}

fn sorted_unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct cities, countries and subgenres, sorted.
pub fn facets(events: &[Event]) -> Facets {
    Facets {
        cities: sorted_unique(events.iter().map(|e| e.city.as_str())),
        countries: sorted_unique(events.iter().filter_map(|e| e.country.as_deref())),
        subgenres: sorted_unique(events.iter().map(|e| e.subgenre.as_str())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Event,
    Venue,
    City,
    Artist,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub value: String,
    pub label: String,
    pub event_id: Uuid,
}

/// Typeahead suggestions for `query`, best matches first.
pub fn suggestions(events: &[Event], query: &str) -> Vec<Suggestion> {
    let query = query.trim().to_lowercase();
    if query.chars().count() < MIN_SUGGESTION_QUERY {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut push = |kind: SuggestionKind, value: &str, label: String, event: &Event| {
        if contains(value, &query) && seen.insert((kind, value.to_lowercase())) {
            found.push(Suggestion {
                kind,
                value: value.to_string(),
                label,
                event_id: event.id,
            });
        }
    };

    for event in events {
        push(SuggestionKind::Event, &event.title, event.title.clone(), event);
        push(
            SuggestionKind::Venue,
            &event.venue,
            format!("{} • {}", event.venue, event.city),
            event,
        );
        push(SuggestionKind::City, &event.city, event.city.clone(), event);
        for artist in &event.artists {
            push(
                SuggestionKind::Artist,
                artist,
                format!("{} • {}", artist, event.title),
                event,
            );
        }
    }

    found.sort_by(|a, b| rank(a, b, &query));
    found.truncate(MAX_SUGGESTIONS);
    found
}

fn rank(a: &Suggestion, b: &Suggestion, query: &str) -> Ordering {
    let a_value = a.value.to_lowercase();
    let b_value = b.value.to_lowercase();
    (a_value != query)
        .cmp(&(b_value != query))
        .then_with(|| (!a_value.starts_with(query)).cmp(&!b_value.starts_with(query)))
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a_value.cmp(&b_value))
}
