//! Normalisation of third-party JSON event feeds.
//!
//! Feeds arrive in several shapes (schema.org `MusicEvent`, scraper output,
//! the legacy Italian column names). Every entry is mapped onto a
//! [`NewEvent`] ready for [`crate::store::EventStore::upsert_event`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::models::{EventStatus, NewEvent, SubmissionType};

/// Known prog subgenres, as offered by the listing filters.
pub const PROG_SUBGENRES: [&str; 9] = [
    "Symphonic",
    "Canterbury",
    "Zeuhl",
    "Avant-Prog",
    "Krautrock",
    "Italian Prog",
    "Neo-Prog",
    "Prog Metal",
    "Post Prog",
];

pub const DEFAULT_SUBGENRE: &str = "Progressive";
pub const DEFAULT_SOURCE: &str = "import";

/// Image the concert aggregator serves when it has none.
pub const PLACEHOLDER_IMAGE: &str = "https://concertful.com/public/foto/large/default.jpg";

/// Keywords checked in order; the first hit wins.
const SUBGENRE_KEYWORDS: [(&str, &[&str]); 9] = [
    ("Zeuhl", &["zeuhl", "magma", "kobaia", "kobaian"]),
    (
        "Canterbury",
        &["canterbury", "caravan", "soft machine", "hatfield", "national health", "gong"],
    ),
    (
        "Krautrock",
        &["krautrock", "kraut", "tangerine dream", "amon duul", "amon düül", "faust"],
    ),
    (
        "Avant-Prog",
        &["avant prog", "avant-prog", "rock in opposition", "henry cow", "univers zero", "art zoyd"],
    ),
    (
        "Prog Metal",
        &["prog metal", "progressive metal", "dream theater", "haken", "opeth", "leprous", "symphony x"],
    ),
    (
        "Post Prog",
        &["post prog", "post-prog", "porcupine tree", "steven wilson", "anathema", "riverside"],
    ),
    (
        "Neo-Prog",
        &["neo prog", "neo-prog", "marillion", "pendragon", "iq", "arena"],
    ),
    (
        "Italian Prog",
        &["italian prog", "prog italiano", "rock progressivo italiano", "pfm", "premiata forneria", "banco del mutuo", "le orme", "goblin"],
    ),
    (
        "Symphonic",
        &["symphonic", "sinfonico", "genesis", "camel", "renaissance", "emerson lake"],
    ),
];

/// One input entry after normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    /// Title when known, otherwise the entry's position.
    pub label: String,
    pub event: Result<NewEvent, String>,
}

/// Normalises an array of entries or a single object.
pub fn normalize_feed(feed: &Value) -> Vec<FeedEntry> {
    let entries: Vec<&Value> = match feed {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let label = entry
                .as_object()
                .and_then(|obj| text(obj, &["nome_evento", "name", "title"]))
                .unwrap_or_else(|| format!("entry {}", index + 1));
            FeedEntry {
                label,
                event: normalize_entry(entry),
            }
        })
        .collect()
}

pub fn normalize_entry(entry: &Value) -> Result<NewEvent, String> {
    let obj = entry
        .as_object()
        .ok_or_else(|| "Entry is not a JSON object".to_string())?;

    let title = text(obj, &["nome_evento", "name", "title"])
        .ok_or_else(|| "Missing event title".to_string())?;

    let raw_date = text(obj, &["data_ora", "startDate", "date", "datetime"])
        .ok_or_else(|| "Missing event date".to_string())?;
    let starts_at =
        parse_feed_date(&raw_date).ok_or_else(|| format!("Invalid event date '{raw_date}'"))?;

    let (venue, city, location_country) = location(obj);
    let country = text(obj, &["country", "paese"]).or(location_country);

    let description = text(obj, &["descrizione", "description"]);
    let artists = artists(obj);
    let subgenre = text(obj, &["sottogenere", "subgenre"]).unwrap_or_else(|| {
        classify_subgenre(&title, description.as_deref(), &artists).to_string()
    });

    let submission_type = match text(obj, &["tipo_inserimento"]) {
        Some(kind) => kind.parse::<SubmissionType>().map_err(|e| e.to_string())?,
        None => SubmissionType::Scraped,
    };

    Ok(NewEvent {
        title,
        starts_at,
        venue,
        city,
        country,
        subgenre,
        description,
        artists,
        time_of_day: text(obj, &["orario", "time"]),
        link: text(obj, &["link", "url", "link_biglietti"]),
        image_url: text(obj, &["immagine", "image", "copertina"])
            .filter(|url| url != PLACEHOLDER_IMAGE),
        source: text(obj, &["fonte", "source"]).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        submission_type,
        status: EventStatus::Approved,
        user_id: None,
        external_id: text(obj, &["event_id", "id"]),
    })
}

/// Parses RFC 3339 or a naive date/time, the latter taken as UTC.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Guesses a subgenre from free text, falling back to [`DEFAULT_SUBGENRE`].
pub fn classify_subgenre(title: &str, description: Option<&str>, artists: &[String]) -> &'static str {
    let mut haystack = String::from(title);
    if let Some(description) = description {
        haystack.push(' ');
        haystack.push_str(description);
    }
    for artist in artists {
        haystack.push(' ');
        haystack.push_str(artist);
    }
    let haystack = words(&haystack);

    SUBGENRE_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| haystack.contains(&words(keyword)))
        })
        .map(|(subgenre, _)| *subgenre)
        .unwrap_or(DEFAULT_SUBGENRE)
}

/// Lower-cases `s` and pads each word with spaces so keywords match whole words.
fn words(s: &str) -> String {
    let joined = s
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!(" {joined} ")
}

/// First non-empty string (or number) among `keys`.
fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn artists(obj: &Map<String, Value>) -> Vec<String> {
    let raw = ["artisti", "artists"].iter().find_map(|key| obj.get(*key));
    let names: Vec<String> = match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(list)) => list.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    crate::models::event::clean_artists(names)
}

/// Venue, city and country from either a `location` value or flat fields.
fn location(obj: &Map<String, Value>) -> (String, String, Option<String>) {
    let flat_city = || text(obj, &["città", "city", "luogo"]).unwrap_or_default();

    match obj.get("location") {
        Some(Value::Object(location)) => {
            let venue = text(location, &["name"]).unwrap_or_default();
            let (city, country) = match location.get("address") {
                Some(Value::Object(address)) => (
                    text(address, &["addressLocality", "city"]),
                    address_country(address),
                ),
                _ => (text(location, &["city"]), None),
            };
            (venue, city.unwrap_or_else(flat_city), country)
        }
        Some(Value::String(venue)) if !venue.trim().is_empty() => {
            (venue.trim().to_string(), flat_city(), None)
        }
        _ => (
            text(obj, &["venue"]).unwrap_or_default(),
            flat_city(),
            None,
        ),
    }
}

/// `addressCountry` is either a plain name or a schema.org `Country` object.
fn address_country(address: &Map<String, Value>) -> Option<String> {
    match address.get("addressCountry")? {
        Value::Object(country) => text(country, &["name"]),
        _ => text(address, &["addressCountry"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_schema_org_entry() {
        let entry = json!({
            "name": " Haken ",
            "startDate": "2025-04-12T20:30:00+02:00",
            "location": {
                "name": "Alcatraz",
                "address": { "addressLocality": "Milano", "addressCountry": "Italy" }
            },
            "image": PLACEHOLDER_IMAGE,
            "url": "https://tickets.example/haken",
            "id": 4812
        });

        let event = normalize_entry(&entry).unwrap();
        assert_eq!(event.title, "Haken");
        assert_eq!(event.starts_at, Utc.with_ymd_and_hms(2025, 4, 12, 18, 30, 0).unwrap());
        assert_eq!(event.venue, "Alcatraz");
        assert_eq!(event.city, "Milano");
        assert_eq!(event.country.as_deref(), Some("Italy"));
        assert_eq!(event.subgenre, "Prog Metal");
        assert_eq!(event.image_url, None);
        assert_eq!(event.link.as_deref(), Some("https://tickets.example/haken"));
        assert_eq!(event.external_id.as_deref(), Some("4812"));
        assert_eq!(event.source, DEFAULT_SOURCE);
        assert_eq!(event.submission_type, SubmissionType::Scraped);
        assert_eq!(event.status, EventStatus::Approved);
    }

    #[test]
    fn test_legacy_entry() {
        let entry = json!({
            "nome_evento": "Serata Canterbury",
            "data_ora": "2025-05-01 21:00",
            "venue": "Circolo Magnolia",
            "città": "Segrate",
            "sottogenere": "Canterbury",
            "artisti": "Caravan, , Hatfield",
            "fonte": "concertful",
            "tipo_inserimento": "manual"
        });

        let event = normalize_entry(&entry).unwrap();
        assert_eq!(event.venue, "Circolo Magnolia");
        assert_eq!(event.city, "Segrate");
        assert_eq!(event.artists, vec!["Caravan".to_string(), "Hatfield".to_string()]);
        assert_eq!(event.source, "concertful");
        assert_eq!(event.submission_type, SubmissionType::Manual);
        assert_eq!(event.starts_at, Utc.with_ymd_and_hms(2025, 5, 1, 21, 0, 0).unwrap());
    }

    #[test]
    fn test_string_location_uses_top_level_city() {
        let entry = json!({
            "title": "Magma",
            "date": "2025-06-20",
            "location": "Le Trianon",
            "city": "Paris"
        });
        let event = normalize_entry(&entry).unwrap();
        assert_eq!(event.venue, "Le Trianon");
        assert_eq!(event.city, "Paris");
        assert_eq!(event.subgenre, "Zeuhl");
    }

    #[test]
    fn test_invalid_entries_are_reported() {
        let feed = json!([
            { "name": "No date" },
            { "name": "Bad date", "startDate": "next friday" },
            { "startDate": "2025-01-01" },
            "not an object",
            { "name": "Fine", "startDate": "2025-01-01" }
        ]);

        let entries = normalize_feed(&feed);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].label, "No date");
        assert!(entries[0].event.is_err());
        assert!(entries[1].event.as_ref().unwrap_err().contains("next friday"));
        assert_eq!(entries[2].label, "entry 3");
        assert!(entries[2].event.is_err());
        assert!(entries[3].event.is_err());
        assert!(entries[4].event.is_ok());
    }

    #[test]
    fn test_single_object_feed() {
        let entries = normalize_feed(&json!({ "name": "Solo", "date": "2025-02-02" }));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event.as_ref().unwrap().subgenre, DEFAULT_SUBGENRE);
    }

    #[test]
    fn test_parse_feed_date() {
        let midnight = Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap();
        assert_eq!(parse_feed_date("2025-03-09"), Some(midnight));
        assert_eq!(parse_feed_date("2025-03-09T00:00"), Some(midnight));
        assert_eq!(parse_feed_date("2025-03-09 00:00:00"), Some(midnight));
        assert_eq!(parse_feed_date("2025-03-09T01:00:00+01:00"), Some(midnight));
        assert_eq!(parse_feed_date("09/03/2025"), None);
    }

    #[test]
    fn test_classify_subgenre_matches_whole_words() {
        assert_eq!(classify_subgenre("Dream Theater", None, &[]), "Prog Metal");
        assert_eq!(
            classify_subgenre("Festival", Some("Omaggio a PFM e Banco del Mutuo"), &[]),
            "Italian Prog"
        );
        assert_eq!(
            classify_subgenre("Live", None, &["Soft Machine Legacy".to_string()]),
            "Canterbury"
        );
        // "magmatic" must not count as Magma
        assert_eq!(classify_subgenre("Magmatic Night", None, &[]), DEFAULT_SUBGENRE);
        for subgenre in SUBGENRE_KEYWORDS.iter().map(|(s, _)| *s) {
            assert!(PROG_SUBGENRES.contains(&subgenre));
        }
    }
}
