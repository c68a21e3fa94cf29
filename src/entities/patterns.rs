use once_cell::sync::Lazy;
use regex::Regex;

/// One compiled pattern per recognized entity shape. Organizations and
/// locations lean on closed suffix/seed lists rather than full NER;
/// this is a rule-based extractor, not a model.
pub static PERSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:Mr|Mrs|Ms|Dr|Prof)\.?\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?\b|\b[A-Z][a-z]+\s[A-Z][a-z]+\b").unwrap()
});

pub static ORGANIZATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][\w&,.' -]*\s(?:Inc|LLC|Corp|Ltd|Co|GmbH|Foundation|Institute|University)\.?\b").unwrap()
});

/// Small geographic seed list; a real deployment would back this with
/// a gazetteer, out of scope for a rule-based pass.
const KNOWN_LOCATIONS: &[&str] = &[
    "New York", "San Francisco", "London", "Tokyo", "Berlin", "Paris", "Singapore", "Jakarta", "Toronto", "Sydney",
];

pub static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s)>\]]+").unwrap());

pub static DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2})?(?:Z|[+-]\d{2}:\d{2})?)?\b|\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s*\d{4}\b",
    )
    .unwrap()
});

pub static CODE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[\w./-]+\.(?:rs|py|go|ts|tsx|js|jsx|java|rb|c|cpp|h|hpp|sql|toml|yaml|yml)(?::\d+)?\b").unwrap()
});

pub static API_ENDPOINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\s+/[\w{}/.:-]*").unwrap()
});

pub static ERROR_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Za-z0-9]*Error\b|\b[A-Z_]{3,}_ERROR\b").unwrap());

pub static HTTP_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(200 OK|201 Created|204 No Content|301 Moved Permanently|400 Bad Request|401 Unauthorized|403 Forbidden|404 Not Found|409 Conflict|422 Unprocessable Entity|429 Too Many Requests|500 Internal Server Error|502 Bad Gateway|503 Service Unavailable)\b").unwrap()
});

pub static TABLE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([a-z_][a-z0-9_]*)`\s+table|table\s+`([a-z_][a-z0-9_]*)`").unwrap());

pub fn known_location(candidate: &str) -> bool {
    KNOWN_LOCATIONS.iter().any(|loc| *loc == candidate)
}

pub fn known_locations() -> &'static [&'static str] {
    KNOWN_LOCATIONS
}
