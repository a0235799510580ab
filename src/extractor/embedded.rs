//! The site ships its GraphQL client cache in a script tag, either as
//! `window.URQL_DATA = {...};` or as `window.URQL_DATA=JSON.parse("...")`.
//! Each cache entry holds a `data` field that is an object or a JSON-encoded string.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::extractor::{results_url, Extractor, PageClient};
use crate::types::ExtractedRecord;

const URQL_ASSIGNMENT: &str = r"window\.URQL_DATA\s*=\s*";
const JSON_PARSE_CALL: &str = "JSON.parse(";

/// Locates and decodes the URQL cache embedded in a page.
pub struct UrqlCache {
    script: Selector,
    assignment: Regex,
}

impl UrqlCache {
    pub fn new() -> Result<Self> {
        Ok(Self {
            script: Selector::parse("script")
                .map_err(|e| AppError::ParseFailure(format!("bad selector script: {e}")))?,
            assignment: Regex::new(URQL_ASSIGNMENT)
                .map_err(|e| AppError::ParseFailure(format!("bad pattern: {e}")))?,
        })
    }

    /// The decoded `data` payload of every cache entry. Entries whose payload does not
    /// decode are skipped.
    pub fn payloads(&self, html: &str) -> Result<Vec<Value>> {
        let cache = self.cache(html)?;
        let Value::Object(entries) = cache else {
            return Err(AppError::ParseFailure("URQL_DATA is not an object".to_string()));
        };

        let mut payloads = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            match entry.get("data") {
                Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                    Ok(v) => payloads.push(v),
                    Err(e) => debug!("URQL entry {key}: undecodable data: {e}"),
                },
                Some(v @ Value::Object(_)) => payloads.push(v.clone()),
                _ => {}
            }
        }
        Ok(payloads)
    }

    fn cache(&self, html: &str) -> Result<Value> {
        let doc = Html::parse_document(html);
        for script in doc.select(&self.script) {
            let text: String = script.text().collect();
            if let Some(m) = self.assignment.find(&text) {
                return decode_assignment(&text[m.end()..]);
            }
        }
        Err(AppError::ParseFailure("window.URQL_DATA not found".to_string()))
    }
}

/// Decode the right-hand side of the cache assignment.
fn decode_assignment(rhs: &str) -> Result<Value> {
    let rhs = rhs.trim_start();
    if let Some(call) = rhs.strip_prefix(JSON_PARSE_CALL) {
        let literal = js_string_literal(call.trim_start())?;
        return Ok(serde_json::from_str(&literal)?);
    }
    // Object literal: take the first complete JSON value and ignore the trailing `;`.
    serde_json::Deserializer::from_str(rhs)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| AppError::ParseFailure("empty URQL_DATA assignment".to_string()))?
        .map_err(AppError::from)
}

/// Unescape a leading JS string literal (`"..."` or `'...'`) into its contents.
fn js_string_literal(s: &str) -> Result<String> {
    let mut chars = s.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('"' | '\''))) => q,
        _ => return Err(AppError::ParseFailure("JSON.parse argument is not a string".to_string())),
    };

    let mut escaped = false;
    let mut end = None;
    for (i, c) in chars {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            c if c == quote => {
                end = Some(i);
                break;
            }
            _ => {}
        }
    }
    let end = end.ok_or_else(|| AppError::ParseFailure("unterminated JSON.parse string".to_string()))?;
    Ok(serde_json::from_str::<String>(&format!("\"{}\"", json_string_body(&s[1..end])))?)
}

/// Re-escape a JS string body as a JSON string body: bare `"` gets escaped,
/// `\'` loses its backslash, `\xNN` becomes `\u00NN`.
fn json_string_body(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => match chars.next() {
                Some('x') => out.push_str("\\u00"),
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Every object in `payload` that looks like a match with a known score.
pub fn collect_results(payload: &Value, out: &mut Vec<ExtractedRecord>) {
    match payload {
        Value::Object(map) => {
            if let Some(record) = result_from(map) {
                out.push(record);
                return;
            }
            for child in map.values() {
                collect_results(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_results(item, out);
            }
        }
        _ => {}
    }
}

fn team_name<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)?
        .get("name")?
        .as_str()
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

/// Goals as a number or a numeric string. `None` for null or anything else.
fn goals(v: &Value) -> Option<i32> {
    match v {
        Value::Number(n) => n.as_i64().and_then(|g| i32::try_from(g).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn result_from(map: &Map<String, Value>) -> Option<ExtractedRecord> {
    let home_team = team_name(map, "homeTeam")?;
    let away_team = team_name(map, "awayTeam")?;
    let home_score = goals(map.get("homeScore")?)?;
    let away_score = goals(map.get("awayScore")?)?;

    let status = map
        .get("status")
        .and_then(|s| {
            let name = s.get("name").and_then(Value::as_str).filter(|n| !n.is_empty());
            name.or_else(|| s.get("type").and_then(Value::as_str))
        })
        .unwrap_or_default()
        .to_string();

    let match_time = map
        .get("startDate")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));

    Some(ExtractedRecord {
        home_team: home_team.to_string(),
        away_team: away_team.to_string(),
        match_time,
        home_score: Some(home_score),
        away_score: Some(away_score),
        status,
    })
}

pub struct EmbeddedJsonExtractor {
    client: PageClient,
    base_url: String,
    cache: UrqlCache,
}

impl EmbeddedJsonExtractor {
    pub fn new(client: PageClient, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            cache: UrqlCache::new()?,
        })
    }

    pub fn parse(&self, html: &str) -> Result<Vec<ExtractedRecord>> {
        let mut records = Vec::new();
        for payload in self.cache.payloads(html)? {
            collect_results(&payload, &mut records);
        }
        Ok(records)
    }
}

#[async_trait]
impl Extractor for EmbeddedJsonExtractor {
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<ExtractedRecord>> {
        let url = results_url(&self.base_url, date);
        let body = self.client.get_text(&url).await?;
        let records = self.parse(&body);
        match &records {
            Ok(r) => info!(%date, "Found {} scored matches in URQL cache of {url}", r.len()),
            Err(e) => warn!(%date, "Could not read URQL cache of {url}: {e}"),
        }
        records
    }
}
