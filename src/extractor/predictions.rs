use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::PREDICTION_SOURCE;
use crate::error::{AppError, Result};
use crate::extractor::embedded::UrqlCache;
use crate::extractor::PageClient;
use crate::types::NewPrediction;

const TOP_MATCHES_KEY: &str = "TopPredictionMatches";

pub const BTTS_TYPE: &str = "btts";
/// Everything on the BTTS trends page is a "both teams to score: yes" tip.
pub const BTTS_VALUE: &str = "Yes";

/// `{base}/trends?trendsMarketSlug=btts`
pub fn trends_url(base_url: &str) -> String {
    format!("{base_url}/trends?trendsMarketSlug=btts")
}

#[derive(Debug, Default)]
pub struct TrendsPage {
    pub predictions: Vec<NewPrediction>,
    /// Entries missing a team or a kickoff time.
    pub skipped: usize,
}

/// Reads upcoming BTTS tips from the trends page's URQL cache.
pub struct TrendsParser {
    cache: UrqlCache,
}

impl TrendsParser {
    pub fn new() -> Result<Self> {
        Ok(Self { cache: UrqlCache::new()? })
    }

    pub fn parse(&self, html: &str) -> Result<TrendsPage> {
        let matches = self
            .cache
            .payloads(html)?
            .into_iter()
            .find_map(|payload| find_key(&payload, TOP_MATCHES_KEY).cloned())
            .ok_or_else(|| AppError::ParseFailure(format!("{TOP_MATCHES_KEY} not found")))?;

        let Value::Array(entries) = matches else {
            return Err(AppError::ParseFailure(format!("{TOP_MATCHES_KEY} is not a list")));
        };

        let mut page = TrendsPage::default();
        for entry in &entries {
            match prediction_from(entry) {
                Some(p) => page.predictions.push(p),
                None => {
                    debug!("Skipping trends entry without teams or kickoff: {entry}");
                    page.skipped += 1;
                }
            }
        }
        Ok(page)
    }
}

/// Depth-first search for the first value stored under `key`.
fn find_key<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    match v {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|child| find_key(child, key))),
        Value::Array(items) => items.iter().find_map(|item| find_key(item, key)),
        _ => None,
    }
}

fn prediction_from(entry: &Value) -> Option<NewPrediction> {
    let teams = entry.get("teams")?.as_array()?;
    let name = |i: usize| {
        teams
            .get(i)?
            .get("name")?
            .as_str()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    };
    let home_team = name(0)?;
    let away_team = name(1)?;

    let match_time = entry
        .get("matchDate")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
        .with_timezone(&Utc);

    Some(NewPrediction {
        home_team,
        away_team,
        match_time,
        prediction_type: BTTS_TYPE.to_string(),
        prediction_value: BTTS_VALUE.to_string(),
        source: Some(PREDICTION_SOURCE.to_string()),
    })
}

pub async fn fetch_btts_predictions(client: &PageClient, base_url: &str) -> Result<TrendsPage> {
    let url = trends_url(base_url);
    let body = client.get_text(&url).await?;
    let page = TrendsParser::new()?.parse(&body)?;
    info!(
        "Found {} BTTS tips on {url} ({} skipped)",
        page.predictions.len(),
        page.skipped
    );
    Ok(page)
}
