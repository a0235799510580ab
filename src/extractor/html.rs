use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::extractor::{results_url, Extractor, PageClient};
use crate::types::ExtractedRecord;

/// Status substrings (lower-case) that mark a finished match.
pub const FINISHED_KEYWORDS: &[&str] = &["закончен", "заверш", "finished", "completed"];

/// Status assumed when a match block carries no status node.
pub const DEFAULT_STATUS: &str = "Завершен";

mod css {
    pub const MATCH: &str = "div.sc-17qxh4e-0";
    pub const TEAM: &str = "div.sc-17qxh4e-10";
    pub const STATUS: &str = "div.sc-1p31vt4-0";
    pub const SCORES: &str = "div.sc-4g7sie-0";
    pub const FINAL_SCORE: &str = "div.sc-pvs6fr-0";
    pub const SCORE_CELL: &str = "div.sc-pvs6fr-1";
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::ParseFailure(format!("bad selector {css}: {e}")))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

pub fn is_finished(status: &str) -> bool {
    let lower = status.to_lowercase();
    FINISHED_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// CSS-selector parser for the rendered results list.
pub struct ResultsPage {
    match_block: Selector,
    team: Selector,
    status: Selector,
    scores: Selector,
    final_score: Selector,
    score_cell: Selector,
}

impl ResultsPage {
    pub fn new() -> Result<Self> {
        Ok(Self {
            match_block: selector(css::MATCH)?,
            team: selector(css::TEAM)?,
            status: selector(css::STATUS)?,
            scores: selector(css::SCORES)?,
            final_score: selector(css::FINAL_SCORE)?,
            score_cell: selector(css::SCORE_CELL)?,
        })
    }

    /// Finished matches on the page. Malformed blocks are logged and skipped; a page
    /// with no match blocks at all is a `ParseFailure`.
    pub fn parse(&self, html: &str) -> Result<Vec<ExtractedRecord>> {
        let doc = Html::parse_document(html);
        let mut blocks = 0usize;
        let mut records = Vec::new();

        for block in doc.select(&self.match_block) {
            blocks += 1;
            match self.parse_block(block) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => debug!("Skipping match block: {e}"),
            }
        }

        if blocks == 0 {
            return Err(AppError::ParseFailure("no match blocks found".to_string()));
        }
        Ok(records)
    }

    /// `Ok(None)` for matches that are not finished yet.
    fn parse_block(&self, block: ElementRef<'_>) -> Result<Option<ExtractedRecord>> {
        let teams: Vec<String> = block.select(&self.team).map(text_of).collect();
        if teams.len() < 2 {
            return Err(AppError::ParseFailure(format!(
                "expected two team nodes, found {}",
                teams.len()
            )));
        }
        if teams[0].is_empty() || teams[1].is_empty() {
            return Err(AppError::ParseFailure("blank team name".to_string()));
        }

        let status = block
            .select(&self.status)
            .next()
            .map(text_of)
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());
        if !is_finished(&status) {
            return Ok(None);
        }

        let cells: Vec<String> = block
            .select(&self.scores)
            .next()
            .and_then(|scores| scores.select(&self.final_score).next())
            .map(|final_score| final_score.select(&self.score_cell).map(text_of).collect())
            .unwrap_or_default();
        if cells.len() < 2 {
            return Err(AppError::ParseFailure(format!(
                "{} vs {}: final score cells missing",
                teams[0], teams[1]
            )));
        }

        let goals = |cell: &str| {
            cell.parse::<i32>().map_err(|_| {
                AppError::ParseFailure(format!("{} vs {}: bad score {cell:?}", teams[0], teams[1]))
            })
        };
        let home_score = goals(cells[0].as_str())?;
        let away_score = goals(cells[1].as_str())?;

        Ok(Some(ExtractedRecord {
            home_team: teams[0].clone(),
            away_team: teams[1].clone(),
            match_time: None,
            home_score: Some(home_score),
            away_score: Some(away_score),
            status,
        }))
    }
}

pub struct HtmlExtractor {
    client: PageClient,
    base_url: String,
    page: ResultsPage,
}

impl HtmlExtractor {
    pub fn new(client: PageClient, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            page: ResultsPage::new()?,
        })
    }
}

#[async_trait]
impl Extractor for HtmlExtractor {
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<ExtractedRecord>> {
        let url = results_url(&self.base_url, date);
        let body = self.client.get_text(&url).await?;
        let records = self.page.parse(&body);
        match &records {
            Ok(r) => info!(%date, "Parsed {} finished matches from {url}", r.len()),
            Err(e) => warn!(%date, "Could not parse {url}: {e}"),
        }
        records
    }
}
