use std::collections::BTreeSet;

use url::Url;

use crate::parser::record::WILDCARD_CLASS;
use crate::scraper::ScraperError;
use crate::types::{ACTION_KEY, QueryParams, Record};

/// Values the record page falls back to when a link leaves them out.
const RECORD_PAGE_DEFAULTS: [(&str, &str); 5] = [
    ("S", "2"),
    ("Lap", "1"),
    ("Cls", WILDCARD_CLASS),
    ("L", "1"),
    ("P", "1"),
];

/// Splits a link into the site back into the parameters that would have led
/// to it. The path relative to `base` becomes the `action`; on repeated keys
/// the last value wins (meet links carry `G` twice).
pub fn params_from_url(url: &str, base: &Url) -> Result<QueryParams, ScraperError> {
    let url = base.join(url)?;
    let mut params: QueryParams = url.query_pairs().into_owned().collect();

    let action = match base.make_relative(&url) {
        Some(relative) => relative.split('?').next().unwrap_or_default().to_string(),
        None => url.path().trim_start_matches('/').to_string(),
    };
    params.insert(ACTION_KEY, action);
    Ok(params)
}

/// Like [`params_from_url`] for a record page link, filling in the record
/// page defaults for anything the link leaves out.
pub fn record_params_from_url(url: &str, base: &Url) -> Result<QueryParams, ScraperError> {
    let mut params = params_from_url(url, base)?;
    for (key, value) in RECORD_PAGE_DEFAULTS {
        if !params.contains_key(key) {
            params.insert(key, value);
        }
    }
    Ok(params)
}

#[derive(Debug)]
pub struct RecordStats {
    pub total: usize,
    pub with_laps: usize,
    pub classes: usize,
}

impl RecordStats {
    pub fn from_records(records: &[Record]) -> RecordStats {
        RecordStats {
            total: records.len(),
            with_laps: records.iter().filter(|r| r.laps.is_some()).count(),
            classes: records
                .iter()
                .filter_map(|r| r.age_class.as_deref())
                .collect::<BTreeSet<_>>()
                .len(),
        }
    }
}

impl std::fmt::Display for RecordStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Age classes:       {}", self.classes)?;
        writeln!(f, "  Records with laps: {}", self.with_laps)?;
        writeln!(f, "  Total:             {}", self.total)
    }
}
