//! Parsers for the tdsystem result pages.
//!
//! None of these fail: a page whose shape does not match yields `None` (or an
//! empty list), and a cell that does not match the pattern being looked for is
//! skipped.

pub mod meet;
pub mod month;
pub mod record;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use unicode_normalization::UnicodeNormalization;

use crate::types::{ACTION_KEY, QueryParams, SwimTime};

pub use meet::parse_races;
pub use month::{parse_available_years, parse_days, parse_meets};
pub use record::{parse_available_classes, parse_query_params, parse_records};

static RE_SWIM_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{0,2}):?([0-9]{2})\.([0-9]{2})").expect("invalid regex: swim time")
});

static RE_RANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("invalid regex: rank"));

pub(crate) static SEL_TD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("invalid selector: td"));

pub(crate) static SEL_TR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("invalid selector: tr"));

pub(crate) static SEL_BUTTON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("button").expect("invalid selector: button"));

static SEL_HIDDEN: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[type="hidden"]"#).expect("invalid selector: hidden input")
});

/// What a results table row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Starts a new result; the first cell holds a bare rank.
    Record,
    /// Continues the current result, usually with a nested split table.
    Lap,
}

/// Canonical form of text extracted from the site: newlines dropped, NFKC
/// applied (folds full-width digits and brackets), surrounding whitespace
/// trimmed.
pub fn normalize(text: &str) -> String {
    let joined: String = text.chars().filter(|&c| c != '\n').collect();
    joined.nfkc().collect::<String>().trim().to_string()
}

/// Parses `[M[M]][:]SS.cc` at the start of `text`. Anything after the match is
/// ignored, so labelled cells still yield a time.
pub fn parse_swim_time(text: &str) -> Option<SwimTime> {
    let caps = RE_SWIM_TIME.captures(text)?;
    let minutes = match &caps[1] {
        "" => 0,
        m => m.parse().ok()?,
    };
    let seconds = caps[2].parse().ok()?;
    let hundredths = caps[3].parse().ok()?;
    Some(SwimTime::new(minutes, seconds, hundredths))
}

pub fn classify_cell_text(text: &str) -> RowKind {
    if RE_RANK.is_match(text) {
        RowKind::Record
    } else {
        RowKind::Lap
    }
}

/// Classifies a row by its first cell. Rows without any `td` (header rows)
/// give `None`.
pub fn classify_row(row: ElementRef) -> Option<RowKind> {
    let first = row.select(&SEL_TD).next()?;
    Some(classify_cell_text(&normalize(&elem_text(first))))
}

pub(crate) fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

/// Form target plus every hidden input: the parameters shared by every row
/// of a listing form.
pub(crate) fn form_params(form: ElementRef, with_action: bool) -> QueryParams {
    let mut params = QueryParams::new();
    if with_action && let Some(action) = form.value().attr("action") {
        params.insert(ACTION_KEY, action);
    }
    for input in form.select(&SEL_HIDDEN) {
        let Some(name) = input.value().attr("name") else {
            continue;
        };
        params.insert(name, input.value().attr("value").unwrap_or_default());
    }
    params
}

/// Layers the row's action button, if any, on a copy of the form params.
pub(crate) fn row_params(base: &QueryParams, scope: ElementRef) -> QueryParams {
    let button = scope.select(&SEL_BUTTON).next();
    match button.and_then(|b| Some((b.value().attr("name")?, b.value().attr("value")?))) {
        Some((name, value)) => base.merged(name, value),
        None => base.clone(),
    }
}
