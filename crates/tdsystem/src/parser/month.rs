use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{SEL_TD, SEL_TR, elem_text, form_params, normalize, row_params};
use crate::types::{Course, Meet};

static SEL_YEAR_FORM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"form[name="SelectYear"]"#).expect("invalid selector: year form")
});

static SEL_YEAR_OPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"option[name="SelYearList"]"#).expect("invalid selector: year option")
});

static SEL_MEET_FORM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"form[name="gamelist"]"#).expect("invalid selector: meet form")
});

static RE_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+)日\([日月火水木金土・祝]+\)").expect("invalid regex: day")
});

static RE_COURSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((25m|50m)\)").expect("invalid regex: course"));

/// Years offered by the year selector, in page order.
pub fn parse_available_years(document: &Html) -> Option<Vec<String>> {
    let form = document.select(&SEL_YEAR_FORM).next()?;
    Some(
        form.select(&SEL_YEAR_OPTION)
            .filter_map(|o| o.value().attr("value"))
            .map(str::to_string)
            .collect(),
    )
}

/// Meets listed for `year`/`month`. Each meet gets its own copy of the form's
/// parameters with its row button layered on top.
pub fn parse_meets(document: &Html, year: i32, month: u32) -> Option<Vec<Meet>> {
    let form = document.select(&SEL_MEET_FORM).next()?;
    let base = form_params(form, true);

    let meets = form
        .select(&SEL_TR)
        .filter_map(|row| {
            let cells: Vec<ElementRef> = row.select(&SEL_TD).collect();
            if cells.len() < 4 {
                return None;
            }

            let dates = parse_days(&normalize(&elem_text(cells[0])), year, month);
            let name = normalize(&elem_text(cells[1]));
            let (venue, course) = split_venue(&normalize(&elem_text(cells[2])));
            let params = row_params(&base, cells[3]);

            Some(Meet {
                dates,
                name,
                course,
                venue,
                params,
            })
        })
        .collect();

    Some(meets)
}

/// Every `<day>日(<weekday>)` in `text`, as dates in `year`/`month`.
pub fn parse_days(text: &str, year: i32, month: u32) -> Vec<NaiveDate> {
    RE_DAY
        .captures_iter(text)
        .filter_map(|caps| {
            let day: u32 = caps[1].parse().ok()?;
            let date = NaiveDate::from_ymd_opt(year, month, day);
            if date.is_none() {
                log::warn!("Skipping impossible date {}-{}-{}", year, month, day);
            }
            date
        })
        .collect()
}

/// Splits `City Pool(50m)` into the venue name and its course.
fn split_venue(text: &str) -> (String, Option<Course>) {
    let Some(marker) = RE_COURSE.find(text) else {
        return (text.to_string(), None);
    };
    let course = marker.as_str().trim_matches(['(', ')']).parse().ok();
    (text[..marker.start()].trim_end().to_string(), course)
}
