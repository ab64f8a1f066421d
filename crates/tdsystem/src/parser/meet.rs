use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::{SEL_TD, SEL_TR, elem_text, form_params, normalize, row_params};
use crate::types::{Race, Sex, Style};

static SEL_RACE_FORM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"form[name="gamelist"]"#).expect("invalid selector: race form")
});

static RE_SEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:女子|男子|混合)").expect("invalid regex: sex"));

static RE_INDIVIDUAL_DISTANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)m").expect("invalid regex: individual distance"));

static RE_RELAY_DISTANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^4×([0-9]+)m").expect("invalid regex: relay distance"));

static RE_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:自由形|背泳ぎ|平泳ぎ|バタフライ|個人メドレー|フリーリレー|メドレーリレー)")
        .expect("invalid regex: style")
});

/// Races on a meet page, one per table row. Fields the row does not carry
/// keep their defaults.
pub fn parse_races(document: &Html) -> Option<Vec<Race>> {
    let form = document.select(&SEL_RACE_FORM).next()?;
    let base = form_params(form, true);

    let races = form
        .select(&SEL_TR)
        .map(|row| {
            let mut race = Race::with_params(row_params(&base, row));
            for cell in row.select(&SEL_TD) {
                let text = normalize(&elem_text(cell));
                if !text.is_empty() {
                    read_race_cell(&mut race, &text);
                }
            }
            race
        })
        .collect();

    Some(races)
}

fn read_race_cell(race: &mut Race, text: &str) {
    if let Some(m) = RE_SEX.find(text) {
        race.sex = Sex::from_label(m.as_str());
        return;
    }
    if let Some(distance) = RE_INDIVIDUAL_DISTANCE
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
    {
        race.distance = distance;
    }
    if let Some(leg) = RE_RELAY_DISTANCE
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
    {
        race.distance = leg * 4;
    }
    if let Some(m) = RE_STYLE.find(text) {
        race.style = Style::from_label(m.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn races_from_fixture() -> Vec<Race> {
        let html = fs::read_to_string("fixtures/meet_page.html").expect("Failed to read fixture");
        let document = Html::parse_document(&html);
        parse_races(&document).expect("Should find race form")
    }

    #[test]
    fn test_parse_races_from_fixture() {
        let races = races_from_fixture();
        // Header row included: every row yields a race.
        assert_eq!(races.len(), 5);

        let header = &races[0];
        assert_eq!(header.sex, None);
        assert_eq!(header.distance, 0);
        assert_eq!(header.style, None);
        assert_eq!(header.params.get("S"), None);

        let free = &races[1];
        assert_eq!(free.sex, Some(Sex::Female));
        assert_eq!(free.distance, 50);
        assert_eq!(free.style, Some(Style::Freestyle));
        assert_eq!(free.params.get("S"), Some("2"));
        assert_eq!(free.params.get("G"), Some("154"));
        assert_eq!(free.params.get("action"), Some("Record.php"));

        let im = &races[2];
        assert_eq!(im.sex, Some(Sex::Male));
        assert_eq!(im.distance, 200);
        assert_eq!(im.style, Some(Style::IndividualMedley));
        assert_eq!(im.params.get("S"), Some("15"));
    }

    #[test]
    fn test_parse_relay_distance() {
        let races = races_from_fixture();
        let relay = &races[3];
        assert_eq!(relay.sex, Some(Sex::Mixed));
        assert_eq!(relay.distance, 200);
        assert_eq!(relay.style, Some(Style::MedleyRelay));
    }

    #[test]
    fn test_partially_recognized_row_is_kept() {
        let races = races_from_fixture();
        let odd = &races[4];
        assert_eq!(odd.sex, Some(Sex::Male));
        assert_eq!(odd.distance, 0);
        assert_eq!(odd.style, None);
        assert_eq!(odd.params.get("S"), Some("99"));
    }

    #[test]
    fn test_sex_match_ends_cell_scan() {
        let mut race = Race::with_params(Default::default());
        read_race_cell(&mut race, "男子100m自由形");
        assert_eq!(race.sex, Some(Sex::Male));
        assert_eq!(race.distance, 0);
        assert_eq!(race.style, None);
    }

    #[test]
    fn test_missing_form_yields_none() {
        let document = Html::parse_document("<table><tr><td>男子</td></tr></table>");
        assert_eq!(parse_races(&document), None);
    }
}
