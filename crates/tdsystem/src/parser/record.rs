use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{RowKind, SEL_TD, classify_row, elem_text, form_params, normalize, parse_swim_time};
use crate::types::{QueryParams, Record};

/// Class value the site uses to request every age class at once.
pub const WILDCARD_CLASS: &str = "999";

/// Header text of the results table.
const RANK_HEADER: &str = "順位";

/// Rows inspected to decide whether a results table interleaves lap rows.
const LAP_PROBE_ROWS: usize = 3;

static SEL_CLASS_FORM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"form[name="formclasslist"]"#).expect("invalid selector: class form")
});

static SEL_SELECT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("select").expect("invalid selector: select"));

static SEL_OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option").expect("invalid selector: option"));

static SEL_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("invalid selector: table"));

static SEL_TH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("invalid selector: th"));

/// Hidden inputs of the class selector; the parameters for requesting this
/// race again with another class.
pub fn parse_query_params(document: &Html) -> Option<QueryParams> {
    let form = document.select(&SEL_CLASS_FORM).next()?;
    Some(form_params(form, false))
}

/// Age classes offered by the class selector, value → label. The wildcard
/// entry is left out.
pub fn parse_available_classes(document: &Html) -> Option<BTreeMap<String, String>> {
    let form = document.select(&SEL_CLASS_FORM).next()?;
    let select = form.select(&SEL_SELECT).next()?;
    Some(
        select
            .select(&SEL_OPTION)
            .filter_map(|option| {
                let value = option.value().attr("value")?;
                if value == WILDCARD_CLASS {
                    return None;
                }
                Some((value.to_string(), normalize(&elem_text(option))))
            })
            .collect(),
    )
}

/// Results listed in the page's ranking table.
///
/// A record is emitted once complete: on pages with lap rows, after the lap
/// row that follows it; otherwise as soon as its finish time is read. Every
/// record carries `params` and `age_class` so it can be traced back to the
/// request that produced it.
pub fn parse_records(
    document: &Html,
    params: &QueryParams,
    age_class: Option<&str>,
) -> Option<Vec<Record>> {
    let table = document.select(&SEL_TABLE).find(|t| is_ranking_table(*t))?;
    let rows = table_rows(table);

    let has_laps = rows
        .iter()
        .take(LAP_PROBE_ROWS)
        .any(|row| classify_row(*row) == Some(RowKind::Lap));

    let mut records = Vec::new();
    let mut current = Record::blank(params, age_class);

    for row in rows {
        match classify_row(row) {
            Some(RowKind::Record) => read_record_row(&mut current, row),
            Some(RowKind::Lap) => {
                let Some(splits) = row.select(&SEL_TABLE).next() else {
                    continue;
                };
                for cell in splits.select(&SEL_TD) {
                    if let Some(lap) = parse_swim_time(&normalize(&elem_text(cell))) {
                        current.push_lap(lap);
                    }
                }
            }
            None => continue,
        }

        let complete = if has_laps {
            current.has_laps()
        } else {
            current.time.is_some()
        };
        if complete {
            let next = Record::blank(params, age_class);
            records.push(std::mem::replace(&mut current, next));
        }
    }

    Some(records)
}

/// Rank, name and time of a ranked row. Each ranked row starts them over.
fn read_record_row(record: &mut Record, row: ElementRef) {
    record.rank = 0;
    record.name = None;
    record.time = None;

    for (i, cell) in row.select(&SEL_TD).enumerate() {
        let text = normalize(&elem_text(cell));
        if text.is_empty() {
            continue;
        }
        if i == 0
            && let Ok(rank) = text.parse::<u32>()
        {
            record.rank = rank;
        }
        if record.name.is_none() && is_name_cell(cell) {
            record.name = Some(text.clone());
        }
        if let Some(time) = parse_swim_time(&text) {
            record.time = Some(time);
        }
    }
}

/// The swimmer's name sits in the one cell rendered as a bare
/// `<td valign="top">`.
fn is_name_cell(cell: ElementRef) -> bool {
    let element = cell.value();
    element.attr("valign") == Some("top") && element.attrs().count() == 1
}

fn is_ranking_table(table: ElementRef) -> bool {
    table
        .select(&SEL_TH)
        .next()
        .is_some_and(|th| normalize(&elem_text(th)) == RANK_HEADER)
}

/// The table's own rows, skipping those of nested tables. The parser wraps
/// bare rows in an implicit `tbody`, so sections are walked as well.
fn table_rows(table: ElementRef) -> Vec<ElementRef> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SwimTime;
    use std::fs;

    fn record_params() -> QueryParams {
        [("Y", "2018"), ("M", "6"), ("G", "154"), ("S", "2"), ("Cls", "50")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_parse_query_params() {
        let html = fs::read_to_string("fixtures/record_page_laps.html")
            .expect("Failed to read fixture");
        let document = Html::parse_document(&html);

        let params = parse_query_params(&document).expect("Should find class form");
        assert_eq!(params.get("Y"), Some("2018"));
        assert_eq!(params.get("G"), Some("154"));
        assert_eq!(params.get("S"), Some("2"));
        assert_eq!(params.get("Page"), Some("ProList.php"));
        assert_eq!(params.get("action"), None);
    }

    #[test]
    fn test_parse_available_classes_skips_wildcard() {
        let html = fs::read_to_string("fixtures/record_page_laps.html")
            .expect("Failed to read fixture");
        let document = Html::parse_document(&html);

        let classes = parse_available_classes(&document).expect("Should find class select");
        assert_eq!(classes.len(), 2);
        assert_eq!(classes.get("25").map(String::as_str), Some("25~29歳"));
        assert_eq!(classes.get("50").map(String::as_str), Some("50~54歳"));
        assert!(!classes.contains_key(WILDCARD_CLASS));
    }

    #[test]
    fn test_parse_records_with_laps() {
        let html = fs::read_to_string("fixtures/record_page_laps.html")
            .expect("Failed to read fixture");
        let document = Html::parse_document(&html);
        let params = record_params();

        let records = parse_records(&document, &params, Some("50～54歳"))
            .expect("Should find ranking table");
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.rank, 1);
        assert_eq!(first.name.as_deref(), Some("山田 太郎"));
        assert_eq!(first.time, Some(SwimTime::new(1, 2, 34)));
        assert_eq!(
            first.laps,
            Some(vec![SwimTime::new(0, 29, 80), SwimTime::new(1, 2, 34)])
        );
        assert_eq!(first.age_class.as_deref(), Some("50～54歳"));
        assert_eq!(first.params, params);

        let second = &records[1];
        assert_eq!(second.rank, 2);
        assert_eq!(second.name.as_deref(), Some("鈴木 次郎"));
        assert_eq!(second.time, Some(SwimTime::new(1, 5, 0)));
        assert_eq!(second.laps.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_parse_records_without_laps() {
        let html = fs::read_to_string("fixtures/record_page_plain.html")
            .expect("Failed to read fixture");
        let document = Html::parse_document(&html);
        let params = record_params();

        let records = parse_records(&document, &params, None).expect("Should find ranking table");
        assert_eq!(records.len(), 3);
        assert_eq!(
            records.iter().map(|r| r.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(records.iter().all(|r| r.laps.is_none()));
        assert!(records.iter().all(|r| r.time.is_some()));
        assert!(records.iter().all(|r| r.age_class.is_none()));
        assert_eq!(records[2].time, Some(SwimTime::new(0, 31, 5)));
    }

    #[test]
    fn test_row_without_time_does_not_leak_into_next_record() {
        let document = Html::parse_document(
            r#"<table>
                 <tr><th>順位</th><th>氏名</th><th>記録</th></tr>
                 <tr><td>1</td><td valign="top">AAA</td><td>30.00</td></tr>
                 <tr><td>2</td><td valign="top">BBB</td><td>失格</td></tr>
                 <tr><td>3</td><td valign="top">CCC</td><td>31.00</td></tr>
               </table>"#,
        );

        let records = parse_records(&document, &QueryParams::new(), None).expect("table");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("AAA"));
        assert_eq!(records[1].rank, 3);
        assert_eq!(records[1].name.as_deref(), Some("CCC"));
        assert_eq!(records[1].time, Some(SwimTime::new(0, 31, 0)));
    }

    #[test]
    fn test_record_row_without_laps_is_replaced_by_next_record_row() {
        let document = Html::parse_document(
            r#"<table>
                 <tr><th>順位</th><th>氏名</th><th>記録</th></tr>
                 <tr><td>1</td><td valign="top">AAA</td><td>30.00</td></tr>
                 <tr><td colspan="3"><table><tr><td>50m</td><td>30.00</td></tr></table></td></tr>
                 <tr><td>2</td><td valign="top">BBB</td><td>30.50</td></tr>
                 <tr><td>3</td><td valign="top">CCC</td><td>棄権</td></tr>
                 <tr><td colspan="3"><table><tr><td>50m</td><td>31.20</td></tr></table></td></tr>
               </table>"#,
        );

        let records = parse_records(&document, &QueryParams::new(), None).expect("table");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("AAA"));
        assert_eq!(records[0].laps, Some(vec![SwimTime::new(0, 30, 0)]));

        let last = &records[1];
        assert_eq!(last.rank, 3);
        assert_eq!(last.name.as_deref(), Some("CCC"));
        assert_eq!(last.time, None);
        assert_eq!(last.laps, Some(vec![SwimTime::new(0, 31, 20)]));
    }

    #[test]
    fn test_ranking_table_is_chosen_by_header() {
        let document = Html::parse_document(
            r#"<table><tr><th>大会</th></tr><tr><td>1</td><td>9.99</td></tr></table>
               <table><tr><th> 順位 </th><th>記録</th></tr>
                      <tr><td>7</td><td>28.50</td></tr></table>"#,
        );

        let records = parse_records(&document, &QueryParams::new(), None).expect("table");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rank, 7);
        assert_eq!(records[0].time, Some(SwimTime::new(0, 28, 50)));
    }

    #[test]
    fn test_missing_shapes_yield_none() {
        let document = Html::parse_document("<table><tr><th>氏名</th></tr></table>");
        assert_eq!(parse_records(&document, &QueryParams::new(), None), None);
        assert_eq!(parse_query_params(&document), None);
        assert_eq!(parse_available_classes(&document), None);
    }
}
