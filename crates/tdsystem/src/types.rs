use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::parser::parse_swim_time;

/// Key of the form target in a [`QueryParams`] set. It names a path on the
/// site rather than a query key.
pub const ACTION_KEY: &str = "action";

#[derive(Debug, thiserror::Error)]
#[error("Invalid course '{0}'. Accepted values: 'short', 'long', '25m', '50m'")]
pub struct CourseParseError(String);

#[derive(Debug, thiserror::Error)]
#[error("Invalid swim time '{0}'. Expected [M:]SS.cc")]
pub struct SwimTimeParseError(String);

/// Parameters a page's form requires to request the next page in the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Removes the form target so the rest can be encoded as a query string.
    pub fn take_action(&mut self) -> Option<String> {
        self.0.remove(ACTION_KEY)
    }

    /// Copy of these params with one extra pair layered on top.
    pub fn merged(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut params = self.clone();
        params.insert(key, value);
        params
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Display for QueryParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Course {
    Short,
    Long,
}

impl Course {
    pub fn pool_length(&self) -> u32 {
        match self {
            Course::Short => 25,
            Course::Long => 50,
        }
    }
}

impl FromStr for Course {
    type Err = CourseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" | "25m" => Ok(Course::Short),
            "long" | "50m" => Ok(Course::Long),
            _ => Err(CourseParseError(s.to_string())),
        }
    }
}

impl Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Course::Short => write!(f, "Short course"),
            Course::Long => write!(f, "Long course"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Mixed,
}

impl Sex {
    /// Label used on the race list page.
    pub fn label(&self) -> &'static str {
        match self {
            Sex::Male => "男子",
            Sex::Female => "女子",
            Sex::Mixed => "混合",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [Sex::Male, Sex::Female, Sex::Mixed]
            .into_iter()
            .find(|s| s.label() == label)
    }
}

impl Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sex::Male => write!(f, "Men"),
            Sex::Female => write!(f, "Women"),
            Sex::Mixed => write!(f, "Mixed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Freestyle,
    Backstroke,
    Breaststroke,
    Butterfly,
    IndividualMedley,
    FreestyleRelay,
    MedleyRelay,
}

impl Style {
    pub const ALL: [Style; 7] = [
        Style::Freestyle,
        Style::Backstroke,
        Style::Breaststroke,
        Style::Butterfly,
        Style::IndividualMedley,
        Style::FreestyleRelay,
        Style::MedleyRelay,
    ];

    /// Label used on the race list page.
    pub fn label(&self) -> &'static str {
        match self {
            Style::Freestyle => "自由形",
            Style::Backstroke => "背泳ぎ",
            Style::Breaststroke => "平泳ぎ",
            Style::Butterfly => "バタフライ",
            Style::IndividualMedley => "個人メドレー",
            Style::FreestyleRelay => "フリーリレー",
            Style::MedleyRelay => "メドレーリレー",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    pub fn is_relay(&self) -> bool {
        matches!(self, Style::FreestyleRelay | Style::MedleyRelay)
    }
}

impl Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Style::Freestyle => write!(f, "Freestyle"),
            Style::Backstroke => write!(f, "Backstroke"),
            Style::Breaststroke => write!(f, "Breaststroke"),
            Style::Butterfly => write!(f, "Butterfly"),
            Style::IndividualMedley => write!(f, "Individual Medley"),
            Style::FreestyleRelay => write!(f, "Freestyle Relay"),
            Style::MedleyRelay => write!(f, "Medley Relay"),
        }
    }
}

/// A finish or split time, kept to the millisecond.
///
/// Serialized in the site's own `M:SS.cc` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SwimTime(Duration);

impl SwimTime {
    pub fn new(minutes: u32, seconds: u32, hundredths: u32) -> Self {
        let secs = u64::from(minutes) * 60 + u64::from(seconds);
        SwimTime(Duration::from_secs(secs) + Duration::from_millis(u64::from(hundredths) * 10))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<SwimTime> for String {
    fn from(time: SwimTime) -> Self {
        time.to_string()
    }
}

impl TryFrom<String> for SwimTime {
    type Error = SwimTimeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl FromStr for SwimTime {
    type Err = SwimTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_swim_time(s).ok_or_else(|| SwimTimeParseError(s.to_string()))
    }
}

impl Display for SwimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self.0.as_secs();
        let hundredths = self.0.subsec_millis() / 10;
        let (minutes, seconds) = (total / 60, total % 60);
        if minutes > 0 {
            write!(f, "{}:{:02}.{:02}", minutes, seconds, hundredths)
        } else {
            write!(f, "{}.{:02}", seconds, hundredths)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meet {
    pub dates: Vec<NaiveDate>,
    pub name: String,
    pub course: Option<Course>,
    pub venue: String,
    pub params: QueryParams,
}

impl Display for Meet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dates: Vec<String> = self.dates.iter().map(|d| d.to_string()).collect();
        write!(f, "[{}] {} - {}", dates.join(", "), self.name, self.venue)?;
        if let Some(course) = self.course {
            write!(f, " ({}m)", course.pool_length())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub sex: Option<Sex>,
    pub distance: u32,
    pub style: Option<Style>,
    pub params: QueryParams,
}

impl Race {
    pub(crate) fn with_params(params: QueryParams) -> Self {
        Self {
            sex: None,
            distance: 0,
            style: None,
            params,
        }
    }
}

impl Race {
    /// True for rows that carried none of sex, distance or style, such as the
    /// table header.
    pub fn is_blank(&self) -> bool {
        self.sex.is_none() && self.distance == 0 && self.style.is_none()
    }
}

impl Display for Race {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.sex {
            Some(sex) => write!(f, "{}", sex)?,
            None => write!(f, "?")?,
        }
        match self.style {
            Some(style) if style.is_relay() => write!(f, " 4x{}m", self.distance / 4)?,
            _ => write!(f, " {}m", self.distance)?,
        }
        match self.style {
            Some(style) => write!(f, " {}", style),
            None => write!(f, " ?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub age_class: Option<String>,
    pub rank: u32,
    pub name: Option<String>,
    pub time: Option<SwimTime>,
    pub laps: Option<Vec<SwimTime>>,
    pub params: QueryParams,
}

impl Record {
    pub(crate) fn blank(params: &QueryParams, age_class: Option<&str>) -> Self {
        Self {
            age_class: age_class.map(str::to_string),
            rank: 0,
            name: None,
            time: None,
            laps: None,
            params: params.clone(),
        }
    }

    pub(crate) fn push_lap(&mut self, lap: SwimTime) {
        self.laps.get_or_insert_with(Vec::new).push(lap);
    }

    pub(crate) fn has_laps(&self) -> bool {
        self.laps.as_ref().is_some_and(|l| !l.is_empty())
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>3}. {}", self.rank, self.name.as_deref().unwrap_or("-"))?;
        if let Some(class) = &self.age_class {
            write!(f, " [{}]", class)?;
        }
        match self.time {
            Some(time) => write!(f, "  {}", time)?,
            None => write!(f, "  --")?,
        }
        if let Some(laps) = &self.laps {
            let laps: Vec<String> = laps.iter().map(|l| l.to_string()).collect();
            write!(f, "\n     Laps: {}", laps.join(" / "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_action_preserves_other_params() {
        let mut params: QueryParams = [
            ("action", "ProList.php"),
            ("Y", "2018"),
            ("M", "6"),
            ("GL", "0"),
            ("G", "154"),
        ]
        .into_iter()
        .collect();
        let before = params.clone();

        assert_eq!(params.take_action().as_deref(), Some("ProList.php"));
        assert!(!params.contains_key(ACTION_KEY));
        assert_eq!(params.len(), before.len() - 1);
        for (k, v) in params.iter() {
            assert_eq!(before.get(k), Some(v));
        }
        assert_eq!(params.take_action(), None);
    }

    #[test]
    fn test_merged_leaves_base_untouched() {
        let base: QueryParams = [("Y", "2018")].into_iter().collect();
        let merged = base.merged("G", "154");

        assert_eq!(merged.get("G"), Some("154"));
        assert_eq!(merged.get("Y"), Some("2018"));
        assert_eq!(base.get("G"), None);
    }

    #[test]
    fn test_swim_time_display() {
        assert_eq!(SwimTime::new(1, 23, 45).to_string(), "1:23.45");
        assert_eq!(SwimTime::new(0, 23, 45).to_string(), "23.45");
        assert_eq!(SwimTime::new(10, 5, 0).to_string(), "10:05.00");
    }

    #[test]
    fn test_swim_time_serde_uses_site_notation() {
        let time = SwimTime::new(2, 3, 4);
        let json = serde_json::to_string(&time).expect("serialize");
        assert_eq!(json, "\"2:03.04\"");

        let back: SwimTime = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, time);
        assert!(serde_json::from_str::<SwimTime>("\"fast\"").is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Sex::from_label("混合"), Some(Sex::Mixed));
        assert_eq!(Sex::from_label("男女"), None);
        assert_eq!(Style::from_label("個人メドレー"), Some(Style::IndividualMedley));
        assert_eq!("50m".parse::<Course>().unwrap(), Course::Long);
    }

    #[test]
    fn test_meet_and_race_display() {
        let meet = Meet {
            dates: vec![
                NaiveDate::from_ymd_opt(2018, 6, 25).unwrap(),
                NaiveDate::from_ymd_opt(2018, 6, 26).unwrap(),
            ],
            name: "Summer Meet".to_string(),
            course: Some(Course::Short),
            venue: "City Pool".to_string(),
            params: QueryParams::new(),
        };
        assert_eq!(
            meet.to_string(),
            "[2018-06-25, 2018-06-26] Summer Meet - City Pool (25m)"
        );

        let relay = Race {
            sex: Some(Sex::Mixed),
            distance: 200,
            style: Some(Style::MedleyRelay),
            params: QueryParams::new(),
        };
        assert_eq!(relay.to_string(), "Mixed 4x50m Medley Relay");

        let individual = Race {
            style: Some(Style::Butterfly),
            ..relay
        };
        assert_eq!(individual.to_string(), "Mixed 200m Butterfly");
    }
}
