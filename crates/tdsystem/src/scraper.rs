use std::time::Duration;

use ::scraper::Html;
use reqwest::Client;
use url::Url;

use crate::pacer::Pacer;
use crate::parser::record::WILDCARD_CLASS;
use crate::parser::{
    parse_available_classes, parse_available_years, parse_meets, parse_query_params,
    parse_races, parse_records,
};
use crate::types::{Meet, QueryParams, Race, Record};

/// Query key selecting the age class on a record page.
const CLASS_KEY: &str = "Cls";

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Query parameters carry no 'action' to follow")]
    MissingAction,
}

/// Walks the site page by page, threading each page's form parameters into
/// the next request. Requests go out one at a time, spaced by its [`Pacer`].
#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    base_url: Url,
    pacer: Pacer,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(crate::BASE_URL)?,
            pacer: Pacer::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ScraperError> {
        self.base_url = Url::parse(base_url)?;
        Ok(self)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.pacer = Pacer::new(interval);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn fetch_years(&mut self) -> Result<Vec<String>, ScraperError> {
        log::info!("Fetching available years...");
        let url = self.base_url.clone();
        let html = self.get_html(&url).await?;
        let document = Html::parse_document(&html);
        Ok(parse_available_years(&document).unwrap_or_else(|| {
            log::warn!("No year selector found at {}", url);
            Vec::new()
        }))
    }

    pub async fn fetch_meets(&mut self, year: i32, month: u32) -> Result<Vec<Meet>, ScraperError> {
        log::info!("Fetching meets for {}-{:02}...", year, month);
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("Y", &year.to_string())
            .append_pair("M", &month.to_string());

        let html = self.get_html(&url).await?;
        let document = Html::parse_document(&html);
        Ok(parse_meets(&document, year, month).unwrap_or_else(|| {
            log::warn!("No meet list found at {}", url);
            Vec::new()
        }))
    }

    pub async fn fetch_races(&mut self, meet_params: &QueryParams) -> Result<Vec<Race>, ScraperError> {
        let url = build_url(&self.base_url, meet_params)?;
        log::info!("Fetching races...");
        let html = self.get_html(&url).await?;
        let document = Html::parse_document(&html);
        Ok(parse_races(&document).unwrap_or_else(|| {
            log::warn!("No race list found at {}", url);
            Vec::new()
        }))
    }

    /// Records of one race across every age class the page offers. When the
    /// page offers no class selector, the wildcard class is requested once.
    pub async fn fetch_records(
        &mut self,
        race_params: &QueryParams,
    ) -> Result<Vec<Record>, ScraperError> {
        let url = build_url(&self.base_url, race_params)?;
        log::info!("Fetching record classes...");
        let html = self.get_html(&url).await?;

        let (page_params, page_classes) = {
            let document = Html::parse_document(&html);
            (
                parse_query_params(&document),
                parse_available_classes(&document),
            )
        };

        let mut params = page_params
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| {
                let mut params = race_params.clone();
                params.take_action();
                params
            });

        let classes: Vec<(String, Option<String>)> = match page_classes {
            Some(classes) if !classes.is_empty() => classes
                .into_iter()
                .map(|(value, label)| (value, Some(label)))
                .collect(),
            _ => vec![(WILDCARD_CLASS.to_string(), None)],
        };

        let mut path = url;
        path.set_query(None);

        let mut records = Vec::new();
        for (class, label) in classes {
            params.insert(CLASS_KEY, class.as_str());
            let mut class_url = path.clone();
            class_url.query_pairs_mut().extend_pairs(params.iter());

            let html = self.get_html(&class_url).await?;
            let document = Html::parse_document(&html);
            match parse_records(&document, &params, label.as_deref()) {
                Some(found) => {
                    log::info!("Parsed {} record(s) for class {}", found.len(), class);
                    records.extend(found);
                }
                None => log::warn!("No ranking table found at {}", class_url),
            }
        }

        Ok(records)
    }

    /// Every record of every meet held in `year`/`month`.
    pub async fn crawl_month(&mut self, year: i32, month: u32) -> Result<Vec<Record>, ScraperError> {
        let mut records = Vec::new();

        for meet in self.fetch_meets(year, month).await? {
            log::info!("Crawling meet: {}", meet);
            let races = match self.fetch_races(&meet.params).await {
                Err(ScraperError::MissingAction) => {
                    log::warn!("Meet '{}' has no race list to follow", meet.name);
                    continue;
                }
                other => other?,
            };

            for race in races.iter().filter(|r| !r.is_blank()) {
                log::info!("Crawling race: {}", race);
                match self.fetch_records(&race.params).await {
                    Err(ScraperError::MissingAction) => {
                        log::warn!("Race '{}' has no record list to follow", race);
                    }
                    other => records.extend(other?),
                }
            }
        }

        Ok(records)
    }

    pub async fn crawl_year(&mut self, year: i32) -> Result<Vec<Record>, ScraperError> {
        let mut records = Vec::new();
        for month in 1..=12 {
            records.extend(self.crawl_month(year, month).await?);
        }
        Ok(records)
    }

    /// Every record of every year the site lists. Years that are not numbers
    /// are skipped.
    pub async fn crawl_all(&mut self) -> Result<Vec<Record>, ScraperError> {
        let mut records = Vec::new();
        for year in crawl_years(&self.fetch_years().await?) {
            log::info!("Crawling year {}", year);
            records.extend(self.crawl_year(year).await?);
        }
        Ok(records)
    }

    async fn get_html(&mut self, url: &Url) -> Result<String, ScraperError> {
        self.pacer.wait().await;
        log::info!("GET {}", url);
        Ok(self
            .client
            .get(url.clone())
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

fn crawl_years(years: &[String]) -> Vec<i32> {
    years
        .iter()
        .filter_map(|year| {
            year.trim()
                .parse::<i32>()
                .inspect_err(|_| log::warn!("Skipping unrecognized year '{}'", year))
                .ok()
        })
        .collect()
}

/// URL of the page a set of form parameters leads to: the `action` joined onto
/// `base`, every other pair encoded as the query string.
pub fn build_url(base: &Url, params: &QueryParams) -> Result<Url, ScraperError> {
    let mut params = params.clone();
    let action = params.take_action().ok_or(ScraperError::MissingAction)?;

    let mut url = base.join(&action)?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter());
    }
    Ok(url)
}
