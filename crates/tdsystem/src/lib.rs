pub mod pacer;
pub mod parser;
pub mod scraper;
pub mod types;
pub mod utils;

pub use crate::scraper::{ScraperError, WebScraper};

pub const BASE_URL: &str = "https://www.tdsystem.co.jp/";
