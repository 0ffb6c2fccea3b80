mod parser;
pub mod scraper;
pub mod types;
pub mod utils;

pub use scraper::{ScraperConfig, ScraperError, SwimrankingsScraper};

pub(crate) const BASE_URL: &str = "https://www.swimrankings.net/index.php";
