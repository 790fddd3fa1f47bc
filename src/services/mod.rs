pub mod auction_scraper;
pub mod browser;
pub mod detection;
pub mod extractor;
pub mod http_session;
pub mod sheets;
pub mod worker;

pub use auction_scraper::{search_url_variants, AttemptOutcome, AuctionScraper};
pub use sheets::SheetsClient;
pub use worker::{
    data_persistence_handler, keyword_scraper_handler, KeywordQuerySender, ScrapedKeyword,
};
