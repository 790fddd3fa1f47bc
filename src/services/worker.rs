use std::sync::Arc;

use actix_web::web::Data;
use sqlx::PgPool;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::dal::{config_db, keyword_db, listing_db, session_db};
use crate::domain::{ListingRecord, SearchRequest};
use crate::services::{AuctionScraper, SheetsClient};

/// Handle routes use to queue keywords for the scraper task.
pub struct KeywordQuerySender {
    pub sender: UnboundedSender<String>,
}

pub struct ScrapedKeyword {
    pub keyword: String,
    pub records: Vec<ListingRecord>,
}

/// Consumes queued keywords and scrapes them one at a time. Deliberately
/// sequential: a browser session is exclusive and the human-cadence waits
/// only read as human when nothing races them.
pub async fn keyword_scraper_handler(
    mut keyword_receiver: UnboundedReceiver<String>,
    scraper: Arc<AuctionScraper>,
    pool: PgPool,
    results_sender: UnboundedSender<ScrapedKeyword>,
) {
    log::info!("Started keyword scraper");

    while let Some(keyword) = keyword_receiver.recv().await {
        let request = search_request_for(&scraper, &pool, keyword).await;

        let records = match user_agent_override(&pool).await {
            Some(user_agent) => {
                let mut settings = scraper.settings().clone();
                settings.user_agent = Some(user_agent);
                AuctionScraper::new(settings).scrape(&request).await
            }
            None => scraper.scrape(&request).await,
        };

        log::info!("Found {} results for '{}'", records.len(), request.keyword);

        let scraped = ScrapedKeyword {
            keyword: request.keyword,
            records,
        };
        if results_sender.send(scraped).is_err() {
            log::error!("Persistence channel closed, stopping keyword scraper");
            return;
        }
    }
}

/// Runtime overrides from the configuration table win over file settings.
async fn search_request_for(
    scraper: &AuctionScraper,
    pool: &PgPool,
    keyword: String,
) -> SearchRequest {
    let settings = scraper.settings();

    let max_results = match config_db::get_max_results(pool).await {
        Ok(Some(value)) => value,
        Ok(None) => settings.max_results,
        Err(e) => {
            log::error!("Error reading max results override: {:?}", e);
            settings.max_results
        }
    };

    let max_retries = match config_db::get_max_retries(pool).await {
        Ok(Some(value)) => value,
        Ok(None) => settings.max_retries,
        Err(e) => {
            log::error!("Error reading max retries override: {:?}", e);
            settings.max_retries
        }
    };

    SearchRequest {
        keyword,
        max_results,
        max_retries,
    }
}

async fn user_agent_override(pool: &PgPool) -> Option<String> {
    match config_db::get_custom_user_agent(pool).await {
        Ok(value) => value,
        Err(e) => {
            log::error!("Error reading user agent override: {:?}", e);
            None
        }
    }
}

/// Sinks scraped records into Postgres and the spreadsheet. Every sink
/// failure is logged and swallowed so one bad write never loses the rest.
pub async fn data_persistence_handler(
    mut results_receiver: UnboundedReceiver<ScrapedKeyword>,
    pool: PgPool,
    sheets: Data<SheetsClient>,
) {
    log::info!("Started data persistence handler");

    while let Some(data) = results_receiver.recv().await {
        let succeeded = data.records.len() > 1;

        match listing_db::insert_listings(&pool, &data.keyword, &data.records).await {
            Ok(count) => log::info!("Inserted {} listings for '{}'", count, data.keyword),
            Err(e) => log::error!("Error inserting listings in db: {:?}", e),
        }

        if let Err(e) =
            keyword_db::mark_scraped(&pool, &data.keyword, data.records.len() as i32).await
        {
            log::error!("Error updating keyword stats: {:?}", e);
        }

        if let Err(e) = session_db::insert_session(
            &pool,
            Uuid::new_v4(),
            &data.keyword,
            data.records.len() as i32,
            succeeded,
        )
        .await
        {
            log::error!("Error recording scrape session: {:?}", e);
        }

        if let Err(e) = sheets.write_results(&data.keyword, &data.records).await {
            log::error!("Error writing results to spreadsheet: {:?}", e);
        }
    }
}
