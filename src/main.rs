use std::{net::TcpListener, sync::Arc, time::Duration};

use actix_web::web;
use env_logger::Env;
use gavel::{
    configuration::get_configuration,
    services::{
        data_persistence_handler, keyword_scraper_handler, AuctionScraper, KeywordQuerySender,
        ScrapedKeyword, SheetsClient,
    },
    startup::run,
};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().expect("Failed to read configuration.");

    let pool_options = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(15 * 60)) // 15 minutes
        .max_lifetime(None);

    let connection_pool = pool_options.connect_lazy_with(configuration.database.with_db());
    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(address)?;

    let scraper = Arc::new(AuctionScraper::new(configuration.scraper));
    let sheets = web::Data::new(SheetsClient::new(configuration.sheets));

    let (keyword_sender, keyword_receiver) = mpsc::unbounded_channel::<String>();
    let (results_sender, results_receiver) = mpsc::unbounded_channel::<ScrapedKeyword>();

    let keyword_query_sender = KeywordQuerySender {
        sender: keyword_sender,
    };

    // Spawn background tasks
    let scraper_clone = scraper.clone();
    let pool_clone = connection_pool.clone();
    tokio::spawn(async move {
        keyword_scraper_handler(keyword_receiver, scraper_clone, pool_clone, results_sender).await
    });

    let pool_clone = connection_pool.clone();
    let sheets_clone = sheets.clone();
    tokio::spawn(
        async move { data_persistence_handler(results_receiver, pool_clone, sheets_clone).await },
    );

    run(listener, connection_pool, sheets, keyword_query_sender)?.await
}
