use actix_web::{get, post, web, HttpResponse};
use itertools::Itertools;
use serde::Deserialize;
use sqlx::PgPool;

use crate::dal::listing_db;
use crate::services::{KeywordQuerySender, SheetsClient};

#[derive(Deserialize)]
pub struct ScrapeKeywordBody {
    pub keyword: String,
}

#[post("/keyword")]
pub async fn scrape_keyword(
    body: web::Form<ScrapeKeywordBody>,
    sender: web::Data<KeywordQuerySender>,
) -> HttpResponse {
    let keyword = body.keyword.trim().to_string();
    if keyword.is_empty() {
        return HttpResponse::BadRequest().body("keyword must not be empty");
    }

    match sender.sender.send(keyword.clone()) {
        Ok(_) => HttpResponse::Ok().body(format!("Queued '{}' for scraping", keyword)),
        Err(e) => {
            log::error!("Keyword channel closed: {:?}", e);
            HttpResponse::InternalServerError().body("scraper worker unavailable")
        }
    }
}

/// Reads the keyword tab of the configured spreadsheet and queues every
/// keyword on it, in sheet order.
#[post("/sheet")]
pub async fn scrape_sheet(
    sender: web::Data<KeywordQuerySender>,
    sheets: web::Data<SheetsClient>,
) -> HttpResponse {
    let keywords = match sheets.read_keywords().await {
        Ok(keywords) => keywords,
        Err(e) => {
            log::error!("Failed to read keywords from sheet: {:?}", e);
            return HttpResponse::BadGateway().body("could not read keywords from spreadsheet");
        }
    };

    let keywords: Vec<String> = keywords.into_iter().unique().collect();
    let queued = keywords.len();

    for keyword in keywords {
        if sender.sender.send(keyword).is_err() {
            return HttpResponse::InternalServerError().body("scraper worker unavailable");
        }
    }

    HttpResponse::Ok().body(format!("Queued {} keywords from sheet", queued))
}

#[get("/listings/{keyword}")]
pub async fn get_listings(path: web::Path<String>, pool: web::Data<PgPool>) -> HttpResponse {
    let keyword = path.into_inner();

    match listing_db::get_listings_for_keyword(&pool, &keyword, 100).await {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => {
            log::error!("Error fetching listings for '{}': {:?}", keyword, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
