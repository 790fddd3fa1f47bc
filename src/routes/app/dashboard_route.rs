use actix_web::{get, post, web, HttpResponse};
use askama::Template;
use serde::Deserialize;
use sqlx::PgPool;

use crate::dal::{
    config_db,
    keyword_db::{self, KeywordRow},
    listing_db::{self, ListingRow},
    session_db,
};

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    keywords: Vec<KeywordRow>,
    listings: Vec<ListingRow>,
    total_sessions: i64,
    succeeded_sessions: i64,
    max_results: String,
    max_retries: String,
    user_agent: String,
}

#[get("/dashboard")]
pub async fn dashboard(pool: web::Data<PgPool>) -> HttpResponse {
    let keywords = keyword_db::get_keyword_table(&pool).await.unwrap_or(vec![]);
    let listings = listing_db::get_recent_listings(&pool, 25)
        .await
        .unwrap_or(vec![]);

    let (total_sessions, succeeded_sessions) = match session_db::get_session_stats(&pool).await {
        Ok(stats) => (stats.total_sessions, stats.succeeded_sessions),
        Err(e) => {
            log::error!("Error reading session stats: {:?}", e);
            (0, 0)
        }
    };

    let max_results = config_value(&pool, config_db::MAX_RESULTS_KEY).await;
    let max_retries = config_value(&pool, config_db::MAX_RETRIES_KEY).await;
    let user_agent = config_value(&pool, config_db::USER_AGENT_KEY).await;

    let page = DashboardTemplate {
        keywords,
        listings,
        total_sessions,
        succeeded_sessions,
        max_results,
        max_retries,
        user_agent,
    };

    match page.render() {
        Ok(body) => HttpResponse::Ok().body(body),
        Err(e) => {
            log::error!("Failed to render dashboard: {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn config_value(pool: &PgPool, key: &str) -> String {
    match config_db::get_value(pool, key).await {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            log::error!("Error reading configuration '{}': {:?}", key, e);
            String::new()
        }
    }
}

#[derive(Deserialize)]
pub struct SetConfigBody {
    key: String,
    value: String,
}

#[post("/set-config")]
pub async fn set_config(pool: web::Data<PgPool>, body: web::Form<SetConfigBody>) -> HttpResponse {
    match body.key.as_str() {
        config_db::MAX_RESULTS_KEY | config_db::MAX_RETRIES_KEY | config_db::USER_AGENT_KEY => {
            if let Err(e) = config_db::set_value(&pool, &body.key, &body.value).await {
                log::error!("Error saving configuration '{}': {:?}", body.key, e);
                return HttpResponse::InternalServerError().finish();
            }
        }
        _ => return HttpResponse::Ok().body(format!("Setting wrong configuration: {}", body.key)),
    }

    HttpResponse::Ok().body("Done!")
}
