use serde::Serialize;
use sqlx::PgPool;

use crate::domain::ListingRecord;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ListingRow {
    pub keyword: String,
    pub description: String,
    pub price_text: String,
    pub end_date_text: String,
    pub image_url: String,
    pub scraped_at: String,
}

pub async fn insert_listings(
    pool: &PgPool,
    keyword: &str,
    records: &[ListingRecord],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;

    for record in records {
        let result = sqlx::query(
            r#"
            insert into listing
                (keyword, description, price_text, end_date_text, image_url)
            values
                ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(keyword)
        .bind(&record.description)
        .bind(&record.price_text)
        .bind(&record.end_date_text)
        .bind(&record.image_url)
        .execute(pool)
        .await?;

        inserted += result.rows_affected();
    }

    Ok(inserted)
}

pub async fn get_listings_for_keyword(
    pool: &PgPool,
    keyword: &str,
    limit: i64,
) -> Result<Vec<ListingRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        select
            keyword,
            description,
            price_text,
            end_date_text,
            image_url,
            to_char(scraped_at, 'YYYY-MM-DD HH24:MI') as scraped_at
        from
            listing
        where
            keyword = $1
        order by
            scraped_at desc
        limit $2
        "#,
    )
    .bind(keyword)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_recent_listings(pool: &PgPool, limit: i64) -> Result<Vec<ListingRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        select
            keyword,
            description,
            price_text,
            end_date_text,
            image_url,
            to_char(scraped_at, 'YYYY-MM-DD HH24:MI') as scraped_at
        from
            listing
        order by
            scraped_at desc
        limit $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
