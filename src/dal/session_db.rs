use sqlx::PgPool;
use uuid::Uuid;

pub async fn insert_session(
    pool: &PgPool,
    id: Uuid,
    keyword: &str,
    records: i32,
    succeeded: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        insert into scrape_session
            (id, keyword, records, succeeded)
        values
            ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(keyword)
    .bind(records)
    .bind(succeeded)
    .execute(pool)
    .await?;

    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionStats {
    pub total_sessions: i64,
    pub succeeded_sessions: i64,
}

pub async fn get_session_stats(pool: &PgPool) -> Result<SessionStats, sqlx::Error> {
    sqlx::query_as(
        r#"
        select
            count(*) as total_sessions,
            count(*) filter (where succeeded) as succeeded_sessions
        from
            scrape_session
        "#,
    )
    .fetch_one(pool)
    .await
}
