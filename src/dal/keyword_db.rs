use sqlx::PgPool;

#[derive(Debug, sqlx::FromRow)]
pub struct KeywordRow {
    pub keyword: String,
    pub last_scraped: String,
    pub total_results: i32,
}

pub async fn mark_scraped(
    pool: &PgPool,
    keyword: &str,
    total_results: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        insert into keyword
            (keyword, last_scraped, total_results)
        values
            ($1, now(), $2)
        on conflict(keyword) do update set
            last_scraped = now(),
            total_results = $2
        "#,
    )
    .bind(keyword)
    .bind(total_results)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_keyword_table(pool: &PgPool) -> Result<Vec<KeywordRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        select
            keyword,
            coalesce(to_char(last_scraped, 'YYYY-MM-DD HH24:MI'), 'never') as last_scraped,
            total_results
        from
            keyword
        order by
            keyword.last_scraped desc nulls last
        "#,
    )
    .fetch_all(pool)
    .await
}
