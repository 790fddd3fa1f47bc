use sqlx::PgPool;

pub const MAX_RESULTS_KEY: &str = "scraper-max-results";
pub const MAX_RETRIES_KEY: &str = "scraper-max-retries";
pub const USER_AGENT_KEY: &str = "scraper-user-agent";

pub async fn get_value(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        select
            value
        from
            configuration
        where
            key = $1
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await
}

pub async fn set_value(pool: &PgPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        insert into configuration
            (key, value)
        values
            ($1, $2)
        on conflict(key) do update set
            value = $2
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_max_results(pool: &PgPool) -> Result<Option<usize>, sqlx::Error> {
    let value = get_value(pool, MAX_RESULTS_KEY).await?;
    Ok(value.and_then(|v| v.parse().ok()))
}

pub async fn get_max_retries(pool: &PgPool) -> Result<Option<u32>, sqlx::Error> {
    let value = get_value(pool, MAX_RETRIES_KEY).await?;
    Ok(value.and_then(|v| v.parse().ok()))
}

pub async fn get_custom_user_agent(pool: &PgPool) -> Result<Option<String>, sqlx::Error> {
    let value = get_value(pool, USER_AGENT_KEY).await?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}
