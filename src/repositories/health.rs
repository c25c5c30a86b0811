use sqlx::PgPool;

/// Round-trips a trivial query so `/healthz` reflects whether the pool can reach Postgres.
pub(crate) async fn database_reachable(pool: &PgPool) -> Result<(), sqlx::Error> {
    let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    debug_assert_eq!(one, 1);
    Ok(())
}
