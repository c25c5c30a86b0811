use sqlx::Row;

fn database_url() -> String {
    dotenvy::dotenv().ok();

    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return url;
        }
    }

    let server = std::env::var("POSTGRES_SERVER").unwrap_or_else(|_| "localhost".into());
    let port = std::env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".into());
    let user = std::env::var("POSTGRES_USER").unwrap_or_else(|_| "nexus".into());
    let password = std::env::var("POSTGRES_PASSWORD").unwrap_or_default();
    let db = std::env::var("POSTGRES_DB").unwrap_or_else(|_| "nexus4d".into());

    format!("postgresql://{user}:{password}@{server}:{port}/{db}")
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn migrations_apply_and_tables_exist() -> anyhow::Result<()> {
    let pool =
        sqlx::postgres::PgPoolOptions::new().max_connections(1).connect(&database_url()).await?;

    let migrations_dir =
        std::env::var("NEXUS_MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(&migrations_dir)).await?;
    migrator.run(&pool).await?;

    let tables = [
        "users",
        "avatars",
        "user_avatars",
        "courses",
        "chapters",
        "chapter_materials",
        "promo_codes",
        "enrollments",
        "notifications",
        "follows",
        "friend_requests",
    ];

    for table in tables {
        let row = sqlx::query("SELECT to_regclass($1)::text").bind(table).fetch_one(&pool).await?;
        let regclass: Option<String> = row.try_get(0)?;
        assert!(regclass.is_some(), "expected table {table} to exist after migrations");
    }

    let row = sqlx::query(
        "SELECT COUNT(*) FROM pg_constraint WHERE conname = 'enrollments_user_course_key'",
    )
    .fetch_one(&pool)
    .await?;
    let unique_constraints: i64 = row.try_get(0)?;
    assert_eq!(unique_constraints, 1, "enrollments must be unique per (user, course)");

    let row = sqlx::query(
        "SELECT COUNT(*) FROM pg_indexes WHERE indexname = 'friend_requests_pair_key'",
    )
    .fetch_one(&pool)
    .await?;
    let pair_indexes: i64 = row.try_get(0)?;
    assert_eq!(pair_indexes, 1, "friend requests must be unique per unordered pair");

    Ok(())
}
